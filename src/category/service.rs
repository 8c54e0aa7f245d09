use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use super::models::{BudgetOverview, CategorySummary};
use crate::errors::AppError;
use crate::store::models::{AccountClass, PeriodFilter, Transaction};
use crate::store::LedgerStore;

/// Computes the authoritative category aggregates from live ledger rows.
///
/// The store only lists by foreign key, so the sums happen here rather
/// than in the backend. This read is what the reconciliation loop
/// refetches after every change burst.
#[derive(Clone)]
pub struct CategorySummaryService {
    store: Arc<dyn LedgerStore>,
}

/// Spend contributed by one period's rows: expense magnitudes only.
fn period_spend(rows: &[Transaction]) -> Decimal {
    rows.iter()
        .filter(|t| t.amount < Decimal::ZERO)
        .map(|t| -t.amount)
        .sum()
}

impl CategorySummaryService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Summary for a single category in the given period.
    pub async fn category_summary(
        &self,
        owner_id: Uuid,
        category_id: Uuid,
        period: PeriodFilter,
    ) -> Result<CategorySummary, AppError> {
        let category = self
            .store
            .get_category(category_id)
            .await?
            .filter(|c| c.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        let rows = self
            .store
            .list_transactions_by_category(category.id, period)
            .await?;

        Ok(CategorySummary::derive(
            category.id,
            category.name,
            category.budget_cap,
            period_spend(&rows),
            rows.len() as u64,
        ))
    }

    /// The full portfolio snapshot: every category summary plus totals.
    pub async fn overview(
        &self,
        owner_id: Uuid,
        period: PeriodFilter,
    ) -> Result<BudgetOverview, AppError> {
        let categories = self.store.list_categories(owner_id).await?;

        let mut summaries = Vec::with_capacity(categories.len());
        let mut total_budget_caps = Decimal::ZERO;
        for category in categories {
            let rows = self
                .store
                .list_transactions_by_category(category.id, period)
                .await?;
            total_budget_caps += category.budget_cap;
            summaries.push(CategorySummary::derive(
                category.id,
                category.name,
                category.budget_cap,
                period_spend(&rows),
                rows.len() as u64,
            ));
        }

        let asset_funds: Decimal = self
            .store
            .list_accounts(owner_id)
            .await?
            .iter()
            .filter(|a| a.class() == AccountClass::Asset)
            .map(|a| a.current_balance)
            .sum();

        Ok(BudgetOverview {
            categories: summaries,
            total_budget_caps,
            unallocated_funds: asset_funds - total_budget_caps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ChangeFeed;
    use crate::store::memory::MemoryLedgerStore;
    use crate::store::models::{CategoryType, EntryType};
    use crate::transaction::models::CreateUnifiedDto;
    use crate::transaction::service::TransactionWriter;
    use chrono::Utc;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[tokio::test]
    async fn spend_and_utilization_follow_the_live_rows() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let category = store.seed_category(
            owner,
            "Groceries",
            dec(800),
            CategoryType::Regular,
            None,
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        for amount in [100, 250, 300] {
            writer
                .create_unified(
                    owner,
                    CreateUnifiedDto {
                        description: "expense".to_string(),
                        amount: dec(amount),
                        transaction_date: Utc::now(),
                        entry_type: EntryType::Expense,
                        category_id: Some(category.id),
                        account_id: Some(None),
                        require_account: false,
                        notes: None,
                    },
                )
                .await
                .unwrap();
        }

        let service = CategorySummaryService::new(store);
        let summary = service
            .category_summary(owner, category.id, PeriodFilter::default())
            .await
            .unwrap();

        assert_eq!(summary.actual_spend, dec(650));
        assert_eq!(summary.remaining, dec(150));
        assert_eq!(summary.utilization_percentage, Decimal::new(8125, 2));
        assert_eq!(summary.transaction_count, 3);
    }

    #[tokio::test]
    async fn income_rows_count_but_do_not_spend() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let category = store.seed_category(
            owner,
            "Side gig",
            dec(0),
            CategoryType::Regular,
            None,
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        writer
            .create_unified(
                owner,
                CreateUnifiedDto {
                    description: "payout".to_string(),
                    amount: dec(120),
                    transaction_date: Utc::now(),
                    entry_type: EntryType::Income,
                    category_id: Some(category.id),
                    account_id: Some(None),
                    require_account: false,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let service = CategorySummaryService::new(store);
        let summary = service
            .category_summary(owner, category.id, PeriodFilter::default())
            .await
            .unwrap();

        assert_eq!(summary.actual_spend, dec(0));
        assert_eq!(summary.transaction_count, 1);
        assert_eq!(summary.utilization_percentage, dec(0));
    }

    #[tokio::test]
    async fn overview_totals_span_categories_and_asset_accounts() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        store.seed_account(owner, "Checking", AccountClass::Asset, dec(3000));
        store.seed_account(owner, "Card", AccountClass::Liability, dec(400));
        store.seed_category(owner, "Groceries", dec(800), CategoryType::Regular, None);
        store.seed_category(owner, "Rent", dec(1200), CategoryType::Regular, None);

        let service = CategorySummaryService::new(store);
        let overview = service
            .overview(owner, PeriodFilter::default())
            .await
            .unwrap();

        assert_eq!(overview.categories.len(), 2);
        assert_eq!(overview.total_budget_caps, dec(2000));
        // Liability balances stay out of the unallocated pool.
        assert_eq!(overview.unallocated_funds, dec(1000));
    }
}
