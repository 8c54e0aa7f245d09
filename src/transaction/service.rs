use std::sync::Arc;

use uuid::Uuid;

use super::models::CreateUnifiedDto;
use crate::errors::AppError;
use crate::notify::{ChangeFeed, Collection};
use crate::saga::Saga;
use crate::store::models::{
    Account, AccountTransaction, NewAccountTransaction, NewTransaction, Transaction,
    TransactionChange,
};
use crate::store::{LedgerStore, StoreError};
use crate::suggestion::service::SuggestionService;

/// Source tag for rows created through the unified write path.
const SOURCE_UNIFIED: &str = "manual";

/// Both rows a unified write produced.
#[derive(Debug)]
pub struct UnifiedWriteOutcome {
    pub transaction: Transaction,
    pub account_transaction: Option<AccountTransaction>,
}

/// Writes one economic event into the ledger: a budget-side row, and when
/// an account resolves, a linked account-side row plus the balance delta.
///
/// The store offers no multi-statement atomicity, so the whole write runs
/// under a saga: every completed step records its compensation, and a
/// failed step unwinds the earlier ones before the error is reported. An
/// orphaned budget row is worse than no row.
#[derive(Clone)]
pub struct TransactionWriter {
    store: Arc<dyn LedgerStore>,
    feed: ChangeFeed,
}

impl TransactionWriter {
    pub fn new(store: Arc<dyn LedgerStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Create a unified transaction.
    ///
    /// Validation and account resolution happen before any write; failures
    /// after the first write trigger compensation. On success, change
    /// signals are published for every collection touched.
    pub async fn create_unified(
        &self,
        owner_id: Uuid,
        dto: CreateUnifiedDto,
    ) -> Result<UnifiedWriteOutcome, AppError> {
        // 1. Resolve the category (ownership check) and the account to use,
        //    entirely pre-write.
        let category = match dto.category_id {
            Some(category_id) => Some(
                self.store
                    .get_category(category_id)
                    .await?
                    .filter(|c| c.owner_id == owner_id)
                    .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?,
            ),
            None => None,
        };

        let account_id = match dto.account_id {
            Some(Some(id)) => Some(id),
            // Caller explicitly chose "no account": skip the resolver.
            Some(None) => None,
            None => category
                .as_ref()
                .and_then(|c| SuggestionService::resolve(c).account_id),
        };

        if dto.require_account && account_id.is_none() {
            return Err(AppError::ValidationError(
                "An account is required for this transaction".to_string(),
            ));
        }

        let account = match account_id {
            Some(id) => Some(
                self.store
                    .get_account(id)
                    .await?
                    .filter(|a| a.owner_id == owner_id)
                    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?,
            ),
            None => None,
        };

        // 2. Budget-side row, sign normalized from the entry type.
        let mut saga = Saga::new("create_unified_transaction");
        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                owner_id,
                category_id: dto.category_id,
                amount: dto.entry_type.signed_amount(dto.amount),
                transaction_date: dto.transaction_date,
                description: dto.description.clone(),
                source: SOURCE_UNIFIED.to_string(),
                account_transaction_id: None,
                recurring_id: None,
                notes: dto.notes.clone(),
            })
            .await
            .map_err(AppError::from)?;
        {
            let store = self.store.clone();
            let id = transaction.id;
            saga.record("delete_budget_row", move || async move {
                store.delete_transaction(id).await
            });
        }

        // 3. Account-side row, link, balance delta.
        let account_transaction = match account {
            Some(account) => {
                match self
                    .write_account_side(&mut saga, &account, &dto, transaction.id)
                    .await
                {
                    Ok(row) => Some(row),
                    Err((stage, err)) => return Err(Self::classify_unwind(saga, stage, err).await),
                }
            }
            None => None,
        };

        saga.commit();

        self.feed
            .publish(Collection::Transactions, owner_id, Some(transaction.id));
        if let Some(row) = &account_transaction {
            self.feed
                .publish(Collection::AccountTransactions, owner_id, Some(row.id));
            self.feed
                .publish(Collection::Accounts, owner_id, Some(row.account_id));
        }

        // Return the budget row as persisted after linking.
        let transaction = Transaction {
            account_transaction_id: account_transaction.as_ref().map(|row| row.id),
            ..transaction
        };

        Ok(UnifiedWriteOutcome {
            transaction,
            account_transaction,
        })
    }

    /// Steps 4-5 of the unified write: insert the account-side row, set
    /// the bidirectional link, apply the balance delta. Reports the first
    /// failing stage; the caller unwinds.
    async fn write_account_side(
        &self,
        saga: &mut Saga,
        account: &Account,
        dto: &CreateUnifiedDto,
        transaction_id: Uuid,
    ) -> Result<AccountTransaction, (&'static str, StoreError)> {
        let kind = dto.entry_type.default_kind();
        let signed = account.class().signed_amount(dto.amount, kind);

        let row = self
            .store
            .insert_account_transaction(NewAccountTransaction {
                account_id: account.id,
                amount: signed,
                kind,
                transaction_date: dto.transaction_date,
                description: dto.description.clone(),
                transaction_id: Some(transaction_id),
            })
            .await
            .map_err(|err| ("account_write", err))?;
        {
            let store = self.store.clone();
            let id = row.id;
            saga.record("delete_account_row", move || async move {
                store.delete_account_transaction(id).await
            });
        }

        let link = TransactionChange {
            account_transaction_id: Some(Some(row.id)),
            ..Default::default()
        };
        self.store
            .update_transaction(transaction_id, link)
            .await
            .map_err(|err| ("link_budget_row", err))?;
        // No compensation for the link itself: unwinding deletes the
        // budget row outright.

        let new_balance = account.current_balance + signed;
        self.store
            .set_account_balance(account.id, new_balance)
            .await
            .map_err(|err| ("balance_update", err))?;

        Ok(row)
    }

    /// Unwind the saga and classify the outcome: compensation succeeded
    /// means an ordinary partial-write failure, compensation failed means
    /// a consistency warning for operator eyes.
    async fn classify_unwind(saga: Saga, stage: &'static str, err: StoreError) -> AppError {
        match saga.unwind().await {
            Ok(()) => AppError::PartialWrite {
                stage,
                message: err.to_string(),
            },
            Err(failure) => AppError::ConsistencyWarning {
                stage,
                message: format!(
                    "{err}; compensation {} failed: {}",
                    failure.step, failure.source
                ),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLedgerStore;
    use crate::store::models::{AccountClass, CategoryType, EntryType, PeriodFilter};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn dto(amount: i64, entry_type: EntryType) -> CreateUnifiedDto {
        CreateUnifiedDto {
            description: "test".to_string(),
            amount: Decimal::from(amount),
            transaction_date: Utc::now(),
            entry_type,
            category_id: None,
            account_id: None,
            require_account: false,
            notes: None,
        }
    }

    #[tokio::test]
    async fn expense_round_trip_links_both_rows() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(1000));
        let category = store.seed_category(
            owner,
            "Groceries",
            Decimal::from(800),
            CategoryType::Regular,
            None,
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(50, EntryType::Expense);
        request.category_id = Some(category.id);
        request.account_id = Some(Some(account.id));

        let outcome = writer.create_unified(owner, request).await.unwrap();
        assert_eq!(outcome.transaction.amount, Decimal::from(-50));

        let account_row = outcome.account_transaction.unwrap();
        assert_eq!(account_row.amount, Decimal::from(-50));
        assert_eq!(account_row.kind(), crate::store::models::AccountTransactionKind::Withdrawal);
        assert_eq!(account_row.transaction_id, Some(outcome.transaction.id));
        assert_eq!(
            outcome.transaction.account_transaction_id,
            Some(account_row.id)
        );

        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, Decimal::from(950));
    }

    #[tokio::test]
    async fn suggestion_is_adopted_when_account_unspecified() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let goal_account =
            store.seed_account(owner, "Vacation fund", AccountClass::Asset, Decimal::ZERO);
        let category = store.seed_category(
            owner,
            "Vacation",
            Decimal::from(200),
            CategoryType::SavingsGoal,
            Some(goal_account.id),
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(75, EntryType::Expense);
        request.category_id = Some(category.id);

        let outcome = writer.create_unified(owner, request).await.unwrap();
        let account_row = outcome.account_transaction.unwrap();
        assert_eq!(account_row.account_id, goal_account.id);
    }

    #[tokio::test]
    async fn explicit_no_account_skips_the_resolver() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let goal_account =
            store.seed_account(owner, "Vacation fund", AccountClass::Asset, Decimal::from(100));
        let category = store.seed_category(
            owner,
            "Vacation",
            Decimal::from(200),
            CategoryType::SavingsGoal,
            Some(goal_account.id),
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(75, EntryType::Expense);
        request.category_id = Some(category.id);
        request.account_id = Some(None);

        let outcome = writer.create_unified(owner, request).await.unwrap();
        assert!(outcome.account_transaction.is_none());

        let reloaded = store.get_account(goal_account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, Decimal::from(100));
    }

    #[tokio::test]
    async fn require_account_rejects_before_any_write() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let category = store.seed_category(
            owner,
            "Groceries",
            Decimal::from(800),
            CategoryType::Regular,
            None,
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(50, EntryType::Expense);
        request.category_id = Some(category.id);
        request.require_account = true;

        let err = writer.create_unified(owner, request).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let rows = store
            .list_transactions_by_category(category.id, PeriodFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn failed_account_write_compensates_the_budget_row() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(1000));
        let category = store.seed_category(
            owner,
            "Groceries",
            Decimal::from(800),
            CategoryType::Regular,
            None,
        );

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(50, EntryType::Expense);
        request.category_id = Some(category.id);
        request.account_id = Some(Some(account.id));

        store.fail_next("insert_account_transaction");
        let err = writer.create_unified(owner, request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::PartialWrite {
                stage: "account_write",
                ..
            }
        ));

        // Zero orphaned budget rows and an untouched balance.
        let rows = store
            .list_transactions_by_category(category.id, PeriodFilter::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, Decimal::from(1000));
    }

    #[tokio::test]
    async fn failed_compensation_is_a_consistency_warning() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(1000));

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(50, EntryType::Expense);
        request.account_id = Some(Some(account.id));

        store.fail_next("insert_account_transaction");
        store.fail_next("delete_transaction");
        let err = writer.create_unified(owner, request).await.unwrap_err();
        assert!(matches!(err, AppError::ConsistencyWarning { .. }));
    }

    #[tokio::test]
    async fn failed_balance_write_unwinds_both_rows() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(1000));

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(50, EntryType::Expense);
        request.account_id = Some(Some(account.id));

        store.fail_next("set_account_balance");
        let err = writer.create_unified(owner, request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::PartialWrite {
                stage: "balance_update",
                ..
            }
        ));

        let rows = store.list_account_transactions(account.id).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn income_is_positive_on_both_sides_of_an_asset_account() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(100));

        let writer = TransactionWriter::new(store.clone(), ChangeFeed::default());
        let mut request = dto(200, EntryType::Income);
        request.account_id = Some(Some(account.id));

        let outcome = writer.create_unified(owner, request).await.unwrap();
        assert_eq!(outcome.transaction.amount, Decimal::from(200));
        assert_eq!(
            outcome.account_transaction.unwrap().amount,
            Decimal::from(200)
        );

        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, Decimal::from(300));
    }
}
