use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Percentage of the cap consumed, 2-decimal rounding, 0 when the cap is 0.
pub fn utilization_percentage(budget_cap: Decimal, actual_spend: Decimal) -> Decimal {
    if budget_cap == Decimal::ZERO {
        return Decimal::ZERO;
    }
    (actual_spend / budget_cap * Decimal::from(100)).round_dp(2)
}

/// Derived per-category aggregate. Computed server-side from the live
/// transaction rows; mirrored client-side by the optimistic projector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Category identifier
    pub id: Uuid,
    /// Category name
    #[schema(example = "Groceries")]
    pub name: String,
    /// Budgeted cap for the period
    #[schema(example = 800.00)]
    pub budget_cap: Decimal,
    /// Sum of expense magnitudes recorded in the period
    #[schema(example = 650.00)]
    pub actual_spend: Decimal,
    /// budget_cap - actual_spend
    #[schema(example = 150.00)]
    pub remaining: Decimal,
    /// actual_spend / budget_cap in percent, 0 when the cap is 0
    #[schema(example = 81.25)]
    pub utilization_percentage: Decimal,
    /// Number of transactions in the period
    #[schema(example = 3)]
    pub transaction_count: u64,
}

impl CategorySummary {
    /// Build a summary from a cap and the period's spend.
    pub fn derive(
        id: Uuid,
        name: String,
        budget_cap: Decimal,
        actual_spend: Decimal,
        transaction_count: u64,
    ) -> Self {
        Self {
            id,
            name,
            budget_cap,
            actual_spend,
            remaining: budget_cap - actual_spend,
            utilization_percentage: utilization_percentage(budget_cap, actual_spend),
            transaction_count,
        }
    }

    /// The same summary under a different cap; spend is unchanged.
    pub fn with_cap(&self, budget_cap: Decimal) -> Self {
        Self::derive(
            self.id,
            self.name.clone(),
            budget_cap,
            self.actual_spend,
            self.transaction_count,
        )
    }
}

/// Portfolio-level aggregate: every category summary plus the totals the
/// projector tracks optimistically.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetOverview {
    pub categories: Vec<CategorySummary>,
    /// Sum of all category caps
    #[schema(example = 2400.00)]
    pub total_budget_caps: Decimal,
    /// Asset balances not yet assigned to a category cap
    #[schema(example = 600.00)]
    pub unallocated_funds: Decimal,
}

/// Query parameters bounding the summary period
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct OverviewQuery {
    /// Include transactions on or after this instant
    pub start_date: Option<DateTime<Utc>>,
    /// Include transactions on or before this instant
    pub end_date: Option<DateTime<Utc>>,
}
