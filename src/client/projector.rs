use rust_decimal::Decimal;
use uuid::Uuid;

use crate::category::models::{BudgetOverview, CategorySummary};

/// Placeholder id for a category inserted optimistically, before the
/// server has assigned a real one. Replaced wholesale on the next sync.
pub const PENDING_CATEGORY_ID: Uuid = Uuid::nil();

/// The client's local mirror of the budget aggregates.
///
/// Every transition is pure: it takes the current snapshot and returns a
/// new one, no I/O. The caller fires the real write separately, keeps the
/// prior snapshot, and either rolls back to it on failure or replaces the
/// whole state when authoritative data arrives.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BudgetSnapshot {
    pub overview: BudgetOverview,
}

impl BudgetSnapshot {
    pub fn new(overview: BudgetOverview) -> Self {
        Self { overview }
    }

    /// Optimistically insert a zero-spend category under the placeholder
    /// id. The cap moves from unallocated funds into the cap total.
    pub fn add_category(&self, name: &str, cap: Decimal) -> Self {
        let mut next = self.clone();
        next.overview.categories.push(CategorySummary::derive(
            PENDING_CATEGORY_ID,
            name.to_string(),
            cap,
            Decimal::ZERO,
            0,
        ));
        next.overview.total_budget_caps += cap;
        next.overview.unallocated_funds -= cap;
        next
    }

    /// Change a category's cap, re-deriving its summary from the spend we
    /// already know and shifting both totals by the delta.
    pub fn update_budget(&self, id: Uuid, new_cap: Decimal) -> Self {
        let mut next = self.clone();
        if let Some(category) = next.overview.categories.iter_mut().find(|c| c.id == id) {
            let delta = new_cap - category.budget_cap;
            *category = category.with_cap(new_cap);
            next.overview.total_budget_caps += delta;
            next.overview.unallocated_funds -= delta;
        }
        next
    }

    /// Rename only; aggregates untouched.
    pub fn update_name(&self, id: Uuid, new_name: &str) -> Self {
        let mut next = self.clone();
        if let Some(category) = next.overview.categories.iter_mut().find(|c| c.id == id) {
            category.name = new_name.to_string();
        }
        next
    }

    /// Remove a category and return its cap to the unallocated pool.
    pub fn delete_category(&self, id: Uuid) -> Self {
        let mut next = self.clone();
        if let Some(pos) = next.overview.categories.iter().position(|c| c.id == id) {
            let removed = next.overview.categories.remove(pos);
            next.overview.total_budget_caps -= removed.budget_cap;
            next.overview.unallocated_funds += removed.budget_cap;
        }
        next
    }

    /// Discard speculative state: the prior snapshot becomes live again.
    pub fn rollback(&self, previous: BudgetSnapshot) -> Self {
        previous
    }

    /// Authoritative data arrived; replace the local mirror wholesale.
    pub fn sync_with_server(&self, server: BudgetOverview) -> Self {
        Self { overview: server }
    }
}
