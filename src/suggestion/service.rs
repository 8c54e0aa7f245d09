use std::sync::Arc;

use uuid::Uuid;

use super::models::{SuggestedAccount, SuggestionReason};
use crate::errors::AppError;
use crate::store::models::{Category, CategoryType};
use crate::store::LedgerStore;

/// Maps a budget category to a recommended settlement account.
///
/// Pure read with no side effects; cheap enough to call on every
/// category-selection change in a form.
#[derive(Clone)]
pub struct SuggestionService {
    store: Arc<dyn LedgerStore>,
}

impl SuggestionService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Resolve the suggested account for a category the owner can see.
    pub async fn suggest_account(
        &self,
        owner_id: Uuid,
        category_id: Uuid,
    ) -> Result<SuggestedAccount, AppError> {
        let category = self
            .store
            .get_category(category_id)
            .await?
            .filter(|c| c.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Category not found".to_string()))?;

        Ok(Self::resolve(&category))
    }

    /// The suggestion mapping itself, on an already-loaded category.
    ///
    /// Savings-goal and debt-payment categories with a configured linked
    /// account resolve to that account; everything else resolves to none.
    pub fn resolve(category: &Category) -> SuggestedAccount {
        let (account_id, reason) = match (category.category_type(), category.linked_account_id) {
            (CategoryType::SavingsGoal, Some(account_id)) => {
                (Some(account_id), SuggestionReason::LinkedSavingsGoal)
            }
            (CategoryType::DebtPayment, Some(account_id)) => {
                (Some(account_id), SuggestionReason::LinkedDebtPayment)
            }
            _ => (None, SuggestionReason::None),
        };

        SuggestedAccount {
            category_id: category.id,
            account_id,
            reason,
        }
    }
}
