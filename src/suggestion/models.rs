use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Why an account was (or wasn't) suggested for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionReason {
    LinkedSavingsGoal,
    LinkedDebtPayment,
    None,
}

/// Resolved account suggestion. Ephemeral; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedAccount {
    pub category_id: Uuid,
    pub account_id: Option<Uuid>,
    pub reason: SuggestionReason,
}

/// Suggestion returned in responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAccountResponse {
    /// Category the suggestion was resolved for
    pub category_id: Uuid,
    /// Suggested settlement account, if any
    pub account_id: Option<Uuid>,
    /// Why this account was chosen
    #[schema(example = "linked_savings_goal")]
    pub reason: SuggestionReason,
}

impl From<SuggestedAccount> for SuggestedAccountResponse {
    fn from(s: SuggestedAccount) -> Self {
        Self {
            category_id: s.category_id,
            account_id: s.account_id,
            reason: s.reason,
        }
    }
}

/// Path parameters for category ID
#[derive(Debug, Deserialize, IntoParams)]
pub struct CategoryIdPath {
    /// Category UUID
    pub category_id: Uuid,
}
