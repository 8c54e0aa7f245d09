use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::account_transaction::models::AccountTransactionResponse;
use crate::store::models::{EntryType, Transaction};

/// Validate that amount is positive
fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    Ok(())
}

/// Deserialize a present-but-nullable field into `Option<Option<Uuid>>` so that
/// an absent field is distinguishable from an explicit JSON `null`. Paired with
/// `#[serde(default)]`: absent → `None`, `null` → `Some(None)`, value → `Some(Some(..))`.
fn deserialize_double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::<Uuid>::deserialize(deserializer)?))
}

/// Request body for creating a unified transaction: one economic event,
/// recorded on the budget side and, when an account resolves, on the
/// account side as a linked pair.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnifiedDto {
    /// What the money was for (1-200 chars)
    #[validate(length(min = 1, max = 200, message = "Description must be 1-200 characters"))]
    #[schema(example = "Weekly groceries")]
    pub description: String,

    /// Unsigned magnitude (must be positive); the entry type decides the sign
    #[validate(custom(
        function = "validate_positive_amount",
        message = "Amount must be positive"
    ))]
    #[schema(example = 50.00)]
    pub amount: Decimal,

    /// Date of the transaction
    pub transaction_date: DateTime<Utc>,

    /// Entry type (defaults to expense)
    #[serde(default)]
    pub entry_type: EntryType,

    /// Budget category (optional)
    pub category_id: Option<Uuid>,

    /// Settlement account. Omit to let the category's suggestion decide;
    /// pass null to record a budget-only transaction with no account.
    #[serde(default, deserialize_with = "deserialize_double_option")]
    pub account_id: Option<Option<Uuid>>,

    /// Fail validation instead of writing when no account resolves
    #[serde(default)]
    pub require_account: bool,

    /// Free-form notes (max 500 chars)
    #[validate(length(max = 500, message = "Notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
}

/// Budget-side transaction returned in responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Unique transaction identifier
    pub id: Uuid,
    /// Category this transaction belongs to (optional)
    pub category_id: Option<Uuid>,
    /// Signed amount: expenses negative, income positive
    #[schema(example = -50.00)]
    pub amount: Decimal,
    /// Date of the transaction
    pub transaction_date: DateTime<Utc>,
    /// Description
    #[schema(example = "Weekly groceries")]
    pub description: String,
    /// Where the record came from
    #[schema(example = "manual")]
    pub source: String,
    /// Linked account-side record, if any
    pub account_transaction_id: Option<Uuid>,
    /// Recurring definition this row was created from, if any
    pub recurring_id: Option<Uuid>,
    /// Free-form notes
    pub notes: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id,
            category_id: t.category_id,
            amount: t.amount,
            transaction_date: t.transaction_date,
            description: t.description,
            source: t.source,
            account_transaction_id: t.account_transaction_id,
            recurring_id: t.recurring_id,
            notes: t.notes,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Response for a unified write: the budget-side row plus the linked
/// account-side row when one was created.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedTransactionResponse {
    pub transaction: TransactionResponse,
    pub account_transaction: Option<AccountTransactionResponse>,
}
