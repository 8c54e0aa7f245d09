use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::store::models::{AccountTransaction, AccountTransactionKind};

/// Validate that amount is positive
fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    Ok(())
}

/// Account-side transaction returned in responses
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransactionResponse {
    /// Unique identifier
    pub id: Uuid,
    /// Owning account
    pub account_id: Uuid,
    /// Signed amount per the account's class
    #[schema(example = -50.00)]
    pub amount: Decimal,
    /// Transaction kind (deposit, withdrawal, payment, ...)
    #[schema(example = "withdrawal")]
    pub kind: String,
    /// Date of the transaction
    pub transaction_date: DateTime<Utc>,
    /// Description
    pub description: String,
    /// Linked budget-side record, if any
    pub transaction_id: Option<Uuid>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<AccountTransaction> for AccountTransactionResponse {
    fn from(t: AccountTransaction) -> Self {
        Self {
            id: t.id,
            account_id: t.account_id,
            amount: t.amount,
            kind: t.kind,
            transaction_date: t.transaction_date,
            description: t.description,
            transaction_id: t.transaction_id,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Request body for updating an account transaction (PATCH - all fields
/// optional). Amounts arrive as unsigned magnitudes; the kind and the
/// account's class decide the stored sign.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountTransactionDto {
    /// Description
    #[validate(length(min = 1, max = 200, message = "Description must be 1-200 characters"))]
    #[schema(example = "Corrected amount")]
    pub description: Option<String>,

    /// Unsigned magnitude
    #[schema(example = 75.00)]
    pub amount: Option<Decimal>,

    /// Date of the transaction
    pub transaction_date: Option<DateTime<Utc>>,

    /// Transaction kind
    pub kind: Option<AccountTransactionKind>,
}

impl UpdateAccountTransactionDto {
    /// Validate amount if provided
    pub fn validate_amount(&self) -> Result<(), ValidationError> {
        if let Some(amount) = &self.amount {
            validate_positive_amount(amount)?;
        }
        Ok(())
    }
}

/// Path parameters for account transaction ID
#[derive(Debug, Deserialize, IntoParams)]
pub struct AccountTransactionIdPath {
    /// Account transaction UUID
    pub id: Uuid,
}
