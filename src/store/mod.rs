pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use self::models::{
    Account, AccountTransaction, AccountTransactionChange, Category, NewAccountTransaction,
    NewTransaction, PeriodFilter, Transaction, TransactionChange,
};

/// Errors surfaced by a ledger store backend.
#[derive(Debug)]
pub enum StoreError {
    RowNotFound(String),
    /// Backend rejected or lost the call (connection error, constraint
    /// violation, injected test failure).
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::RowNotFound(what) => write!(f, "{what} not found"),
            StoreError::Backend(msg) => write!(f, "store backend error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::RowNotFound("Row".to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// The persistence seam every component receives at construction.
///
/// Deliberately narrow: point lookup by id, list by foreign key, insert,
/// single-row update carrying absolute new values, delete. There is no
/// multi-statement transaction and no server-side increment; callers
/// compute deltas themselves and stay correct through compensation, not
/// atomicity.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -- accounts ---------------------------------------------------------

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError>;

    /// Write an absolute new balance. The caller computed the delta.
    async fn set_account_balance(&self, id: Uuid, balance: Decimal) -> Result<(), StoreError>;

    // -- categories -------------------------------------------------------

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError>;

    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>, StoreError>;

    // -- budget-side transactions ----------------------------------------

    async fn insert_transaction(&self, row: NewTransaction) -> Result<Transaction, StoreError>;

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError>;

    async fn list_transactions_by_category(
        &self,
        category_id: Uuid,
        period: PeriodFilter,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn update_transaction(
        &self,
        id: Uuid,
        change: TransactionChange,
    ) -> Result<(), StoreError>;

    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError>;

    // -- account-side transactions ---------------------------------------

    async fn insert_account_transaction(
        &self,
        row: NewAccountTransaction,
    ) -> Result<AccountTransaction, StoreError>;

    async fn get_account_transaction(
        &self,
        id: Uuid,
    ) -> Result<Option<AccountTransaction>, StoreError>;

    async fn list_account_transactions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<AccountTransaction>, StoreError>;

    async fn update_account_transaction(
        &self,
        id: Uuid,
        change: AccountTransactionChange,
    ) -> Result<(), StoreError>;

    async fn delete_account_transaction(&self, id: Uuid) -> Result<(), StoreError>;
}
