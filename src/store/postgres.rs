use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{
    Account, AccountTransaction, AccountTransactionChange, Category, NewAccountTransaction,
    NewTransaction, PeriodFilter, Transaction, TransactionChange,
};
use super::{LedgerStore, StoreError};

/// Postgres-backed ledger store.
///
/// Every method is a single statement against the pool. There is no
/// `BEGIN`/`COMMIT` here on purpose: the hosted datastore this models
/// offers no multi-statement atomicity, and the writer/mutator layers
/// compensate instead of relying on it.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner_id, name, account_class, opening_balance, current_balance,
                   created_at, updated_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT id, owner_id, name, account_class, opening_balance, current_balance,
                   created_at, updated_at
            FROM accounts
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn set_account_balance(&self, id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE accounts SET current_balance = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(balance)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound("Account".to_string()));
        }
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, owner_id, name, budget_cap, category_type, linked_account_id,
                   created_at, updated_at
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>, StoreError> {
        sqlx::query_as::<_, Category>(
            r#"
            SELECT id, owner_id, name, budget_cap, category_type, linked_account_id,
                   created_at, updated_at
            FROM categories
            WHERE owner_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn insert_transaction(&self, row: NewTransaction) -> Result<Transaction, StoreError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions
                (owner_id, category_id, amount, transaction_date, description, source,
                 account_transaction_id, recurring_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, owner_id, category_id, amount, transaction_date, description, source,
                      account_transaction_id, recurring_id, notes, created_at, updated_at
            "#,
        )
        .bind(row.owner_id)
        .bind(row.category_id)
        .bind(row.amount)
        .bind(row.transaction_date)
        .bind(&row.description)
        .bind(&row.source)
        .bind(row.account_transaction_id)
        .bind(row.recurring_id)
        .bind(&row.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, owner_id, category_id, amount, transaction_date, description, source,
                   account_transaction_id, recurring_id, notes, created_at, updated_at
            FROM transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn list_transactions_by_category(
        &self,
        category_id: Uuid,
        period: PeriodFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT id, owner_id, category_id, amount, transaction_date, description, source,
                   account_transaction_id, recurring_id, notes, created_at, updated_at
            FROM transactions
            WHERE category_id = $1
              AND ($2::timestamptz IS NULL OR transaction_date >= $2)
              AND ($3::timestamptz IS NULL OR transaction_date <= $3)
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(category_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        change: TransactionChange,
    ) -> Result<(), StoreError> {
        // COALESCE keeps untouched columns; the link and notes columns are
        // nullable, so "clear it" arrives as an explicit flag instead.
        let (set_link, link) = match change.account_transaction_id {
            Some(value) => (true, value),
            None => (false, None),
        };
        let (set_notes, notes) = match change.notes {
            Some(value) => (true, value),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                amount = COALESCE($2, amount),
                transaction_date = COALESCE($3, transaction_date),
                description = COALESCE($4, description),
                account_transaction_id = CASE WHEN $5 THEN $6 ELSE account_transaction_id END,
                notes = CASE WHEN $7 THEN $8 ELSE notes END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(change.amount)
        .bind(change.transaction_date)
        .bind(change.description)
        .bind(set_link)
        .bind(link)
        .bind(set_notes)
        .bind(notes)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound("Transaction".to_string()));
        }
        Ok(())
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound("Transaction".to_string()));
        }
        Ok(())
    }

    async fn insert_account_transaction(
        &self,
        row: NewAccountTransaction,
    ) -> Result<AccountTransaction, StoreError> {
        sqlx::query_as::<_, AccountTransaction>(
            r#"
            INSERT INTO account_transactions
                (account_id, amount, kind, transaction_date, description, transaction_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, account_id, amount, kind, transaction_date, description,
                      transaction_id, created_at, updated_at
            "#,
        )
        .bind(row.account_id)
        .bind(row.amount)
        .bind(row.kind.as_str())
        .bind(row.transaction_date)
        .bind(&row.description)
        .bind(row.transaction_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn get_account_transaction(
        &self,
        id: Uuid,
    ) -> Result<Option<AccountTransaction>, StoreError> {
        sqlx::query_as::<_, AccountTransaction>(
            r#"
            SELECT id, account_id, amount, kind, transaction_date, description,
                   transaction_id, created_at, updated_at
            FROM account_transactions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn list_account_transactions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<AccountTransaction>, StoreError> {
        sqlx::query_as::<_, AccountTransaction>(
            r#"
            SELECT id, account_id, amount, kind, transaction_date, description,
                   transaction_id, created_at, updated_at
            FROM account_transactions
            WHERE account_id = $1
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from)
    }

    async fn update_account_transaction(
        &self,
        id: Uuid,
        change: AccountTransactionChange,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE account_transactions SET
                amount = COALESCE($2, amount),
                kind = COALESCE($3, kind),
                transaction_date = COALESCE($4, transaction_date),
                description = COALESCE($5, description),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(change.amount)
        .bind(change.kind.map(|k| k.as_str()))
        .bind(change.transaction_date)
        .bind(change.description)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound("Account transaction".to_string()));
        }
        Ok(())
    }

    async fn delete_account_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM account_transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RowNotFound("Account transaction".to_string()));
        }
        Ok(())
    }
}
