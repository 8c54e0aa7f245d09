use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::models::{
    Account, AccountClass, AccountTransaction, AccountTransactionChange, Category, CategoryType,
    NewAccountTransaction, NewTransaction, PeriodFilter, Transaction, TransactionChange,
};
use super::{LedgerStore, StoreError};

#[derive(Default)]
struct Collections {
    accounts: HashMap<Uuid, Account>,
    categories: HashMap<Uuid, Category>,
    transactions: HashMap<Uuid, Transaction>,
    account_transactions: HashMap<Uuid, AccountTransaction>,
}

/// In-memory ledger store for the test suite and local development.
///
/// Mirrors the Postgres backend's per-call semantics, including its lack
/// of cross-call atomicity. Individual operations can be primed to fail
/// once via [`fail_next`](MemoryLedgerStore::fail_next), which is how the
/// compensation paths get exercised.
#[derive(Default)]
pub struct MemoryLedgerStore {
    data: Mutex<Collections>,
    failures: Mutex<Vec<&'static str>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prime the named operation to fail on its next call.
    pub fn fail_next(&self, operation: &'static str) {
        self.failures
            .lock()
            .expect("failure list poisoned")
            .push(operation);
    }

    fn check_failure(&self, operation: &'static str) -> Result<(), StoreError> {
        let mut failures = self.failures.lock().expect("failure list poisoned");
        if let Some(pos) = failures.iter().position(|f| *f == operation) {
            failures.remove(pos);
            return Err(StoreError::Backend(format!(
                "injected failure for {operation}"
            )));
        }
        Ok(())
    }

    /// Seed an account row. Test/dev helper, not part of the store trait.
    pub fn seed_account(
        &self,
        owner_id: Uuid,
        name: &str,
        class: AccountClass,
        opening_balance: Decimal,
    ) -> Account {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            account_class: class.as_str().to_string(),
            opening_balance,
            current_balance: opening_balance,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .expect("store poisoned")
            .accounts
            .insert(account.id, account.clone());
        account
    }

    /// Seed a category row. Test/dev helper, not part of the store trait.
    pub fn seed_category(
        &self,
        owner_id: Uuid,
        name: &str,
        budget_cap: Decimal,
        category_type: CategoryType,
        linked_account_id: Option<Uuid>,
    ) -> Category {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            owner_id,
            name: name.to_string(),
            budget_cap,
            category_type: category_type.as_str().to_string(),
            linked_account_id,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .expect("store poisoned")
            .categories
            .insert(category.id, category.clone());
        category
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_account(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        self.check_failure("get_account")?;
        Ok(self
            .data
            .lock()
            .expect("store poisoned")
            .accounts
            .get(&id)
            .cloned())
    }

    async fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<Account>, StoreError> {
        self.check_failure("list_accounts")?;
        let data = self.data.lock().expect("store poisoned");
        let mut accounts: Vec<Account> = data
            .accounts
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(accounts)
    }

    async fn set_account_balance(&self, id: Uuid, balance: Decimal) -> Result<(), StoreError> {
        self.check_failure("set_account_balance")?;
        let mut data = self.data.lock().expect("store poisoned");
        let account = data
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::RowNotFound("Account".to_string()))?;
        account.current_balance = balance;
        account.updated_at = Utc::now();
        Ok(())
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>, StoreError> {
        self.check_failure("get_category")?;
        Ok(self
            .data
            .lock()
            .expect("store poisoned")
            .categories
            .get(&id)
            .cloned())
    }

    async fn list_categories(&self, owner_id: Uuid) -> Result<Vec<Category>, StoreError> {
        self.check_failure("list_categories")?;
        let data = self.data.lock().expect("store poisoned");
        let mut categories: Vec<Category> = data
            .categories
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_transaction(&self, row: NewTransaction) -> Result<Transaction, StoreError> {
        self.check_failure("insert_transaction")?;
        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            owner_id: row.owner_id,
            category_id: row.category_id,
            amount: row.amount,
            transaction_date: row.transaction_date,
            description: row.description,
            source: row.source,
            account_transaction_id: row.account_transaction_id,
            recurring_id: row.recurring_id,
            notes: row.notes,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .expect("store poisoned")
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(transaction)
    }

    async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>, StoreError> {
        self.check_failure("get_transaction")?;
        Ok(self
            .data
            .lock()
            .expect("store poisoned")
            .transactions
            .get(&id)
            .cloned())
    }

    async fn list_transactions_by_category(
        &self,
        category_id: Uuid,
        period: PeriodFilter,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.check_failure("list_transactions_by_category")?;
        let data = self.data.lock().expect("store poisoned");
        let mut rows: Vec<Transaction> = data
            .transactions
            .values()
            .filter(|t| t.category_id == Some(category_id) && period.contains(t.transaction_date))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(rows)
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        change: TransactionChange,
    ) -> Result<(), StoreError> {
        self.check_failure("update_transaction")?;
        let mut data = self.data.lock().expect("store poisoned");
        let row = data
            .transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::RowNotFound("Transaction".to_string()))?;
        if let Some(amount) = change.amount {
            row.amount = amount;
        }
        if let Some(date) = change.transaction_date {
            row.transaction_date = date;
        }
        if let Some(description) = change.description {
            row.description = description;
        }
        if let Some(link) = change.account_transaction_id {
            row.account_transaction_id = link;
        }
        if let Some(notes) = change.notes {
            row.notes = notes;
        }
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_failure("delete_transaction")?;
        let mut data = self.data.lock().expect("store poisoned");
        data.transactions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::RowNotFound("Transaction".to_string()))
    }

    async fn insert_account_transaction(
        &self,
        row: NewAccountTransaction,
    ) -> Result<AccountTransaction, StoreError> {
        self.check_failure("insert_account_transaction")?;
        let now = Utc::now();
        let account_transaction = AccountTransaction {
            id: Uuid::new_v4(),
            account_id: row.account_id,
            amount: row.amount,
            kind: row.kind.as_str().to_string(),
            transaction_date: row.transaction_date,
            description: row.description,
            transaction_id: row.transaction_id,
            created_at: now,
            updated_at: now,
        };
        self.data
            .lock()
            .expect("store poisoned")
            .account_transactions
            .insert(account_transaction.id, account_transaction.clone());
        Ok(account_transaction)
    }

    async fn get_account_transaction(
        &self,
        id: Uuid,
    ) -> Result<Option<AccountTransaction>, StoreError> {
        self.check_failure("get_account_transaction")?;
        Ok(self
            .data
            .lock()
            .expect("store poisoned")
            .account_transactions
            .get(&id)
            .cloned())
    }

    async fn list_account_transactions(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<AccountTransaction>, StoreError> {
        self.check_failure("list_account_transactions")?;
        let data = self.data.lock().expect("store poisoned");
        let mut rows: Vec<AccountTransaction> = data
            .account_transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(rows)
    }

    async fn update_account_transaction(
        &self,
        id: Uuid,
        change: AccountTransactionChange,
    ) -> Result<(), StoreError> {
        self.check_failure("update_account_transaction")?;
        let mut data = self.data.lock().expect("store poisoned");
        let row = data
            .account_transactions
            .get_mut(&id)
            .ok_or_else(|| StoreError::RowNotFound("Account transaction".to_string()))?;
        if let Some(amount) = change.amount {
            row.amount = amount;
        }
        if let Some(kind) = change.kind {
            row.kind = kind.as_str().to_string();
        }
        if let Some(date) = change.transaction_date {
            row.transaction_date = date;
        }
        if let Some(description) = change.description {
            row.description = description;
        }
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_account_transaction(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_failure("delete_account_transaction")?;
        let mut data = self.data.lock().expect("store poisoned");
        data.account_transactions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::RowNotFound("Account transaction".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryLedgerStore::new();
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::ZERO);

        store.fail_next("get_account");
        assert!(store.get_account(account.id).await.is_err());
        assert!(store.get_account(account.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn balance_write_is_absolute() {
        let store = MemoryLedgerStore::new();
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, Decimal::from(100));

        store
            .set_account_balance(account.id, Decimal::from(250))
            .await
            .unwrap();
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, Decimal::from(250));
        assert_eq!(reloaded.opening_balance, Decimal::from(100));
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = MemoryLedgerStore::new();
        let err = store
            .set_account_balance(Uuid::new_v4(), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound(_)));

        let err = store.delete_transaction(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::RowNotFound(_)));
    }
}
