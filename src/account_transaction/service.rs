use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use super::models::UpdateAccountTransactionDto;
use crate::errors::AppError;
use crate::notify::{ChangeFeed, Collection};
use crate::saga::Saga;
use crate::store::models::{
    Account, AccountTransaction, AccountTransactionChange, TransactionChange,
};
use crate::store::{LedgerStore, StoreError};

/// Updates and deletes account-side rows, keeping the account balance and
/// the linked budget-side row in step.
///
/// Balance math is delta-based: new signed amount minus old, applied as an
/// absolute balance write. The update path compensates (balance reverted
/// if the row write fails); the delete path deliberately does not undo a
/// completed balance reversal when a later delete fails — that divergence
/// surfaces as a consistency warning instead.
#[derive(Clone)]
pub struct AccountTransactionMutator {
    store: Arc<dyn LedgerStore>,
    feed: ChangeFeed,
}

impl AccountTransactionMutator {
    pub fn new(store: Arc<dyn LedgerStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Load the row and its owning account, scoped to the owner.
    async fn load_pair(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<(AccountTransaction, Account), AppError> {
        let row = self
            .store
            .get_account_transaction(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account transaction not found".to_string()))?;

        let account = self
            .store
            .get_account(row.account_id)
            .await?
            .filter(|a| a.owner_id == owner_id)
            .ok_or_else(|| AppError::NotFound("Account transaction not found".to_string()))?;

        Ok((row, account))
    }

    /// Update an account transaction and re-derive the balance.
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        dto: UpdateAccountTransactionDto,
    ) -> Result<AccountTransaction, AppError> {
        let (old, account) = self.load_pair(owner_id, id).await?;

        // Same sign function as the create path, fed with merged values.
        let magnitude = dto.amount.unwrap_or_else(|| old.amount.abs());
        let kind = dto.kind.unwrap_or_else(|| old.kind());
        let date = dto.transaction_date.unwrap_or(old.transaction_date);
        let description = dto.description.clone().unwrap_or_else(|| old.description.clone());

        let new_signed = account.class().signed_amount(magnitude, kind);
        let balance_diff = new_signed - old.amount;

        let mut saga = Saga::new("update_account_transaction");
        if balance_diff != Decimal::ZERO {
            let adjusted = account.current_balance + balance_diff;
            self.store
                .set_account_balance(account.id, adjusted)
                .await
                .map_err(AppError::from)?;

            let store = self.store.clone();
            let account_id = account.id;
            let previous = account.current_balance;
            saga.record("restore_balance", move || async move {
                store.set_account_balance(account_id, previous).await
            });
        }

        let change = AccountTransactionChange {
            amount: Some(new_signed),
            kind: Some(kind),
            transaction_date: Some(date),
            description: Some(description.clone()),
        };
        if let Err(err) = self.store.update_account_transaction(id, change).await {
            // Revert the balance before reporting the row failure.
            return Err(match saga.unwind().await {
                Ok(()) => AppError::PartialWrite {
                    stage: "persist_row",
                    message: err.to_string(),
                },
                Err(failure) => AppError::ConsistencyWarning {
                    stage: "persist_row",
                    message: format!(
                        "{err}; balance revert {} failed: {}",
                        failure.step, failure.source
                    ),
                },
            });
        }
        saga.commit();

        // Best-effort propagation to the linked budget-side row. Its
        // failure leaves an eventual-consistency gap, logged, not fatal.
        let mut propagated = false;
        if let Some(transaction_id) = old.transaction_id {
            let budget_amount = kind.entry_type().signed_amount(magnitude);
            let change = TransactionChange {
                amount: Some(budget_amount),
                transaction_date: Some(date),
                description: Some(description),
                ..Default::default()
            };
            match self.store.update_transaction(transaction_id, change).await {
                Ok(()) => propagated = true,
                Err(err) => warn!(
                    account_transaction_id = %id,
                    transaction_id = %transaction_id,
                    %err,
                    "linked budget row propagation failed"
                ),
            }
        }

        self.feed
            .publish(Collection::AccountTransactions, owner_id, Some(id));
        if balance_diff != Decimal::ZERO {
            self.feed
                .publish(Collection::Accounts, owner_id, Some(account.id));
        }
        if propagated {
            self.feed
                .publish(Collection::Transactions, owner_id, old.transaction_id);
        }

        self.store
            .get_account_transaction(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account transaction not found".to_string()))
    }

    /// Delete an account transaction, reversing its balance contribution
    /// and removing the linked budget-side row.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), AppError> {
        let (row, account) = self.load_pair(owner_id, id).await?;

        // Reverse the balance first. Nothing has changed yet if this
        // write fails, so it reports as an ordinary error.
        let reversed = account.current_balance - row.amount;
        self.store
            .set_account_balance(account.id, reversed)
            .await
            .map_err(AppError::from)?;

        // From here on the balance is already adjusted; failures leave the
        // ledger diverged and are reported as consistency warnings rather
        // than silently repaired.
        let mut pair_deleted = false;
        if let Some(transaction_id) = row.transaction_id {
            match self.store.delete_transaction(transaction_id).await {
                Ok(()) => pair_deleted = true,
                // A pair that is already gone is not divergence.
                Err(StoreError::RowNotFound(_)) => {
                    warn!(%transaction_id, "linked budget row already deleted");
                }
                Err(err) => {
                    return Err(AppError::ConsistencyWarning {
                        stage: "delete_linked_budget_row",
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Err(err) = self.store.delete_account_transaction(id).await {
            return Err(AppError::ConsistencyWarning {
                stage: "delete_account_row",
                message: err.to_string(),
            });
        }

        self.feed
            .publish(Collection::AccountTransactions, owner_id, Some(id));
        self.feed
            .publish(Collection::Accounts, owner_id, Some(account.id));
        if pair_deleted {
            self.feed
                .publish(Collection::Transactions, owner_id, row.transaction_id);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLedgerStore;
    use crate::store::models::{
        AccountClass, AccountTransactionKind, NewAccountTransaction, NewTransaction,
    };
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    async fn seed_linked_pair(
        store: &Arc<MemoryLedgerStore>,
        owner: Uuid,
        account_id: Uuid,
        class: AccountClass,
        magnitude: i64,
        kind: AccountTransactionKind,
    ) -> (Uuid, Uuid) {
        let signed = class.signed_amount(dec(magnitude), kind);
        let budget = store
            .insert_transaction(NewTransaction {
                owner_id: owner,
                category_id: None,
                amount: kind.entry_type().signed_amount(dec(magnitude)),
                transaction_date: Utc::now(),
                description: "seed".to_string(),
                source: "manual".to_string(),
                account_transaction_id: None,
                recurring_id: None,
                notes: None,
            })
            .await
            .unwrap();
        let account_row = store
            .insert_account_transaction(NewAccountTransaction {
                account_id,
                amount: signed,
                kind,
                transaction_date: Utc::now(),
                description: "seed".to_string(),
                transaction_id: Some(budget.id),
            })
            .await
            .unwrap();
        store
            .update_transaction(
                budget.id,
                TransactionChange {
                    account_transaction_id: Some(Some(account_row.id)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let account = store.get_account(account_id).await.unwrap().unwrap();
        store
            .set_account_balance(account_id, account.current_balance + signed)
            .await
            .unwrap();
        (budget.id, account_row.id)
    }

    #[tokio::test]
    async fn amount_change_applies_the_diff() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (_, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;
        // 1000 - 50 = 950 after the seed.

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        let updated = mutator
            .update(
                owner,
                row_id,
                UpdateAccountTransactionDto {
                    description: None,
                    amount: Some(dec(80)),
                    transaction_date: None,
                    kind: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount, dec(-80));
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, dec(920));
    }

    #[tokio::test]
    async fn kind_change_flips_the_sign_and_rebalances() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (_, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        mutator
            .update(
                owner,
                row_id,
                UpdateAccountTransactionDto {
                    description: None,
                    amount: None,
                    transaction_date: None,
                    kind: Some(AccountTransactionKind::Deposit),
                },
            )
            .await
            .unwrap();

        // -50 became +50: the balance moves by +100.
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, dec(1050));
    }

    #[tokio::test]
    async fn row_failure_reverts_the_balance() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (_, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        store.fail_next("update_account_transaction");
        let err = mutator
            .update(
                owner,
                row_id,
                UpdateAccountTransactionDto {
                    description: None,
                    amount: Some(dec(80)),
                    transaction_date: None,
                    kind: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::PartialWrite {
                stage: "persist_row",
                ..
            }
        ));
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, dec(950));
    }

    #[tokio::test]
    async fn propagation_failure_does_not_fail_the_update() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (budget_id, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        store.fail_next("update_transaction");
        let updated = mutator
            .update(
                owner,
                row_id,
                UpdateAccountTransactionDto {
                    description: None,
                    amount: Some(dec(80)),
                    transaction_date: None,
                    kind: None,
                },
            )
            .await
            .unwrap();

        // Primary update landed, budget row kept its stale amount.
        assert_eq!(updated.amount, dec(-80));
        let budget = store.get_transaction(budget_id).await.unwrap().unwrap();
        assert_eq!(budget.amount, dec(-50));
    }

    #[tokio::test]
    async fn propagation_renormalizes_the_budget_sign() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Card", AccountClass::Liability, dec(0));
        let (budget_id, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Liability,
            500,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        mutator
            .update(
                owner,
                row_id,
                UpdateAccountTransactionDto {
                    description: Some("Refund".to_string()),
                    amount: Some(dec(120)),
                    transaction_date: None,
                    kind: Some(AccountTransactionKind::Deposit),
                },
            )
            .await
            .unwrap();

        // Deposit classifies as income on the budget side: +120.
        let budget = store.get_transaction(budget_id).await.unwrap().unwrap();
        assert_eq!(budget.amount, dec(120));
        assert_eq!(budget.description, "Refund");
    }

    #[tokio::test]
    async fn delete_reverses_balance_and_removes_the_pair() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (budget_id, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        mutator.delete(owner, row_id).await.unwrap();

        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, dec(1000));
        assert!(store.get_transaction(budget_id).await.unwrap().is_none());
        assert!(store
            .get_account_transaction(row_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failed_row_delete_after_reversal_is_a_consistency_warning() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (_, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        store.fail_next("delete_account_transaction");
        let err = mutator.delete(owner, row_id).await.unwrap_err();

        assert!(matches!(
            err,
            AppError::ConsistencyWarning {
                stage: "delete_account_row",
                ..
            }
        ));
        // The open risk, on purpose: balance reversed, row still present.
        let reloaded = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(reloaded.current_balance, dec(1000));
        assert!(store
            .get_account_transaction(row_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn foreign_owner_cannot_touch_the_row() {
        let store = Arc::new(MemoryLedgerStore::new());
        let owner = Uuid::new_v4();
        let account = store.seed_account(owner, "Checking", AccountClass::Asset, dec(1000));
        let (_, row_id) = seed_linked_pair(
            &store,
            owner,
            account.id,
            AccountClass::Asset,
            50,
            AccountTransactionKind::Withdrawal,
        )
        .await;

        let mutator = AccountTransactionMutator::new(store.clone(), ChangeFeed::default());
        let err = mutator.delete(Uuid::new_v4(), row_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
