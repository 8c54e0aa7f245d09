use futures::future::BoxFuture;
use std::future::Future;
use tracing::warn;

use crate::store::StoreError;

type UndoFn = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), StoreError>> + Send>;

/// A compensation that failed while unwinding. Whatever the failed step
/// was supposed to undo is now stranded in the store.
#[derive(Debug)]
pub struct UnwindFailure {
    pub step: &'static str,
    pub source: StoreError,
}

/// Manual compensation for multi-step writes against a store with no
/// multi-statement atomicity.
///
/// After each forward step succeeds, the caller records the matching
/// compensation. On success the saga is committed and the compensations
/// are dropped; on a failed forward step the saga is unwound, running the
/// recorded compensations in reverse order. One rollback path, shared by
/// every multi-write operation.
pub struct Saga {
    operation: &'static str,
    undo_stack: Vec<(&'static str, UndoFn)>,
}

impl Saga {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            undo_stack: Vec::new(),
        }
    }

    /// Record the compensation for a forward step that just succeeded.
    pub fn record<F, Fut>(&mut self, step: &'static str, undo: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        self.undo_stack.push((step, Box::new(move || Box::pin(undo()))));
    }

    /// All forward steps landed; discard the compensations.
    pub fn commit(mut self) {
        self.undo_stack.clear();
    }

    /// Run recorded compensations in reverse. Stops at the first
    /// compensation that itself fails; the remaining ones are abandoned
    /// since the store is already in an unknown state.
    pub async fn unwind(mut self) -> Result<(), UnwindFailure> {
        while let Some((step, undo)) = self.undo_stack.pop() {
            if let Err(source) = undo().await {
                warn!(
                    operation = self.operation,
                    step, %source,
                    "compensation failed while unwinding"
                );
                self.undo_stack.clear();
                return Err(UnwindFailure { step, source });
            }
        }
        Ok(())
    }
}

impl Drop for Saga {
    fn drop(&mut self) {
        if !self.undo_stack.is_empty() {
            warn!(
                operation = self.operation,
                pending = self.undo_stack.len(),
                "saga dropped without commit or unwind"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type StepLog = Arc<Mutex<Vec<&'static str>>>;

    fn record_step(saga: &mut Saga, log: &StepLog, step: &'static str) {
        let log = log.clone();
        saga.record(step, move || async move {
            log.lock().unwrap().push(step);
            Ok(())
        });
    }

    #[tokio::test]
    async fn unwind_runs_in_reverse_order() {
        let log: StepLog = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");
        record_step(&mut saga, &log, "first");
        record_step(&mut saga, &log, "second");
        record_step(&mut saga, &log, "third");

        saga.unwind().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn commit_discards_compensations() {
        let log: StepLog = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");
        record_step(&mut saga, &log, "only");

        saga.commit();
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unwind_failure_names_the_step_and_stops() {
        let log: StepLog = Arc::new(Mutex::new(Vec::new()));
        let mut saga = Saga::new("test");
        record_step(&mut saga, &log, "first");
        saga.record("second", || async {
            Err(StoreError::Backend("boom".to_string()))
        });

        let failure = saga.unwind().await.unwrap_err();
        assert_eq!(failure.step, "second");
        // "first" never ran: unwinding stopped at the failed compensation.
        assert!(log.lock().unwrap().is_empty());
    }
}
