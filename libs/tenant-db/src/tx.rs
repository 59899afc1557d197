//! Transactions with post-commit hooks.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

type Hook = Box<dyn FnOnce() + Send>;

/// Work to run only once the surrounding transaction has committed.
///
/// Hooks run in registration order on the task that awaited the commit.
/// On rollback they are discarded without running.
#[derive(Default)]
pub struct AfterCommit {
    hooks: Vec<(&'static str, Hook)>,
}

impl AfterCommit {
    pub fn register(&mut self, name: &'static str, hook: impl FnOnce() + Send + 'static) {
        self.hooks.push((name, Box::new(hook)));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn run(self) {
        for (name, hook) in self.hooks {
            // The data is already committed; a failing hook must not hide that.
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                tracing::error!(hook = name, "after-commit hook panicked");
            }
        }
    }

    pub(crate) fn discard(self) {
        if !self.hooks.is_empty() {
            let names: Vec<_> = self.hooks.iter().map(|(n, _)| *n).collect();
            tracing::debug!(hooks = ?names, "transaction rolled back, after-commit hooks dropped");
        }
    }
}

impl fmt::Debug for AfterCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterCommit")
            .field("hooks", &self.hooks.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .finish()
    }
}

/// Infrastructure error representing a database-level failure.
#[derive(Debug, Clone)]
pub struct InfraError {
    message: String,
}

impl InfraError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for InfraError {}

/// Transaction error that distinguishes domain errors from infrastructure errors.
#[derive(Debug, Clone)]
pub enum TxError<E> {
    /// Returned by the transaction callback; the transaction was rolled back.
    Domain(E),
    /// Begin / commit / rollback failed.
    Infra(InfraError),
}

impl<E> TxError<E> {
    /// Collapse into the domain error type.
    #[must_use]
    pub fn into_domain<F>(self, map_infra: F) -> E
    where
        F: FnOnce(InfraError) -> E,
    {
        match self {
            TxError::Domain(e) => e,
            TxError::Infra(infra) => map_infra(infra),
        }
    }
}

impl<E: fmt::Display> fmt::Display for TxError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxError::Domain(e) => write!(f, "{e}"),
            TxError::Infra(e) => write!(f, "infrastructure error: {e}"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for TxError<E> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn hooks_run_in_order_and_survive_panics() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = AfterCommit::default();
        let l1 = log.clone();
        hooks.register("first", move || l1.lock().unwrap().push(1));
        hooks.register("boom", || panic!("hook failure"));
        let l3 = log.clone();
        hooks.register("third", move || l3.lock().unwrap().push(3));
        assert_eq!(hooks.len(), 3);

        hooks.run();
        assert_eq!(*log.lock().unwrap(), vec![1, 3]);
    }

    #[test]
    fn discarded_hooks_never_run() {
        let log = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut hooks = AfterCommit::default();
        let l = log.clone();
        hooks.register("never", move || l.lock().unwrap().push(1));
        hooks.discard();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn into_domain_maps_infra() {
        let err: TxError<String> = TxError::Infra(InfraError::new("commit failed"));
        assert_eq!(err.to_string(), "infrastructure error: commit failed");
        assert_eq!(err.into_domain(|e| e.message().to_owned()), "commit failed");
    }
}
