//! Fixed pool of reusable workers for post-commit / deferred work.
//!
//! Jobs carry a [`Snapshot`] taken at enqueue time. Workers never inherit
//! anything from the request that enqueued the job; each job gets a fresh
//! unit of work through [`DeferredTaskCarrier::run_with`].

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{DeferredOutcome, DeferredTaskCarrier, Snapshot, TenancyError, TenantContext, TenantId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeferredExecutorConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DeferredExecutorConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum DeferredError {
    #[error("deferred executor is shut down")]
    Closed,
    #[error("deferred queue is full")]
    QueueFull,
    #[error(transparent)]
    Context(#[from] TenancyError),
}

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeferredStats {
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    /// Jobs that found a tenant still bound on their worker. Must stay 0.
    pub leaked_bindings: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    leaked_bindings: AtomicU64,
}

type Job = Box<dyn FnOnce(TenantId) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

struct Envelope {
    name: String,
    snapshot: Snapshot,
    job: Job,
    done: oneshot::Sender<DeferredOutcome>,
}

/// Completion handle returned by `submit`. Dropping it does not cancel the job.
#[derive(Debug)]
pub struct DeferredHandle {
    rx: oneshot::Receiver<DeferredOutcome>,
}

impl DeferredHandle {
    /// Wait for the job. `None` if the executor was torn down before it ran.
    pub async fn outcome(self) -> Option<DeferredOutcome> {
        self.rx.await.ok()
    }
}

pub struct DeferredExecutor {
    tx: parking_lot::Mutex<Option<mpsc::Sender<Envelope>>>,
    workers: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
}

impl DeferredExecutor {
    /// Spawn the worker pool on the current tokio runtime.
    #[must_use]
    pub fn start(cfg: &DeferredExecutorConfig) -> Self {
        let workers = cfg.workers.max(1);
        let (tx, rx) = mpsc::channel::<Envelope>(cfg.queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let counters = Arc::new(Counters::default());
        let cancel = CancellationToken::new();

        let handles = (0..workers)
            .map(|idx| {
                tokio::spawn(worker_loop(
                    idx,
                    rx.clone(),
                    counters.clone(),
                    cancel.child_token(),
                ))
            })
            .collect();

        tracing::info!(workers, queue_capacity = cfg.queue_capacity, "deferred executor started");

        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            workers: parking_lot::Mutex::new(handles),
            counters,
            cancel,
        }
    }

    /// Enqueue `body` under the tenant bound to the caller.
    ///
    /// # Errors
    /// `Context(NoTenantBound)` when the caller is unbound, `QueueFull`, `Closed`.
    pub fn submit<F, Fut>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<DeferredHandle, DeferredError>
    where
        F: FnOnce(TenantId) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let snapshot = DeferredTaskCarrier::capture()?;
        self.submit_with(snapshot, name, body)
    }

    /// Enqueue `body` under an explicit snapshot.
    ///
    /// # Errors
    /// `QueueFull` when the bounded queue has no room, `Closed` after shutdown.
    pub fn submit_with<F, Fut>(
        &self,
        snapshot: Snapshot,
        name: impl Into<String>,
        body: F,
    ) -> Result<DeferredHandle, DeferredError>
    where
        F: FnOnce(TenantId) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let tx = self.tx.lock().as_ref().cloned().ok_or(DeferredError::Closed)?;
        let (done, rx) = oneshot::channel();
        let name = name.into();
        let envelope = Envelope {
            name,
            snapshot,
            job: Box::new(move |tenant| Box::pin(body(tenant))),
            done,
        };
        tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(env) => {
                tracing::warn!(task = %env.name, tenant.id = %env.snapshot.tenant_id(), "deferred queue full");
                DeferredError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => DeferredError::Closed,
        })?;
        Ok(DeferredHandle { rx })
    }

    #[must_use]
    pub fn stats(&self) -> DeferredStats {
        DeferredStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            leaked_bindings: self.counters.leaked_bindings.load(Ordering::Relaxed),
        }
    }

    /// Close the queue, let workers drain what is already enqueued, and join
    /// them. Workers still busy after `grace` are cancelled.
    pub async fn shutdown(&self, grace: Duration) {
        drop(self.tx.lock().take());
        let handles = std::mem::take(&mut *self.workers.lock());
        if handles.is_empty() {
            return;
        }

        let aborts: Vec<_> = handles.iter().map(JoinHandle::abort_handle).collect();
        let joined = tokio::time::timeout(grace, futures::future::join_all(handles)).await;
        match joined {
            Ok(results) => {
                for res in results {
                    if let Err(e) = res {
                        tracing::error!(error = %e, "deferred worker terminated abnormally");
                    }
                }
                tracing::info!("deferred executor drained");
            }
            Err(_) => {
                tracing::warn!(grace = ?grace, "deferred executor did not drain in time, cancelling");
                self.cancel.cancel();
                for a in aborts {
                    a.abort();
                }
            }
        }
    }
}

impl Drop for DeferredExecutor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// A worker serves all of its jobs from one long-lived unbound unit of work;
/// each job opens its own nested unit inside it. Finding the worker's unit
/// bound before or after a job means a binding escaped.
fn worker_loop(
    idx: usize,
    rx: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) -> impl Future<Output = ()> + Send {
    TenantContext::unit(serve(idx, rx, counters, cancel))
}

async fn serve(
    idx: usize,
    rx: Arc<Mutex<mpsc::Receiver<Envelope>>>,
    counters: Arc<Counters>,
    cancel: CancellationToken,
) {
    tracing::debug!(worker = idx, "deferred worker up");
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                msg = rx.recv() => msg,
            }
        };
        let Some(env) = next else {
            break;
        };

        audit_binding(idx, &env.name, "before", &counters);
        let outcome = DeferredTaskCarrier::run_with(env.snapshot, &env.name, env.job).await;
        audit_binding(idx, &env.name, "after", &counters);

        let counter = match outcome {
            DeferredOutcome::Completed => &counters.completed,
            DeferredOutcome::Failed => &counters.failed,
            DeferredOutcome::Rejected => &counters.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        // Receiver may be gone; the outcome is already logged.
        let _ = env.done.send(outcome);
    }
    tracing::debug!(worker = idx, "deferred worker stopped");
}

fn audit_binding(idx: usize, task: &str, stage: &'static str, counters: &Counters) {
    if let Some(bound) = TenantContext::try_current() {
        counters.leaked_bindings.fetch_add(1, Ordering::Relaxed);
        tracing::error!(worker = idx, task, stage, tenant.id = %bound, "worker unit carries a tenant binding");
    }
}
