use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::Instrument;

use crate::{ScopeGuard, TenancyError, TenantContext, TenantId};

/// Context captured at enqueue time for work that runs after the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    tenant_id: TenantId,
    request_id: Option<Arc<str>>,
}

impl Snapshot {
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<Arc<str>>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

/// How a deferred task ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredOutcome {
    Completed,
    /// Body returned an error or panicked. Already logged.
    Failed,
    /// The tenant could not be re-established, body never ran.
    Rejected,
}

/// Re-attaches a captured tenant to work executing on an arbitrary worker.
pub struct DeferredTaskCarrier;

impl DeferredTaskCarrier {
    /// Snapshot the current unit for later re-binding.
    ///
    /// # Errors
    /// `NoTenantBound` if the calling unit has no tenant.
    pub fn capture() -> Result<Snapshot, TenancyError> {
        let tenant_id = TenantContext::current()?;
        Ok(Snapshot {
            tenant_id,
            request_id: TenantContext::request_id(),
        })
    }

    /// Run `body` in a fresh unit bound to the snapshot tenant, with the row
    /// filter active.
    ///
    /// Errors and panics from `body` are contained and logged here; they
    /// never reach the request that enqueued the work.
    pub async fn run_with<F, Fut>(snapshot: Snapshot, task_name: &str, body: F) -> DeferredOutcome
    where
        F: FnOnce(TenantId) -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        let tenant = snapshot.tenant_id;
        let span = tracing::info_span!(
            "deferred_task",
            task = task_name,
            tenant.id = %tenant,
            request_id = snapshot.request_id().unwrap_or("-"),
        );

        let unit = TenantContext::run_with_request_id(
            tenant,
            snapshot.request_id.clone(),
            ScopeGuard::with_scope_async(body),
        );

        async move {
            match AssertUnwindSafe(unit).catch_unwind().await {
                Ok(Ok(Ok(()))) => {
                    tracing::debug!("deferred task completed");
                    DeferredOutcome::Completed
                }
                Ok(Ok(Err(e))) => {
                    tracing::error!(error = ?e, "deferred task failed");
                    DeferredOutcome::Failed
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "deferred task rejected");
                    DeferredOutcome::Rejected
                }
                Err(payload) => {
                    tracing::error!(panic = %panic_message(payload.as_ref()), "deferred task panicked");
                    DeferredOutcome::Failed
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
