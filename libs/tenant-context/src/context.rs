//! Unit-of-work tenant binding.
//!
//! Every logical operation (one HTTP request, one deferred task) runs inside a
//! *unit of work*: a task-local slot created when the unit's future starts and
//! destroyed when that future completes, fails, panics or is dropped. The
//! tenant bound to a unit can therefore never survive into the next unit that
//! the same worker thread happens to poll.
//!
//! Spawned tasks do not inherit the slot. Work that must outlive the unit goes
//! through [`crate::DeferredTaskCarrier`], which snapshots the tenant and
//! re-binds it explicitly.

use std::cell::Cell;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{TenancyError, TenantId};

tokio::task_local! {
    static UNIT: UnitOfWork;
}

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct UnitOfWork {
    pub(crate) id: u64,
    tenant: Cell<Option<TenantId>>,
    scope_depth: Cell<u32>,
    /// Bumped by `clear`; scope tokens from an earlier binding no longer count.
    generation: Cell<u64>,
    request_id: Option<Arc<str>>,
}

impl UnitOfWork {
    fn new(tenant: Option<TenantId>, request_id: Option<Arc<str>>) -> Self {
        Self {
            id: NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed),
            tenant: Cell::new(tenant),
            scope_depth: Cell::new(0),
            generation: Cell::new(0),
            request_id,
        }
    }

    pub(crate) fn tenant(&self) -> Option<TenantId> {
        self.tenant.get()
    }

    pub(crate) fn scope_depth(&self) -> u32 {
        self.scope_depth.get()
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub(crate) fn enter_scope(&self) {
        self.scope_depth.set(self.scope_depth.get().saturating_add(1));
    }

    pub(crate) fn leave_scope(&self) {
        self.scope_depth.set(self.scope_depth.get().saturating_sub(1));
    }
}

/// Run `f` against the unit of the current task, if any.
pub(crate) fn with_unit<R>(f: impl FnOnce(&UnitOfWork) -> R) -> Option<R> {
    UNIT.try_with(f).ok()
}

/// Access point for the tenant governing the current unit of work.
///
/// All functions are associated: there is no instance to pass around, the
/// state lives in the task that is currently being polled.
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` as a fresh, unbound unit of work.
    ///
    /// The unit starts `Unbound`; call [`TenantContext::bind`] once the tenant
    /// is known.
    pub fn unit<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        UNIT.scope(UnitOfWork::new(None, None), fut)
    }

    /// Same as [`TenantContext::unit`] but tags the unit with a request
    /// correlation id.
    pub fn unit_with_request_id<F: Future>(
        request_id: impl Into<Arc<str>>,
        fut: F,
    ) -> impl Future<Output = F::Output> {
        UNIT.scope(UnitOfWork::new(None, Some(request_id.into())), fut)
    }

    /// Run `fut` as a unit of work already bound to `tenant`.
    ///
    /// Opening a unit inside a unit that is bound is refused with
    /// [`TenancyError::RebindConflict`]. When the enclosing unit is unbound
    /// its request id is inherited.
    ///
    /// # Errors
    /// `RebindConflict` if the calling task is already bound.
    pub async fn run<F: Future>(tenant: TenantId, fut: F) -> Result<F::Output, TenancyError> {
        let inherited = Self::enter_nested(tenant)?;
        Ok(UNIT
            .scope(UnitOfWork::new(Some(tenant), inherited), fut)
            .await)
    }

    /// Like [`TenantContext::run`], with an explicit request id.
    ///
    /// # Errors
    /// `RebindConflict` if the calling task is already bound.
    pub async fn run_with_request_id<F: Future>(
        tenant: TenantId,
        request_id: Option<Arc<str>>,
        fut: F,
    ) -> Result<F::Output, TenancyError> {
        let inherited = Self::enter_nested(tenant)?;
        Ok(UNIT
            .scope(UnitOfWork::new(Some(tenant), request_id.or(inherited)), fut)
            .await)
    }

    /// Synchronous counterpart of [`TenantContext::run`].
    ///
    /// # Errors
    /// `RebindConflict` if the calling task is already bound.
    pub fn run_sync<R>(tenant: TenantId, f: impl FnOnce() -> R) -> Result<R, TenancyError> {
        let inherited = Self::enter_nested(tenant)?;
        Ok(UNIT.sync_scope(UnitOfWork::new(Some(tenant), inherited), f))
    }

    fn enter_nested(requested: TenantId) -> Result<Option<Arc<str>>, TenancyError> {
        match with_unit(|u| (u.tenant(), u.request_id.clone())) {
            Some((Some(bound), _)) => {
                tracing::error!(
                    tenant.bound = %bound,
                    tenant.requested = %requested,
                    "nested unit of work opened while bound"
                );
                Err(TenancyError::RebindConflict { bound, requested })
            }
            Some((None, request_id)) => Ok(request_id),
            None => Ok(None),
        }
    }

    /// Bind `tenant` to the current unit.
    ///
    /// # Errors
    /// - `NoUnitOfWork` outside of any unit
    /// - `RebindConflict` if the unit is already bound (even to the same tenant)
    pub fn bind(tenant: TenantId) -> Result<(), TenancyError> {
        with_unit(|u| match u.tenant() {
            Some(bound) => {
                tracing::error!(
                    tenant.bound = %bound,
                    tenant.requested = %tenant,
                    "refusing to rebind unit of work"
                );
                Err(TenancyError::RebindConflict {
                    bound,
                    requested: tenant,
                })
            }
            None => {
                u.tenant.set(Some(tenant));
                tracing::trace!(tenant.id = %tenant, unit = u.id, "tenant bound");
                Ok(())
            }
        })
        .unwrap_or(Err(TenancyError::NoUnitOfWork))
    }

    /// The tenant bound to the current unit.
    ///
    /// # Errors
    /// `NoTenantBound` when unbound or outside any unit. There is no default.
    pub fn current() -> Result<TenantId, TenancyError> {
        Self::try_current().ok_or(TenancyError::NoTenantBound)
    }

    #[must_use]
    pub fn try_current() -> Option<TenantId> {
        with_unit(UnitOfWork::tenant).flatten()
    }

    #[must_use]
    pub fn is_bound() -> bool {
        Self::try_current().is_some()
    }

    /// True when the calling task runs inside any unit of work.
    #[must_use]
    pub fn in_unit() -> bool {
        with_unit(|_| ()).is_some()
    }

    /// Return the current unit to `Unbound`, dropping any active row filter.
    ///
    /// Scope tokens still alive from before the call are orphaned: releasing
    /// them later leaves the filter of a newer binding untouched.
    /// Never fails; a no-op outside of a unit.
    pub fn clear() {
        with_unit(|u| {
            if let Some(t) = u.tenant.take() {
                tracing::trace!(tenant.id = %t, unit = u.id, "tenant cleared");
            }
            u.scope_depth.set(0);
            u.generation.set(u.generation.get().wrapping_add(1));
        });
    }

    /// Correlation id of the current unit, if one was attached.
    #[must_use]
    pub fn request_id() -> Option<Arc<str>> {
        with_unit(|u| u.request_id.clone()).flatten()
    }
}
