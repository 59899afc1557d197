use std::future::Future;

use crate::context::with_unit;
use crate::{TenancyError, TenantId};

/// Activates tenant-row filtering for tenant-data operations.
///
/// Fails closed: without a bound tenant nothing runs. The filter is
/// deactivated on every exit path because it is tied to a [`ScopeToken`],
/// and tokens release on drop (normal return, `?`, panic unwinding, or the
/// enclosing future being cancelled).
pub struct ScopeGuard;

impl ScopeGuard {
    /// Low-level activation. Prefer [`ScopeGuard::with_scope`] /
    /// [`ScopeGuard::with_scope_async`].
    ///
    /// Activations nest; the filter stays active until the outermost token
    /// is released.
    ///
    /// # Errors
    /// `NoTenantBound` when the current unit is unbound or absent.
    pub fn activate() -> Result<ScopeToken, TenancyError> {
        with_unit(|u| {
            let tenant = u.tenant().ok_or(TenancyError::NoTenantBound)?;
            u.enter_scope();
            tracing::trace!(tenant.id = %tenant, depth = u.scope_depth(), "tenant filter on");
            Ok(ScopeToken {
                unit: u.id,
                generation: u.generation(),
                tenant,
                released: false,
            })
        })
        .unwrap_or(Err(TenancyError::NoTenantBound))
    }

    /// Run synchronous tenant-data `work` with the filter active.
    ///
    /// # Errors
    /// `NoTenantBound` (converted into `E`) if unbound; `work` is not called.
    /// Otherwise whatever `work` returns.
    pub fn with_scope<T, E, F>(work: F) -> Result<T, E>
    where
        F: FnOnce(TenantId) -> Result<T, E>,
        E: From<TenancyError>,
    {
        let token = Self::activate()?;
        let out = work(token.tenant());
        token.release();
        out
    }

    /// Async variant of [`ScopeGuard::with_scope`].
    ///
    /// # Errors
    /// `NoTenantBound` (converted into `E`) if unbound; `work` is not called.
    /// Otherwise whatever the future returns.
    pub async fn with_scope_async<T, E, F, Fut>(work: F) -> Result<T, E>
    where
        F: FnOnce(TenantId) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<TenancyError>,
    {
        let token = Self::activate()?;
        let out = work(token.tenant()).await;
        token.release();
        out
    }

    /// The tenant the data layer must filter on.
    ///
    /// # Errors
    /// - `NoTenantBound` when unbound
    /// - `FilterInactive` when bound but no scope is active
    pub fn active_filter() -> Result<TenantId, TenancyError> {
        with_unit(|u| match u.tenant() {
            None => Err(TenancyError::NoTenantBound),
            Some(_) if u.scope_depth() == 0 => Err(TenancyError::FilterInactive),
            Some(t) => Ok(t),
        })
        .unwrap_or(Err(TenancyError::NoTenantBound))
    }

    #[must_use]
    pub fn is_active() -> bool {
        Self::active_filter().is_ok()
    }
}

/// Proof of an active tenant filter. Only [`ScopeGuard::activate`] creates one.
#[must_use = "the tenant filter is released as soon as the token is dropped"]
#[derive(Debug)]
pub struct ScopeToken {
    unit: u64,
    generation: u64,
    tenant: TenantId,
    released: bool,
}

impl ScopeToken {
    #[must_use]
    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Deactivate explicitly. Equivalent to dropping the token.
    pub fn release(mut self) {
        self.deactivate();
    }

    fn deactivate(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let unit = self.unit;
        match with_unit(|u| {
            if u.id != unit {
                false
            } else if u.generation() == self.generation {
                u.leave_scope();
                tracing::trace!(tenant.id = %self.tenant, depth = u.scope_depth(), "tenant filter off");
                true
            } else {
                // Cleared since activation; that already dropped our depth.
                tracing::trace!(tenant.id = %self.tenant, "stale scope token released");
                true
            }
        }) {
            // Owning unit already gone: its filter went with it.
            None | Some(true) => {}
            Some(false) => {
                tracing::error!(
                    tenant.id = %self.tenant,
                    token.unit = unit,
                    "scope token released inside a foreign unit of work"
                );
            }
        }
    }
}

impl Drop for ScopeToken {
    fn drop(&mut self) {
        self.deactivate();
    }
}
