use crate::TenantId;

/// Violations of the tenant binding discipline.
///
/// None of these are recoverable at the request boundary: each one means a
/// tenant-scoped operation was attempted outside the rules and the unit of
/// work must fail.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenancyError {
    /// A tenant-scoped operation ran while no tenant was bound.
    #[error("no tenant is bound to the current unit of work")]
    NoTenantBound,

    /// `bind` was called on a unit that already carries a tenant.
    #[error("unit of work is already bound to tenant {bound}, refusing to rebind to {requested}")]
    RebindConflict { bound: TenantId, requested: TenantId },

    /// `bind` was called outside of any unit of work.
    #[error("no unit of work is active on this task")]
    NoUnitOfWork,

    /// Data access asked for the tenant filter while no scope was active.
    #[error("tenant row filter is not active")]
    FilterInactive,
}

impl TenancyError {
    /// True for errors that indicate a binding leaked between units.
    #[must_use]
    pub fn is_leak(&self) -> bool {
        matches!(self, Self::RebindConflict { .. })
    }
}
