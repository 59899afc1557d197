use tenant_context::TenancyError;

/// Errors that can occur during tenant-scoped query execution.
#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    /// Database error occurred during query execution.
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    /// No usable tenant filter: unbound unit or scope not activated.
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    /// Write attempted to touch a row of another tenant.
    #[error("access denied: {0}")]
    Denied(&'static str),
}

impl ScopeError {
    #[must_use]
    pub fn is_fail_closed(&self) -> bool {
        matches!(self, Self::Tenancy(_))
    }
}
