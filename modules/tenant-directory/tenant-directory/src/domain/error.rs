use tenant_context::TenancyError;
use tenant_db::{InfraError, ScopeError};
use tenant_directory_sdk::{DirectoryError, TenantKey};

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("tenant not found: {0}")]
    NotFound(TenantKey),

    #[error("invalid domain '{domain}': {reason}")]
    InvalidDomain {
        domain: String,
        reason: &'static str,
    },

    #[error("domain already taken: {0}")]
    DomainTaken(String),

    #[error("validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("tenant store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error("access denied: {0}")]
    Denied(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn store(e: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

impl From<ScopeError> for DomainError {
    fn from(e: ScopeError) -> Self {
        match e {
            ScopeError::Db(db) => Self::store(db),
            ScopeError::Tenancy(t) => Self::Tenancy(t),
            ScopeError::Denied(msg) => Self::Denied(msg),
        }
    }
}

impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        Self::store(e)
    }
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        Self::StoreUnavailable(e.message().to_owned())
    }
}

impl From<DirectoryError> for DomainError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::TenantNotFound { key } => Self::NotFound(key),
            DirectoryError::InvalidDomain { domain, reason } => {
                Self::InvalidDomain { domain, reason }
            }
            DirectoryError::DomainTaken { domain } => Self::DomainTaken(domain),
            DirectoryError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            DirectoryError::Context(t) => Self::Tenancy(t),
            DirectoryError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<DomainError> for DirectoryError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(key) => Self::TenantNotFound { key },
            DomainError::InvalidDomain { domain, reason } => Self::InvalidDomain { domain, reason },
            DomainError::DomainTaken(domain) => Self::DomainTaken { domain },
            DomainError::StoreUnavailable(msg) => Self::StoreUnavailable(msg),
            DomainError::Tenancy(t) => Self::Context(t),
            DomainError::Validation { field, message } => {
                Self::Internal(format!("{field}: {message}"))
            }
            DomainError::Denied(msg) => Self::Internal(msg.to_owned()),
            DomainError::Internal(msg) => Self::Internal(msg),
        }
    }
}
