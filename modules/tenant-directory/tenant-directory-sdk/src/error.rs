//! Error types for the tenant directory.

use std::fmt;

use tenant_context::{TenancyError, TenantId};
use thiserror::Error;

/// How a tenant was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantKey {
    Domain(String),
    Id(TenantId),
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(d) => write!(f, "domain {d}"),
            Self::Id(id) => write!(f, "id {id}"),
        }
    }
}

/// Errors returned by the tenant directory and lifecycle API.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// No tenant matches the key. Never cached.
    #[error("tenant not found: {key}")]
    TenantNotFound { key: TenantKey },

    #[error("invalid domain '{domain}': {reason}")]
    InvalidDomain { domain: String, reason: &'static str },

    #[error("domain already taken: {domain}")]
    DomainTaken { domain: String },

    /// The persistent store could not answer. Retryable; no stale fallback.
    #[error("tenant store unavailable: {0}")]
    StoreUnavailable(String),

    #[error(transparent)]
    Context(#[from] TenancyError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    #[must_use]
    pub fn not_found_domain(domain: impl Into<String>) -> Self {
        Self::TenantNotFound {
            key: TenantKey::Domain(domain.into()),
        }
    }

    #[must_use]
    pub fn not_found_id(id: TenantId) -> Self {
        Self::TenantNotFound {
            key: TenantKey::Id(id),
        }
    }

    #[must_use]
    pub fn invalid_domain(domain: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason,
        }
    }
}
