use serde::{Deserialize, Serialize};
use tenant_context::TenantId;

use crate::error::DirectoryError;

/// Longest DNS name accepted as a tenant domain.
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Tenant as produced by the persistent store.
///
/// `domain` is unique across tenants and is the only externally supplied
/// lookup key. It is always held in normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantIdentity {
    pub id: TenantId,
    pub domain: String,
    pub name: String,
    pub email: String,
}

/// Canonical form of a request domain: trimmed, lowercased, no trailing dot.
///
/// # Errors
/// `DirectoryError::InvalidDomain` when the result is empty, longer than
/// `max_len`, has empty labels or characters outside `[a-z0-9-.]`.
pub fn normalize_domain(raw: &str, max_len: usize) -> Result<String, DirectoryError> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(DirectoryError::invalid_domain(raw, "empty domain"));
    }
    if trimmed.len() > max_len {
        return Err(DirectoryError::invalid_domain(raw, "domain too long"));
    }
    let domain = trimmed.to_ascii_lowercase();
    if domain.split('.').any(str::is_empty) {
        return Err(DirectoryError::invalid_domain(raw, "empty label"));
    }
    if !domain
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(DirectoryError::invalid_domain(raw, "invalid character"));
    }
    Ok(domain)
}
