//! Public API trait for the tenant directory.

use async_trait::async_trait;

use crate::error::DirectoryError;
use crate::models::TenantIdentity;

/// Domain → tenant lookup with a coherent in-process cache.
///
/// ```ignore
/// let tenant = directory.resolve("a.example").await?;
/// TenantContext::run(tenant.id, handler).await?;
/// ```
#[async_trait]
pub trait TenantDirectoryClient: Send + Sync {
    /// Resolve a request domain to its tenant.
    ///
    /// A cache hit does not touch the store. A miss reads the store and
    /// caches a positive answer only.
    ///
    /// # Errors
    ///
    /// - `InvalidDomain` for an empty or malformed domain
    /// - `TenantNotFound` if no tenant owns the domain
    /// - `StoreUnavailable` if the store fails; stale entries are never served
    async fn resolve(&self, domain: &str) -> Result<TenantIdentity, DirectoryError>;

    /// Drop any cached entry for `domain`. No-op when absent.
    fn invalidate(&self, domain: &str);

    /// Keep the cache coherent after a committed tenant mutation.
    ///
    /// `old_domain` is the domain before the mutation (`None` on creation),
    /// `fresh` the identity after it (`None` on deletion). Must be called from
    /// an after-commit hook, never inline with the write.
    fn notify_mutated(&self, old_domain: Option<&str>, fresh: Option<&TenantIdentity>);
}
