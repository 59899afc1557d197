use async_trait::async_trait;
use tenant_directory_sdk::{TenantId, TenantIdentity};

/// Read access to the global tenant table.
///
/// Lookups run before any tenant is bound, so implementations must not go
/// through the tenant-scoped query layer.
#[async_trait]
pub trait TenantStore: Send + Sync {
    /// `domain` is already normalized.
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>>;

    async fn find_by_id(&self, id: TenantId) -> anyhow::Result<Option<TenantIdentity>>;
}
