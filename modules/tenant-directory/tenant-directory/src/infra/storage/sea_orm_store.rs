use async_trait::async_trait;
use tenant_db::TenantDb;
use tenant_directory_sdk::{TenantId, TenantIdentity};

use super::tenant_rows;
use crate::domain::repo::TenantStore;

/// [`TenantStore`] over the shared database pool.
pub struct SeaOrmTenantStore {
    db: TenantDb,
}

impl SeaOrmTenantStore {
    #[must_use]
    pub fn new(db: TenantDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TenantStore for SeaOrmTenantStore {
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>> {
        let row = tenant_rows::find_by_domain(self.db.conn(), domain).await?;
        Ok(row.map(Into::into))
    }

    async fn find_by_id(&self, id: TenantId) -> anyhow::Result<Option<TenantIdentity>> {
        let row = tenant_rows::find_by_id(self.db.conn(), id).await?;
        Ok(row.map(Into::into))
    }
}
