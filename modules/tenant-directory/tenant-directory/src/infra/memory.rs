//! In-process [`TenantStore`] for tests and local runs without a database.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tenant_directory_sdk::{TenantId, TenantIdentity};

use crate::domain::repo::TenantStore;

#[derive(Default)]
pub struct InMemoryTenantStore {
    by_id: DashMap<TenantId, TenantIdentity>,
    domain_lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryTenantStore {
    /// Insert or replace a tenant. Callers are responsible for telling the
    /// directory, exactly like a committed write would.
    pub fn put(&self, identity: TenantIdentity) {
        self.by_id.insert(identity.id, identity);
    }

    #[must_use]
    pub fn remove(&self, id: TenantId) -> Option<TenantIdentity> {
        self.by_id.remove(&id).map(|(_, v)| v)
    }

    /// Make every lookup fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    #[must_use]
    pub fn domain_lookups(&self) -> usize {
        self.domain_lookups.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }
        Ok(())
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn find_by_domain(&self, domain: &str) -> anyhow::Result<Option<TenantIdentity>> {
        self.domain_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(self
            .by_id
            .iter()
            .find(|e| e.value().domain == domain)
            .map(|e| e.value().clone()))
    }

    async fn find_by_id(&self, id: TenantId) -> anyhow::Result<Option<TenantIdentity>> {
        self.check_available()?;
        Ok(self.by_id.get(&id).map(|e| e.value().clone()))
    }
}
