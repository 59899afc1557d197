use std::sync::Arc;

use async_trait::async_trait;
use tenant_directory_sdk::{DirectoryError, TenantDirectoryClient, TenantIdentity};

use crate::domain::service::TenantDirectory;

/// In-process implementation of the SDK client.
pub struct LocalClient {
    directory: Arc<TenantDirectory>,
}

impl LocalClient {
    #[must_use]
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl TenantDirectoryClient for LocalClient {
    async fn resolve(&self, domain: &str) -> Result<TenantIdentity, DirectoryError> {
        self.directory.resolve(domain).await.map_err(Into::into)
    }

    fn invalidate(&self, domain: &str) {
        self.directory.invalidate(domain);
    }

    fn notify_mutated(&self, old_domain: Option<&str>, fresh: Option<&TenantIdentity>) {
        self.directory.notify_mutated(old_domain, fresh);
    }
}
