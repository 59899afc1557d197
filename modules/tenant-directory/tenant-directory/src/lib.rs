//! Tenant Directory module
//!
//! Resolves request domains to tenants through a coherent in-process cache,
//! owns the tenant lifecycle (create / update / delete with post-commit cache
//! maintenance) and provides the HTTP admission layer that binds the resolved
//! tenant to every request.
//!
//! The public API is defined in `tenant-directory-sdk` and re-exported here.

pub use tenant_directory_sdk::{
    DirectoryError, TenantDirectoryClient, TenantId, TenantIdentity, TenantKey,
};

pub mod config;
pub use config::TenantDirectoryConfig;

pub mod api;
pub mod domain;
pub mod infra;

pub use domain::local_client::LocalClient;
pub use domain::notifier::{
    LogMailer, MailMessage, Mailer, TokenIssuer, UuidTokenIssuer, WelcomeNotifier, WelcomeOutcome,
};
pub use domain::registry::{
    NewTenant, TenantPage, TenantQuery, TenantRegistry, TenantStats, TenantUpdate,
};
pub use domain::service::TenantDirectory;
pub use domain::site_config::{SiteConfig, SiteConfigPatch, SiteConfigService};
