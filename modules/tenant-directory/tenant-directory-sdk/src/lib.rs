#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant Directory SDK
//!
//! - [`TenantDirectoryClient`]: domain → tenant resolution for consumers
//! - [`TenantIdentity`]: the tenant record
//! - [`DirectoryError`]: error taxonomy shared with the REST layer

pub mod api;
pub mod error;
pub mod models;

pub use api::TenantDirectoryClient;
pub use error::{DirectoryError, TenantKey};
pub use models::{MAX_DOMAIN_LENGTH, TenantIdentity, normalize_domain};
pub use tenant_context::TenantId;
