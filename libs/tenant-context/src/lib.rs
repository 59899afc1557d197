#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant isolation primitives shared by every tenant-aware crate.
//!
//! - [`TenantContext`]: the tenant bound to the current unit of work
//! - [`ScopeGuard`]: fail-closed activation of tenant-row filtering
//! - [`DeferredTaskCarrier`] / [`DeferredExecutor`]: carry the tenant into
//!   work that runs after the request finished

pub mod carrier;
pub mod context;
pub mod error;
pub mod executor;
pub mod scope;
pub mod tenant_id;

pub use carrier::{DeferredOutcome, DeferredTaskCarrier, Snapshot};
pub use context::TenantContext;
pub use error::TenancyError;
pub use executor::{
    DeferredError, DeferredExecutor, DeferredExecutorConfig, DeferredHandle, DeferredStats,
};
pub use scope::{ScopeGuard, ScopeToken};
pub use tenant_id::TenantId;
