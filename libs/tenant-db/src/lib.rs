#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant-confined data access on top of `SeaORM`.
//!
//! Queries against [`TenantScopedEntity`] types are built through typestate
//! wrappers: `.secure()` yields an unscoped query that cannot be executed,
//! `.scope_current()` adds `tenant_col = <active filter>` and fails closed
//! when the caller is not inside `ScopeGuard`.
//!
//! [`TenantDb::in_transaction`] hands the callback an [`AfterCommit`]
//! registry so cache invalidation and deferred work happen strictly after
//! the commit.

pub use sea_orm::ConnectionTrait as DbConnTrait;

pub mod conn;
pub mod db_ops;
pub mod entity;
pub mod error;
pub mod select;
pub mod tx;

pub use conn::{DbConfig, TenantDb};
pub use db_ops::{
    SecureDeleteExt, SecureDeleteMany, SecureUpdateExt, SecureUpdateMany, scoped_insert,
    scoped_update,
};
pub use entity::TenantScopedEntity;
pub use error::ScopeError;
pub use select::{Scoped, SecureEntityExt, SecureSelect, Unscoped};
pub use tx::{AfterCommit, InfraError, TxError};
