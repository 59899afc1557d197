#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Tenant-namespaced file storage.
//!
//! Files live under `<base_path>/<tenant>/<directory>/<file>`. The tenant is
//! always the one bound to the calling unit of work; callers never pass it.

pub mod config;
pub mod error;
pub mod path;
pub mod storage;

pub use config::FileStorageConfig;
pub use error::StorageError;
pub use storage::{LocalFileStorage, Upload};
