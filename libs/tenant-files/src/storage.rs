use std::path::PathBuf;

use bytes::Bytes;
use tenant_context::{TenantContext, TenantId};

use crate::config::FileStorageConfig;
use crate::error::StorageError;
use crate::path::{TenantPath, check_directory, extension_of};

/// An incoming file.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client sent; only its extension is kept.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Filesystem storage confined to the bound tenant's namespace.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    config: FileStorageConfig,
}

impl LocalFileStorage {
    #[must_use]
    pub fn new(config: FileStorageConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn base_path(&self) -> &std::path::Path {
        &self.config.base_path
    }

    /// Store `upload` under `directory` for the bound tenant.
    ///
    /// Returns the relative path `<tenant>/<directory>/<uuid><ext>`.
    ///
    /// # Errors
    /// - `Tenancy(NoTenantBound)` outside a bound unit
    /// - `TooLarge`, `TypeNotAllowed`, `InvalidDirectory`
    /// - `Io` when the file cannot be written
    #[tracing::instrument(
        skip_all,
        fields(directory = %directory, size = upload.bytes.len(), content_type = %upload.content_type)
    )]
    pub async fn store(&self, directory: &str, upload: Upload) -> Result<String, StorageError> {
        let tenant = TenantContext::current()?;
        self.check_size(upload.bytes.len() as u64)?;
        self.check_type(&upload.content_type)?;
        check_directory(directory)?;

        let file = format!("{}{}", uuid::Uuid::new_v4(), extension_of(&upload.file_name));
        let relative = format!("{tenant}/{directory}/{file}");

        let dir = self.config.base_path.join(tenant.to_string()).join(directory);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&file), &upload.bytes).await?;

        tracing::info!(tenant.id = %tenant, path = %relative, "file stored");
        Ok(relative)
    }

    /// Read a file previously returned by [`LocalFileStorage::store`].
    ///
    /// # Errors
    /// `InvalidPath`, `OutsideNamespace`, `NotFound`, `Io`, or
    /// `Tenancy(NoTenantBound)`.
    pub async fn load(&self, relative: &str) -> Result<Bytes, StorageError> {
        let full = self.resolve(relative)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Bytes::from(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(relative.to_owned()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a stored file. Returns `false` when it did not exist.
    ///
    /// # Errors
    /// As [`LocalFileStorage::load`], except a missing file is not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, relative: &str) -> Result<bool, StorageError> {
        let full = self.resolve(relative)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => {
                tracing::info!(path = %relative, "file deleted");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %relative, "file already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Absolute location of `relative`, if it belongs to the bound tenant.
    fn resolve(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let tenant: TenantId = TenantContext::current()?;
        let path = TenantPath::parse(relative)?.owned_by(tenant).inspect_err(|_| {
            tracing::warn!(tenant.id = %tenant, path = %relative, "refused access outside tenant namespace");
        })?;
        Ok(self
            .config
            .base_path
            .join(path.tenant)
            .join(path.directory)
            .join(path.file))
    }

    fn check_size(&self, size: u64) -> Result<(), StorageError> {
        if size > self.config.max_file_size {
            return Err(StorageError::TooLarge {
                size,
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    fn check_type(&self, content_type: &str) -> Result<(), StorageError> {
        let not_allowed = || StorageError::TypeNotAllowed(content_type.to_owned());
        let mime: mime::Mime = content_type.parse().map_err(|_| not_allowed())?;
        let allowed = self.config.allowed_types.iter().any(|allowed| {
            match allowed.split_once('/') {
                Some((ty, "*")) => mime.type_().as_str().eq_ignore_ascii_case(ty),
                _ => mime.essence_str().eq_ignore_ascii_case(allowed),
            }
        });
        if allowed { Ok(()) } else { Err(not_allowed()) }
    }
}
