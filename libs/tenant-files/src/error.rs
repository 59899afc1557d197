use tenant_context::TenancyError;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Tenancy(#[from] TenancyError),

    #[error("file of {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("content type '{0}' is not allowed")]
    TypeNotAllowed(String),

    #[error("invalid directory '{directory}': {reason}")]
    InvalidDirectory {
        directory: String,
        reason: &'static str,
    },

    #[error("invalid file path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// The path belongs to another tenant's namespace.
    #[error("path '{0}' is outside the current tenant's namespace")]
    OutsideNamespace(String),

    #[error("file not found: {0}")]
    NotFound(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
