use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::LocalFileStorage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileStorageConfig {
    /// Root directory; one subdirectory per tenant is created below it.
    pub base_path: PathBuf,
    /// Upload size limit in bytes.
    pub max_file_size: u64,
    /// Accepted content types. `type/*` accepts every subtype.
    pub allowed_types: Vec<String>,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("data/files"),
            max_file_size: 10 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_owned(),
                "image/png".to_owned(),
                "image/gif".to_owned(),
                "image/webp".to_owned(),
                "video/mp4".to_owned(),
            ],
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: FileStorageConfig =
            serde_json::from_str(r#"{"base_path": "/srv/files"}"#).unwrap();
        assert_eq!(cfg.base_path, PathBuf::from("/srv/files"));
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
        assert!(cfg.allowed_types.iter().any(|t| t == "image/png"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res: Result<FileStorageConfig, _> = serde_json::from_str(r#"{"max_size": 1}"#);
        assert!(res.is_err());
    }
}
