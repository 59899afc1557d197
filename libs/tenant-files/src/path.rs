//! Validation of the relative paths handed out by the storage.
//!
//! A stored file is always addressed as `<tenant>/<directory>/<file>`, three
//! plain segments separated by `/`. Nothing else is accepted back.

use std::path::Path;

use tenant_context::TenantId;

use crate::error::StorageError;

const MAX_SEGMENT_LEN: usize = 128;
const MAX_EXTENSION_LEN: usize = 10;

/// Reason `segment` cannot be used as one path component, if any.
pub(crate) fn segment_problem(segment: &str) -> Option<&'static str> {
    if segment.is_empty() {
        return Some("empty");
    }
    if segment.len() > MAX_SEGMENT_LEN {
        return Some("too long");
    }
    if segment.starts_with('.') {
        return Some("must not start with '.'");
    }
    if !segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    {
        return Some("only ASCII letters, digits, '-', '_' and '.' are allowed");
    }
    None
}

/// Validate an upload directory name.
pub(crate) fn check_directory(directory: &str) -> Result<(), StorageError> {
    match segment_problem(directory) {
        Some(reason) => Err(StorageError::InvalidDirectory {
            directory: directory.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Lower-cased extension of the original file name, with its dot. Empty when
/// the name has none or it is not a plain short extension.
pub(crate) fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| {
            !e.is_empty() && e.len() <= MAX_EXTENSION_LEN && e.bytes().all(|b| b.is_ascii_alphanumeric())
        })
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// A parsed `<tenant>/<directory>/<file>` path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantPath<'a> {
    pub tenant: &'a str,
    pub directory: &'a str,
    pub file: &'a str,
}

impl<'a> TenantPath<'a> {
    /// Parse and validate `raw`.
    ///
    /// # Errors
    /// `InvalidPath` when `raw` is not three safe segments.
    pub fn parse(raw: &'a str) -> Result<Self, StorageError> {
        let invalid = |reason| StorageError::InvalidPath {
            path: raw.to_owned(),
            reason,
        };

        let mut parts = raw.split('/');
        let (Some(tenant), Some(directory), Some(file), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid("expected <tenant>/<directory>/<file>"));
        };
        for segment in [tenant, directory, file] {
            if let Some(reason) = segment_problem(segment) {
                return Err(invalid(reason));
            }
        }
        Ok(Self {
            tenant,
            directory,
            file,
        })
    }

    /// Ensure the path lives in `tenant`'s namespace.
    ///
    /// # Errors
    /// `OutsideNamespace` otherwise.
    pub fn owned_by(self, tenant: TenantId) -> Result<Self, StorageError> {
        if self.tenant == tenant.to_string() {
            Ok(self)
        } else {
            Err(StorageError::OutsideNamespace(format!(
                "{}/{}/{}",
                self.tenant, self.directory, self.file
            )))
        }
    }
}
