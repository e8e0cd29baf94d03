//! Error types for profile catalogs, loading and verification
//!
//! Only failures that stop an operation live here. A generated file with the
//! wrong content or a missing symbolic link is not an error: it is reported
//! as a [`Diagnostic`](crate::verify::Diagnostic) and the scan continues.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure of a single filesystem probe
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The path does not exist
    #[error("{path} does not exist")]
    NotFound { path: PathBuf },

    /// The path exists but may not be accessed
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Any other operating system failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ProbeError {
    /// Classify an I/O error raised while accessing `path`
    pub fn from_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }

    /// Path the failing probe was looking at
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::Io { path, .. } => {
                path
            }
        }
    }
}

/// Errors raised while building the profile catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A profile directory could not be listed
    #[error("unable to read profile directory: {0}")]
    Read(#[from] ProbeError),

    /// The merged catalog could not be allocated
    #[error("unable to allocate the profile catalog")]
    Allocation,
}

/// Errors raised by a [`ProfileLoader`](crate::loader::ProfileLoader)
#[derive(Error, Debug)]
pub enum LoaderError {
    /// No profile directory carries this identifier
    #[error("profile {profile} was not found in {}", format_paths(.searched))]
    ProfileNotFound {
        profile: String,
        searched: Vec<PathBuf>,
    },

    /// Identifier cannot name a profile directory
    #[error("invalid profile identifier: {profile}")]
    InvalidProfileId { profile: String },

    /// The active-profile record exists but could not be understood
    #[error("corrupt selection record {path}: {message}")]
    CorruptSelection { path: PathBuf, message: String },

    /// A compiled profile breaks its own invariants
    #[error("profile {profile} is invalid: {message}")]
    InvalidProfile { profile: String, message: String },

    /// Reading profile or selection content failed
    #[error("unable to load profile data: {0}")]
    Read(#[from] ProbeError),
}

/// Fatal verification failures
///
/// The run stops at the first one and nothing partial is returned.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Loader(#[from] LoaderError),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_io_errors() {
        let not_found = ProbeError::from_io("/a", io::Error::from(io::ErrorKind::NotFound));
        assert!(not_found.is_not_found());

        let denied = ProbeError::from_io("/a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(denied.is_permission_denied());

        let other = ProbeError::from_io("/a", io::Error::new(io::ErrorKind::Other, "disk on fire"));
        assert!(matches!(other, ProbeError::Io { .. }));
        assert_eq!(other.path(), Path::new("/a"));
    }

    #[test]
    fn test_not_found_lists_searched_paths() {
        let err = LoaderError::ProfileNotFound {
            profile: "sssd".to_string(),
            searched: vec![PathBuf::from("/vendor/sssd"), PathBuf::from("/default/sssd")],
        };
        assert_eq!(
            err.to_string(),
            "profile sssd was not found in /vendor/sssd, /default/sssd"
        );
    }
}
