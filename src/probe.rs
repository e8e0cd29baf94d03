//! Read-only filesystem access
//!
//! Everything the catalog, loader and verifier learn about the host goes
//! through [`FsProbe`]. [`SystemProbe`] talks to the real filesystem; tests
//! use [`MemoryProbe`](crate::testing::MemoryProbe) to inject failures that
//! are hard to reproduce on disk.

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ProbeError;

/// Result type alias for probe operations
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

/// File type as reported by `lstat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

impl FileKind {
    fn from_file_type(file_type: fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::Regular
        } else {
            Self::Other
        }
    }
}

/// Metadata of a path, without following symbolic links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMeta {
    pub kind: FileKind,

    /// Permission bits including setuid, setgid and sticky (`mode & 0o7777`)
    pub mode: u32,

    pub uid: u32,
    pub gid: u32,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,

    /// Type of the entry after following symbolic links
    pub kind: FileKind,
}

/// Read-only view of the filesystem
pub trait FsProbe {
    /// Read a whole file, following symbolic links
    fn read_file(&self, path: &Path) -> ProbeResult<Vec<u8>>;

    /// `lstat` the path
    fn metadata(&self, path: &Path) -> ProbeResult<FileMeta>;

    /// Read the target of a symbolic link
    fn read_link(&self, path: &Path) -> ProbeResult<PathBuf>;

    /// Check existence the way `access(F_OK)` does: symbolic links are
    /// followed, so a dangling link does not exist.
    fn exists(&self, path: &Path) -> ProbeResult<bool>;

    /// List a directory, or `None` when the directory itself is missing
    fn read_dir(&self, path: &Path) -> ProbeResult<Option<Vec<DirEntry>>>;
}

/// [`FsProbe`] backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl SystemProbe {
    pub fn new() -> Self {
        Self
    }
}

impl FsProbe for SystemProbe {
    fn read_file(&self, path: &Path) -> ProbeResult<Vec<u8>> {
        debug!(path = %path.display(), "Reading file");
        fs::read(path).map_err(|e| ProbeError::from_io(path, e))
    }

    fn metadata(&self, path: &Path) -> ProbeResult<FileMeta> {
        let meta = fs::symlink_metadata(path).map_err(|e| ProbeError::from_io(path, e))?;
        Ok(FileMeta {
            kind: FileKind::from_file_type(meta.file_type()),
            mode: meta.mode() & 0o7777,
            uid: meta.uid(),
            gid: meta.gid(),
        })
    }

    fn read_link(&self, path: &Path) -> ProbeResult<PathBuf> {
        fs::read_link(path).map_err(|e| ProbeError::from_io(path, e))
    }

    fn exists(&self, path: &Path) -> ProbeResult<bool> {
        path.try_exists().map_err(|e| ProbeError::from_io(path, e))
    }

    fn read_dir(&self, path: &Path) -> ProbeResult<Option<Vec<DirEntry>>> {
        let iter = match fs::read_dir(path) {
            Ok(iter) => iter,
            Err(e) => {
                let err = ProbeError::from_io(path, e);
                if err.is_not_found() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        let mut entries = Vec::new();
        for entry in iter {
            let entry = entry.map_err(|e| ProbeError::from_io(path, e))?;
            let entry_path = entry.path();

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "Skipping entry with a non UTF-8 name");
                    continue;
                }
            };

            // Follow links so that a linked profile directory still counts.
            let kind = match fs::metadata(&entry_path) {
                Ok(meta) => FileKind::from_file_type(meta.file_type()),
                Err(e) => {
                    let err = ProbeError::from_io(&entry_path, e);
                    if !err.is_not_found() {
                        return Err(err);
                    }
                    warn!(path = %entry_path.display(), "Dangling symbolic link");
                    FileKind::Other
                }
            };

            entries.push(DirEntry { name, kind });
        }

        Ok(Some(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    #[test]
    fn test_metadata_does_not_follow_links() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        let link = dir.path().join("link");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();
        symlink(&file, &link).unwrap();

        let probe = SystemProbe::new();
        let meta = probe.metadata(&file).unwrap();
        assert_eq!(meta.kind, FileKind::Regular);
        assert_eq!(meta.mode, 0o640);
        assert_eq!(probe.metadata(&link).unwrap().kind, FileKind::Symlink);
        assert_eq!(probe.read_link(&link).unwrap(), file);
    }

    #[test]
    fn test_exists_follows_links() {
        let dir = TempDir::new().unwrap();
        let dangling = dir.path().join("dangling");
        symlink(dir.path().join("nowhere"), &dangling).unwrap();

        let probe = SystemProbe::new();
        assert!(!probe.exists(&dangling).unwrap());
        assert!(probe.exists(dir.path()).unwrap());
    }

    #[test]
    fn test_read_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = SystemProbe::new()
            .read_file(&dir.path().join("missing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_dir_reports_kinds() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sssd")).unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        symlink(dir.path().join("sssd"), dir.path().join("alias")).unwrap();

        let mut entries = SystemProbe::new().read_dir(dir.path()).unwrap().unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let kinds: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("README", FileKind::Regular),
                ("alias", FileKind::Directory),
                ("sssd", FileKind::Directory),
            ]
        );
    }

    #[test]
    fn test_read_missing_dir_is_none() {
        let dir = TempDir::new().unwrap();
        let listing = SystemProbe::new().read_dir(&dir.path().join("gone")).unwrap();
        assert!(listing.is_none());
    }
}
