//! Test Utilities
//!
//! An in-memory [`FsProbe`] for exercising verification paths that are hard
//! to reproduce on a real filesystem: unreadable files, failing disks,
//! arbitrary owners and groups.
//!
//! # Usage
//!
//! ```ignore
//! use authprofile::testing::MemoryProbe;
//! use authprofile::verify::Verifier;
//!
//! let probe = MemoryProbe::new()
//!     .with_file("/etc/authselect/system-auth", "# a\n# b\n\nauth required pam_env.so\n")
//!     .with_permission_denied("/etc/authselect/password-auth")
//!     .with_io_error("/etc/authselect/nsswitch.conf");
//!
//! let verifier = Verifier::new(&probe);
//! ```
//!
//! Parent directories are created implicitly. Files default to mode `0644`
//! owned by root. Symbolic links are followed wherever the real filesystem
//! would follow them.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ProbeError;
use crate::probe::{DirEntry, FileKind, FileMeta, FsProbe, ProbeResult};

const MAX_LINK_DEPTH: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    File {
        content: Vec<u8>,
        mode: u32,
        uid: u32,
        gid: u32,
    },
    Dir,
    Symlink(PathBuf),
}

#[derive(Debug, Clone, Copy)]
enum Fault {
    PermissionDenied,
    Io,
}

/// In-memory filesystem implementing [`FsProbe`]
#[derive(Debug, Clone, Default)]
pub struct MemoryProbe {
    nodes: BTreeMap<PathBuf, Node>,
    faults: HashMap<PathBuf, Fault>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a regular file with mode `0644` owned by root
    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.with_file_meta(path, content, 0o644, 0, 0)
    }

    /// Add a regular file with explicit permissions and ownership
    pub fn with_file_meta(
        mut self,
        path: impl Into<PathBuf>,
        content: impl Into<Vec<u8>>,
        mode: u32,
        uid: u32,
        gid: u32,
    ) -> Self {
        self.insert(
            path.into(),
            Node::File {
                content: content.into(),
                mode,
                uid,
                gid,
            },
        );
        self
    }

    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.insert(path.into(), Node::Dir);
        self
    }

    pub fn with_symlink(mut self, link: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.insert(link.into(), Node::Symlink(target.into()));
        self
    }

    /// Every access to `path` fails with permission denied
    pub fn with_permission_denied(mut self, path: impl Into<PathBuf>) -> Self {
        self.faults.insert(path.into(), Fault::PermissionDenied);
        self
    }

    /// Every access to `path` fails with an I/O error
    pub fn with_io_error(mut self, path: impl Into<PathBuf>) -> Self {
        self.faults.insert(path.into(), Fault::Io);
        self
    }

    fn insert(&mut self, path: PathBuf, node: Node) {
        for ancestor in path.ancestors().skip(1) {
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir);
        }
        self.nodes.insert(path, node);
    }

    fn check_fault(&self, path: &Path) -> ProbeResult<()> {
        match self.faults.get(path) {
            None => Ok(()),
            Some(Fault::PermissionDenied) => Err(ProbeError::PermissionDenied {
                path: path.to_path_buf(),
            }),
            Some(Fault::Io) => Err(ProbeError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "injected I/O error"),
            }),
        }
    }

    /// Follow symbolic links from `path` to the final node
    fn resolve(&self, path: &Path) -> ProbeResult<Option<(PathBuf, &Node)>> {
        let mut current = path.to_path_buf();
        for _ in 0..MAX_LINK_DEPTH {
            self.check_fault(&current)?;
            match self.nodes.get(&current) {
                None => return Ok(None),
                Some(Node::Symlink(target)) => {
                    current = if target.is_absolute() {
                        target.clone()
                    } else {
                        current
                            .parent()
                            .unwrap_or_else(|| Path::new("/"))
                            .join(target)
                    };
                }
                Some(node) => return Ok(Some((current, node))),
            }
        }

        Err(ProbeError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "too many levels of symbolic links"),
        })
    }

    fn kind_of(node: &Node) -> FileKind {
        match node {
            Node::File { .. } => FileKind::Regular,
            Node::Dir => FileKind::Directory,
            Node::Symlink(_) => FileKind::Symlink,
        }
    }
}

impl FsProbe for MemoryProbe {
    fn read_file(&self, path: &Path) -> ProbeResult<Vec<u8>> {
        match self.resolve(path)? {
            None => Err(ProbeError::NotFound {
                path: path.to_path_buf(),
            }),
            Some((_, Node::File { content, .. })) => Ok(content.clone()),
            Some(_) => Err(ProbeError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::Other, "is a directory"),
            }),
        }
    }

    fn metadata(&self, path: &Path) -> ProbeResult<FileMeta> {
        self.check_fault(path)?;
        let node = self.nodes.get(path).ok_or_else(|| ProbeError::NotFound {
            path: path.to_path_buf(),
        })?;

        Ok(match node {
            Node::File { mode, uid, gid, .. } => FileMeta {
                kind: FileKind::Regular,
                mode: *mode,
                uid: *uid,
                gid: *gid,
            },
            Node::Dir => FileMeta {
                kind: FileKind::Directory,
                mode: 0o755,
                uid: 0,
                gid: 0,
            },
            Node::Symlink(_) => FileMeta {
                kind: FileKind::Symlink,
                mode: 0o777,
                uid: 0,
                gid: 0,
            },
        })
    }

    fn read_link(&self, path: &Path) -> ProbeResult<PathBuf> {
        self.check_fault(path)?;
        match self.nodes.get(path) {
            None => Err(ProbeError::NotFound {
                path: path.to_path_buf(),
            }),
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(ProbeError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a symbolic link"),
            }),
        }
    }

    fn exists(&self, path: &Path) -> ProbeResult<bool> {
        Ok(self.resolve(path)?.is_some())
    }

    fn read_dir(&self, path: &Path) -> ProbeResult<Option<Vec<DirEntry>>> {
        let dir = match self.resolve(path)? {
            None => return Ok(None),
            Some((dir, Node::Dir)) => dir,
            Some(_) => {
                return Err(ProbeError::Io {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::Other, "not a directory"),
                })
            }
        };

        let mut entries = Vec::new();
        for child in self.nodes.keys().filter(|p| p.parent() == Some(dir.as_path())) {
            let Some(name) = child.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let kind = match self.resolve(child)? {
                Some((_, node)) => Self::kind_of(node),
                None => FileKind::Other,
            };
            entries.push(DirEntry {
                name: name.to_string(),
                kind,
            });
        }

        Ok(Some(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_create_parent_directories() {
        let probe = MemoryProbe::new().with_file("/etc/authselect/system-auth", "x");
        assert!(probe.exists(Path::new("/etc/authselect")).unwrap());

        let entries = probe.read_dir(Path::new("/etc")).unwrap().unwrap();
        assert_eq!(
            entries,
            vec![DirEntry {
                name: "authselect".to_string(),
                kind: FileKind::Directory
            }]
        );
    }

    #[test]
    fn test_links_are_followed_for_reads() {
        let probe = MemoryProbe::new()
            .with_file("/etc/authselect/nsswitch.conf", "passwd: files\n")
            .with_symlink("/etc/nsswitch.conf", "authselect/nsswitch.conf");

        let content = probe.read_file(Path::new("/etc/nsswitch.conf")).unwrap();
        assert_eq!(content, b"passwd: files\n");
        assert_eq!(
            probe.metadata(Path::new("/etc/nsswitch.conf")).unwrap().kind,
            FileKind::Symlink
        );
    }

    #[test]
    fn test_faults_are_reported() {
        let probe = MemoryProbe::new()
            .with_file("/a", "x")
            .with_permission_denied("/a")
            .with_io_error("/b");

        assert!(probe.read_file(Path::new("/a")).unwrap_err().is_permission_denied());
        assert!(matches!(
            probe.exists(Path::new("/b")).unwrap_err(),
            ProbeError::Io { .. }
        ));
    }

    #[test]
    fn test_link_loop_is_an_error() {
        let probe = MemoryProbe::new()
            .with_symlink("/a", "/b")
            .with_symlink("/b", "/a");
        assert!(probe.exists(Path::new("/a")).is_err());
    }
}
