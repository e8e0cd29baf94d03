//! Where generated files, symbolic links and profile sources live
//!
//! The table of generated files is fixed: every profile produces the same set
//! of files, only their content differs. All paths hang off a root prefix so
//! the same table can describe a chroot or a test directory.

use std::path::{Path, PathBuf};

use crate::profile::{GeneratedFileSpec, SymlinkSpec};

/// Directory holding generated files, relative to the root
pub const GENERATED_DIR: &str = "etc/authselect";

/// Active-profile record, relative to the root
pub const SELECTION_FILE: &str = "etc/authselect/authselect.conf";

pub const DEFAULT_PROFILES_DIR: &str = "usr/share/authselect/default";
pub const VENDOR_PROFILES_DIR: &str = "usr/share/authselect/vendor";
pub const CUSTOM_PROFILES_DIR: &str = "etc/authselect/custom";

/// Permission bits of every generated file (`rw-r--r--`)
pub const GENERATED_MODE: u32 = 0o644;

/// One generated file and the system link pointing at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    /// File name inside both the profile directory and [`GENERATED_DIR`]
    pub file: &'static str,

    /// Link location, relative to the root
    pub link: &'static str,
}

const ENTRIES: &[LayoutEntry] = &[
    LayoutEntry {
        file: "system-auth",
        link: "etc/pam.d/system-auth",
    },
    LayoutEntry {
        file: "password-auth",
        link: "etc/pam.d/password-auth",
    },
    LayoutEntry {
        file: "fingerprint-auth",
        link: "etc/pam.d/fingerprint-auth",
    },
    LayoutEntry {
        file: "smartcard-auth",
        link: "etc/pam.d/smartcard-auth",
    },
    LayoutEntry {
        file: "postlogin",
        link: "etc/pam.d/postlogin",
    },
    LayoutEntry {
        file: "nsswitch.conf",
        link: "etc/nsswitch.conf",
    },
    LayoutEntry {
        file: "dconf-db",
        link: "etc/dconf/db/distro.d/20-authselect",
    },
    LayoutEntry {
        file: "dconf-locks",
        link: "etc/dconf/db/distro.d/locks/20-authselect",
    },
];

/// Ownership and permissions every generated file must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileExpectations {
    pub mode: u32,
    pub owner: Option<u32>,
    pub group: Option<u32>,
}

impl Default for FileExpectations {
    fn default() -> Self {
        Self {
            mode: GENERATED_MODE,
            owner: Some(0),
            group: Some(0),
        }
    }
}

/// Filesystem layout of the tool under one root
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    default_profiles: PathBuf,
    vendor_profiles: PathBuf,
    custom_profiles: PathBuf,
    expectations: FileExpectations,
}

impl Default for Layout {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            default_profiles: root.join(DEFAULT_PROFILES_DIR),
            vendor_profiles: root.join(VENDOR_PROFILES_DIR),
            custom_profiles: root.join(CUSTOM_PROFILES_DIR),
            root,
            expectations: FileExpectations::default(),
        }
    }

    pub fn with_default_profiles(mut self, dir: impl Into<PathBuf>) -> Self {
        self.default_profiles = dir.into();
        self
    }

    pub fn with_vendor_profiles(mut self, dir: impl Into<PathBuf>) -> Self {
        self.vendor_profiles = dir.into();
        self
    }

    pub fn with_custom_profiles(mut self, dir: impl Into<PathBuf>) -> Self {
        self.custom_profiles = dir.into();
        self
    }

    pub fn with_expectations(mut self, expectations: FileExpectations) -> Self {
        self.expectations = expectations;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &'static [LayoutEntry] {
        ENTRIES
    }

    pub fn expectations(&self) -> FileExpectations {
        self.expectations
    }

    pub fn default_profiles(&self) -> &Path {
        &self.default_profiles
    }

    pub fn vendor_profiles(&self) -> &Path {
        &self.vendor_profiles
    }

    pub fn custom_profiles(&self) -> &Path {
        &self.custom_profiles
    }

    pub fn selection_file(&self) -> PathBuf {
        self.root.join(SELECTION_FILE)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.root.join(GENERATED_DIR)
    }

    pub fn generated_path(&self, entry: &LayoutEntry) -> PathBuf {
        self.generated_dir().join(entry.file)
    }

    /// Every generated file path the tool can produce, for any profile
    pub fn generated_paths(&self) -> Vec<PathBuf> {
        ENTRIES.iter().map(|e| self.generated_path(e)).collect()
    }

    /// Every symbolic link the tool can produce
    pub fn symlinks(&self) -> Vec<SymlinkSpec> {
        ENTRIES
            .iter()
            .map(|e| SymlinkSpec {
                link: self.root.join(e.link),
                destination: self.generated_path(e),
            })
            .collect()
    }

    /// Generated file spec for `entry` with the given expected body
    pub fn file_spec(&self, entry: &LayoutEntry, body: Option<String>) -> GeneratedFileSpec {
        GeneratedFileSpec {
            path: self.generated_path(entry),
            body,
            mode: self.expectations.mode,
            owner: self.expectations.owner,
            group: self.expectations.group,
        }
    }
}
