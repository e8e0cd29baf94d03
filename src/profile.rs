//! Profile identifiers and compiled profile contents

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Prefix marking a profile that comes from the locally authored directory
pub const CUSTOM_PREFIX: &str = "custom/";

/// Identifier of an available profile
///
/// Plain identifiers come from the default and vendor directories, custom
/// ones carry [`CUSTOM_PREFIX`]. Ordering is the catalog order: every plain
/// identifier sorts before every custom one, then byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(String);

impl ProfileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier for a profile found in the custom directory
    pub fn custom(name: &str) -> Self {
        Self(format!("{CUSTOM_PREFIX}{name}"))
    }

    pub fn is_custom(&self) -> bool {
        self.0.starts_with(CUSTOM_PREFIX)
    }

    /// Directory name of the profile, without the custom prefix
    pub fn name(&self) -> &str {
        self.0.strip_prefix(CUSTOM_PREFIX).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for ProfileId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.is_custom()
            .cmp(&other.is_custom())
            .then_with(|| self.0.as_bytes().cmp(other.0.as_bytes()))
    }
}

impl PartialOrd for ProfileId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProfileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProfileId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The profile recorded as active on the host, with its features
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub profile: ProfileId,
    pub features: Vec<String>,
}

/// A file the active profile is responsible for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFileSpec {
    pub path: PathBuf,

    /// Expected body after the preamble; `None` is the same as empty
    pub body: Option<String>,

    /// Expected permission bits
    pub mode: u32,

    /// Expected owner uid, `None` when any owner is acceptable
    pub owner: Option<u32>,

    /// Expected group gid, `None` when any group is acceptable
    pub group: Option<u32>,
}

impl GeneratedFileSpec {
    pub fn expected_body(&self) -> &str {
        self.body.as_deref().unwrap_or("")
    }
}

/// A symbolic link the active profile is responsible for
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymlinkSpec {
    pub link: PathBuf,
    pub destination: PathBuf,
}

/// Expected on-disk state for one (profile, features) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledProfile {
    pub profile: ProfileId,
    pub features: Vec<String>,
    pub files: Vec<GeneratedFileSpec>,
    pub symlinks: Vec<SymlinkSpec>,
}

impl CompiledProfile {
    /// Check that every symbolic link points at exactly one generated file
    pub fn validate(&self) -> Result<(), LoaderError> {
        let mut counts: HashMap<&PathBuf, usize> = HashMap::new();
        for file in &self.files {
            *counts.entry(&file.path).or_default() += 1;
        }

        for link in &self.symlinks {
            match counts.get(&link.destination).copied().unwrap_or(0) {
                1 => {}
                0 => {
                    return Err(self.invalid(format!(
                        "link {} points to {}, which is not a generated file",
                        link.link.display(),
                        link.destination.display()
                    )))
                }
                n => {
                    return Err(self.invalid(format!(
                        "link {} points to {}, which is generated {} times",
                        link.link.display(),
                        link.destination.display(),
                        n
                    )))
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, message: String) -> LoaderError {
        LoaderError::InvalidProfile {
            profile: self.profile.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> GeneratedFileSpec {
        GeneratedFileSpec {
            path: PathBuf::from(path),
            body: None,
            mode: 0o644,
            owner: None,
            group: None,
        }
    }

    fn link(link: &str, destination: &str) -> SymlinkSpec {
        SymlinkSpec {
            link: PathBuf::from(link),
            destination: PathBuf::from(destination),
        }
    }

    #[test]
    fn test_custom_identifier() {
        let id = ProfileId::custom("mine");
        assert_eq!(id.as_str(), "custom/mine");
        assert!(id.is_custom());
        assert_eq!(id.name(), "mine");

        let plain = ProfileId::new("sssd");
        assert!(!plain.is_custom());
        assert_eq!(plain.name(), "sssd");
    }

    #[test]
    fn test_custom_sorts_after_plain() {
        let mut ids = vec![
            ProfileId::custom("aaa"),
            ProfileId::new("zzz"),
            ProfileId::new("Local"),
            ProfileId::new("local"),
        ];
        ids.sort();
        let sorted: Vec<_> = ids.iter().map(ProfileId::as_str).collect();
        assert_eq!(sorted, vec!["Local", "local", "zzz", "custom/aaa"]);
    }

    #[test]
    fn test_missing_body_is_empty() {
        assert_eq!(file("/etc/a").expected_body(), "");
    }

    #[test]
    fn test_validate_accepts_links_to_generated_files() {
        let profile = CompiledProfile {
            profile: ProfileId::new("sssd"),
            features: Vec::new(),
            files: vec![file("/etc/a"), file("/etc/b")],
            symlinks: vec![link("/x/a", "/etc/a"), link("/x/b", "/etc/b")],
        };
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_destination() {
        let profile = CompiledProfile {
            profile: ProfileId::new("sssd"),
            features: Vec::new(),
            files: vec![file("/etc/a")],
            symlinks: vec![link("/x/b", "/etc/b")],
        };
        let err = profile.validate().unwrap_err();
        assert!(matches!(err, LoaderError::InvalidProfile { .. }));
    }

    #[test]
    fn test_validate_rejects_ambiguous_destination() {
        let profile = CompiledProfile {
            profile: ProfileId::new("sssd"),
            features: Vec::new(),
            files: vec![file("/etc/a"), file("/etc/a")],
            symlinks: vec![link("/x/a", "/etc/a")],
        };
        assert!(profile.validate().is_err());
    }
}
