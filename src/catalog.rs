//! Profile discovery and the merged profile catalog
//!
//! Profiles come from three directories. Default profiles are the
//! distribution baseline and always listed. Vendor profiles are listed unless
//! a default profile already has the same name. Custom profiles are always
//! listed, namespaced with `custom/`, and sort after everything else.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::probe::{FileKind, FsProbe};
use crate::profile::ProfileId;

/// Profiles found as immediate subdirectories of one source directory
#[derive(Debug, Clone, Default)]
pub struct ProfileDirectory {
    profiles: Vec<String>,
}

impl ProfileDirectory {
    /// List the profiles in `path`
    ///
    /// A missing directory is an empty listing. Entries that are not
    /// directories are skipped.
    pub fn read<P: FsProbe>(probe: &P, path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading profile directory");

        let entries = match probe.read_dir(path)? {
            Some(entries) => entries,
            None => {
                warn!(path = %path.display(), "Profile directory is missing");
                return Ok(Self::default());
            }
        };

        let mut profiles = Vec::with_capacity(entries.len());
        for entry in entries {
            if entry.kind != FileKind::Directory {
                warn!(name = %entry.name, "Not a directory");
                continue;
            }
            debug!(profile = %entry.name, "Found profile");
            profiles.push(entry.name);
        }

        Ok(Self { profiles })
    }

    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }
}

/// Merge three directory listings into the ordered catalog
///
/// Nothing is returned unless the whole catalog could be built.
pub fn merge_profiles<S: AsRef<str>>(
    default: &[S],
    vendor: &[S],
    custom: &[S],
) -> Result<Vec<ProfileId>, CatalogError> {
    let mut ids: Vec<ProfileId> = Vec::new();
    ids.try_reserve_exact(default.len() + vendor.len() + custom.len())
        .map_err(|_| CatalogError::Allocation)?;

    ids.extend(default.iter().map(|name| ProfileId::new(name.as_ref())));

    // Vendor names are unique among themselves, compare with defaults only.
    let baseline = ids.len();
    for name in vendor {
        let name = name.as_ref();
        if ids[..baseline].iter().any(|id| id.as_str() == name) {
            debug!(profile = name, "Vendor profile is shadowed by a default profile");
            continue;
        }
        ids.push(ProfileId::new(name));
    }

    ids.extend(custom.iter().map(|name| ProfileId::custom(name.as_ref())));

    ids.sort();
    Ok(ids)
}

/// Read the three profile directories and merge them
pub fn merge_catalog<P: FsProbe>(
    probe: &P,
    default_dir: impl AsRef<Path>,
    vendor_dir: impl AsRef<Path>,
    custom_dir: impl AsRef<Path>,
) -> Result<Vec<ProfileId>, CatalogError> {
    let default = ProfileDirectory::read(probe, default_dir)?;
    let vendor = ProfileDirectory::read(probe, vendor_dir)?;
    let custom = ProfileDirectory::read(probe, custom_dir)?;

    merge_profiles(default.profiles(), vendor.profiles(), custom.profiles())
}
