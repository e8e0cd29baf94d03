//! Active-profile loading
//!
//! A [`ProfileLoader`] tells the verifier which profile is recorded as active
//! and what that profile is expected to have produced on disk.
//! [`DirectoryLoader`] reads both from the layout's directories.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::error::{LoaderError, ProbeError};
use crate::layout::Layout;
use crate::probe::FsProbe;
use crate::profile::{CompiledProfile, ProfileId, Selection};

/// Source of the active selection and of compiled profiles
pub trait ProfileLoader {
    /// The profile recorded as active, or `None` when nothing is recorded
    fn active_selection(&self) -> Result<Option<Selection>, LoaderError>;

    /// Expected generated files and links for `profile` with `features`
    fn compile(
        &self,
        profile: &ProfileId,
        features: &[String],
    ) -> Result<CompiledProfile, LoaderError>;
}

/// Parse the content of a selection record
///
/// Blank lines and `#` comments are skipped. The first remaining line names
/// the profile, every further line is a feature.
pub fn parse_selection(content: &str) -> Option<Selection> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));

    let profile = ProfileId::new(lines.next()?);
    let features = lines.map(str::to_string).collect();

    Some(Selection { profile, features })
}

/// Loader reading profiles from the default, vendor and custom directories
///
/// Profile files are taken verbatim as expected bodies. Features are carried
/// on the compiled profile but do not change its content.
#[derive(Debug)]
pub struct DirectoryLoader<'a, P: FsProbe> {
    probe: &'a P,
    layout: &'a Layout,
}

impl<'a, P: FsProbe> DirectoryLoader<'a, P> {
    pub fn new(probe: &'a P, layout: &'a Layout) -> Self {
        Self { probe, layout }
    }

    /// Directory holding `profile`
    ///
    /// Custom identifiers resolve in the custom directory. Plain ones are
    /// looked up in the vendor directory first, so vendor content replaces a
    /// default profile of the same name.
    pub fn locate(&self, profile: &ProfileId) -> Result<PathBuf, LoaderError> {
        let name = profile.name();
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(LoaderError::InvalidProfileId {
                profile: profile.to_string(),
            });
        }

        let candidates = if profile.is_custom() {
            vec![self.layout.custom_profiles().join(name)]
        } else {
            vec![
                self.layout.vendor_profiles().join(name),
                self.layout.default_profiles().join(name),
            ]
        };

        for candidate in &candidates {
            if self.probe.exists(candidate)? {
                debug!(profile = %profile, path = %candidate.display(), "Located profile");
                return Ok(candidate.clone());
            }
        }

        Err(LoaderError::ProfileNotFound {
            profile: profile.to_string(),
            searched: candidates,
        })
    }
}

impl<P: FsProbe> ProfileLoader for DirectoryLoader<'_, P> {
    fn active_selection(&self) -> Result<Option<Selection>, LoaderError> {
        let path = self.layout.selection_file();

        let raw = match self.probe.read_file(&path) {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => {
                info!(path = %path.display(), "No selection record found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8(raw).map_err(|e| LoaderError::CorruptSelection {
            path: path.clone(),
            message: e.to_string(),
        })?;

        parse_selection(&content)
            .map(Some)
            .ok_or_else(|| LoaderError::CorruptSelection {
                path,
                message: "no profile identifier".to_string(),
            })
    }

    fn compile(
        &self,
        profile: &ProfileId,
        features: &[String],
    ) -> Result<CompiledProfile, LoaderError> {
        let dir = self.locate(profile)?;

        let mut files = Vec::with_capacity(self.layout.entries().len());
        for entry in self.layout.entries() {
            let source = dir.join(entry.file);
            let body = match self.probe.read_file(&source) {
                Ok(raw) => Some(String::from_utf8(raw).map_err(|e| LoaderError::InvalidProfile {
                    profile: profile.to_string(),
                    message: format!("{} is not valid UTF-8: {}", source.display(), e),
                })?),
                Err(ProbeError::NotFound { .. }) => {
                    debug!(path = %source.display(), "Profile does not provide this file");
                    None
                }
                Err(e) => return Err(e.into()),
            };
            files.push(self.layout.file_spec(entry, body));
        }

        let compiled = CompiledProfile {
            profile: profile.clone(),
            features: features.to_vec(),
            files,
            symlinks: self.layout.symlinks(),
        };
        compiled.validate()?;

        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryProbe;

    #[test]
    fn test_parse_selection_skips_comments() {
        let content =
            "# Generated by authprofile\n\n  sssd  \nwith-mkhomedir\n# note\nwith-faillock\n";
        let selection = parse_selection(content).unwrap();
        assert_eq!(selection.profile, ProfileId::new("sssd"));
        assert_eq!(selection.features, vec!["with-mkhomedir", "with-faillock"]);
    }

    #[test]
    fn test_parse_selection_without_profile() {
        assert!(parse_selection("# only a comment\n\n").is_none());
    }

    #[test]
    fn test_missing_record_means_not_configured() {
        let probe = MemoryProbe::new();
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);
        assert!(loader.active_selection().unwrap().is_none());
    }

    #[test]
    fn test_empty_record_is_corrupt() {
        let probe = MemoryProbe::new().with_file("/etc/authselect/authselect.conf", "\n");
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);
        assert!(matches!(
            loader.active_selection(),
            Err(LoaderError::CorruptSelection { .. })
        ));
    }

    #[test]
    fn test_unreadable_record_is_an_error() {
        let probe = MemoryProbe::new()
            .with_file("/etc/authselect/authselect.conf", "sssd\n")
            .with_permission_denied("/etc/authselect/authselect.conf");
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);
        assert!(matches!(loader.active_selection(), Err(LoaderError::Read(_))));
    }

    #[test]
    fn test_vendor_profile_replaces_default() {
        let probe = MemoryProbe::new()
            .with_file("/usr/share/authselect/default/sssd/system-auth", "default\n")
            .with_file("/usr/share/authselect/vendor/sssd/system-auth", "vendor\n");
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);

        let compiled = loader.compile(&ProfileId::new("sssd"), &[]).unwrap();
        let system_auth = &compiled.files[0];
        assert_eq!(system_auth.path, PathBuf::from("/etc/authselect/system-auth"));
        assert_eq!(system_auth.body.as_deref(), Some("vendor\n"));
        assert!(compiled.files[1].body.is_none());
        assert_eq!(compiled.symlinks.len(), compiled.files.len());
    }

    #[test]
    fn test_custom_profile_resolves_in_custom_dir() {
        let probe = MemoryProbe::new()
            .with_file("/etc/authselect/custom/mine/nsswitch.conf", "passwd: files\n");
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);

        let features = vec!["with-sudo".to_string()];
        let compiled = loader.compile(&ProfileId::custom("mine"), &features).unwrap();
        assert_eq!(compiled.features, features);
        assert!(compiled
            .files
            .iter()
            .any(|f| f.body.as_deref() == Some("passwd: files\n")));
    }

    #[test]
    fn test_unknown_profile() {
        let probe = MemoryProbe::new();
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);

        match loader.compile(&ProfileId::new("nis"), &[]) {
            Err(LoaderError::ProfileNotFound { searched, .. }) => assert_eq!(searched.len(), 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_path_traversal() {
        let probe = MemoryProbe::new();
        let layout = Layout::default();
        let loader = DirectoryLoader::new(&probe, &layout);

        assert!(matches!(
            loader.compile(&ProfileId::custom("../../etc"), &[]),
            Err(LoaderError::InvalidProfileId { .. })
        ));
    }
}
