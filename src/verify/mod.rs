//! Configuration state verification
//!
//! Compares what is installed on disk with what the active profile should
//! have produced. When no profile is active it checks instead that nothing
//! the tool would have created is left behind.
//!
//! # Error model
//!
//! A missing, unreadable or modified artifact is a [`Diagnostic`]: the scan
//! records it and moves on so that one run lists every problem. Any other
//! operating system failure is a [`VerifyError`] that aborts the run.
//!
//! # Usage
//!
//! ```ignore
//! use authprofile::layout::Layout;
//! use authprofile::loader::DirectoryLoader;
//! use authprofile::probe::SystemProbe;
//! use authprofile::verify::Verifier;
//!
//! let probe = SystemProbe::new();
//! let layout = Layout::default();
//! let loader = DirectoryLoader::new(&probe, &layout);
//!
//! let state = Verifier::new(&probe).verify_active_configuration(&loader, &layout)?;
//! for diagnostic in state.diagnostics() {
//!     eprintln!("{}", diagnostic);
//! }
//! ```

mod content;
mod outcome;

pub use content::{has_expected_content, strip_preamble};
pub use outcome::{
    ArtifactCheck, ConfigurationState, ConflictReport, Diagnostic, DiagnosticKind, Verification,
};

use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProbeError, VerifyError};
use crate::layout::Layout;
use crate::loader::ProfileLoader;
use crate::probe::{FileKind, FsProbe};
use crate::profile::{CompiledProfile, GeneratedFileSpec, SymlinkSpec};

/// Result type alias for verification runs
pub type Result<T> = std::result::Result<T, VerifyError>;

/// How a link target is compared with the expected destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkMatch {
    /// The target must equal the destination
    #[default]
    Exact,

    /// Compatibility mode: the destination is truncated to the length of the
    /// actual target before comparing, so a target that is a prefix of the
    /// destination (including an empty one) matches
    Prefix,
}

impl LinkMatch {
    pub fn matches(self, actual: &Path, expected: &Path) -> bool {
        let actual = actual.as_os_str().as_bytes();
        let expected = expected.as_os_str().as_bytes();
        match self {
            Self::Exact => actual == expected,
            Self::Prefix => expected.starts_with(actual),
        }
    }
}

impl FromStr for LinkMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "prefix" | "legacy" => Ok(Self::Prefix),
            other => Err(format!(
                "unknown link match mode '{}', expected 'exact' or 'prefix'",
                other
            )),
        }
    }
}

impl fmt::Display for LinkMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => f.write_str("exact"),
            Self::Prefix => f.write_str("prefix"),
        }
    }
}

/// Read-only checker for generated files and symbolic links
#[derive(Debug, Clone)]
pub struct Verifier<'a, P: FsProbe> {
    probe: &'a P,
    link_match: LinkMatch,
}

impl<'a, P: FsProbe> Verifier<'a, P> {
    pub fn new(probe: &'a P) -> Self {
        Self {
            probe,
            link_match: LinkMatch::default(),
        }
    }

    pub fn with_link_match(mut self, link_match: LinkMatch) -> Self {
        self.link_match = link_match;
        self
    }

    /// Verify the host against whatever profile is recorded as active
    pub fn verify_active_configuration<L: ProfileLoader>(
        &self,
        loader: &L,
        layout: &Layout,
    ) -> Result<ConfigurationState> {
        let Some(selection) = loader.active_selection()? else {
            info!("No profile is recorded as active, checking for leftovers");
            let leftovers = self.check_leftovers(layout)?;
            return Ok(ConfigurationState::NotConfigured { leftovers });
        };

        info!(
            profile = %selection.profile,
            features = ?selection.features,
            "Verifying active profile"
        );

        let compiled = loader.compile(&selection.profile, &selection.features)?;
        let verification = self.verify_profile(&compiled)?;

        Ok(ConfigurationState::Configured {
            selection,
            verification,
        })
    }

    /// Check every generated file and symbolic link of a compiled profile
    pub fn verify_profile(&self, profile: &CompiledProfile) -> Result<Verification> {
        let mut result = Verification::default();

        for spec in &profile.files {
            let check = self.check_generated_file(spec)?;
            if !check.is_valid() {
                warn!(path = %spec.path.display(), "File was modified outside authprofile");
            }
            result.record(check);
        }

        for spec in &profile.symlinks {
            result.record(self.check_symlink(spec)?);
        }

        Ok(result)
    }

    /// Check content, type, permissions and ownership of one generated file
    pub fn check_generated_file(&self, spec: &GeneratedFileSpec) -> Result<ArtifactCheck> {
        debug!(path = %spec.path.display(), "Checking generated file");

        let content = match self.probe.read_file(&spec.path) {
            Ok(content) => content,
            Err(ProbeError::NotFound { .. }) => {
                info!(path = %spec.path.display(), "Generated file does not exist");
                return Ok(ArtifactCheck::invalid(
                    &spec.path,
                    DiagnosticKind::Missing,
                    "does not exist",
                ));
            }
            Err(e @ ProbeError::PermissionDenied { .. }) => {
                info!(path = %spec.path.display(), error = %e, "Unable to read generated file");
                return Ok(ArtifactCheck::invalid(
                    &spec.path,
                    DiagnosticKind::Unreadable,
                    format!("unable to read: {}", e),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if !has_expected_content(&content, spec.expected_body().as_bytes()) {
            info!(path = %spec.path.display(), "Generated file has unexpected content");
            return Ok(ArtifactCheck::invalid(
                &spec.path,
                DiagnosticKind::UnexpectedContent,
                "has unexpected content",
            ));
        }

        self.check_file_metadata(spec)
    }

    fn check_file_metadata(&self, spec: &GeneratedFileSpec) -> Result<ArtifactCheck> {
        let path = &spec.path;
        let meta = match self.probe.metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => {
                return Ok(ArtifactCheck::invalid(path, DiagnosticKind::Missing, "does not exist"));
            }
            Err(e) => return Err(e.into()),
        };

        if meta.kind != FileKind::Regular {
            return Ok(ArtifactCheck::invalid(
                path,
                DiagnosticKind::WrongType,
                "is not a regular file",
            ));
        }

        if meta.mode != spec.mode {
            return Ok(ArtifactCheck::invalid(
                path,
                DiagnosticKind::WrongMode,
                format!("has wrong mode [{:04o}], expected [{:04o}]", meta.mode, spec.mode),
            ));
        }

        if let Some(owner) = spec.owner {
            if meta.uid != owner {
                return Ok(ArtifactCheck::invalid(
                    path,
                    DiagnosticKind::WrongOwner,
                    format!("has wrong owner [{}], expected [{}]", meta.uid, owner),
                ));
            }
        }

        if let Some(group) = spec.group {
            if meta.gid != group {
                return Ok(ArtifactCheck::invalid(
                    path,
                    DiagnosticKind::WrongGroup,
                    format!("has wrong group [{}], expected [{}]", meta.gid, group),
                ));
            }
        }

        Ok(ArtifactCheck::Valid)
    }

    /// Check that a symbolic link exists and points at its generated file
    pub fn check_symlink(&self, spec: &SymlinkSpec) -> Result<ArtifactCheck> {
        debug!(link = %spec.link.display(), "Checking link");

        let meta = match self.probe.metadata(&spec.link) {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => {
                info!(link = %spec.link.display(), "Link was not created by authprofile");
                return Ok(ArtifactCheck::invalid(
                    &spec.link,
                    DiagnosticKind::NotCreatedByTool,
                    "was not created by authprofile",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        if meta.kind != FileKind::Symlink {
            info!(link = %spec.link.display(), "Not a symbolic link");
            return Ok(ArtifactCheck::invalid(
                &spec.link,
                DiagnosticKind::WrongType,
                "is not a symbolic link",
            ));
        }

        let target = self.probe.read_link(&spec.link)?;
        if !self.link_match.matches(&target, &spec.destination) {
            info!(
                link = %spec.link.display(),
                target = %target.display(),
                expected = %spec.destination.display(),
                "Link points elsewhere"
            );
            return Ok(ArtifactCheck::invalid(
                &spec.link,
                DiagnosticKind::WrongTarget,
                format!("does not point to [{}]", spec.destination.display()),
            ));
        }

        Ok(ArtifactCheck::Valid)
    }

    /// Check that nothing the tool creates is left on disk
    ///
    /// Every generated file path must be absent. A link path may hold
    /// anything except a symbolic link to the generated file.
    pub fn check_leftovers(&self, layout: &Layout) -> Result<Verification> {
        let mut result = Verification::default();

        for path in layout.generated_paths() {
            if self.probe.exists(&path)? {
                info!(path = %path.display(), "Generated file is still present");
                result.record(ArtifactCheck::invalid(
                    &path,
                    DiagnosticKind::StillPresent,
                    "is still present",
                ));
            }
        }

        for spec in layout.symlinks() {
            if !self.probe.exists(&spec.link)? {
                continue;
            }
            result.record(self.check_not_tool_link(&spec)?);
        }

        Ok(result)
    }

    fn check_not_tool_link(&self, spec: &SymlinkSpec) -> Result<ArtifactCheck> {
        debug!(link = %spec.link.display(), "Checking that path is not an authprofile link");

        let meta = match self.probe.metadata(&spec.link) {
            Ok(meta) => meta,
            Err(e) if e.is_not_found() => return Ok(ArtifactCheck::Valid),
            Err(e) => return Err(e.into()),
        };

        if meta.kind != FileKind::Symlink {
            return Ok(ArtifactCheck::NotApplicable);
        }

        let target = self.probe.read_link(&spec.link)?;
        if self.link_match.matches(&target, &spec.destination) {
            info!(
                link = %spec.link.display(),
                target = %spec.destination.display(),
                "Symbolic link still exists"
            );
            return Ok(ArtifactCheck::invalid(
                &spec.link,
                DiagnosticKind::LeftoverLink,
                format!("symbolic link to [{}] still exists", spec.destination.display()),
            ));
        }

        Ok(ArtifactCheck::NotApplicable)
    }

    /// Report every link path that is already occupied
    ///
    /// Anything at the path counts, including a dangling symbolic link.
    pub fn check_install_conflicts(&self, symlinks: &[SymlinkSpec]) -> Result<ConflictReport> {
        let mut report = ConflictReport::default();

        for spec in symlinks {
            match self.probe.metadata(&spec.link) {
                Ok(_) => {
                    info!(
                        path = %spec.link.display(),
                        "File exists but it needs to be overwritten"
                    );
                    report.record(Diagnostic::new(
                        &spec.link,
                        DiagnosticKind::Conflict,
                        "exists but it needs to be overwritten",
                    ));
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }
}
