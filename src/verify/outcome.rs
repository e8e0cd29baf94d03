//! Results of a verification pass

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::profile::Selection;

/// What is wrong with one artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Missing,
    Unreadable,
    UnexpectedContent,
    WrongType,
    WrongMode,
    WrongOwner,
    WrongGroup,
    WrongTarget,
    NotCreatedByTool,
    StillPresent,
    LeftoverLink,
    Conflict,
}

/// Human-readable report about one failing artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl AsRef<Path>, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.path.display(), self.message)
    }
}

/// Outcome of checking one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactCheck {
    Valid,
    Invalid(Diagnostic),
    /// The artifact is not ours to judge, e.g. an unrelated file where a
    /// leftover link could have been
    NotApplicable,
}

impl ArtifactCheck {
    pub fn invalid(
        path: impl AsRef<Path>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self::Invalid(Diagnostic::new(path, kind, message))
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

/// AND-aggregated result of a verification pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            valid: true,
            diagnostics: Vec::new(),
        }
    }
}

impl Verification {
    pub fn record(&mut self, check: ArtifactCheck) {
        if let ArtifactCheck::Invalid(diagnostic) = check {
            self.valid = false;
            self.diagnostics.push(diagnostic);
        }
    }
}

/// What a full verification run found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ConfigurationState {
    /// No profile is recorded as active; the leftover check ran instead
    NotConfigured { leftovers: Verification },

    /// A profile is active and its artifacts were checked
    Configured {
        selection: Selection,
        verification: Verification,
    },
}

impl ConfigurationState {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }

    pub fn is_valid(&self) -> bool {
        self.verification().valid
    }

    pub fn verification(&self) -> &Verification {
        match self {
            Self::NotConfigured { leftovers } => leftovers,
            Self::Configured { verification, .. } => verification,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.verification().diagnostics
    }
}

/// OR-aggregated result of the pre-install conflict check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    pub conflicts_exist: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConflictReport {
    pub fn record(&mut self, diagnostic: Diagnostic) {
        self.conflicts_exist = true;
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_aggregates_with_and() {
        let mut result = Verification::default();
        result.record(ArtifactCheck::Valid);
        result.record(ArtifactCheck::NotApplicable);
        assert!(result.valid);

        result.record(ArtifactCheck::invalid("/etc/a", DiagnosticKind::Missing, "does not exist"));
        result.record(ArtifactCheck::Valid);
        assert!(!result.valid);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].to_string(), "[/etc/a] does not exist");
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let state = ConfigurationState::NotConfigured {
            leftovers: Verification::default(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "not-configured");
        assert_eq!(json["leftovers"]["valid"], true);
    }
}
