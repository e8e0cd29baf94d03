//! Configuration parsing for authprofile.toml
//!
//! Every setting has a default, so the file is optional. Values are applied
//! in order: file, then `AUTHPROFILE_*` environment variables, then command
//! line flags.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use authprofile::layout::{FileExpectations, Layout, GENERATED_MODE};
use authprofile::verify::LinkMatch;

use crate::error::{CliError, Result};

/// Environment variable overriding `paths.root`
pub const ENV_ROOT: &str = "AUTHPROFILE_ROOT";

/// Environment variable overriding `verify.link_match`
pub const ENV_LINK_MATCH: &str = "AUTHPROFILE_LINK_MATCH";

/// Root configuration structure for authprofile.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthProfileConfig {
    /// Filesystem locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Verification behavior
    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Prefix for every managed path
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Distribution profiles (defaults to `<root>/usr/share/authselect/default`)
    #[serde(default)]
    pub default_profiles: Option<PathBuf>,

    /// Vendor profiles (defaults to `<root>/usr/share/authselect/vendor`)
    #[serde(default)]
    pub vendor_profiles: Option<PathBuf>,

    /// Locally authored profiles (defaults to `<root>/etc/authselect/custom`)
    #[serde(default)]
    pub custom_profiles: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            default_profiles: None,
            vendor_profiles: None,
            custom_profiles: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("/")
}

/// Verification behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyConfig {
    /// Link target comparison: "exact" or "prefix"
    #[serde(default)]
    pub link_match: LinkMatch,

    /// Expected permission bits of generated files, as an octal string
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Expected owner uid of generated files
    #[serde(default)]
    pub owner: u32,

    /// Expected group gid of generated files
    #[serde(default)]
    pub group: u32,

    /// Accept generated files with any owner and group
    #[serde(default)]
    pub ignore_ownership: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            link_match: LinkMatch::default(),
            mode: default_mode(),
            owner: 0,
            group: 0,
            ignore_ownership: false,
        }
    }
}

fn default_mode() -> String {
    format!("{:04o}", GENERATED_MODE)
}

impl AuthProfileConfig {
    /// Load configuration from a file path
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| CliError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_str(&content, path)
    }

    /// Parse configuration from a string
    pub fn from_str(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| CliError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, defaults otherwise
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading configuration");
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply `AUTHPROFILE_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var(ENV_ROOT).ok(),
            std::env::var(ENV_LINK_MATCH).ok(),
        )
    }

    fn apply_overrides(&mut self, root: Option<String>, link_match: Option<String>) -> Result<()> {
        if let Some(root) = root.filter(|r| !r.is_empty()) {
            self.paths.root = PathBuf::from(root);
        }

        if let Some(mode) = link_match.filter(|m| !m.is_empty()) {
            self.verify.link_match = mode
                .parse()
                .map_err(|message| CliError::invalid(ENV_LINK_MATCH, message))?;
        }

        Ok(())
    }

    /// Parsed permission bits for generated files
    pub fn file_mode(&self) -> Result<u32> {
        let raw = self.verify.mode.trim_start_matches("0o");
        let mode = u32::from_str_radix(raw, 8)
            .map_err(|e| CliError::invalid("verify.mode", e.to_string()))?;
        if mode > 0o7777 {
            return Err(CliError::invalid(
                "verify.mode",
                format!("{} is not a permission mode", self.verify.mode),
            ));
        }
        Ok(mode)
    }

    /// Build the filesystem layout described by this configuration
    pub fn layout(&self) -> Result<Layout> {
        let expectations = if self.verify.ignore_ownership {
            FileExpectations {
                mode: self.file_mode()?,
                owner: None,
                group: None,
            }
        } else {
            FileExpectations {
                mode: self.file_mode()?,
                owner: Some(self.verify.owner),
                group: Some(self.verify.group),
            }
        };

        let mut layout = Layout::new(&self.paths.root).with_expectations(expectations);
        if let Some(dir) = &self.paths.default_profiles {
            layout = layout.with_default_profiles(dir);
        }
        if let Some(dir) = &self.paths.vendor_profiles {
            layout = layout.with_vendor_profiles(dir);
        }
        if let Some(dir) = &self.paths.custom_profiles {
            layout = layout.with_custom_profiles(dir);
        }

        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_config() {
        let config = AuthProfileConfig::from_str("", Path::new("test.toml")).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/"));
        assert_eq!(config.verify.link_match, LinkMatch::Exact);
        assert_eq!(config.file_mode().unwrap(), 0o644);

        let layout = config.layout().unwrap();
        assert_eq!(layout.expectations(), FileExpectations::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[paths]
root = "/mnt/sysimage"
vendor_profiles = "/opt/vendor/profiles"

[verify]
link_match = "prefix"
mode = "0640"
group = 42
"#;

        let config = AuthProfileConfig::from_str(toml, Path::new("test.toml")).unwrap();
        assert_eq!(config.verify.link_match, LinkMatch::Prefix);

        let layout = config.layout().unwrap();
        assert_eq!(layout.root(), Path::new("/mnt/sysimage"));
        assert_eq!(layout.vendor_profiles(), Path::new("/opt/vendor/profiles"));
        assert_eq!(
            layout.default_profiles(),
            Path::new("/mnt/sysimage/usr/share/authselect/default")
        );
        assert_eq!(
            layout.expectations(),
            FileExpectations {
                mode: 0o640,
                owner: Some(0),
                group: Some(42),
            }
        );
    }

    #[test]
    fn test_ignore_ownership() {
        let toml = "[verify]\nignore_ownership = true\n";
        let config = AuthProfileConfig::from_str(toml, Path::new("test.toml")).unwrap();
        let expectations = config.layout().unwrap().expectations();
        assert_eq!(expectations.owner, None);
        assert_eq!(expectations.group, None);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let toml = "[verify]\nlink_mode = \"exact\"\n";
        assert!(matches!(
            AuthProfileConfig::from_str(toml, Path::new("test.toml")),
            Err(CliError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_invalid_mode() {
        let mut config = AuthProfileConfig::default();
        config.verify.mode = "rw-r--r--".to_string();
        assert!(config.layout().is_err());

        config.verify.mode = "17777".to_string();
        assert!(config.file_mode().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = AuthProfileConfig::default();
        config
            .apply_overrides(Some("/srv/chroot".to_string()), Some("prefix".to_string()))
            .unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/srv/chroot"));
        assert_eq!(config.verify.link_match, LinkMatch::Prefix);

        assert!(config
            .apply_overrides(None, Some("sometimes".to_string()))
            .is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AuthProfileConfig::load(&dir.path().join("authprofile.toml")).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/"));
    }
}
