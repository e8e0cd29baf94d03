//! authprofile CLI - Authentication profile inspection tool
//!
//! Lists the available authentication profiles and verifies that the files
//! and symbolic links of the active profile are intact.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use authprofile::catalog::merge_catalog;
use authprofile::layout::Layout;
use authprofile::loader::{DirectoryLoader, ProfileLoader};
use authprofile::probe::SystemProbe;
use authprofile::verify::{ConfigurationState, LinkMatch, Verifier};

mod config;
mod error;
mod output;

use config::AuthProfileConfig;
use error::{CliError, Result};

/// authprofile - Authentication profile inspection tool
#[derive(Parser)]
#[command(name = "authprofile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to authprofile.toml configuration file
    #[arg(short, long, default_value = "/etc/authprofile.toml", global = true)]
    config: PathBuf,

    /// Inspect a different root directory
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Link target comparison: exact or prefix
    #[arg(long, global = true)]
    link_match: Option<LinkMatch>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the active configuration is intact
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that no artifacts of a removed configuration remain
    Leftovers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report files that installing a profile would overwrite
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active profile and its features
    Current {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = init_tracing(cli.verbose).and_then(|()| run(&cli));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config, cli.root.as_deref(), cli.link_match)?;
    let layout = config.layout()?;
    let link_match = config.verify.link_match;
    let probe = SystemProbe::new();

    match cli.command {
        Commands::List { json } => cmd_list(&probe, &layout, json),
        Commands::Check { json } => cmd_check(&probe, &layout, link_match, json),
        Commands::Leftovers { json } => cmd_leftovers(&probe, &layout, link_match, json),
        Commands::Conflicts { json } => cmd_conflicts(&probe, &layout, json),
        Commands::Current { json } => cmd_current(&probe, &layout, json),
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))
    }
    .map_err(|e| CliError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

fn load_config(
    path: &Path,
    root: Option<&Path>,
    link_match: Option<LinkMatch>,
) -> Result<AuthProfileConfig> {
    let mut config = AuthProfileConfig::load(path)?;
    config.apply_env()?;

    if let Some(root) = root {
        config.paths.root = root.to_path_buf();
    }
    if let Some(link_match) = link_match {
        config.verify.link_match = link_match;
    }

    Ok(config)
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_list(probe: &SystemProbe, layout: &Layout, json: bool) -> Result<()> {
    let profiles = merge_catalog(
        probe,
        layout.default_profiles(),
        layout.vendor_profiles(),
        layout.custom_profiles(),
    )?;

    if json {
        output::print_json(&profiles)?;
    } else {
        output::print_catalog(&profiles);
    }

    Ok(())
}

fn cmd_check(
    probe: &SystemProbe,
    layout: &Layout,
    link_match: LinkMatch,
    json: bool,
) -> Result<()> {
    let loader = DirectoryLoader::new(probe, layout);
    let state = Verifier::new(probe)
        .with_link_match(link_match)
        .verify_active_configuration(&loader, layout)?;

    if json {
        output::print_json(&state)?;
    } else {
        output::print_state(&state);
    }

    match state {
        ConfigurationState::NotConfigured { leftovers } if !leftovers.valid => {
            Err(CliError::LeftoversFound {
                count: leftovers.diagnostics.len(),
            })
        }
        ConfigurationState::NotConfigured { .. } => Ok(()),
        ConfigurationState::Configured { verification, .. } if !verification.valid => {
            Err(CliError::InvalidConfiguration {
                count: verification.diagnostics.len(),
            })
        }
        ConfigurationState::Configured { .. } => Ok(()),
    }
}

fn cmd_leftovers(
    probe: &SystemProbe,
    layout: &Layout,
    link_match: LinkMatch,
    json: bool,
) -> Result<()> {
    let leftovers = Verifier::new(probe)
        .with_link_match(link_match)
        .check_leftovers(layout)?;

    if json {
        output::print_json(&leftovers)?;
    } else {
        output::print_leftovers(&leftovers);
    }

    if leftovers.valid {
        Ok(())
    } else {
        Err(CliError::LeftoversFound {
            count: leftovers.diagnostics.len(),
        })
    }
}

fn cmd_conflicts(probe: &SystemProbe, layout: &Layout, json: bool) -> Result<()> {
    let report = Verifier::new(probe).check_install_conflicts(&layout.symlinks())?;

    if json {
        output::print_json(&report)?;
    } else {
        output::print_conflicts(&report);
    }

    if report.conflicts_exist {
        Err(CliError::ConflictsFound {
            count: report.diagnostics.len(),
        })
    } else {
        Ok(())
    }
}

fn cmd_current(probe: &SystemProbe, layout: &Layout, json: bool) -> Result<()> {
    let selection = DirectoryLoader::new(probe, layout).active_selection()?;

    if json {
        output::print_json(&selection)?;
    } else {
        output::print_selection(selection.as_ref());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "authprofile",
            "check",
            "--json",
            "--root",
            "/mnt/sysimage",
            "--link-match",
            "prefix",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/mnt/sysimage")));
        assert_eq!(cli.link_match, Some(LinkMatch::Prefix));
        assert!(matches!(cli.command, Commands::Check { json: true }));
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("authprofile.toml");
        std::fs::write(&path, "[paths]\nroot = \"/from/file\"\n").unwrap();

        let config =
            load_config(&path, Some(Path::new("/from/flag")), Some(LinkMatch::Prefix)).unwrap();
        assert_eq!(config.paths.root, PathBuf::from("/from/flag"));
        assert_eq!(config.verify.link_match, LinkMatch::Prefix);
    }

    #[test]
    fn test_check_passes_without_profile_on_clean_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());

        assert!(cmd_check(&SystemProbe::new(), &layout, LinkMatch::Exact, true).is_ok());
    }

    #[test]
    fn test_check_fails_without_profile_when_leftovers_remain() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        let generated = layout.generated_paths();
        std::fs::create_dir_all(layout.generated_dir()).unwrap();
        std::fs::write(&generated[0], "leftover\n").unwrap();

        let err = cmd_check(&SystemProbe::new(), &layout, LinkMatch::Exact, true).unwrap_err();
        assert!(matches!(err, CliError::LeftoversFound { count: 1 }));
    }

    #[test]
    fn test_list_empty_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        assert!(cmd_list(&SystemProbe::new(), &layout, true).is_ok());
    }
}
