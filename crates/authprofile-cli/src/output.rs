//! Output formatting and display utilities
//!
//! Provides colored, formatted output for the CLI

use colored::Colorize;

use authprofile::verify::{ConfigurationState, ConflictReport, Diagnostic, Verification};
use authprofile::{ProfileId, Selection};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

/// Print a header
pub fn header(msg: &str) {
    println!("\n{}", msg.bold().underline());
}

/// Print the available profiles, custom ones marked
pub fn print_catalog(profiles: &[ProfileId]) {
    if profiles.is_empty() {
        warning("No profiles found");
        return;
    }

    for id in profiles {
        if id.is_custom() {
            println!("- {} {}", id.as_str().cyan(), "(custom)".dimmed());
        } else {
            println!("- {}", id);
        }
    }
}

/// Print the recorded selection
pub fn print_selection(selection: Option<&Selection>) {
    match selection {
        None => info("No existing configuration detected"),
        Some(selection) => {
            println!("Profile ID: {}", selection.profile.as_str().bold());
            if selection.features.is_empty() {
                println!("Enabled features: {}", "None".dimmed());
            } else {
                println!("Enabled features:");
                for feature in &selection.features {
                    println!("- {}", feature);
                }
            }
        }
    }
}

/// Print the result of a full verification run
pub fn print_state(state: &ConfigurationState) {
    match state {
        ConfigurationState::Configured {
            selection,
            verification,
        } => {
            header(&format!("Profile: {}", selection.profile));
            if verification.valid {
                success("Current configuration is valid");
            } else {
                error("Current configuration is not valid");
                print_diagnostics(&verification.diagnostics);
            }
        }
        ConfigurationState::NotConfigured { leftovers } => {
            info("No existing configuration detected");
            print_leftovers(leftovers);
        }
    }
}

/// Print the result of a leftover scan
pub fn print_leftovers(leftovers: &Verification) {
    if leftovers.valid {
        success("No leftovers of a previous configuration");
    } else {
        warning(&format!(
            "{} leftover(s) of a previous configuration:",
            leftovers.diagnostics.len()
        ));
        print_diagnostics(&leftovers.diagnostics);
    }
}

/// Print the result of the install conflict check
pub fn print_conflicts(report: &ConflictReport) {
    if report.conflicts_exist {
        warning(&format!(
            "{} file(s) exist and would be overwritten:",
            report.diagnostics.len()
        ));
        print_diagnostics(&report.diagnostics);
    } else {
        success("No conflicting files");
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        println!(
            "  {} {} {}",
            "✗".red(),
            format!("[{}]", diagnostic.path.display()).dimmed(),
            diagnostic.message
        );
    }
}

/// Print a JSON report
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}
