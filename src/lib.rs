//! # authprofile
//!
//! Inspection of a host's active authentication profile: a named bundle of
//! generated configuration files (PAM stacks, `nsswitch.conf`, dconf
//! settings) and the symbolic links that point system services at them.
//!
//! This crate answers two questions without touching the filesystem:
//!
//! - **Catalog**: which profiles are available, merged from the default,
//!   vendor and custom profile directories ([`catalog`]).
//! - **Verification**: does the host match the active profile, or, when no
//!   profile is active, is it free of leftovers ([`verify`]).
//!
//! ## Quick Start
//!
//! ```ignore
//! use authprofile::catalog::merge_catalog;
//! use authprofile::layout::Layout;
//! use authprofile::loader::DirectoryLoader;
//! use authprofile::probe::SystemProbe;
//! use authprofile::verify::Verifier;
//!
//! let probe = SystemProbe::new();
//! let layout = Layout::default();
//!
//! let profiles = merge_catalog(
//!     &probe,
//!     layout.default_profiles(),
//!     layout.vendor_profiles(),
//!     layout.custom_profiles(),
//! )?;
//!
//! let loader = DirectoryLoader::new(&probe, &layout);
//! let state = Verifier::new(&probe).verify_active_configuration(&loader, &layout)?;
//! println!("valid: {}", state.is_valid());
//! ```

pub mod catalog;
pub mod error;
pub mod layout;
pub mod loader;
pub mod probe;
pub mod profile;
pub mod testing;
pub mod verify;

// Re-exports
pub use catalog::{merge_catalog, merge_profiles, ProfileDirectory};
pub use error::{CatalogError, LoaderError, ProbeError, VerifyError};
pub use layout::{FileExpectations, Layout};
pub use loader::{DirectoryLoader, ProfileLoader};
pub use probe::{FsProbe, SystemProbe};
pub use profile::{CompiledProfile, GeneratedFileSpec, ProfileId, Selection, SymlinkSpec};
pub use verify::{ConfigurationState, ConflictReport, Diagnostic, LinkMatch, Verification, Verifier};
