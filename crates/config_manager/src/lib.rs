//! Configuration management for the team organizer
//!
//! The desired state of an organization is declared in a TOML file. This crate parses the
//! file, validates it and builds a [`team_organizer_core::DesiredState`] through the core
//! builder API.
//!
//! # Examples
//!
//! ```rust
//! use config_manager::parse_desired_state;
//!
//! let loaded = parse_desired_state(
//!     r#"
//! [[teams]]
//! name = "platform"
//! maintainers = ["alice"]
//! "#,
//!     "inline",
//! )
//! .unwrap();
//!
//! assert_eq!(loaded.desired_state.teams().len(), 1);
//! ```

pub mod errors;
pub mod loader;
pub mod schema;

pub use errors::{ConfigurationError, ConfigurationResult};
pub use loader::{build_desired_state, load_desired_state, parse_desired_state, LoadedConfiguration};
pub use schema::{
    OrganizerConfig, ProjectEntry, ProjectRepositoryEntry, RepositoryDefaultsEntry,
    RepositoryEntry, TeamEntry,
};
