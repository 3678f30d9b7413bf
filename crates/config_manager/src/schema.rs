//! TOML file schema.
//!
//! These types mirror the configuration file one to one. They carry no behaviour beyond
//! deserialization; [`crate::loader`] turns them into a desired state. Unknown keys are
//! rejected everywhere so that a misspelled setting is reported instead of ignored.
//!
//! # TOML Format
//!
//! ```toml
//! organization = "acme"
//!
//! [protection_defaults]
//! required_approving_review_count = 1
//!
//! [[teams]]
//! name = "platform-core"
//! description = "Platform core"
//! privacy = "closed"
//! maintainers = ["alice"]
//! members = ["bob"]
//!
//! [[repositories]]
//! name = "svc"
//! admin_teams = ["ops"]
//! master_teams = ["platform-core"]
//! precreated_branches = ["develop"]
//! auto_cicd_mode = "jenkins"
//! [repositories.protection.develop]
//! required_approving_review_count = 1
//!
//! [[projects]]
//! name = "platform"
//! repositories = ["api", { name = "web", pull_teams = ["qa"] }]
//! master_team_members = ["alice"]
//! ```

use std::collections::BTreeMap;

use github_client::TeamPrivacy;
use serde::Deserialize;
use team_organizer_core::{AutoCicdMode, ProtectionOverride};

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrganizerConfig {
    /// Organization to reconcile. The command line and environment take precedence.
    pub organization: Option<String>,

    /// Protection settings layered under every per-pattern override
    #[serde(default)]
    pub protection_defaults: ProtectionOverride,

    #[serde(default)]
    pub teams: Vec<TeamEntry>,

    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,

    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

/// A `[[teams]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TeamEntry {
    pub name: String,
    pub description: Option<String>,
    pub privacy: Option<TeamPrivacy>,
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// A `[[repositories]]` entry, or an inline repository table of a project.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryEntry {
    pub name: String,
    #[serde(default)]
    pub admin_teams: Vec<String>,
    #[serde(default)]
    pub master_teams: Vec<String>,
    #[serde(default)]
    pub push_teams: Vec<String>,
    #[serde(default)]
    pub pull_teams: Vec<String>,
    #[serde(default)]
    pub triage_teams: Vec<String>,
    #[serde(default)]
    pub precreated_branches: Vec<String>,
    pub default_branch: Option<String>,
    pub master_branch: Option<String>,
    pub auto_cicd_mode: Option<AutoCicdMode>,
    /// Protection overrides keyed by branch pattern
    #[serde(default)]
    pub protection: BTreeMap<String, ProtectionOverride>,
}

/// Settings applied to repositories a project lists by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryDefaultsEntry {
    #[serde(default)]
    pub admin_teams: Vec<String>,
    #[serde(default)]
    pub master_teams: Vec<String>,
    #[serde(default)]
    pub push_teams: Vec<String>,
    #[serde(default)]
    pub pull_teams: Vec<String>,
    #[serde(default)]
    pub triage_teams: Vec<String>,
    #[serde(default)]
    pub precreated_branches: Vec<String>,
    pub default_branch: Option<String>,
    pub master_branch: Option<String>,
    pub auto_cicd_mode: Option<AutoCicdMode>,
    #[serde(default)]
    pub protection: BTreeMap<String, ProtectionOverride>,
}

/// A repository listed by a project: either a bare name or a full table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProjectRepositoryEntry {
    Name(String),
    Table(RepositoryEntry),
}

/// A `[[projects]]` entry. Subprojects use the same shape.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectEntry {
    pub name: String,
    #[serde(default)]
    pub repositories: Vec<ProjectRepositoryEntry>,
    #[serde(default)]
    pub repository_defaults: RepositoryDefaultsEntry,
    #[serde(default)]
    pub master_teams: Vec<String>,
    #[serde(default)]
    pub developer_teams: Vec<String>,
    #[serde(default)]
    pub qa_teams: Vec<String>,
    #[serde(default)]
    pub master_team_members: Vec<String>,
    #[serde(default)]
    pub developer_team_members: Vec<String>,
    #[serde(default)]
    pub qa_team_members: Vec<String>,
    #[serde(default)]
    pub subprojects: Vec<ProjectEntry>,
}
