//! # Team Organizer Core
//!
//! This crate reconciles a GitHub organization against a declared desired state: teams
//! and their members, the teams that hold each role on a repository, repository settings
//! and branch protection.
//!
//! ## Overview
//!
//! A run goes through fixed phases:
//! 1. Every team is created or updated and its maintainers and members are synchronized
//! 2. Projects are expanded into repositories and their role teams merged in
//! 3. Every repository has its settings, collaborators, roles and protection reconciled
//! 4. Organization repositories absent from the desired state are reported
//!
//! In [`RunMode::DryRun`] the engine reads live state and reports what it would change.
//! Only [`RunMode::Apply`] issues writes. Both modes are idempotent: a second run against
//! an unchanged desired state finds nothing to do.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use github_client::{create_token_client, GitHubClient};
//! use team_organizer_core::{
//!     DesiredState, Orchestrator, OrchestratorOptions, ReconcileContext, Repository, RunMode,
//!     Team, UserDirectory,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(GitHubClient::new(create_token_client("token")?));
//!
//! let mut state = DesiredState::builder()
//!     .team(Team::new("platform")?.with_maintainers(["alice"]))
//!     .repository(Repository::new("svc")?.with_push_teams(["platform".to_string()]))
//!     .build()?;
//! state
//!     .resolve_users(client.as_ref(), &mut UserDirectory::new())
//!     .await?;
//!
//! let ctx = ReconcileContext::new(client, "acme", RunMode::DryRun);
//! let report = Orchestrator::new(ctx, OrchestratorOptions::default())
//!     .run(&state)
//!     .await;
//!
//! for name in &report.unmanaged_repositories {
//!     println!("unmanaged: {name}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Failures of a single team or repository are recorded in the [`RunReport`] and do not
//! stop the run. [`OrganizerError::Configuration`] errors are raised before reconciliation
//! starts and must abort it.

pub mod context;
pub mod desired_state;
pub mod errors;
pub mod orchestrator;
pub mod project;
pub mod project_reconciler;
pub mod protection;
pub mod report;
pub mod repository;
pub mod repository_reconciler;
pub mod team;
pub mod team_reconciler;

#[cfg(test)]
mod test_support;

pub use context::{ReconcileContext, RunMode, TeamDirectory};
pub use desired_state::{DesiredState, DesiredStateBuilder, UserDirectory};
pub use errors::{ConfigurationError, OrganizerError, OrganizerResult, ValidationError};
pub use orchestrator::{Orchestrator, OrchestratorOptions};
pub use project::{Project, ProjectRole, RepositoryRef};
pub use project_reconciler::ProjectReconciler;
pub use protection::{ProtectionOverride, ProtectionSpec, JENKINS_STATUS_CONTEXTS};
pub use report::{EntityFailure, EntityKind, ReconcileStats, RunReport};
pub use repository::{AutoCicdMode, Repository, RepositoryDefaults, Role, RoleBindings};
pub use repository_reconciler::RepositoryReconciler;
pub use team::{Team, UserRef};
pub use team_reconciler::TeamReconciler;

pub use tokio_util::sync::CancellationToken;
