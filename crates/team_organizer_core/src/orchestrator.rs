//! Top-level reconciliation loop.
//!
//! A run reconciles every team, then every repository (project repositories first, then
//! standalone ones), and finally lists the organization's repositories that the desired
//! state does not mention. A failing entity is recorded in the [`RunReport`] and the run
//! moves on to the next one.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::context::{ReconcileContext, TeamDirectory};
use crate::desired_state::DesiredState;
use crate::errors::{OrganizerError, OrganizerResult};
use crate::project::Project;
use crate::project_reconciler::ProjectReconciler;
use crate::report::{EntityKind, ReconcileStats, RunReport};
use crate::repository::Repository;
use crate::repository_reconciler::RepositoryReconciler;
use crate::team_reconciler::TeamReconciler;

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

/// Tuning knobs of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Number of repositories reconciled at the same time. Values below 1 are treated as 1.
    pub max_concurrent_repositories: usize,

    /// Whether repositories of subprojects are reconciled too.
    pub walk_subprojects: bool,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_concurrent_repositories: 1,
            walk_subprojects: false,
        }
    }
}

/// Drives a full reconciliation run.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use team_organizer_core::{
///     DesiredState, Orchestrator, OrchestratorOptions, ReconcileContext, RunMode,
/// };
///
/// # async fn example(client: Arc<dyn github_client::OrganizationClient>, state: DesiredState) {
/// let ctx = ReconcileContext::new(client, "acme", RunMode::DryRun);
/// let report = Orchestrator::new(ctx, OrchestratorOptions::default())
///     .run(&state)
///     .await;
///
/// println!("{} changes planned", report.stats.mutations);
/// # }
/// ```
#[derive(Debug)]
pub struct Orchestrator {
    ctx: ReconcileContext,
    options: OrchestratorOptions,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(ctx: ReconcileContext, options: OrchestratorOptions) -> Self {
        Self {
            ctx,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Uses `token` to stop the run between entities.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn context(&self) -> &ReconcileContext {
        &self.ctx
    }

    /// Runs every phase and returns the collected outcome.
    ///
    /// The token is checked before each team and each repository. A cancelled run leaves
    /// applied changes in place and returns a report with `aborted` set.
    #[instrument(
        skip(self, state),
        fields(organization = self.ctx.organization(), mode = %self.ctx.mode())
    )]
    pub async fn run(&self, state: &DesiredState) -> RunReport {
        let mut report = RunReport::new();
        info!(
            teams = state.teams().len(),
            projects = state.projects().len(),
            repositories = state.repositories().len(),
            "Starting reconciliation"
        );

        let Some(mut directory) = self.reconcile_teams(state, &mut report).await else {
            return report;
        };
        if report.aborted {
            return report;
        }

        let (repositories, unexpanded) = self.collect_repositories(state, &mut report);

        let referenced: Vec<String> = repositories
            .iter()
            .flat_map(Repository::referenced_teams)
            .collect();
        if let Err(e) = directory
            .load_referenced(
                self.ctx.client(),
                self.ctx.organization(),
                referenced.iter().map(String::as_str),
            )
            .await
        {
            error!(error = %e, "Failed to look up referenced teams");
            report.record_failure(EntityKind::Organization, self.ctx.organization(), e);
            return report;
        }

        self.reconcile_repositories(&repositories, &directory, state, &mut report)
            .await;
        if report.aborted {
            warn!("Reconciliation aborted, skipping unmanaged repository check");
            return report;
        }

        let managed: HashSet<String> = repositories
            .iter()
            .map(Repository::name)
            .chain(unexpanded.iter().map(String::as_str))
            .map(str::to_ascii_lowercase)
            .collect();
        self.report_unmanaged(&managed, &mut report).await;

        info!(
            teams = report.teams_reconciled,
            repositories = report.repositories_reconciled,
            mutations = report.stats.mutations,
            violations = report.stats.violations,
            failures = report.failures.len(),
            "Reconciliation finished"
        );
        report
    }

    /// Reconciles every team in registration order.
    ///
    /// Returns `None` when the live team list cannot be read.
    async fn reconcile_teams(
        &self,
        state: &DesiredState,
        report: &mut RunReport,
    ) -> Option<TeamDirectory> {
        let live_teams = match self.ctx.client().list_teams(self.ctx.organization()).await {
            Ok(teams) => teams,
            Err(e) => {
                let e = OrganizerError::provider("list teams", e);
                error!(error = %e, "Failed to read organization teams");
                report.record_failure(EntityKind::Organization, self.ctx.organization(), e);
                return None;
            }
        };

        let mut directory = TeamDirectory::new().with_live_teams(live_teams.clone());
        let reconciler = TeamReconciler::new(&self.ctx, &live_teams);

        for team in state.teams() {
            if self.cancel.is_cancelled() {
                warn!(team = team.name(), "Cancelled before team");
                report.aborted = true;
                break;
            }

            let mut stats = ReconcileStats::new();
            let result = reconciler.run(team, &mut directory, &mut stats).await;
            report.stats.merge(stats);
            match result {
                Ok(()) => report.teams_reconciled += 1,
                Err(e) => {
                    error!(team = team.name(), error = %e, "Failed to reconcile team");
                    report.record_failure(EntityKind::Team, team.name(), e);
                }
            }
        }

        Some(directory)
    }

    /// Expands projects and appends the standalone repositories.
    ///
    /// Also returns the repository names declared by projects that failed to expand. Those
    /// repositories are not reconciled, but they are not unmanaged either.
    fn collect_repositories(
        &self,
        state: &DesiredState,
        report: &mut RunReport,
    ) -> (Vec<Repository>, Vec<String>) {
        let expander = ProjectReconciler::new(self.options.walk_subprojects);
        let mut repositories = Vec::new();
        let mut unexpanded = Vec::new();

        for project in state.projects() {
            match expander.expand_tree(project) {
                Ok(expanded) => repositories.extend(expanded),
                Err(e) => {
                    error!(project = project.name(), error = %e, "Failed to expand project");
                    report.record_failure(EntityKind::Project, project.name(), e);
                    self.declared_repositories(project, &mut unexpanded);
                }
            }
        }

        repositories.extend(state.repositories().iter().cloned());
        (repositories, unexpanded)
    }

    fn declared_repositories(&self, project: &Project, names: &mut Vec<String>) {
        names.extend(project.repositories().iter().map(|r| r.name().to_string()));
        if self.options.walk_subprojects {
            for subproject in project.subprojects() {
                self.declared_repositories(subproject, names);
            }
        }
    }

    async fn reconcile_repositories(
        &self,
        repositories: &[Repository],
        directory: &TeamDirectory,
        state: &DesiredState,
        report: &mut RunReport,
    ) {
        let ctx = &self.ctx;
        let cancel = &self.cancel;
        let defaults = state.protection_defaults();

        let outcomes: Vec<(&Repository, ReconcileStats, OrganizerResult<()>)> =
            stream::iter(repositories)
                .map(move |repository| async move {
                    let mut stats = ReconcileStats::new();
                    if cancel.is_cancelled() {
                        return (repository, stats, Err(OrganizerError::Aborted));
                    }
                    let result = RepositoryReconciler::new(ctx, directory, defaults)
                        .run(repository, &mut stats)
                        .await;
                    (repository, stats, result)
                })
                .buffer_unordered(self.options.max_concurrent_repositories.max(1))
                .collect()
                .await;

        for (repository, stats, result) in outcomes {
            report.stats.merge(stats);
            match result {
                Ok(()) => report.repositories_reconciled += 1,
                Err(OrganizerError::Aborted) => {
                    warn!(repository = repository.name(), "Cancelled before repository");
                    report.aborted = true;
                }
                Err(e @ OrganizerError::MasterBranchMissing { .. }) => {
                    warn!(
                        repository = repository.name(),
                        error = %e,
                        "Skipped branch protection"
                    );
                    report.record_failure(EntityKind::Repository, repository.name(), e);
                }
                Err(e) => {
                    error!(
                        repository = repository.name(),
                        error = %e,
                        "Failed to reconcile repository"
                    );
                    report.record_failure(EntityKind::Repository, repository.name(), e);
                }
            }
        }
    }

    /// Lists organization repositories that no project or standalone entry manages.
    ///
    /// `managed` holds lowercase names.
    async fn report_unmanaged(&self, managed: &HashSet<String>, report: &mut RunReport) {
        let live = match self
            .ctx
            .client()
            .list_organization_repositories(self.ctx.organization())
            .await
        {
            Ok(live) => live,
            Err(e) => {
                let e = OrganizerError::provider("list organization repositories", e);
                error!(error = %e, "Failed to list organization repositories");
                report.record_failure(EntityKind::Organization, self.ctx.organization(), e);
                return;
            }
        };

        for repository in live {
            if !managed.contains(&repository.name().to_ascii_lowercase()) {
                warn!(repository = repository.name(), "Repository is not managed");
                report
                    .unmanaged_repositories
                    .push(repository.name().to_string());
            }
        }
    }
}
