//! Repository reconciliation.
//!
//! A repository is reconciled in a fixed order: settings, direct collaborators, the four
//! role bindings, and finally branch protection. Protection runs last because its actor
//! lists depend on the final set of master teams.

use github_client::{Branch, RepositorySettingsUpdate, RepositoryTeam};
use tracing::{debug, info, instrument, warn};

use crate::context::{ReconcileContext, TeamDirectory};
use crate::errors::{OrganizerError, OrganizerResult};
use crate::protection::{
    pattern_matches, ProtectionOverride, ProtectionSpec, JENKINS_STATUS_CONTEXTS,
};
use crate::report::ReconcileStats;
use crate::repository::{AutoCicdMode, Repository, Role, MASTER_BRANCH};

#[cfg(test)]
#[path = "repository_reconciler_tests.rs"]
mod tests;

/// Path of the pipeline definition checked in Jenkins mode.
const JENKINSFILE: &str = "Jenkinsfile";

/// Reconciles a single repository.
///
/// Reads are always issued. Writes are issued only in apply mode; in dry-run mode each
/// write is logged and counted instead.
pub struct RepositoryReconciler<'a> {
    ctx: &'a ReconcileContext,
    teams: &'a TeamDirectory,
    protection_defaults: &'a ProtectionOverride,
}

impl<'a> RepositoryReconciler<'a> {
    pub fn new(
        ctx: &'a ReconcileContext,
        teams: &'a TeamDirectory,
        protection_defaults: &'a ProtectionOverride,
    ) -> Self {
        Self {
            ctx,
            teams,
            protection_defaults,
        }
    }

    /// Runs every step for the repository.
    ///
    /// # Errors
    ///
    /// The first failing step stops the repository. `MasterBranchMissing` can only come
    /// from the protection step, which is the last one, so the other steps have already
    /// been applied when it is returned.
    #[instrument(skip(self, repository, stats), fields(repository = repository.name()))]
    pub async fn run(
        &self,
        repository: &Repository,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        info!(repository = repository.name(), mode = %self.ctx.mode(), "Reconciling repository");

        self.update_settings(repository, stats).await?;
        self.clean_direct_collaborators(repository, stats).await?;

        let bindings = repository.role_bindings();
        for role in Role::SYNC_ORDER {
            self.sync_role(repository, role, bindings.teams(role), stats)
                .await?;
        }

        if self.ctx.is_apply() {
            self.reconcile_protection(repository, stats).await?;
        } else {
            debug!(
                repository = repository.name(),
                "Dry run, branch protection is not evaluated"
            );
        }

        Ok(())
    }

    /// Enforces the merge policy, the default branch and the security features.
    ///
    /// Merge commits are allowed; squash and rebase merges are not. The default branch is
    /// only managed when it is configured to something other than `master`.
    pub async fn update_settings(
        &self,
        repository: &Repository,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let owner = self.ctx.organization();
        let name = repository.name();

        let live = client
            .get_repository(owner, name)
            .await
            .map_err(|e| match e {
                github_client::Error::NotFound => {
                    OrganizerError::not_found(format!("Repository '{owner}/{name}'"))
                }
                other => OrganizerError::provider("get repository", other),
            })?;

        let mut update = RepositorySettingsUpdate::default();
        if live.allow_merge_commit() != Some(true) {
            update.allow_merge_commit = Some(true);
        }
        if live.allow_squash_merge() != Some(false) {
            update.allow_squash_merge = Some(false);
        }
        if live.allow_rebase_merge() != Some(false) {
            update.allow_rebase_merge = Some(false);
        }
        if repository.default_branch() != MASTER_BRANCH
            && live.default_branch() != Some(repository.default_branch())
        {
            update.default_branch = Some(repository.default_branch().to_string());
        }

        if !update.is_empty() {
            warn!(repository = name, update = ?update, "Repository settings should be updated");
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .update_repository_settings(owner, name, &update)
                    .await
                    .map_err(|e| OrganizerError::provider("update repository settings", e))?;
                info!(repository = name, "Updated repository settings");
            }
        }

        let alerts = client
            .vulnerability_alerts_enabled(owner, name)
            .await
            .map_err(|e| OrganizerError::provider("check vulnerability alerts", e))?;
        if !alerts {
            warn!(repository = name, "Vulnerability alerts are disabled, enabling");
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .enable_vulnerability_alerts(owner, name)
                    .await
                    .map_err(|e| OrganizerError::provider("enable vulnerability alerts", e))?;
            }
        }

        let fixes = client
            .automated_security_fixes_enabled(owner, name)
            .await
            .map_err(|e| OrganizerError::provider("check automated security fixes", e))?;
        if !fixes {
            warn!(repository = name, "Automated security fixes are disabled, enabling");
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .enable_automated_security_fixes(owner, name)
                    .await
                    .map_err(|e| {
                        OrganizerError::provider("enable automated security fixes", e)
                    })?;
            }
        }

        Ok(())
    }

    /// Removes every collaborator whose access is not granted through a team.
    pub async fn clean_direct_collaborators(
        &self,
        repository: &Repository,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let owner = self.ctx.organization();
        let name = repository.name();

        let collaborators = client
            .list_direct_collaborators(owner, name)
            .await
            .map_err(|e| OrganizerError::provider("list direct collaborators", e))?;

        if collaborators.is_empty() {
            return Ok(());
        }

        warn!(
            repository = name,
            count = collaborators.len(),
            "Found direct collaborators, cleaning"
        );
        for collaborator in &collaborators {
            warn!(repository = name, user = collaborator.login, "Direct collaborator");
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .remove_collaborator(owner, name, &collaborator.login)
                    .await
                    .map_err(|e| OrganizerError::provider("remove collaborator", e))?;
                info!(repository = name, user = collaborator.login, "Removed collaborator");
            }
        }

        Ok(())
    }

    /// Converges the set of teams holding exactly `role` on the repository.
    ///
    /// Teams holding the role without being listed are removed first. The live list is
    /// then read again and listed teams that are missing are granted the role.
    pub async fn sync_role(
        &self,
        repository: &Repository,
        role: Role,
        desired: &[String],
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let owner = self.ctx.organization();
        let name = repository.name();
        let permission = role.permission();

        let live = self.teams_with_role(repository, role).await?;
        let mut removed = false;
        for team in live.iter().filter(|t| !self.is_listed(t, desired)) {
            warn!(
                repository = name,
                team = team.slug,
                "Found unlisted team with {permission} access, removing"
            );
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .remove_team_repository(owner, &team.slug, owner, name)
                    .await
                    .map_err(|e| OrganizerError::provider("remove team from repository", e))?;
                removed = true;
            }
        }

        let live = if removed {
            self.teams_with_role(repository, role).await?
        } else {
            live
        };

        for team_name in desired
            .iter()
            .filter(|n| !live.iter().any(|t| self.is_team(t, n)))
        {
            warn!(
                repository = name,
                team = team_name,
                "Team is missing {permission} access, adding"
            );
            stats.diverged(1);
            if !self.ctx.is_apply() {
                continue;
            }

            let slug = self
                .teams
                .slug_of(team_name)
                .ok_or_else(|| OrganizerError::not_found(format!("Team '{team_name}'")))?;
            client
                .set_team_repository_permission(owner, slug, owner, name, permission)
                .await
                .map_err(|e| OrganizerError::provider("set team repository permission", e))?;
            info!(repository = name, team = team_name, "Granted {permission} access");
        }

        Ok(())
    }

    /// Converges branch protection rules and creates missing precreated branches.
    ///
    /// Every configured pattern gets a rule built from the merged protection spec. Live
    /// rules whose pattern is not configured are deleted afterwards.
    ///
    /// # Errors
    ///
    /// Returns `OrganizerError::MasterBranchMissing` when a precreated branch is missing
    /// and there is no `master` branch to create it from.
    pub async fn reconcile_protection(
        &self,
        repository: &Repository,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let owner = self.ctx.organization();
        let name = repository.name();

        let state = client
            .get_branch_protection_state(owner, name)
            .await
            .map_err(|e| OrganizerError::provider("read branch protection rules", e))?;

        self.precreate_branches(repository, stats).await?;
        let status_contexts = self.cicd_status_contexts(repository).await?;

        let master_teams = repository.master_teams();
        for (pattern, pattern_override) in repository.protection() {
            let mut spec =
                ProtectionSpec::merged(master_teams, self.protection_defaults, pattern_override);
            if pattern_matches(pattern, repository.master_branch()) {
                spec.append_push_teams(master_teams.iter().chain(repository.admin_teams()));
            }
            spec.append_status_contexts(status_contexts.iter().copied());

            let settings = spec.to_settings(|team| self.teams.node_id_of(team))?;

            match state.rule_for_pattern(pattern) {
                Some(rule) if rule.settings.is_equivalent(&settings) => {
                    debug!(repository = name, pattern, "Protection rule is up to date");
                }
                Some(rule) => {
                    warn!(repository = name, pattern, "Protection rule differs, updating");
                    stats.diverged(1);
                    client
                        .update_branch_protection_rule(&rule.id, pattern, &settings)
                        .await
                        .map_err(|e| {
                            OrganizerError::provider("update branch protection rule", e)
                        })?;
                }
                None => {
                    warn!(repository = name, pattern, "Protection rule missing, creating");
                    stats.diverged(1);
                    client
                        .create_branch_protection_rule(
                            &state.repository_node_id,
                            pattern,
                            &settings,
                        )
                        .await
                        .map_err(|e| {
                            OrganizerError::provider("create branch protection rule", e)
                        })?;
                }
            }
        }

        for rule in state
            .rules
            .iter()
            .filter(|r| !repository.protection().iter().any(|(p, _)| *p == r.pattern))
        {
            warn!(
                repository = name,
                pattern = rule.pattern,
                rule_id = rule.id,
                "Removing old protection rule"
            );
            stats.diverged(1);
            client
                .delete_branch_protection_rule(&rule.id)
                .await
                .map_err(|e| OrganizerError::provider("delete branch protection rule", e))?;
        }

        Ok(())
    }

    async fn precreate_branches(
        &self,
        repository: &Repository,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let owner = self.ctx.organization();
        let name = repository.name();
        let mut master: Option<Branch> = None;

        for branch in repository.precreated_branches() {
            match client.get_branch(owner, name, branch).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(OrganizerError::provider("get branch", e)),
            }

            warn!(repository = name, branch = branch, "Branch not found, will be created");
            let source = match master.take() {
                Some(b) => b,
                None => client
                    .get_branch(owner, name, MASTER_BRANCH)
                    .await
                    .map_err(|e| match e {
                        github_client::Error::NotFound => OrganizerError::MasterBranchMissing {
                            repository: name.to_string(),
                        },
                        other => OrganizerError::provider("get branch", other),
                    })?,
            };

            stats.diverged(1);
            client
                .create_branch_ref(owner, name, branch, source.sha())
                .await
                .map_err(|e| OrganizerError::provider("create branch", e))?;
            info!(repository = name, branch = branch, sha = source.sha(), "Created branch");
            master = Some(source);
        }

        Ok(())
    }

    /// Status check contexts implied by the repository's CI mode.
    async fn cicd_status_contexts(
        &self,
        repository: &Repository,
    ) -> OrganizerResult<Vec<&'static str>> {
        let mode = repository
            .auto_cicd_mode()
            .unwrap_or(self.ctx.default_cicd_mode());
        if mode != AutoCicdMode::Jenkins {
            return Ok(Vec::new());
        }

        let name = repository.name();
        match self
            .ctx
            .client()
            .get_file(self.ctx.organization(), name, JENKINSFILE)
            .await
        {
            Ok(file) if file.size > 0 => Ok(JENKINS_STATUS_CONTEXTS.to_vec()),
            Ok(_) => {
                warn!(repository = name, "Jenkinsfile is empty");
                Ok(Vec::new())
            }
            Err(e) if e.is_not_found() => {
                warn!(repository = name, "Jenkinsfile not found");
                Ok(Vec::new())
            }
            Err(e) => Err(OrganizerError::provider("get Jenkinsfile", e)),
        }
    }

    async fn teams_with_role(
        &self,
        repository: &Repository,
        role: Role,
    ) -> OrganizerResult<Vec<RepositoryTeam>> {
        let teams = self
            .ctx
            .client()
            .list_repository_teams(self.ctx.organization(), repository.name())
            .await
            .map_err(|e| OrganizerError::provider("list repository teams", e))?;
        Ok(teams
            .into_iter()
            .filter(|t| t.permission == role.permission())
            .collect())
    }

    fn is_listed(&self, team: &RepositoryTeam, desired: &[String]) -> bool {
        desired.iter().any(|n| self.is_team(team, n))
    }

    /// Matches a live team against a configured name, by slug or by name.
    fn is_team(&self, team: &RepositoryTeam, name: &str) -> bool {
        team.matches_name(name) || self.teams.slug_of(name) == Some(team.slug.as_str())
    }
}
