//! Team reconciliation.
//!
//! Converges the metadata and the maintainer and member sets of one team.

use github_client::{Team as GhTeam, TeamCreatePayload, TeamRole, TeamUpdatePayload};
use tracing::{info, instrument, warn};

use crate::context::{ReconcileContext, TeamDirectory};
use crate::errors::{OrganizerError, OrganizerResult};
use crate::report::ReconcileStats;
use crate::team::{Team, UserRef};

#[cfg(test)]
#[path = "team_reconciler_tests.rs"]
mod tests;

/// Reconciles teams against the live team list read at the start of the run.
pub struct TeamReconciler<'a> {
    ctx: &'a ReconcileContext,
    live_teams: &'a [GhTeam],
}

impl<'a> TeamReconciler<'a> {
    pub fn new(ctx: &'a ReconcileContext, live_teams: &'a [GhTeam]) -> Self {
        Self { ctx, live_teams }
    }

    /// Resolves the team, then synchronizes maintainers and members.
    ///
    /// The provider handle is stored in `directory` as soon as it is known, so that
    /// repositories can refer to the team even if a membership change fails afterwards.
    pub async fn run(
        &self,
        team: &Team,
        directory: &mut TeamDirectory,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let Some(handle) = self.resolve(team, stats).await? else {
            warn!(
                team = team.name(),
                "Team has no reference, skipping membership"
            );
            return Ok(());
        };
        directory.insert(team.name(), handle.clone());

        self.sync_membership(&handle, TeamRole::Maintainer, team.maintainers(), stats)
            .await?;
        self.sync_membership(&handle, TeamRole::Member, team.members(), stats)
            .await?;
        Ok(())
    }

    /// Finds the live team, updating or creating it as needed.
    ///
    /// Returns `None` when the team does not exist and is not being created, which is the
    /// case in dry-run mode.
    #[instrument(skip(self, team, stats), fields(team = team.name()))]
    pub async fn resolve(
        &self,
        team: &Team,
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<Option<GhTeam>> {
        let client = self.ctx.client();
        let org = self.ctx.organization();

        if let Some(live) = self.live_teams.iter().find(|t| t.matches_name(team.name())) {
            let description_differs =
                live.description.as_deref().unwrap_or_default() != team.description();
            let privacy_differs = live.privacy != Some(team.privacy());

            if !(description_differs || privacy_differs) {
                return Ok(Some(live.clone()));
            }

            warn!(team = team.name(), "Team metadata should be updated");
            stats.diverged(1);
            if !self.ctx.is_apply() {
                info!(team = team.name(), "Dry run, skipping metadata update");
                return Ok(Some(live.clone()));
            }

            let updated = client
                .update_team(org, &live.slug, &update_payload(team))
                .await
                .map_err(|e| OrganizerError::provider("update team", e))?;
            info!(team = team.name(), "Updated team metadata");
            return Ok(Some(updated));
        }

        warn!(team = team.name(), "Team not found, should be created");
        // Creation cannot set the description, so an edit follows.
        stats.diverged(2);
        if !self.ctx.is_apply() {
            info!(team = team.name(), "Dry run, skipping team creation");
            return Ok(None);
        }

        let payload = TeamCreatePayload {
            name: team.name().to_string(),
            privacy: team.privacy(),
        };
        let created = client
            .create_team(org, &payload)
            .await
            .map_err(|e| OrganizerError::provider("create team", e))?;
        let edited = client
            .update_team(org, &created.slug, &update_payload(team))
            .await
            .map_err(|e| OrganizerError::provider("update team", e))?;

        info!(team = team.name(), slug = edited.slug, "Created team");
        Ok(Some(edited))
    }

    /// Converges one role of a team: unlisted users are removed first, then missing
    /// users are added.
    #[instrument(skip(self, handle, desired, stats), fields(team = %handle.slug, role = %role))]
    pub async fn sync_membership(
        &self,
        handle: &GhTeam,
        role: TeamRole,
        desired: &[UserRef],
        stats: &mut ReconcileStats,
    ) -> OrganizerResult<()> {
        let client = self.ctx.client();
        let org = self.ctx.organization();

        let live = client
            .list_team_members(org, &handle.slug, role)
            .await
            .map_err(|e| OrganizerError::provider("list team members", e))?;

        for user in live
            .iter()
            .filter(|u| !desired.iter().any(|d| d.same_login(&u.login)))
        {
            warn!(
                team = handle.name,
                user = user.login,
                "Found unlisted {role}, removing"
            );
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .remove_team_membership(org, &handle.slug, &user.login)
                    .await
                    .map_err(|e| OrganizerError::provider("remove team membership", e))?;
            }
        }

        for user in desired
            .iter()
            .filter(|d| !live.iter().any(|u| d.same_login(&u.login)))
        {
            warn!(
                team = handle.name,
                user = user.login(),
                "Missing {role}, adding"
            );
            stats.diverged(1);
            if self.ctx.is_apply() {
                client
                    .add_team_membership(org, &handle.slug, user.login(), role)
                    .await
                    .map_err(|e| OrganizerError::provider("add team membership", e))?;
            }
        }

        Ok(())
    }
}

fn update_payload(team: &Team) -> TeamUpdatePayload {
    TeamUpdatePayload {
        name: team.name().to_string(),
        description: team.description().to_string(),
        privacy: team.privacy(),
    }
}
