//! Run-wide context shared by every reconciler.

use std::collections::HashMap;
use std::sync::Arc;

use github_client::{OrganizationClient, Team as GhTeam};
use tracing::{debug, warn};

use crate::errors::{OrganizerError, OrganizerResult};
use crate::repository::AutoCicdMode;

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;

/// Whether reconcilers write to the provider or only report what they would change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    DryRun,
    Apply,
}

impl RunMode {
    pub fn is_apply(&self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DryRun => f.write_str("dry-run"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Immutable settings of one run.
///
/// The mode is fixed at construction. Reconcilers read it before every write.
#[derive(Clone)]
pub struct ReconcileContext {
    client: Arc<dyn OrganizationClient>,
    organization: String,
    mode: RunMode,
    default_cicd_mode: AutoCicdMode,
}

impl ReconcileContext {
    pub fn new(
        client: Arc<dyn OrganizationClient>,
        organization: impl Into<String>,
        mode: RunMode,
    ) -> Self {
        Self {
            client,
            organization: organization.into(),
            mode,
            default_cicd_mode: AutoCicdMode::None,
        }
    }

    /// CI mode for repositories that do not configure one.
    pub fn with_default_cicd_mode(mut self, mode: AutoCicdMode) -> Self {
        self.default_cicd_mode = mode;
        self
    }

    pub fn client(&self) -> &dyn OrganizationClient {
        self.client.as_ref()
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_apply(&self) -> bool {
        self.mode.is_apply()
    }

    pub fn default_cicd_mode(&self) -> AutoCicdMode {
        self.default_cicd_mode
    }
}

impl std::fmt::Debug for ReconcileContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("organization", &self.organization)
            .field("mode", &self.mode)
            .field("default_cicd_mode", &self.default_cicd_mode)
            .finish()
    }
}

/// Provider handles of teams, keyed by configured name.
///
/// Filled while teams are reconciled, then completed with teams that repositories
/// reference without configuring them. It is read-only while repositories are
/// reconciled.
#[derive(Debug, Default, Clone)]
pub struct TeamDirectory {
    handles: HashMap<String, GhTeam>,
    live: Option<Vec<GhTeam>>,
}

impl TeamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the live team list read at the start of the run.
    pub fn with_live_teams(mut self, teams: Vec<GhTeam>) -> Self {
        self.live = Some(teams);
        self
    }

    pub fn live_teams(&self) -> &[GhTeam] {
        self.live.as_deref().unwrap_or_default()
    }

    pub fn insert(&mut self, name: &str, handle: GhTeam) {
        self.handles.insert(name.to_ascii_lowercase(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&GhTeam> {
        self.handles.get(&name.to_ascii_lowercase())
    }

    /// Slug for a configured team name, if the team exists.
    pub fn slug_of(&self, name: &str) -> Option<&str> {
        self.get(name).map(|t| t.slug.as_str())
    }

    /// GraphQL node ID for a configured team name, if the team exists.
    pub fn node_id_of(&self, name: &str) -> Option<String> {
        self.get(name).map(|t| t.node_id.clone())
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Adds handles for referenced teams that were not reconciled, without creating them.
    ///
    /// The live team list is read once if it was not recorded earlier. Names that match no
    /// live team are reported and left out.
    pub async fn load_referenced<'a>(
        &mut self,
        client: &dyn OrganizationClient,
        organization: &str,
        names: impl IntoIterator<Item = &'a str>,
    ) -> OrganizerResult<()> {
        let missing: Vec<&str> = names.into_iter().filter(|n| self.get(n).is_none()).collect();
        if missing.is_empty() {
            return Ok(());
        }

        if self.live.is_none() {
            let teams = client
                .list_teams(organization)
                .await
                .map_err(|e| OrganizerError::provider("list teams", e))?;
            self.live = Some(teams);
        }

        for name in missing {
            let found = self
                .live_teams()
                .iter()
                .find(|t| t.matches_name(name))
                .cloned();
            match found {
                Some(team) => {
                    debug!(team = name, slug = team.slug, "Found unconfigured team");
                    self.insert(name, team);
                }
                None => warn!(team = name, "Referenced team does not exist"),
            }
        }
        Ok(())
    }
}
