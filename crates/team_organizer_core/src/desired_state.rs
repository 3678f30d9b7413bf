//! The desired state of an organization and the builder that assembles it.
//!
//! The registries hold teams, projects and standalone repositories in the order they were
//! added. Nothing is removed from them once built.

use std::collections::{HashMap, HashSet};

use github_client::{OrganizationClient, User};
use tracing::{debug, info};

use crate::errors::{ConfigurationError, OrganizerError, OrganizerResult, ValidationError};
use crate::project::{Project, RepositoryRef};
use crate::protection::ProtectionOverride;
use crate::repository::Repository;
use crate::team::{Team, UserRef};

#[cfg(test)]
#[path = "desired_state_tests.rs"]
mod tests;

/// Teams, projects and repositories that should exist, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredState {
    teams: Vec<Team>,
    projects: Vec<Project>,
    repositories: Vec<Repository>,
    protection_defaults: ProtectionOverride,
}

impl DesiredState {
    pub fn builder() -> DesiredStateBuilder {
        DesiredStateBuilder::default()
    }

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Standalone repositories, not including those listed by projects.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Organization-wide protection defaults, layered under every per-pattern override.
    pub fn protection_defaults(&self) -> &ProtectionOverride {
        &self.protection_defaults
    }

    /// Resolves every login to a provider user.
    ///
    /// # Errors
    /// Returns `ConfigurationError::UnknownUser` for a login that does not exist. The run
    /// must not start in that case.
    pub async fn resolve_users(
        &mut self,
        client: &dyn OrganizationClient,
        directory: &mut UserDirectory,
    ) -> OrganizerResult<()> {
        for team in &mut self.teams {
            for user in team.users_mut() {
                if let UserRef::Login(login) = user {
                    let resolved = directory.resolve(client, login).await?;
                    *user = UserRef::Resolved(resolved);
                }
            }
        }

        info!(users = directory.len(), "Resolved team users");
        Ok(())
    }
}

/// Assembles a [`DesiredState`].
///
/// Adding a project registers its shorthand role teams, and those of its subprojects, in
/// the team registry.
///
/// # Examples
///
/// ```rust
/// use team_organizer_core::{DesiredState, Project, Repository, Team};
///
/// let state = DesiredState::builder()
///     .team(Team::new("ops").unwrap())
///     .project(Project::new("platform").unwrap().with_master_team_members(["alice"]))
///     .repository(Repository::new("svc").unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(state.teams().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct DesiredStateBuilder {
    teams: Vec<Team>,
    projects: Vec<Project>,
    repositories: Vec<Repository>,
    protection_defaults: ProtectionOverride,
    errors: Vec<ValidationError>,
}

impl DesiredStateBuilder {
    pub fn team(mut self, team: Team) -> Self {
        self.teams.push(team);
        self
    }

    pub fn project(mut self, project: Project) -> Self {
        self.register_shorthand_teams(&project);
        self.projects.push(project);
        self
    }

    pub fn repository(mut self, repository: Repository) -> Self {
        self.repositories.push(repository);
        self
    }

    pub fn protection_defaults(mut self, defaults: ProtectionOverride) -> Self {
        self.protection_defaults = defaults;
        self
    }

    fn register_shorthand_teams(&mut self, project: &Project) {
        match project.shorthand_teams() {
            Ok(teams) => self.teams.extend(teams),
            Err(e) => self.errors.push(e),
        }
        for subproject in project.subprojects() {
            self.register_shorthand_teams(subproject);
        }
    }

    /// Validates the registries and returns the desired state.
    ///
    /// # Errors
    /// Returns the first `ValidationError` found: duplicate team names, or a repository
    /// declared more than once across projects and standalone entries.
    pub fn build(self) -> Result<DesiredState, ValidationError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let mut team_names = HashSet::new();
        for team in &self.teams {
            if !team_names.insert(team.name().to_ascii_lowercase()) {
                return Err(ValidationError::duplicate("team", team.name()));
            }
        }

        let mut repository_names = HashSet::new();
        let mut project_repositories = Vec::new();
        for project in &self.projects {
            collect_repository_names(project, &mut project_repositories);
        }
        for name in project_repositories
            .into_iter()
            .chain(self.repositories.iter().map(Repository::name))
        {
            if !repository_names.insert(name.to_ascii_lowercase()) {
                return Err(ValidationError::duplicate("repository", name));
            }
        }

        debug!(
            teams = self.teams.len(),
            projects = self.projects.len(),
            repositories = self.repositories.len(),
            "Built desired state"
        );

        Ok(DesiredState {
            teams: self.teams,
            projects: self.projects,
            repositories: self.repositories,
            protection_defaults: self.protection_defaults,
        })
    }
}

fn collect_repository_names<'a>(project: &'a Project, names: &mut Vec<&'a str>) {
    names.extend(project.repositories().iter().map(RepositoryRef::name));
    for subproject in project.subprojects() {
        collect_repository_names(subproject, names);
    }
}

/// Memoized login to user lookups, shared across the process.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, User>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Looks up a user, asking the provider only on the first request for a login.
    pub async fn resolve(
        &mut self,
        client: &dyn OrganizationClient,
        login: &str,
    ) -> OrganizerResult<User> {
        let key = login.to_ascii_lowercase();
        if let Some(user) = self.users.get(&key) {
            return Ok(user.clone());
        }

        let user = client.get_user(login).await.map_err(|e| {
            if e.is_not_found() {
                OrganizerError::from(ConfigurationError::UnknownUser {
                    login: login.to_string(),
                })
            } else {
                OrganizerError::provider("get user", e)
            }
        })?;

        self.users.insert(key, user.clone());
        Ok(user)
    }
}
