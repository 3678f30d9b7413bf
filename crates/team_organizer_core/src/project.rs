//! Project domain types
//!
//! A project groups repositories that share role teams. Listing users for one of the
//! shorthand roles creates a team for that role, named after the project.

use github_client::TeamPrivacy;

use crate::errors::ValidationError;
use crate::repository::{Repository, RepositoryDefaults};
use crate::team::{Team, UserRef};

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;

/// A repository listed in a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryRef {
    /// Built from the project's repository defaults.
    Name(String),
    /// Fully configured.
    Defined(Repository),
}

impl RepositoryRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Defined(repository) => repository.name(),
        }
    }
}

impl From<Repository> for RepositoryRef {
    fn from(repository: Repository) -> Self {
        Self::Defined(repository)
    }
}

impl From<&str> for RepositoryRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// A shorthand role of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectRole {
    Masters,
    Developers,
    Qa,
}

impl ProjectRole {
    /// Name of the team created for this role.
    pub fn team_name(&self, project: &str) -> String {
        match self {
            Self::Masters => format!("projects/{project}/masters"),
            Self::Developers => format!("project/{project}/developers"),
            Self::Qa => format!("project/{project}/qa"),
        }
    }

    pub fn team_description(&self, project: &str) -> String {
        match self {
            Self::Masters => format!("{project} / Masters"),
            Self::Developers => format!("{project} / Developers"),
            Self::Qa => format!("{project} / QA"),
        }
    }
}

/// A named group of repositories with shared role teams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    repositories: Vec<RepositoryRef>,
    repository_defaults: RepositoryDefaults,
    subprojects: Vec<Project>,
    master_teams: Vec<String>,
    developer_teams: Vec<String>,
    qa_teams: Vec<String>,
    master_team_members: Vec<UserRef>,
    developer_team_members: Vec<UserRef>,
    qa_team_members: Vec<UserRef>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("project.name"));
        }

        Ok(Self {
            name,
            repositories: Vec::new(),
            repository_defaults: RepositoryDefaults::default(),
            subprojects: Vec::new(),
            master_teams: Vec::new(),
            developer_teams: Vec::new(),
            qa_teams: Vec::new(),
            master_team_members: Vec::new(),
            developer_team_members: Vec::new(),
            qa_team_members: Vec::new(),
        })
    }

    pub fn with_repository(mut self, repository: impl Into<RepositoryRef>) -> Self {
        self.repositories.push(repository.into());
        self
    }

    pub fn with_repository_defaults(mut self, defaults: RepositoryDefaults) -> Self {
        self.repository_defaults = defaults;
        self
    }

    pub fn with_subproject(mut self, project: Project) -> Self {
        self.subprojects.push(project);
        self
    }

    /// Existing teams that act as masters for every repository of the project.
    pub fn with_master_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        self.master_teams.extend(teams);
        self
    }

    pub fn with_developer_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        self.developer_teams.extend(teams);
        self
    }

    pub fn with_qa_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        self.qa_teams.extend(teams);
        self
    }

    /// Users of the generated `projects/<name>/masters` team.
    pub fn with_master_team_members<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserRef>,
    {
        self.master_team_members
            .extend(users.into_iter().map(Into::into));
        self
    }

    pub fn with_developer_team_members<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserRef>,
    {
        self.developer_team_members
            .extend(users.into_iter().map(Into::into));
        self
    }

    pub fn with_qa_team_members<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserRef>,
    {
        self.qa_team_members
            .extend(users.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repositories(&self) -> &[RepositoryRef] {
        &self.repositories
    }

    pub fn repository_defaults(&self) -> &RepositoryDefaults {
        &self.repository_defaults
    }

    pub fn subprojects(&self) -> &[Project] {
        &self.subprojects
    }

    fn role_members(&self, role: ProjectRole) -> &[UserRef] {
        match role {
            ProjectRole::Masters => &self.master_team_members,
            ProjectRole::Developers => &self.developer_team_members,
            ProjectRole::Qa => &self.qa_team_members,
        }
    }

    fn role_teams(&self, role: ProjectRole) -> &[String] {
        match role {
            ProjectRole::Masters => &self.master_teams,
            ProjectRole::Developers => &self.developer_teams,
            ProjectRole::Qa => &self.qa_teams,
        }
    }

    /// Builds the shorthand teams for roles that have members listed.
    ///
    /// This does not recurse into subprojects.
    pub fn shorthand_teams(&self) -> Result<Vec<Team>, ValidationError> {
        let mut teams = Vec::new();
        for role in [ProjectRole::Masters, ProjectRole::Developers, ProjectRole::Qa] {
            let members = self.role_members(role);
            if members.is_empty() {
                continue;
            }
            let team = Team::new(role.team_name(&self.name))?
                .with_description(role.team_description(&self.name))
                .with_privacy(TeamPrivacy::Closed)
                .with_members(members.iter().cloned());
            teams.push(team);
        }
        Ok(teams)
    }

    /// Names of every team holding `role`, the generated team last.
    pub fn teams_for(&self, role: ProjectRole) -> Vec<String> {
        let mut names = self.role_teams(role).to_vec();
        if !self.role_members(role).is_empty() {
            names.push(role.team_name(&self.name));
        }
        names
    }
}
