//! Builds a [`DesiredState`] from a configuration file.

use std::collections::HashSet;
use std::path::Path;

use team_organizer_core::{
    DesiredState, Project, Repository, RepositoryDefaults, RepositoryRef, Team,
};
use tracing::{debug, info, warn};

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::schema::{
    OrganizerConfig, ProjectEntry, ProjectRepositoryEntry, RepositoryDefaultsEntry,
    RepositoryEntry, TeamEntry,
};

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;

/// A parsed and validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfiguration {
    /// Organization named in the file, if any
    pub organization: Option<String>,

    pub desired_state: DesiredState,
}

/// Reads, parses and validates the configuration file at `path`.
///
/// # Errors
///
/// - `FileNotFound` when `path` does not exist
/// - `FileAccessError` when it cannot be read
/// - `ParseError` for malformed TOML, unknown keys and unknown enum values
/// - `InvalidConfiguration` for invalid names and duplicate teams or repositories
pub fn load_desired_state(path: &Path) -> ConfigurationResult<LoadedConfiguration> {
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigurationError::FileNotFound {
                path: display.clone(),
            }
        } else {
            ConfigurationError::FileAccessError {
                path: display.clone(),
                reason: e.to_string(),
            }
        }
    })?;

    info!(path = %path.display(), "Loading configuration");
    parse_desired_state(&content, &display)
}

/// Parses and validates configuration text. `source` names the text in error messages.
pub fn parse_desired_state(
    content: &str,
    source: &str,
) -> ConfigurationResult<LoadedConfiguration> {
    let config: OrganizerConfig =
        toml::from_str(content).map_err(|e| ConfigurationError::ParseError {
            reason: format!("{source}: {e}"),
        })?;
    build_desired_state(config)
}

/// Translates the file schema into a desired state.
pub fn build_desired_state(config: OrganizerConfig) -> ConfigurationResult<LoadedConfiguration> {
    let mut builder = DesiredState::builder().protection_defaults(config.protection_defaults);

    for entry in &config.teams {
        builder = builder.team(team_from_entry(entry)?);
    }
    for entry in &config.projects {
        builder = builder.project(project_from_entry(entry)?);
    }
    for entry in &config.repositories {
        builder = builder.repository(repository_from_entry(entry)?);
    }

    let desired_state = builder.build()?;
    report_external_teams(&desired_state);

    debug!(
        teams = desired_state.teams().len(),
        projects = desired_state.projects().len(),
        repositories = desired_state.repositories().len(),
        "Configuration loaded"
    );
    Ok(LoadedConfiguration {
        organization: config.organization,
        desired_state,
    })
}

fn team_from_entry(entry: &TeamEntry) -> ConfigurationResult<Team> {
    for login in entry
        .members
        .iter()
        .filter(|m| entry.maintainers.iter().any(|u| u.eq_ignore_ascii_case(m)))
    {
        warn!(
            team = %entry.name,
            user = %login,
            "User listed as maintainer and member, keeping maintainer"
        );
    }
    let mut team = Team::new(entry.name.clone())?
        .with_maintainers(entry.maintainers.iter().map(String::as_str))
        .with_members(entry.members.iter().map(String::as_str));
    if let Some(description) = &entry.description {
        team = team.with_description(description.clone());
    }
    if let Some(privacy) = entry.privacy {
        team = team.with_privacy(privacy);
    }
    Ok(team)
}

fn repository_from_entry(entry: &RepositoryEntry) -> ConfigurationResult<Repository> {
    let mut repository = Repository::new(entry.name.clone())?
        .with_admin_teams(entry.admin_teams.iter().cloned())
        .with_master_teams(entry.master_teams.iter().cloned())
        .with_push_teams(entry.push_teams.iter().cloned())
        .with_pull_teams(entry.pull_teams.iter().cloned())
        .with_triage_teams(entry.triage_teams.iter().cloned())
        .with_precreated_branches(entry.precreated_branches.iter().cloned());

    for (pattern, protection) in &entry.protection {
        repository = repository.with_protection(pattern.clone(), protection.clone());
    }
    if let Some(branch) = &entry.default_branch {
        repository = repository.with_default_branch(branch.clone());
    }
    if let Some(branch) = &entry.master_branch {
        repository = repository.with_master_branch(branch.clone());
    }
    if let Some(mode) = entry.auto_cicd_mode {
        repository = repository.with_auto_cicd_mode(mode);
    }
    Ok(repository)
}

fn defaults_from_entry(entry: &RepositoryDefaultsEntry) -> RepositoryDefaults {
    RepositoryDefaults {
        admin_teams: entry.admin_teams.clone(),
        master_teams: entry.master_teams.clone(),
        push_teams: entry.push_teams.clone(),
        pull_teams: entry.pull_teams.clone(),
        triage_teams: entry.triage_teams.clone(),
        precreated_branches: entry.precreated_branches.clone(),
        protection: entry
            .protection
            .iter()
            .map(|(pattern, spec)| (pattern.clone(), spec.clone()))
            .collect(),
        default_branch: entry.default_branch.clone(),
        master_branch: entry.master_branch.clone(),
        auto_cicd_mode: entry.auto_cicd_mode,
    }
}

fn project_from_entry(entry: &ProjectEntry) -> ConfigurationResult<Project> {
    let mut project = Project::new(entry.name.clone())?
        .with_repository_defaults(defaults_from_entry(&entry.repository_defaults))
        .with_master_teams(entry.master_teams.iter().cloned())
        .with_developer_teams(entry.developer_teams.iter().cloned())
        .with_qa_teams(entry.qa_teams.iter().cloned())
        .with_master_team_members(entry.master_team_members.iter().map(String::as_str))
        .with_developer_team_members(entry.developer_team_members.iter().map(String::as_str))
        .with_qa_team_members(entry.qa_team_members.iter().map(String::as_str));

    for repository in &entry.repositories {
        let reference = match repository {
            ProjectRepositoryEntry::Name(name) => RepositoryRef::Name(name.clone()),
            ProjectRepositoryEntry::Table(table) => {
                RepositoryRef::Defined(repository_from_entry(table)?)
            }
        };
        project = project.with_repository(reference);
    }
    for subproject in &entry.subprojects {
        project = project.with_subproject(project_from_entry(subproject)?);
    }
    Ok(project)
}

/// Logs team names used by repositories without being configured as teams.
///
/// Such teams are managed elsewhere. They are granted roles but never created.
fn report_external_teams(state: &DesiredState) {
    let configured: HashSet<String> = state
        .teams()
        .iter()
        .map(|t| t.name().to_ascii_lowercase())
        .collect();

    let mut seen = HashSet::new();
    let standalone = state.repositories().iter();
    let project_defined = state
        .projects()
        .iter()
        .flat_map(|p| p.repositories())
        .filter_map(|r| match r {
            RepositoryRef::Defined(repository) => Some(repository),
            RepositoryRef::Name(_) => None,
        });

    for repository in standalone.chain(project_defined) {
        for team in repository.referenced_teams() {
            let key = team.to_ascii_lowercase();
            if !configured.contains(&key) && seen.insert(key) {
                warn!(
                    team = team,
                    repository = repository.name(),
                    "Team is not configured and will not be created"
                );
            }
        }
    }
}
