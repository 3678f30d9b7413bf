//! Repository domain types
//!
//! Desired-state representation of a repository: which teams hold which role, which
//! branches are protected and how, and which branches must exist.

use github_client::RepositoryPermission;
use serde::Deserialize;

use crate::errors::ValidationError;
use crate::protection::ProtectionOverride;

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Name of the branch that precreated branches are created from.
pub const MASTER_BRANCH: &str = "master";

/// Access level a team holds on a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Push,
    Pull,
    Triage,
}

impl Role {
    /// Roles in the order they are synchronized.
    pub const SYNC_ORDER: [Role; 4] = [Role::Admin, Role::Push, Role::Pull, Role::Triage];

    pub fn permission(&self) -> RepositoryPermission {
        match self {
            Self::Admin => RepositoryPermission::Admin,
            Self::Push => RepositoryPermission::Push,
            Self::Pull => RepositoryPermission::Pull,
            Self::Triage => RepositoryPermission::Triage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.permission().as_str()
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How status checks are derived from the repository's CI setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoCicdMode {
    #[default]
    None,
    /// Require the Jenkins branch and PR-merge contexts when a `Jenkinsfile` exists.
    Jenkins,
}

impl std::str::FromStr for AutoCicdMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "jenkins" => Ok(Self::Jenkins),
            other => Err(ValidationError::invalid_format(
                "auto_cicd_mode",
                format!("expected 'none' or 'jenkins', got '{other}'"),
            )),
        }
    }
}

/// Settings shared by the repositories of a project that are referenced by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryDefaults {
    pub admin_teams: Vec<String>,
    pub master_teams: Vec<String>,
    pub push_teams: Vec<String>,
    pub pull_teams: Vec<String>,
    pub triage_teams: Vec<String>,
    pub precreated_branches: Vec<String>,
    pub protection: Vec<(String, ProtectionOverride)>,
    pub default_branch: Option<String>,
    pub master_branch: Option<String>,
    pub auto_cicd_mode: Option<AutoCicdMode>,
}

/// The effective team set of each role after precedence is applied.
///
/// Precedence is admin > push > triage > pull, so every team lands in exactly one set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBindings {
    pub admin: Vec<String>,
    pub push: Vec<String>,
    pub pull: Vec<String>,
    pub triage: Vec<String>,
}

impl RoleBindings {
    pub fn teams(&self, role: Role) -> &[String] {
        match role {
            Role::Admin => &self.admin,
            Role::Push => &self.push,
            Role::Pull => &self.pull,
            Role::Triage => &self.triage,
        }
    }
}

/// A repository as it should be configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    name: String,
    admin_teams: Vec<String>,
    master_teams: Vec<String>,
    push_teams: Vec<String>,
    pull_teams: Vec<String>,
    triage_teams: Vec<String>,
    protection: Vec<(String, ProtectionOverride)>,
    precreated_branches: Vec<String>,
    default_branch: String,
    master_branch: String,
    auto_cicd_mode: Option<AutoCicdMode>,
}

impl Repository {
    /// Create a new repository with no teams and no protection rules.
    ///
    /// # Validation Rules
    /// - Must not be empty
    /// - Characters: alphanumeric, hyphens, underscores, periods
    ///
    /// # Errors
    /// Returns `ValidationError` if validation fails
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::empty_field("repository.name"));
        }

        if !name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(ValidationError::invalid_format(
                "repository.name",
                "must contain only alphanumeric characters, hyphens, underscores, or periods",
            ));
        }

        Ok(Self {
            name,
            admin_teams: Vec::new(),
            master_teams: Vec::new(),
            push_teams: Vec::new(),
            pull_teams: Vec::new(),
            triage_teams: Vec::new(),
            protection: Vec::new(),
            precreated_branches: Vec::new(),
            default_branch: MASTER_BRANCH.to_string(),
            master_branch: MASTER_BRANCH.to_string(),
            auto_cicd_mode: None,
        })
    }

    /// Create a repository from project defaults.
    pub fn from_defaults(
        name: impl Into<String>,
        defaults: &RepositoryDefaults,
    ) -> Result<Self, ValidationError> {
        let mut repository = Self::new(name)?
            .with_admin_teams(defaults.admin_teams.iter().cloned())
            .with_master_teams(defaults.master_teams.iter().cloned())
            .with_push_teams(defaults.push_teams.iter().cloned())
            .with_pull_teams(defaults.pull_teams.iter().cloned())
            .with_triage_teams(defaults.triage_teams.iter().cloned())
            .with_precreated_branches(defaults.precreated_branches.iter().cloned());

        for (pattern, protection) in &defaults.protection {
            repository = repository.with_protection(pattern.clone(), protection.clone());
        }
        if let Some(branch) = &defaults.default_branch {
            repository = repository.with_default_branch(branch.clone());
        }
        if let Some(branch) = &defaults.master_branch {
            repository = repository.with_master_branch(branch.clone());
        }
        repository.auto_cicd_mode = defaults.auto_cicd_mode;

        Ok(repository)
    }

    pub fn with_admin_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        extend_unique(&mut self.admin_teams, teams);
        self
    }

    pub fn with_master_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        extend_unique(&mut self.master_teams, teams);
        self
    }

    pub fn with_push_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        extend_unique(&mut self.push_teams, teams);
        self
    }

    pub fn with_pull_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        extend_unique(&mut self.pull_teams, teams);
        self
    }

    pub fn with_triage_teams(mut self, teams: impl IntoIterator<Item = String>) -> Self {
        extend_unique(&mut self.triage_teams, teams);
        self
    }

    /// Sets the protection override for a pattern, replacing an earlier one.
    pub fn with_protection(mut self, pattern: impl Into<String>, spec: ProtectionOverride) -> Self {
        let pattern = pattern.into();
        match self.protection.iter_mut().find(|(p, _)| *p == pattern) {
            Some(entry) => entry.1 = spec,
            None => self.protection.push((pattern, spec)),
        }
        self
    }

    pub fn with_precreated_branches(mut self, branches: impl IntoIterator<Item = String>) -> Self {
        for branch in branches {
            if !self.precreated_branches.contains(&branch) {
                self.precreated_branches.push(branch);
            }
        }
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_master_branch(mut self, branch: impl Into<String>) -> Self {
        self.master_branch = branch.into();
        self
    }

    pub fn with_auto_cicd_mode(mut self, mode: AutoCicdMode) -> Self {
        self.auto_cicd_mode = Some(mode);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn admin_teams(&self) -> &[String] {
        &self.admin_teams
    }

    pub fn master_teams(&self) -> &[String] {
        &self.master_teams
    }

    pub fn push_teams(&self) -> &[String] {
        &self.push_teams
    }

    pub fn pull_teams(&self) -> &[String] {
        &self.pull_teams
    }

    pub fn triage_teams(&self) -> &[String] {
        &self.triage_teams
    }

    /// Protection overrides in declaration order.
    pub fn protection(&self) -> &[(String, ProtectionOverride)] {
        &self.protection
    }

    pub fn precreated_branches(&self) -> &[String] {
        &self.precreated_branches
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn master_branch(&self) -> &str {
        &self.master_branch
    }

    /// The configured CI mode, or `None` to use the run-wide default.
    pub fn auto_cicd_mode(&self) -> Option<AutoCicdMode> {
        self.auto_cicd_mode
    }

    /// Computes the effective role sets.
    ///
    /// Push is the union of master and push teams. A team configured for several roles
    /// keeps only the strongest one.
    pub fn role_bindings(&self) -> RoleBindings {
        let admin = dedup(self.admin_teams.iter());

        let push = dedup(
            self.master_teams
                .iter()
                .chain(self.push_teams.iter())
                .filter(|t| !contains(&admin, t)),
        );

        let triage = dedup(
            self.triage_teams
                .iter()
                .filter(|t| !contains(&admin, t) && !contains(&push, t)),
        );

        let pull = dedup(self.pull_teams.iter().filter(|t| {
            !contains(&admin, t) && !contains(&push, t) && !contains(&triage, t)
        }));

        RoleBindings {
            admin,
            push,
            pull,
            triage,
        }
    }

    /// Every team name this repository refers to, including protection actors.
    pub fn referenced_teams(&self) -> Vec<String> {
        let mut names = dedup(
            self.admin_teams
                .iter()
                .chain(&self.master_teams)
                .chain(&self.push_teams)
                .chain(&self.pull_teams)
                .chain(&self.triage_teams),
        );
        for (_, spec) in &self.protection {
            for team in spec.referenced_teams() {
                if !contains(&names, team) {
                    names.push(team.to_string());
                }
            }
        }
        names
    }
}

fn contains(list: &[String], name: &str) -> bool {
    list.iter().any(|t| t.eq_ignore_ascii_case(name))
}

fn dedup<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for name in names {
        if !contains(&result, name) {
            result.push(name.clone());
        }
    }
    result
}

fn extend_unique(target: &mut Vec<String>, names: impl IntoIterator<Item = String>) {
    for name in names {
        if !contains(target, &name) {
            target.push(name);
        }
    }
}
