//! Project expansion.
//!
//! A project is reconciled through its repositories. Expansion turns each repository
//! reference into a full [`Repository`] and adds the project's role teams to it.

use tracing::debug;

use crate::errors::ValidationError;
use crate::project::{Project, ProjectRole, RepositoryRef};
use crate::repository::Repository;

#[cfg(test)]
#[path = "project_reconciler_tests.rs"]
mod tests;

/// Expands projects into the repositories they manage.
///
/// The shorthand role teams are registered in the team registry when the desired state is
/// built, so expansion only refers to them by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectReconciler {
    walk_subprojects: bool,
}

impl ProjectReconciler {
    pub fn new(walk_subprojects: bool) -> Self {
        Self { walk_subprojects }
    }

    /// Returns the repositories of `project` with the project roles merged in.
    ///
    /// Masters become master teams, developers push teams and QA triage teams.
    /// Subprojects are not included; see [`ProjectReconciler::expand_tree`].
    pub fn expand(&self, project: &Project) -> Result<Vec<Repository>, ValidationError> {
        let masters = project.teams_for(ProjectRole::Masters);
        let developers = project.teams_for(ProjectRole::Developers);
        let qa = project.teams_for(ProjectRole::Qa);

        let mut repositories = Vec::with_capacity(project.repositories().len());
        for reference in project.repositories() {
            let repository = match reference {
                RepositoryRef::Name(name) => {
                    Repository::from_defaults(name.clone(), project.repository_defaults())?
                }
                RepositoryRef::Defined(repository) => repository.clone(),
            };

            repositories.push(
                repository
                    .with_master_teams(masters.iter().cloned())
                    .with_push_teams(developers.iter().cloned())
                    .with_triage_teams(qa.iter().cloned()),
            );
        }

        debug!(
            project = project.name(),
            repositories = repositories.len(),
            "Expanded project"
        );
        Ok(repositories)
    }

    /// Expands `project`, followed depth-first by its subprojects when walking is enabled.
    pub fn expand_tree(&self, project: &Project) -> Result<Vec<Repository>, ValidationError> {
        let mut repositories = self.expand(project)?;
        if self.walk_subprojects {
            for subproject in project.subprojects() {
                repositories.extend(self.expand_tree(subproject)?);
            }
        } else if !project.subprojects().is_empty() {
            debug!(
                project = project.name(),
                subprojects = project.subprojects().len(),
                "Subprojects are not walked"
            );
        }
        Ok(repositories)
    }
}
