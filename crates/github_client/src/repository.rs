//! Repository domain types.
//!
//! This module contains types representing GitHub repositories and the subset of their
//! settings the organizer enforces.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;

/// Represents a GitHub repository.
///
/// This struct contains essential information about a GitHub repository,
/// including its name, identifiers, and merge-strategy settings.
///
/// # Examples
///
/// ```rust
/// use github_client::Repository;
///
/// let repo = Repository::new(
///     "my-repo".to_string(),
///     "owner/my-repo".to_string(),
///     "MDEwOlJlcG9zaXRvcnkx".to_string(),
///     false
/// );
///
/// println!("Repository: {}", repo.name());
/// println!("Is private: {}", repo.is_private());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Repository {
    /// The full name of the repository (owner/name)
    full_name: String,
    /// The name of the repository
    name: String,
    /// The GraphQL node ID of the repository
    #[serde(default)]
    node_id: String,
    /// Whether the repository is private
    #[serde(default)]
    private: bool,
    /// Name of the default branch
    #[serde(default)]
    default_branch: Option<String>,
    /// Whether merge commits are allowed for pull requests
    #[serde(default)]
    allow_merge_commit: Option<bool>,
    /// Whether squash merging is allowed for pull requests
    #[serde(default)]
    allow_squash_merge: Option<bool>,
    /// Whether rebase merging is allowed for pull requests
    #[serde(default)]
    allow_rebase_merge: Option<bool>,
}

impl Repository {
    /// Creates a new Repository instance.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the repository
    /// * `full_name` - The full name including owner (owner/repo)
    /// * `node_id` - The GraphQL node ID
    /// * `private` - Whether the repository is private
    pub fn new(name: String, full_name: String, node_id: String, private: bool) -> Self {
        Self {
            full_name,
            name,
            node_id,
            private,
            default_branch: None,
            allow_merge_commit: None,
            allow_squash_merge: None,
            allow_rebase_merge: None,
        }
    }

    /// Returns a copy of the repository with the given merge settings and default branch.
    pub fn with_settings(
        mut self,
        allow_merge_commit: bool,
        allow_squash_merge: bool,
        allow_rebase_merge: bool,
        default_branch: &str,
    ) -> Self {
        self.allow_merge_commit = Some(allow_merge_commit);
        self.allow_squash_merge = Some(allow_squash_merge);
        self.allow_rebase_merge = Some(allow_rebase_merge);
        self.default_branch = Some(default_branch.to_string());
        self
    }

    /// Returns the name of the repository.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the full name of the repository (`owner/name`).
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Returns the GraphQL node ID of the repository.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Returns whether the repository is private.
    pub fn is_private(&self) -> bool {
        self.private
    }

    /// Returns the default branch name, when the API reported it.
    pub fn default_branch(&self) -> Option<&str> {
        self.default_branch.as_deref()
    }

    /// Returns whether merge commits are allowed.
    ///
    /// `None` when the token cannot see the repository settings.
    pub fn allow_merge_commit(&self) -> Option<bool> {
        self.allow_merge_commit
    }

    /// Returns whether squash merging is allowed.
    pub fn allow_squash_merge(&self) -> Option<bool> {
        self.allow_squash_merge
    }

    /// Returns whether rebase merging is allowed.
    pub fn allow_rebase_merge(&self) -> Option<bool> {
        self.allow_rebase_merge
    }
}

/// Represents the settings that can be updated for a repository.
/// Use `Default::default()` and modify fields as needed.
#[derive(Serialize, Default, Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
}

impl RepositorySettingsUpdate {
    /// Returns `true` when the update would not change anything.
    pub fn is_empty(&self) -> bool {
        self.allow_merge_commit.is_none()
            && self.allow_squash_merge.is_none()
            && self.allow_rebase_merge.is_none()
            && self.default_branch.is_none()
    }
}
