//! # Models
//!
//! Basic GitHub entities shared by the team, repository and branch protection modules.
//!
//! These models only carry the fields the organizer reads. They deserialize directly from
//! the REST API responses so that unknown fields are ignored.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Represents a GitHub organization.
///
/// # Examples
///
/// ```rust
/// use github_client::models::Organization;
///
/// let org = Organization {
///     id: 1,
///     login: "my-organization".to_string(),
///     name: None,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// The unique ID of the organization
    pub id: u64,
    /// The login of the organization, used in every API path
    pub login: String,
    /// The display name of the organization
    #[serde(default)]
    pub name: Option<String>,
}

/// Represents a GitHub user account.
///
/// This struct contains basic information about a GitHub user, including
/// their unique ID and login name. It's used for team members, maintainers
/// and repository collaborators.
///
/// # Examples
///
/// ```rust
/// use github_client::models::User;
///
/// let user = User {
///     id: 12345,
///     login: "octocat".to_string(),
///     node_id: None,
/// };
///
/// println!("User: {} (ID: {})", user.login, user.id);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct User {
    /// The unique numeric ID of the user
    pub id: u64,
    /// The login name of the user
    pub login: String,
    /// The node ID for GraphQL operations
    #[serde(default)]
    pub node_id: Option<String>,
}

impl User {
    /// Returns `true` when both values name the same account.
    ///
    /// GitHub logins are case-insensitive, so the comparison ignores ASCII case.
    pub fn same_login(&self, login: &str) -> bool {
        self.login.eq_ignore_ascii_case(login)
    }
}

/// A branch and the commit at its tip.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Branch {
    /// Branch name without the `refs/heads/` prefix
    pub name: String,
    /// The commit the branch points at
    pub commit: BranchCommit,
}

impl Branch {
    /// Returns the SHA of the commit at the tip of the branch.
    pub fn sha(&self) -> &str {
        &self.commit.sha
    }
}

/// The commit reference embedded in a branch response.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchCommit {
    /// Commit SHA
    pub sha: String,
}

/// Metadata for a single file in a repository.
///
/// Only the size is needed to decide whether a file such as `Jenkinsfile` has content.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileMetadata {
    /// File name
    pub name: String,
    /// Full path inside the repository
    pub path: String,
    /// Size in bytes
    pub size: u64,
}
