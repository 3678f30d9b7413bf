//! Team domain types.
//!
//! This module contains types representing GitHub organization teams, their membership
//! roles, and the permission a team holds on a repository.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;

/// Visibility of a team inside the organization.
///
/// GitHub only accepts `closed` and `secret` for non-nested teams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamPrivacy {
    /// Visible to every member of the organization
    #[default]
    Closed,
    /// Only visible to organization owners and team members
    Secret,
}

impl TeamPrivacy {
    /// Returns the value used by the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Secret => "secret",
        }
    }
}

impl std::fmt::Display for TeamPrivacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a user holds inside a team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    /// Can manage the team's membership and settings
    Maintainer,
    /// Regular member
    Member,
}

impl TeamRole {
    /// Returns the value used by the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Maintainer => "maintainer",
            Self::Member => "member",
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission level a team holds on a repository.
///
/// `Maintain` and custom organization roles are read from the API but never
/// granted by the organizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryPermission {
    /// Read access
    Pull,
    /// Read access plus issue and pull request management
    Triage,
    /// Write access
    Push,
    /// Write access plus some repository settings
    Maintain,
    /// Full administrative access
    Admin,
    /// A custom repository role
    #[serde(other)]
    Custom,
}

impl RepositoryPermission {
    /// Returns the value used by the REST API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Triage => "triage",
            Self::Push => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
            Self::Custom => "custom",
        }
    }
}

impl std::fmt::Display for RepositoryPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A team in a GitHub organization.
///
/// # Examples
///
/// ```rust
/// use github_client::{Team, TeamPrivacy};
///
/// let team = Team {
///     id: 1,
///     node_id: "T_kwDOAAABcs4AAAAB".to_string(),
///     slug: "platform-core".to_string(),
///     name: "platform-core".to_string(),
///     description: Some("Platform core".to_string()),
///     privacy: Some(TeamPrivacy::Closed),
/// };
///
/// assert!(team.matches_name("Platform-Core"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Numeric team ID
    pub id: u64,
    /// Node ID used for GraphQL actor lists
    pub node_id: String,
    /// URL-safe team identifier used in REST paths
    pub slug: String,
    /// Display name
    pub name: String,
    /// Team description
    #[serde(default)]
    pub description: Option<String>,
    /// Team visibility
    #[serde(default)]
    pub privacy: Option<TeamPrivacy>,
}

impl Team {
    /// Returns `true` when `name` refers to this team by display name or slug.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.slug.eq_ignore_ascii_case(name)
    }
}

/// A team entry from the repository teams listing.
///
/// The listing reports the permission the team holds on that repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryTeam {
    /// Numeric team ID
    pub id: u64,
    /// URL-safe team identifier
    pub slug: String,
    /// Display name
    pub name: String,
    /// Permission held on the repository
    pub permission: RepositoryPermission,
}

impl RepositoryTeam {
    /// Returns `true` when `name` refers to this team by display name or slug.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.slug.eq_ignore_ascii_case(name)
    }
}

/// Payload for creating a team.
///
/// The description is sent in a follow-up edit, see
/// [`OrganizationClient::create_team`](crate::OrganizationClient::create_team).
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamCreatePayload {
    pub name: String,

    pub privacy: TeamPrivacy,
}

/// Payload for editing the metadata of an existing team.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TeamUpdatePayload {
    pub name: String,

    pub description: String,

    pub privacy: TeamPrivacy,
}

/// Payload for adding a user to a team with a role.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TeamMembershipPayload {
    pub role: TeamRole,
}

/// Payload for granting a team access to a repository.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TeamRepositoryPayload {
    pub permission: RepositoryPermission,
}
