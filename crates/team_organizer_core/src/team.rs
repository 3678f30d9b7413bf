//! Team domain types
//!
//! Desired-state representation of an organization team and the users that belong to it.

use github_client::{TeamPrivacy, User};

use crate::errors::ValidationError;

#[cfg(test)]
#[path = "team_tests.rs"]
mod tests;

/// A reference to a user, either by login or already resolved against the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Login(String),
    Resolved(User),
}

impl UserRef {
    /// The login of the referenced user.
    pub fn login(&self) -> &str {
        match self {
            Self::Login(login) => login,
            Self::Resolved(user) => &user.login,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Case-insensitive login comparison, matching how GitHub treats logins.
    pub fn same_login(&self, login: &str) -> bool {
        self.login().eq_ignore_ascii_case(login)
    }
}

impl From<&str> for UserRef {
    fn from(login: &str) -> Self {
        Self::Login(login.to_string())
    }
}

impl From<String> for UserRef {
    fn from(login: String) -> Self {
        Self::Login(login)
    }
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        Self::Resolved(user)
    }
}

impl std::fmt::Display for UserRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.login())
    }
}

/// A team as it should exist in the organization.
///
/// Only membership and metadata are reconciled. Teams that exist in the organization but
/// are not configured are never deleted.
///
/// # Examples
///
/// ```rust
/// use team_organizer_core::Team;
///
/// let team = Team::new("platform-core")
///     .unwrap()
///     .with_description("Platform core")
///     .with_maintainers(["alice"])
///     .with_members(["bob", "carol"]);
///
/// assert_eq!(team.members().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    name: String,
    description: String,
    privacy: TeamPrivacy,
    maintainers: Vec<UserRef>,
    members: Vec<UserRef>,
}

impl Team {
    /// Creates a team with no description, closed privacy and no users.
    ///
    /// # Errors
    /// Returns `ValidationError` when the name is empty or has surrounding whitespace.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("team.name"));
        }

        if name.trim() != name {
            return Err(ValidationError::invalid_format(
                "team.name",
                "must not start or end with whitespace",
            ));
        }

        Ok(Self {
            name,
            description: String::new(),
            privacy: TeamPrivacy::Closed,
            maintainers: Vec::new(),
            members: Vec::new(),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_privacy(mut self, privacy: TeamPrivacy) -> Self {
        self.privacy = privacy;
        self
    }

    /// Adds maintainers, skipping logins that are already listed.
    ///
    /// A login can hold one role only. Adding it as maintainer drops it from the members.
    pub fn with_maintainers<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserRef>,
    {
        extend_unique(&mut self.maintainers, users);
        let maintainers = &self.maintainers;
        self.members
            .retain(|m| !maintainers.iter().any(|u| u.same_login(m.login())));
        self
    }

    /// Adds members, skipping logins that are already listed as member or maintainer.
    pub fn with_members<I, U>(mut self, users: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserRef>,
    {
        let users: Vec<UserRef> = users
            .into_iter()
            .map(Into::into)
            .filter(|u| !self.maintainers.iter().any(|m| m.same_login(u.login())))
            .collect();
        extend_unique(&mut self.members, users);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn privacy(&self) -> TeamPrivacy {
        self.privacy
    }

    pub fn maintainers(&self) -> &[UserRef] {
        &self.maintainers
    }

    pub fn members(&self) -> &[UserRef] {
        &self.members
    }

    /// Iterates over every user reference of the team, mutably.
    pub(crate) fn users_mut(&mut self) -> impl Iterator<Item = &mut UserRef> {
        self.maintainers.iter_mut().chain(self.members.iter_mut())
    }

    /// Returns `true` when the name refers to this team, ignoring case.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

fn extend_unique<I, U>(target: &mut Vec<UserRef>, users: I)
where
    I: IntoIterator<Item = U>,
    U: Into<UserRef>,
{
    for user in users {
        let user = user.into();
        if !target.iter().any(|u| u.same_login(user.login())) {
            target.push(user);
        }
    }
}
