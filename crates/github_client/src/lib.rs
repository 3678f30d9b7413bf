//! Crate for interacting with the GitHub REST and GraphQL APIs.
//!
//! This crate provides the [`OrganizationClient`] trait, the only boundary through which the
//! organizer reads or changes live organization state, and [`GitHubClient`], its
//! implementation on top of an authenticated [`Octocrab`] instance.

use async_trait::async_trait;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{Branch, FileMetadata, Organization, User};

pub mod branch_protection;
pub use branch_protection::{
    BranchProtectionRule, BranchProtectionSettings, RepositoryProtectionState,
};

pub mod repository;
pub use repository::{Repository, RepositorySettingsUpdate};

pub mod team;
pub use team::{
    RepositoryPermission, RepositoryTeam, Team, TeamCreatePayload, TeamPrivacy, TeamRole,
    TeamUpdatePayload,
};

mod graphql;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Number of items requested per page for list endpoints.
const PAGE_SIZE: usize = 100;

/// Operations the organizer needs from the hosting provider.
///
/// Read operations never change state. Write operations are only issued by reconcilers
/// running in apply mode. Implementations own all retry and timeout policy.
#[async_trait]
pub trait OrganizationClient: Send + Sync {
    /// Fetches an organization. Used at startup to verify credentials.
    async fn get_organization(&self, org: &str) -> Result<Organization, Error>;

    /// Fetches a user account by login.
    async fn get_user(&self, login: &str) -> Result<User, Error>;

    /// Lists every team in the organization.
    async fn list_teams(&self, org: &str) -> Result<Vec<Team>, Error>;

    /// Creates a team.
    ///
    /// GitHub does not reliably apply a description given at creation time, so callers
    /// follow up with [`OrganizationClient::update_team`].
    async fn create_team(&self, org: &str, payload: &TeamCreatePayload) -> Result<Team, Error>;

    /// Edits the name, description and privacy of a team.
    async fn update_team(
        &self,
        org: &str,
        team_slug: &str,
        payload: &TeamUpdatePayload,
    ) -> Result<Team, Error>;

    /// Lists the users holding `role` in a team.
    async fn list_team_members(
        &self,
        org: &str,
        team_slug: &str,
        role: TeamRole,
    ) -> Result<Vec<User>, Error>;

    /// Adds a user to a team, or changes the role of an existing member.
    async fn add_team_membership(
        &self,
        org: &str,
        team_slug: &str,
        login: &str,
        role: TeamRole,
    ) -> Result<(), Error>;

    /// Removes a user from a team.
    async fn remove_team_membership(
        &self,
        org: &str,
        team_slug: &str,
        login: &str,
    ) -> Result<(), Error>;

    /// Lists all repositories owned by the organization.
    async fn list_organization_repositories(&self, org: &str) -> Result<Vec<Repository>, Error>;

    /// Fetches a repository including its merge settings.
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error>;

    /// Updates settings for a repository. Only the fields that are set are changed.
    async fn update_repository_settings(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<(), Error>;

    /// Returns whether vulnerability alerts are enabled.
    async fn vulnerability_alerts_enabled(&self, owner: &str, repo: &str) -> Result<bool, Error>;

    /// Enables vulnerability alerts.
    async fn enable_vulnerability_alerts(&self, owner: &str, repo: &str) -> Result<(), Error>;

    /// Returns whether automated security fixes are enabled.
    async fn automated_security_fixes_enabled(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<bool, Error>;

    /// Enables automated security fixes.
    async fn enable_automated_security_fixes(&self, owner: &str, repo: &str)
        -> Result<(), Error>;

    /// Lists the teams with access to a repository and the permission each holds.
    async fn list_repository_teams(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepositoryTeam>, Error>;

    /// Grants a team `permission` on a repository, replacing any previous grant.
    async fn set_team_repository_permission(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: RepositoryPermission,
    ) -> Result<(), Error>;

    /// Removes a team's access to a repository.
    async fn remove_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<(), Error>;

    /// Lists collaborators whose access is granted directly rather than through a team.
    async fn list_direct_collaborators(&self, owner: &str, repo: &str)
        -> Result<Vec<User>, Error>;

    /// Removes a collaborator from a repository.
    async fn remove_collaborator(&self, owner: &str, repo: &str, login: &str)
        -> Result<(), Error>;

    /// Fetches a branch. Returns [`Error::NotFound`] when it does not exist.
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error>;

    /// Creates `refs/heads/<branch>` pointing at `sha`.
    async fn create_branch_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), Error>;

    /// Fetches metadata for a file. Returns [`Error::NotFound`] when it does not exist.
    async fn get_file(&self, owner: &str, repo: &str, path: &str) -> Result<FileMetadata, Error>;

    /// Reads the repository node ID and every branch protection rule.
    async fn get_branch_protection_state(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryProtectionState, Error>;

    /// Creates a branch protection rule. Returns the node ID of the new rule.
    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<String, Error>;

    /// Replaces the fields of an existing branch protection rule.
    async fn update_branch_protection_rule(
        &self,
        rule_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<(), Error>;

    /// Deletes a branch protection rule.
    async fn delete_branch_protection_rule(&self, rule_id: &str) -> Result<(), Error>;
}

/// A client for interacting with the GitHub API, authenticated with a personal access token.
#[derive(Debug)]
pub struct GitHubClient {
    client: Octocrab,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` from an authenticated `Octocrab` instance.
    ///
    /// Use [`create_token_client`] to build the instance from an API token.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Fetches every page of a list endpoint.
    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        message: &str,
    ) -> Result<Vec<T>, Error> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let route = format!("{path}{separator}per_page={PAGE_SIZE}&page={page}");
            let batch: Vec<T> = self
                .client
                .get(route, None::<&()>)
                .await
                .map_err(|e| map_octocrab_error(message, e))?;

            let is_last = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if is_last {
                break;
            }
            page += 1;
        }

        debug!(path = path, count = items.len(), "Fetched all pages");
        Ok(items)
    }

    /// Issues a PUT whose response has no body (HTTP 204).
    async fn put_no_content<B: Serialize + ?Sized>(
        &self,
        path: String,
        body: Option<&B>,
        message: &str,
    ) -> Result<(), Error> {
        let response = self
            .client
            ._put(path, body)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        Ok(())
    }

    /// Issues a DELETE whose response has no body (HTTP 204).
    async fn delete_no_content(&self, path: String, message: &str) -> Result<(), Error> {
        let response = self
            .client
            ._delete(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        Ok(())
    }

    /// Issues a GET that answers 2xx when a feature is enabled and 404 when it is not.
    async fn probe(&self, path: String, message: &str) -> Result<bool, Error> {
        let response = self
            .client
            ._get(path)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        match octocrab::map_github_error(response).await {
            Ok(_) => Ok(true),
            Err(e) => match map_octocrab_error(message, e) {
                Error::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn run_graphql(
        &self,
        request: &serde_json::Value,
        message: &str,
    ) -> Result<serde_json::Value, Error> {
        let response: serde_json::Value = self
            .client
            .graphql(request)
            .await
            .map_err(|e| map_octocrab_error(message, e))?;
        graphql::into_data(response)
    }
}

#[async_trait]
impl OrganizationClient for GitHubClient {
    #[instrument(skip(self))]
    async fn get_organization(&self, org: &str) -> Result<Organization, Error> {
        let path = format!("/orgs/{org}");
        let organization: Organization = self
            .client
            .get(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to get organization", e))?;

        info!(org = org, id = organization.id, "Retrieved organization");
        Ok(organization)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, login: &str) -> Result<User, Error> {
        let path = format!("/users/{login}");
        self.client
            .get(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to get user", e))
    }

    #[instrument(skip(self))]
    async fn list_teams(&self, org: &str) -> Result<Vec<Team>, Error> {
        self.get_all_pages(&format!("/orgs/{org}/teams"), "Failed to list teams")
            .await
    }

    #[instrument(skip(self, payload), fields(team = %payload.name))]
    async fn create_team(&self, org: &str, payload: &TeamCreatePayload) -> Result<Team, Error> {
        let path = format!("/orgs/{org}/teams");
        let team: Team = self
            .client
            .post(path, Some(payload))
            .await
            .map_err(|e| map_octocrab_error("Failed to create team", e))?;

        info!(org = org, team = team.slug, "Created team");
        Ok(team)
    }

    #[instrument(skip(self, payload))]
    async fn update_team(
        &self,
        org: &str,
        team_slug: &str,
        payload: &TeamUpdatePayload,
    ) -> Result<Team, Error> {
        let path = format!("/orgs/{org}/teams/{team_slug}");
        self.client
            .patch(path, Some(payload))
            .await
            .map_err(|e| map_octocrab_error("Failed to update team", e))
    }

    #[instrument(skip(self))]
    async fn list_team_members(
        &self,
        org: &str,
        team_slug: &str,
        role: TeamRole,
    ) -> Result<Vec<User>, Error> {
        let path = format!("/orgs/{org}/teams/{team_slug}/members?role={}", role.as_str());
        self.get_all_pages(&path, "Failed to list team members")
            .await
    }

    #[instrument(skip(self))]
    async fn add_team_membership(
        &self,
        org: &str,
        team_slug: &str,
        login: &str,
        role: TeamRole,
    ) -> Result<(), Error> {
        let path = format!("/orgs/{org}/teams/{team_slug}/memberships/{login}");
        let payload = team::TeamMembershipPayload { role };
        let _: serde_json::Value = self
            .client
            .put(path, Some(&payload))
            .await
            .map_err(|e| map_octocrab_error("Failed to add team membership", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_team_membership(
        &self,
        org: &str,
        team_slug: &str,
        login: &str,
    ) -> Result<(), Error> {
        let path = format!("/orgs/{org}/teams/{team_slug}/memberships/{login}");
        self.delete_no_content(path, "Failed to remove team membership")
            .await
    }

    #[instrument(skip(self))]
    async fn list_organization_repositories(&self, org: &str) -> Result<Vec<Repository>, Error> {
        self.get_all_pages(
            &format!("/orgs/{org}/repos?type=all"),
            "Failed to list organization repositories",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_repository(&self, owner: &str, repo: &str) -> Result<Repository, Error> {
        let path = format!("/repos/{owner}/{repo}");
        self.client
            .get(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to get repository", e))
    }

    #[instrument(skip(self, settings), fields(owner = %owner, repo = %repo))]
    async fn update_repository_settings(
        &self,
        owner: &str,
        repo: &str,
        settings: &RepositorySettingsUpdate,
    ) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}");
        let _: serde_json::Value = self
            .client
            .patch(path, Some(settings))
            .await
            .map_err(|e| map_octocrab_error("Failed to update repository settings", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn vulnerability_alerts_enabled(&self, owner: &str, repo: &str) -> Result<bool, Error> {
        self.probe(
            format!("/repos/{owner}/{repo}/vulnerability-alerts"),
            "Failed to check vulnerability alerts",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn enable_vulnerability_alerts(&self, owner: &str, repo: &str) -> Result<(), Error> {
        self.put_no_content(
            format!("/repos/{owner}/{repo}/vulnerability-alerts"),
            None::<&()>,
            "Failed to enable vulnerability alerts",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn automated_security_fixes_enabled(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<bool, Error> {
        let path = format!("/repos/{owner}/{repo}/automated-security-fixes");
        let result: Result<serde_json::Value, _> = self.client.get(path, None::<&()>).await;
        match result {
            Ok(status) => Ok(status
                .get("enabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)),
            Err(e) => match map_octocrab_error("Failed to check automated security fixes", e) {
                Error::NotFound => Ok(false),
                other => Err(other),
            },
        }
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn enable_automated_security_fixes(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<(), Error> {
        self.put_no_content(
            format!("/repos/{owner}/{repo}/automated-security-fixes"),
            None::<&()>,
            "Failed to enable automated security fixes",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn list_repository_teams(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<RepositoryTeam>, Error> {
        self.get_all_pages(
            &format!("/repos/{owner}/{repo}/teams"),
            "Failed to list repository teams",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn set_team_repository_permission(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
        permission: RepositoryPermission,
    ) -> Result<(), Error> {
        let payload = team::TeamRepositoryPayload { permission };
        self.put_no_content(
            format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"),
            Some(&payload),
            "Failed to set team repository permission",
        )
        .await
    }

    #[instrument(skip(self))]
    async fn remove_team_repository(
        &self,
        org: &str,
        team_slug: &str,
        owner: &str,
        repo: &str,
    ) -> Result<(), Error> {
        self.delete_no_content(
            format!("/orgs/{org}/teams/{team_slug}/repos/{owner}/{repo}"),
            "Failed to remove team from repository",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn list_direct_collaborators(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<User>, Error> {
        self.get_all_pages(
            &format!("/repos/{owner}/{repo}/collaborators?affiliation=direct"),
            "Failed to list direct collaborators",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn remove_collaborator(
        &self,
        owner: &str,
        repo: &str,
        login: &str,
    ) -> Result<(), Error> {
        self.delete_no_content(
            format!("/repos/{owner}/{repo}/collaborators/{login}"),
            "Failed to remove collaborator",
        )
        .await
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_branch(&self, owner: &str, repo: &str, branch: &str) -> Result<Branch, Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}");
        self.client
            .get(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to get branch", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn create_branch_ref(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}/git/refs");
        let payload = serde_json::json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": sha,
        });
        let _: serde_json::Value = self
            .client
            .post(path, Some(&payload))
            .await
            .map_err(|e| map_octocrab_error("Failed to create branch", e))?;

        info!(owner = owner, repo = repo, branch = branch, "Created branch");
        Ok(())
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_file(&self, owner: &str, repo: &str, path: &str) -> Result<FileMetadata, Error> {
        let route = format!("/repos/{owner}/{repo}/contents/{path}");
        self.client
            .get(route, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to get file contents", e))
    }

    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    async fn get_branch_protection_state(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<RepositoryProtectionState, Error> {
        let request = graphql::protection_state_request(owner, repo);
        let response = self
            .client
            .graphql::<serde_json::Value>(&request)
            .await
            .map_err(|e| map_octocrab_error("Failed to read branch protection rules", e))?;
        graphql::parse_protection_state(response)
    }

    #[instrument(skip(self, settings))]
    async fn create_branch_protection_rule(
        &self,
        repository_node_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<String, Error> {
        let request = graphql::create_rule_request(repository_node_id, pattern, settings)?;
        let data = self
            .run_graphql(&request, "Failed to create branch protection rule")
            .await?;

        data.pointer("/createBranchProtectionRule/branchProtectionRule/id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                error!(pattern = pattern, "Create mutation returned no rule id");
                Error::InvalidResponse
            })
    }

    #[instrument(skip(self, settings))]
    async fn update_branch_protection_rule(
        &self,
        rule_id: &str,
        pattern: &str,
        settings: &BranchProtectionSettings,
    ) -> Result<(), Error> {
        let request = graphql::update_rule_request(rule_id, pattern, settings)?;
        self.run_graphql(&request, "Failed to update branch protection rule")
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_branch_protection_rule(&self, rule_id: &str) -> Result<(), Error> {
        let request = graphql::delete_rule_request(rule_id);
        self.run_graphql(&request, "Failed to delete branch protection rule")
            .await?;
        Ok(())
    }
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// # Errors
///
/// Returns `Error::AuthError` if the client cannot be built.
///
/// # Example
///
/// ```rust,no_run
/// use github_client::{create_token_client, GitHubClient};
///
/// # fn example() -> Result<(), github_client::Error> {
/// let octocrab = create_token_client("ghp_example")?;
/// let client = GitHubClient::new(octocrab);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(token))]
pub fn create_token_client(token: &str) -> Result<Octocrab, Error> {
    Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to build GitHub client: {e}")))
}

/// Converts an octocrab error into a client [`Error`], logging anything unexpected.
///
/// A 404 is an expected outcome for lookups and is only logged at debug level.
fn map_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    let mapped = match &e {
        octocrab::Error::GitHub { source, .. } => match source.status_code.as_u16() {
            404 => Error::NotFound,
            401 => Error::AuthError(source.message.clone()),
            403 | 429 if source.message.to_ascii_lowercase().contains("rate limit") => {
                Error::RateLimitExceeded
            }
            _ => Error::ApiError(source.message.clone()),
        },
        other => Error::ApiError(other.to_string()),
    };

    if mapped.is_not_found() {
        debug!(message, "Resource not found");
    } else {
        log_octocrab_error(message, e);
    }
    mapped
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                status = err.status_code.as_u16(),
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),

        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
