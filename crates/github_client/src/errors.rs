//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. Callers in the reconciliation engine use the variants to
//! decide whether a failure drives a create path (`NotFound`) or should be isolated at the
//! entity boundary (everything else).

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust,ignore
/// use github_client::Error;
///
/// match client.get_branch("my-org", "svc", "develop").await {
///     Ok(branch) => println!("Branch tip: {}", branch.sha),
///     Err(Error::NotFound) => println!("Branch needs to be created"),
///     Err(err) => eprintln!("Other error: {}", err),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A GitHub API request failed.
    ///
    /// The contained string carries the message GitHub returned, or a description of the
    /// transport failure.
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Authentication or GitHub client initialization failure.
    ///
    /// This error occurs when:
    /// - The API token is invalid, expired or revoked
    /// - The token lacks the scopes needed for organization administration
    /// - The octocrab client cannot be built
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GraphQL endpoint answered with an `errors` array.
    ///
    /// The contained string joins the messages of all reported errors.
    #[error("GraphQL request failed: {0}")]
    GraphQl(String),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    ///
    /// This error occurs when a GitHub API request returns a 404 status code. For teams,
    /// branches, files and rules this is an expected outcome that drives a create path.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl Error {
    /// Returns `true` when the error means the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }
}
