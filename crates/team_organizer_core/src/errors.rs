//! Error types for the reconciliation engine.
//!
//! [`OrganizerError`] follows the failure taxonomy of a reconciliation run. `NotFound` is an
//! expected outcome and `Provider` failures are isolated at the entity boundary that caused
//! them. `Configuration` failures abort the run before any reconciliation starts.
//!
//! Policy violations are not errors. Reconcilers log them as warnings and count them in
//! [`ReconcileStats`](crate::ReconcileStats).

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Field-level errors raised while constructing desired-state values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Duplicate {kind} '{name}'")]
    Duplicate { kind: String, name: String },
}

impl ValidationError {
    /// Create an empty field error
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a duplicate entry error
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// Failures that make the desired state unusable. These abort the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Organization '{organization}' could not be found or is not accessible")]
    OrganizationNotFound { organization: String },

    #[error("User '{login}' does not exist")]
    UnknownUser { login: String },

    #[error("Invalid desired state: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors raised while reconciling the organization.
#[derive(Error, Debug)]
pub enum OrganizerError {
    /// An expected-absent resource. Drives a create path and is never fatal.
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// A provider call failed while reading or writing a single entity.
    #[error("Provider call '{operation}' failed: {source}")]
    Provider {
        operation: String,
        #[source]
        source: github_client::Error,
    },

    /// The run cannot start.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The `master` branch is missing, so precreated branches have no source commit.
    #[error("Repository '{repository}' has no master branch to create branches from")]
    MasterBranchMissing { repository: String },

    /// The run was cancelled before this entity was reconciled.
    #[error("Reconciliation aborted")]
    Aborted,
}

impl OrganizerError {
    /// Wraps a provider failure with the name of the operation that failed.
    pub fn provider(operation: impl Into<String>, source: github_client::Error) -> Self {
        Self::Provider {
            operation: operation.into(),
            source,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Returns `true` for errors that must terminate the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<ValidationError> for OrganizerError {
    fn from(err: ValidationError) -> Self {
        Self::Configuration(ConfigurationError::Validation(err))
    }
}

/// Result alias used throughout the engine.
pub type OrganizerResult<T> = Result<T, OrganizerError>;
