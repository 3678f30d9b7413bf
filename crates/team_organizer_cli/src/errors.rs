use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur in the team organizer CLI.
///
/// Every variant except `Reconciliation` is raised before the first change is made and
/// ends the process with exit code 2.
#[derive(Error, Debug)]
pub enum Error {
    /// Authentication with GitHub failed.
    ///
    /// This error is returned when the token is missing or rejected, or when the client
    /// cannot be built.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The desired state could not be loaded or is not valid.
    ///
    /// This covers the configuration file, the organization lookup and user resolution.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid command-line arguments were provided.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Failed to flush the standard output buffer.
    ///
    /// This error occurs when the CLI cannot write output to the terminal,
    /// typically due to broken pipes or terminal issues.
    #[error("Failed to flush the std out buffer.")]
    StdOutFlushFailed,

    /// The run could not be carried out.
    #[error("Reconciliation error: {0}")]
    Reconciliation(String),
}

impl From<config_manager::ConfigurationError> for Error {
    fn from(err: config_manager::ConfigurationError) -> Self {
        Self::Config(err.to_string())
    }
}
