//! The steps of one command invocation, outside of process setup.

use std::io::{BufRead, Write};
use std::sync::Arc;

use github_client::OrganizationClient;
use team_organizer_core::{
    CancellationToken, ConfigurationError, DesiredState, Orchestrator, ReconcileContext,
    RunReport, UserDirectory,
};
use tracing::{info, instrument};

use crate::args::Cli;
use crate::errors::Error;

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Exit code when every entity reconciled.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code when at least one entity failed.
pub const EXIT_ENTITY_FAILED: i32 = 1;
/// Exit code when the run could not start.
pub const EXIT_FATAL: i32 = 2;

/// Loads the configuration file and picks the organization.
pub fn load_configuration(cli: &Cli) -> Result<(String, DesiredState), Error> {
    let loaded = config_manager::load_desired_state(&cli.config)?;
    let organization = cli.organization(loaded.organization.as_deref())?;
    Ok((organization, loaded.desired_state))
}

/// Waits for the user to press enter.
pub fn confirm_apply<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<(), Error> {
    write!(output, "Press enter to continue...").map_err(|_| Error::StdOutFlushFailed)?;
    output.flush().map_err(|_| Error::StdOutFlushFailed)?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| Error::InvalidArguments(format!("failed to read confirmation: {e}")))?;
    Ok(())
}

/// Checks the organization, resolves users and runs the orchestrator.
///
/// # Errors
///
/// Fails before any change is made when the organization cannot be read or a configured
/// user does not exist. Failures of single entities are part of the returned report.
#[instrument(skip(cli, client, state, cancel))]
pub async fn reconcile(
    cli: &Cli,
    client: Arc<dyn OrganizationClient>,
    organization: &str,
    mut state: DesiredState,
    cancel: CancellationToken,
) -> Result<RunReport, Error> {
    let options = cli.orchestrator_options()?;

    client
        .get_organization(organization)
        .await
        .map_err(|e| match e {
            github_client::Error::NotFound => Error::Config(
                ConfigurationError::OrganizationNotFound {
                    organization: organization.to_string(),
                }
                .to_string(),
            ),
            github_client::Error::AuthError(reason) => Error::Auth(reason),
            other => Error::Reconciliation(other.to_string()),
        })?;

    let mut users = UserDirectory::new();
    state
        .resolve_users(client.as_ref(), &mut users)
        .await
        .map_err(|e| {
            if e.is_fatal() {
                Error::Config(e.to_string())
            } else {
                Error::Reconciliation(e.to_string())
            }
        })?;

    let ctx = ReconcileContext::new(client, organization, cli.mode())
        .with_default_cicd_mode(cli.auto_cicd_mode.unwrap_or_default());
    info!(organization, mode = %ctx.mode(), "Reconciling organization");

    Ok(Orchestrator::new(ctx, options)
        .with_cancellation(cancel)
        .run(&state)
        .await)
}

pub fn exit_code(result: &Result<RunReport, Error>) -> i32 {
    match result {
        Ok(report) if report.is_success() => EXIT_SUCCESS,
        Ok(_) => EXIT_ENTITY_FAILED,
        Err(_) => EXIT_FATAL,
    }
}
