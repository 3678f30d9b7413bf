//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use team_organizer_core::{AutoCicdMode, OrchestratorOptions, RunMode};

use crate::errors::Error;

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;

/// Team Organizer: reconcile GitHub teams and repositories with a declared configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "team-organizer")]
#[command(
    about = "Reconcile GitHub teams and repositories with a declared configuration",
    long_about = None
)]
pub struct Cli {
    /// GitHub API token
    #[arg(short = 'k', long, env = "GITHUB_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// GitHub organization, overrides the one named in the configuration file
    #[arg(short = 'o', long, env = "GITHUB_ORGANIZATION")]
    pub org: Option<String>,

    /// Perform changes
    #[arg(short = 'a', long, conflicts_with = "test")]
    pub apply: bool,

    /// Only report changes (default)
    #[arg(short = 't', long)]
    pub test: bool,

    /// Path of the configuration file
    #[arg(short = 'c', long, default_value = "team-organizer.toml")]
    pub config: PathBuf,

    /// Do not ask for confirmation in apply mode
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Also reconcile the repositories of subprojects
    #[arg(long)]
    pub walk_subprojects: bool,

    /// Number of repositories reconciled at the same time
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// CI mode for repositories that do not set one (none or jenkins)
    #[arg(long, env = "AUTO_CICD_PROTECTION_MODE", value_parser = parse_cicd_mode)]
    pub auto_cicd_mode: Option<AutoCicdMode>,

    /// Write logs as JSON
    #[arg(long)]
    pub log_json: bool,
}

fn parse_cicd_mode(value: &str) -> Result<AutoCicdMode, String> {
    value.parse().map_err(|e: team_organizer_core::ValidationError| e.to_string())
}

impl Cli {
    pub fn mode(&self) -> RunMode {
        if self.apply {
            RunMode::Apply
        } else {
            RunMode::DryRun
        }
    }

    pub fn api_key(&self) -> Result<&str, Error> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::Auth(
                "no API token, pass --api-key or set GITHUB_API_KEY".to_string(),
            )),
        }
    }

    /// Picks the organization from the arguments, falling back to the configuration file.
    pub fn organization(&self, from_config: Option<&str>) -> Result<String, Error> {
        self.org
            .as_deref()
            .or(from_config)
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::InvalidArguments(
                    "no organization, pass --org, set GITHUB_ORGANIZATION \
                     or add `organization` to the configuration"
                        .to_string(),
                )
            })
    }

    pub fn orchestrator_options(&self) -> Result<OrchestratorOptions, Error> {
        if self.concurrency == 0 {
            return Err(Error::InvalidArguments(
                "--concurrency must be at least 1".to_string(),
            ));
        }
        Ok(OrchestratorOptions {
            max_concurrent_repositories: self.concurrency,
            walk_subprojects: self.walk_subprojects,
        })
    }
}
