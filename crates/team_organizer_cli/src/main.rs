use std::io;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use github_client::GitHubClient;
use team_organizer_core::{CancellationToken, RunReport};
use tracing::{error, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod args;
mod errors;
mod run;
mod summary;

use args::Cli;
use errors::Error;

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_env("TEAM_ORGANIZER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so the summary on stdout can be piped.
    if json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(io::stderr)).init();
    }
}

async fn execute(cli: &Cli, cancel: CancellationToken) -> Result<RunReport, Error> {
    let (organization, state) = run::load_configuration(cli)?;

    let octocrab = github_client::create_token_client(cli.api_key()?)
        .map_err(|e| Error::Auth(e.to_string()))?;
    let client = Arc::new(GitHubClient::new(octocrab));

    let mut stdout = io::stdout();
    write!(stdout, "{}", summary::format_banner(&organization, cli.mode()))
        .map_err(|_| Error::StdOutFlushFailed)?;
    stdout.flush().map_err(|_| Error::StdOutFlushFailed)?;

    if cli.apply && !cli.yes {
        run::confirm_apply(&mut io::stdin().lock(), &mut stdout)?;
    }

    run::reconcile(cli, client, &organization, state, cancel).await
}

#[tokio::main]
async fn main() {
    // A missing .env file is not an error.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.log_json);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current entity");
            signal_token.cancel();
        }
    });

    let result = execute(&cli, cancel).await;
    match &result {
        Ok(report) => print!("{}", summary::format_report(report, cli.mode())),
        Err(e) => error!("Error: {e}"),
    }

    std::process::exit(run::exit_code(&result));
}
