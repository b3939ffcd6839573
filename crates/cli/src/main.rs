//! querycontext CLI entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: command-line flags, falling back to the
//!    `BACKEND_URL` / `BACKEND_TIMEOUT_SECS` environment variables.
//! 2. **Wire observability**: configure `tracing-subscriber` with a pretty or
//!    JSON layer on stderr, plus an OpenTelemetry OTLP exporter when
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set. Spans and events from every crate
//!    flow through these layers.
//! 3. **Construct infrastructure**: one `FileCookieStore`, one
//!    `HttpRequestExecutor`, and one `QueryContext`, built once and passed to
//!    the command that runs.
//! 4. **Run one command**: `login`, `get`, `mutate`, `session`, or `token`.
//!
//! Normalised JSON goes to stdout. The process exits with status 1 when the
//! call did not complete.

mod args;
mod commands;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use context::QueryContext;
use session::FileCookieStore;
use transport::{HttpConfig, HttpRequestExecutor};

use crate::args::{CliConfig, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliConfig::parse();

    let _telemetry = match telemetry::init(cli.log_format) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::FAILURE
        }
    }
}

/// Runs the selected command. `Ok(false)` means the call did not complete.
async fn run(cli: CliConfig) -> anyhow::Result<bool> {
    let cookies = Arc::new(FileCookieStore::new(&cli.cookie_file));
    let connect = || build_context(cli.base_url.as_deref(), cli.timeout_secs, cookies.clone());

    match cli.command {
        Command::Token(action) => commands::token(cookies.as_ref(), action).await,
        Command::Get { endpoint } => commands::get(&connect()?, &endpoint).await,
        Command::Mutate(request) => commands::mutate(&connect()?, request).await,
        Command::Session => commands::session(&connect()?).await,
        Command::Login(args) => commands::login(&connect()?, cookies.as_ref(), args).await,
    }
}

fn build_context(
    base_url: Option<&str>,
    timeout_secs: Option<u64>,
    cookies: Arc<FileCookieStore>,
) -> anyhow::Result<QueryContext> {
    let mut config = match base_url {
        Some(url) => HttpConfig::new(url)?,
        None => HttpConfig::from_env()?,
    };
    if let Some(secs) = timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs))?;
    }

    let executor =
        HttpRequestExecutor::new(config, cookies).context("building the HTTP executor")?;
    Ok(QueryContext::new(Arc::new(executor)))
}
