#![forbid(unsafe_code)]

//! `livestatus-gateway` — HTTP gateway for MKLivestatus backends.
//!
//! Bootstraps configuration, then either serves the HTTP query
//! endpoint or, with `--query`, runs a single exchange and prints the
//! JSON envelope to stdout (exit code 0 on success, 1 on failure).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use livestatus_gateway::config::GlobalConfig;
use livestatus_gateway::gateway::server::{self, AppState};
use livestatus_gateway::gateway::Envelope;
use livestatus_gateway::livestatus::LivestatusClient;
use livestatus_gateway::query::QueryValidator;
use livestatus_gateway::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "livestatus-gateway", about = "HTTP gateway for MKLivestatus backends", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Built-in defaults apply
    /// when omitted (local socket at /var/lib/nagios/rw/live).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Run a single query (with literal \n escapes) instead of serving
    /// HTTP, printing the JSON envelope to stdout.
    #[arg(long)]
    query: Option<String>,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(args)) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "fatal error");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Cli) -> Result<ExitCode> {
    // ── Load configuration ──────────────────────────────
    let config = match args.config {
        Some(path) => GlobalConfig::load_from_path(path)?,
        None => GlobalConfig::default(),
    };

    let validator = QueryValidator::new(&config.query)?;
    let client = LivestatusClient::new(config.backend.clone(), config.timeouts);
    info!(backend = %config.backend, "configuration loaded");

    // ── One-shot CLI mode ───────────────────────────────
    if let Some(raw) = args.query {
        return Ok(run_once(&client, &validator, &raw).await);
    }

    // ── Serve HTTP ──────────────────────────────────────
    let state = Arc::new(AppState { client, validator });
    let ct = CancellationToken::new();

    let server_ct = ct.clone();
    let mut server = tokio::spawn(server::serve(state, config.http_port, server_ct));

    tokio::select! {
        result = &mut server => {
            result.map_err(|err| AppError::Io(format!("server task panicked: {err}")))??;
        }
        () = shutdown_signal() => {
            info!("shutdown signal received");
            ct.cancel();
            let _ = server.await;
        }
    }

    info!("livestatus-gateway shut down");
    Ok(ExitCode::SUCCESS)
}

/// Run one query and print the envelope, mirroring the HTTP contract.
///
/// The connection is closed before the envelope is emitted; the exit
/// code distinguishes success from the uniform failure envelope.
async fn run_once(client: &LivestatusClient, validator: &QueryValidator, raw: &str) -> ExitCode {
    let outcome = match validator.validate(raw) {
        Ok(query) => client.execute(&query).await,
        Err(err) => Err(err),
    };
    if let Err(ref err) = outcome {
        error!(%err, "query failed");
    }

    let envelope = Envelope::from_outcome(outcome);
    println!("{}", envelope.to_json());

    if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr; in one-shot mode stdout carries only the envelope.
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
