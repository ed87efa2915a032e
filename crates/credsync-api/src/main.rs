//! credsync CLI and REST API entry point.
//!
//! Binary name: `credsync`
//!
//! Parses CLI arguments, opens the vault, then dispatches to the command
//! handler or starts the REST API server together with the sync scheduler.

mod cli;
mod http;
mod jobs;
mod state;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clap_complete::generate;
use secrecy::{ExposeSecret, SecretString};
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use credsync_infra::config::{load_app_config, resolve_data_dir};
use credsync_infra::crypto::cipher::AesGcmCipher;
use credsync_observe::tracing_setup::{init_tracing, shutdown_tracing};

use cli::{Cli, Commands, CredentialCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,credsync=debug",
        _ => "trace",
    };
    init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(mut cli: Cli) -> anyhow::Result<()> {
    // Commands that need neither the vault nor the data directory.
    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            generate(*shell, &mut cmd, "credsync", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Keygen => {
            let key = AesGcmCipher::generate_key();
            if cli.json {
                println!("{}", serde_json::json!({ "master_key": key.expose_secret() }));
            } else {
                println!();
                println!(
                    "  {} New master key (store it safely, it cannot be recovered):",
                    console::style("🔑").bold()
                );
                println!();
                println!("  {}", console::style(key.expose_secret()).yellow().bold());
                println!();
            }
            return Ok(());
        }
        _ => {}
    }

    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    let config = load_app_config(&data_dir).await;

    if let Commands::Jobs = cli.command {
        return cli::jobs::list_jobs(&config.scheduler, cli.json);
    }

    let master_key = cli
        .master_key
        .take()
        .map(SecretString::from)
        .context("MASTER_KEY is required (set the env var or pass --master-key)")?;
    let state = AppState::init(data_dir, config, &master_key).await?;

    match cli.command {
        Commands::Credentials { action } => match action {
            CredentialCommand::List { tenant } => {
                cli::credential::list_credentials(&state, &tenant, cli.json).await?;
            }
            CredentialCommand::History {
                tenant,
                credential_type,
            } => {
                cli::credential::credential_history(&state, &tenant, credential_type, cli.json)
                    .await?;
            }
            CredentialCommand::Revoke {
                tenant,
                credential_type,
            } => {
                cli::credential::revoke_credential(&state, &tenant, credential_type, cli.json)
                    .await?;
            }
        },

        Commands::Serve { port, host } => serve(state, &host, port).await?,

        Commands::Completions { .. } | Commands::Keygen | Commands::Jobs => {
            unreachable!("handled above")
        }
    }

    Ok(())
}

/// Run the HTTP server and the scheduler until a shutdown signal.
///
/// Ctrl+C / SIGTERM cancels the root token: the server drains, the
/// dispatcher stops launching and waits for in-flight runs. If the server
/// fails, the scheduler is stopped and the error returned. A dispatcher
/// panic takes the process down after the server has drained.
async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    jobs::register_catalogue(
        &state.scheduler,
        Arc::clone(&state.vault),
        &state.config.scheduler,
    )
    .await?;
    let dispatcher = state.scheduler.start(cancel.child_token())?;

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} credsync API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    tokio::spawn(shutdown_signal(cancel.clone()));

    let router = http::router::build_router(state);
    let server = axum::serve(listener, router).with_graceful_shutdown(cancel.clone().cancelled_owned());
    let server = tokio::spawn(async move { server.await });
    supervise(server, dispatcher, &cancel).await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for the server or the dispatcher to stop, then stop the other.
///
/// Whichever side ends first (signal, server error, dispatcher panic)
/// cancels `cancel`; the other side is drained before returning.
async fn supervise(
    mut server: JoinHandle<std::io::Result<()>>,
    mut dispatcher: JoinHandle<()>,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let first = tokio::select! {
        served = &mut server => Exit::Server(served),
        dispatched = &mut dispatcher => Exit::Dispatcher(dispatched),
    };
    cancel.cancel();

    let (served, dispatched) = match first {
        Exit::Server(served) => {
            tracing::debug!("http server exited, stopping scheduler");
            (served, dispatcher.await)
        }
        Exit::Dispatcher(dispatched) => (server.await, dispatched),
    };
    served??;
    reraise(dispatched)
}

enum Exit {
    Server(Result<std::io::Result<()>, JoinError>),
    Dispatcher(Result<(), JoinError>),
}

fn reraise(joined: Result<(), JoinError>) -> anyhow::Result<()> {
    match joined {
        Ok(()) => Ok(()),
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(anyhow::anyhow!("sync dispatcher failed: {e}")),
    }
}

/// Wait for Ctrl+C or SIGTERM, then cancel `cancel`.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => return,
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
