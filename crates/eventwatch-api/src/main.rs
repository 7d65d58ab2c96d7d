//! eventwatch CLI and REST API entry point.
//!
//! Binary name: `evwatch`
//!
//! Parses CLI arguments, opens the record store and vector index, then
//! dispatches to the appropriate command handler or starts the REST API
//! server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use eventwatch_observe::LogFormat;
use eventwatch_types::event::EventFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,eventwatch=debug",
        _ => "trace",
    };
    eventwatch_observe::init_tracing(filter, LogFormat::Pretty, cli.otel)
        .map_err(|e| anyhow::anyhow!(e))?;

    let result = run(cli).await;
    eventwatch_observe::shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "evwatch", &mut std::io::stdout());
        return Ok(());
    }

    // Open both stores and the embedder
    let state = AppState::init().await?;

    match cli.command {
        Commands::Ingest { payload } => {
            cli::event::ingest(&state, &payload, cli.json).await?;
        }

        Commands::Submit { text } => {
            cli::event::submit(&state, &text, cli.json).await?;
        }

        Commands::List {
            event_types,
            locations,
            categories,
        } => {
            let filter = EventFilter {
                event_types,
                locations,
                categories,
            };
            cli::event::list(&state, filter, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::event::show(&state, &id, cli.json).await?;
        }

        Commands::Delete { id } => {
            cli::event::delete(&state, &id, cli.json).await?;
        }

        Commands::Reconcile => {
            cli::status::reconcile(&state, cli.json).await?;
        }

        Commands::Status => {
            cli::status::status(&state, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| state.config.server.host.clone());
            let port = port.unwrap_or(state.config.server.port);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} eventwatch API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            if state.pipeline.is_none() {
                println!(
                    "  {}",
                    console::style(format!(
                        "Report submission disabled (set {})",
                        state.config.llm.api_key_env
                    ))
                    .yellow()
                );
            }
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state);

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
///
/// If a handler cannot be installed, that signal source is ignored and the
/// server keeps running until the other one fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
