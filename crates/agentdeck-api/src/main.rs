//! agentdeck CLI and REST API entry point.
//!
//! Binary name: `adeck`
//!
//! Parses CLI arguments, initializes tracing, the database and services,
//! then dispatches to a command handler or starts the HTTP server.

mod cli;
mod http;
mod state;

use anyhow::anyhow;
use clap::Parser;
use secrecy::SecretString;

use agentdeck_infra::auth::jwt::JWT_SECRET_ENV;
use agentdeck_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{AgentCommand, Cli, Commands, TokenCommand, UserCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        verbosity: cli.verbose,
        json: cli.log_json,
        otel: cli.otel,
    })
    .map_err(|e| anyhow!("failed to initialize tracing: {e}"))?;

    let result = run(cli).await;
    shutdown_tracing();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let jwt_secret = cli
        .jwt_secret
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from)
        .ok_or_else(|| anyhow!("{JWT_SECRET_ENV} (or --jwt-secret) must be set"))?;

    let state = AppState::init(jwt_secret).await?;

    match cli.command {
        Commands::Serve { port, host } => serve(state, host, port).await?,

        Commands::User { action } => match action {
            UserCommand::Create { email, name } => {
                cli::user::create_user(&state, email, name, cli.json).await?;
            }
        },

        Commands::Agent { action } => match action {
            AgentCommand::Create {
                user,
                name,
                system_prompt,
                provider,
                model,
                temperature,
                max_tokens,
            } => {
                cli::agent::create_agent(
                    &state,
                    user,
                    name,
                    system_prompt,
                    provider,
                    model,
                    temperature,
                    max_tokens,
                    cli.json,
                )
                .await?;
            }
        },

        Commands::Token { action } => match action {
            TokenCommand::Issue { user, ttl_hours } => {
                cli::token::issue_token(&state, user, ttl_hours, cli.json).await?;
            }
        },

        Commands::Metrics {
            user,
            agent,
            period,
        } => {
            cli::metrics::show_metrics(&state, user, agent, period, cli.json).await?;
        }
    }

    Ok(())
}

async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} agentdeck API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());
    tracing::info!(%addr, data_dir = %state.data_dir.display(), "server started");

    let hub = state.hub.clone();
    let db_pool = state.db_pool.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    hub.shutdown();
    db_pool.close().await;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to install SIGTERM handler: {err}");
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
