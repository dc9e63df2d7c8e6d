//! CLI command definitions for the `adeck` binary.
//!
//! Uses clap derive macros for argument parsing. Commands follow a
//! noun-verb pattern (e.g., `adeck agent create`, `adeck token issue`).

pub mod agent;
pub mod metrics;
pub mod token;
pub mod user;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use agentdeck_types::agent::{MAX_MAX_TOKENS, MIN_MAX_TOKENS};
use agentdeck_types::llm::ProviderKind;
use agentdeck_types::metrics::Period;

/// Run AI agents and watch their metrics live.
#[derive(Parser)]
#[command(name = "adeck", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit structured JSON logs.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Secret used to sign and verify access tokens.
    #[arg(long, env = "AGENTDECK_JWT_SECRET", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API and live metrics server.
    Serve {
        /// Port to listen on (defaults to `server.port` in config.toml).
        #[arg(short, long, env = "AGENTDECK_PORT")]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` in config.toml).
        #[arg(long, env = "AGENTDECK_HOST")]
        host: Option<String>,
    },

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Manage agents.
    Agent {
        #[command(subcommand)]
        action: AgentCommand,
    },

    /// Issue access tokens.
    Token {
        #[command(subcommand)]
        action: TokenCommand,
    },

    /// Print a metrics summary for a user or one of their agents.
    Metrics {
        /// Owner of the agents.
        #[arg(long)]
        user: Uuid,

        /// Limit the summary to one agent.
        #[arg(long)]
        agent: Option<Uuid>,

        /// Lookback window: 1h, 24h, 7d or 30d.
        #[arg(long, default_value = "24h")]
        period: Period,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user.
    Create {
        /// Email address (must be unique).
        #[arg(long)]
        email: String,

        /// Display name.
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AgentCommand {
    /// Create an agent bound to a provider and model.
    Create {
        /// Owning user id.
        #[arg(long)]
        user: Uuid,

        /// Agent name.
        #[arg(long)]
        name: String,

        /// System prompt sent with every turn.
        #[arg(long)]
        system_prompt: String,

        /// Generation provider: openai or gemini.
        #[arg(long, default_value = "openai")]
        provider: ProviderKind,

        /// Model name (defaults to the provider's default model).
        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature, 0.0 to 2.0.
        #[arg(long, default_value_t = 0.7)]
        temperature: f64,

        /// Completion token limit.
        #[arg(
            long,
            default_value_t = 1000,
            value_parser = clap::value_parser!(u32).range(MIN_MAX_TOKENS as i64..=MAX_MAX_TOKENS as i64)
        )]
        max_tokens: u32,
    },
}

#[derive(Subcommand)]
pub enum TokenCommand {
    /// Issue a signed access token for a user.
    Issue {
        /// User the token authenticates.
        #[arg(long)]
        user: Uuid,

        /// Lifetime in hours.
        #[arg(long, default_value_t = 24)]
        ttl_hours: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_agent_create_with_defaults() {
        let user = Uuid::now_v7();
        let cli = Cli::try_parse_from([
            "adeck",
            "agent",
            "create",
            "--user",
            &user.to_string(),
            "--name",
            "Helper",
            "--system-prompt",
            "You help.",
            "--provider",
            "gemini",
        ])
        .unwrap();

        match cli.command {
            Commands::Agent {
                action:
                    AgentCommand::Create {
                        user: parsed,
                        provider,
                        model,
                        temperature,
                        max_tokens,
                        ..
                    },
            } => {
                assert_eq!(parsed, user);
                assert_eq!(provider, ProviderKind::Gemini);
                assert!(model.is_none());
                assert_eq!(temperature, 0.7);
                assert_eq!(max_tokens, 1000);
            }
            _ => panic!("expected agent create"),
        }
    }

    #[test]
    fn rejects_out_of_range_max_tokens() {
        let result = Cli::try_parse_from([
            "adeck",
            "agent",
            "create",
            "--user",
            &Uuid::now_v7().to_string(),
            "--name",
            "Helper",
            "--system-prompt",
            "You help.",
            "--max-tokens",
            "50",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unknown_provider_and_period() {
        let user = Uuid::now_v7().to_string();
        assert!(
            Cli::try_parse_from([
                "adeck", "agent", "create", "--user", &user, "--name", "a",
                "--system-prompt", "b", "--provider", "claude",
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["adeck", "metrics", "--user", &user, "--period", "2w"]).is_err());
    }

    #[test]
    fn parses_metrics_period() {
        let user = Uuid::now_v7();
        let cli =
            Cli::try_parse_from(["adeck", "metrics", "--user", &user.to_string(), "--period", "7d"])
                .unwrap();
        match cli.command {
            Commands::Metrics { period, agent, .. } => {
                assert_eq!(period, Period::Week);
                assert!(agent.is_none());
            }
            _ => panic!("expected metrics"),
        }
    }
}
