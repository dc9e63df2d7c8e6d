//! Application state wiring all services together.
//!
//! Services in agentdeck-core are generic over repository traits; AppState
//! pins them to the SQLite implementations from agentdeck-infra.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use agentdeck_core::auth::Authenticator;
use agentdeck_core::chat::orchestrator::{ChatConfig, ChatOrchestrator};
use agentdeck_core::llm::registry::ProviderRegistry;
use agentdeck_core::llm::router::GenerationRouter;
use agentdeck_core::metrics::aggregator::MetricsAggregator;
use agentdeck_core::metrics::hub::{HubConnection, LiveMetricsConfig, MetricsHub};
use agentdeck_infra::auth::jwt::JwtCodec;
use agentdeck_infra::config::{load_global_config, resolve_data_dir};
use agentdeck_infra::llm::{api_key_from_env, build_registry};
use agentdeck_infra::sqlite::agent::SqliteAgentRepository;
use agentdeck_infra::sqlite::conversation::SqliteConversationRepository;
use agentdeck_infra::sqlite::metric::SqliteMetricRepository;
use agentdeck_infra::sqlite::pool::{DatabasePool, database_url};
use agentdeck_infra::sqlite::user::SqliteUserRepository;
use agentdeck_types::config::GlobalConfig;
use agentdeck_types::llm::ProviderKind;

pub type ConcreteOrchestrator =
    ChatOrchestrator<SqliteAgentRepository, SqliteConversationRepository, SqliteMetricRepository>;

pub type ConcreteAggregator =
    MetricsAggregator<SqliteAgentRepository, SqliteConversationRepository, SqliteMetricRepository>;

pub type ConcreteHub =
    MetricsHub<SqliteAgentRepository, SqliteConversationRepository, SqliteMetricRepository>;

pub type ConcreteHubConnection =
    HubConnection<SqliteAgentRepository, SqliteConversationRepository, SqliteMetricRepository>;

pub type ConcreteAuthenticator = Authenticator<Arc<JwtCodec>, SqliteUserRepository>;

/// Shared application state, used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub aggregator: Arc<ConcreteAggregator>,
    pub hub: ConcreteHub,
    pub authenticator: Arc<ConcreteAuthenticator>,
    pub tokens: Arc<JwtCodec>,
    pub users: SqliteUserRepository,
    pub agents: SqliteAgentRepository,
    pub config: Arc<GlobalConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Resolve the data directory, load `config.toml`, open the database
    /// and register every provider that has an API key in the environment.
    pub async fn init(jwt_secret: SecretString) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let config = load_global_config(&data_dir).await;

        let db_url = format!("{}?mode=rwc", database_url(&data_dir));
        let db_pool = DatabasePool::new(&db_url)
            .await
            .with_context(|| format!("failed to open database {db_url}"))?;

        let registry = build_registry(
            &config.providers,
            api_key_from_env(ProviderKind::OpenAi),
            api_key_from_env(ProviderKind::Gemini),
        )?;

        Self::build(db_pool, config, data_dir, registry, jwt_secret)
    }

    /// Wire services from already opened parts.
    pub fn build(
        db_pool: DatabasePool,
        config: GlobalConfig,
        data_dir: PathBuf,
        registry: ProviderRegistry,
        jwt_secret: SecretString,
    ) -> anyhow::Result<Self> {
        let default_provider: ProviderKind = config
            .providers
            .default_provider
            .parse()
            .map_err(|e: String| anyhow::anyhow!("providers.default_provider: {e}"))?;
        let router = Arc::new(GenerationRouter::new(registry, default_provider));

        let users = SqliteUserRepository::new(db_pool.clone());
        let agents = SqliteAgentRepository::new(db_pool.clone());
        let conversations = SqliteConversationRepository::new(db_pool.clone());
        let metrics = SqliteMetricRepository::new(db_pool.clone());

        let orchestrator = ChatOrchestrator::new(
            agents.clone(),
            conversations.clone(),
            metrics.clone(),
            router,
            ChatConfig::from(&config.chat),
        );
        let aggregator =
            MetricsAggregator::new(agents.clone(), conversations.clone(), metrics.clone());
        let hub = MetricsHub::new(
            agents.clone(),
            conversations,
            metrics,
            LiveMetricsConfig::from(&config.live_metrics),
        );

        let tokens = Arc::new(JwtCodec::new(jwt_secret));
        let authenticator = Authenticator::new(tokens.clone(), users.clone());

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            aggregator: Arc::new(aggregator),
            hub,
            authenticator: Arc::new(authenticator),
            tokens,
            users,
            agents,
            config: Arc::new(config),
            data_dir,
            db_pool,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use agentdeck_core::repository::agent::AgentRepository;
    use agentdeck_core::repository::user::UserRepository;
    use agentdeck_types::agent::{Agent, NewAgent};
    use agentdeck_types::user::User;
    use chrono::Utc;
    use uuid::Uuid;

    pub const TEST_SECRET: &str = "test-signing-secret";

    /// State over a fresh temp database with no providers registered.
    pub async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        let state = AppState::build(
            pool,
            GlobalConfig::default(),
            dir.path().to_path_buf(),
            ProviderRegistry::new(),
            SecretString::from(TEST_SECRET.to_string()),
        )
        .unwrap();
        (state, dir)
    }

    pub async fn seed_user(state: &AppState) -> User {
        let user = User {
            id: Uuid::now_v7(),
            email: format!("{}@example.com", Uuid::now_v7()),
            name: None,
            created_at: Utc::now(),
        };
        state.users.create_user(&user).await.unwrap()
    }

    pub async fn seed_agent(state: &AppState, user_id: Uuid) -> Agent {
        let agent = NewAgent {
            user_id,
            name: "Helper".to_string(),
            system_prompt: "You help.".to_string(),
            provider: ProviderKind::OpenAi,
            model: None,
            temperature: 0.7,
            max_tokens: 1000,
        }
        .validate(Utc::now())
        .unwrap();
        state.agents.create_agent(&agent).await.unwrap()
    }

    pub fn bearer(state: &AppState, user_id: Uuid) -> String {
        let token = state
            .tokens
            .issue(user_id, chrono::Duration::hours(1))
            .unwrap();
        format!("Bearer {token}")
    }
}
