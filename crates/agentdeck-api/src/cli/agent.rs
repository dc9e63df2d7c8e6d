//! Agent CLI commands.

use anyhow::{Result, anyhow};
use chrono::Utc;
use console::style;
use uuid::Uuid;

use agentdeck_core::repository::agent::AgentRepository;
use agentdeck_core::repository::user::UserRepository;
use agentdeck_types::agent::NewAgent;
use agentdeck_types::llm::ProviderKind;

use crate::state::AppState;

/// Validate and persist a new agent.
///
/// # Examples
///
/// ```bash
/// adeck agent create --user <id> --name "Support" \
///     --system-prompt "You answer tickets." --provider gemini
/// ```
#[allow(clippy::too_many_arguments)]
pub async fn create_agent(
    state: &AppState,
    user_id: Uuid,
    name: String,
    system_prompt: String,
    provider: ProviderKind,
    model: Option<String>,
    temperature: f64,
    max_tokens: u32,
    json: bool,
) -> Result<()> {
    state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| anyhow!("user {user_id} not found"))?;

    let agent = NewAgent {
        user_id,
        name,
        system_prompt,
        provider,
        model,
        temperature,
        max_tokens,
    }
    .validate(Utc::now())?;
    let agent = state.agents.create_agent(&agent).await?;
    tracing::info!(agent_id = %agent.id, provider = %agent.provider, model = %agent.model, "agent created");

    if json {
        println!("{}", serde_json::to_string_pretty(&agent)?);
        return Ok(());
    }

    println!();
    println!("  {} Agent created", style("✓").green().bold());
    println!();
    println!("  {}      {}", style("Name:").bold(), style(&agent.name).cyan());
    println!(
        "  {}  {} / {}",
        style("Provider:").bold(),
        agent.provider,
        agent.model
    );
    println!(
        "  {}  temperature {} · max tokens {}",
        style("Sampling:").bold(),
        agent.temperature,
        agent.max_tokens
    );
    println!("  {}        {}", style("ID:").bold(), style(agent.id).dim());
    println!();

    Ok(())
}
