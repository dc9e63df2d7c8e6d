//! Access token CLI command.

use anyhow::{Result, anyhow};
use console::style;
use uuid::Uuid;

use agentdeck_core::repository::user::UserRepository;

use crate::state::AppState;

/// Issue a signed token for an existing user.
pub async fn issue_token(state: &AppState, user_id: Uuid, ttl_hours: u32, json: bool) -> Result<()> {
    let user = state
        .users
        .get_user(&user_id)
        .await?
        .ok_or_else(|| anyhow!("user {user_id} not found"))?;

    let ttl = chrono::Duration::hours(i64::from(ttl_hours.max(1)));
    let token = state.tokens.issue(user.id, ttl)?;
    let expires_at = chrono::Utc::now() + ttl;

    if json {
        let out = serde_json::json!({
            "token": token,
            "user_id": user.id,
            "expires_at": expires_at,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Token for {} (expires {}):",
        style("🔑").bold(),
        style(&user.email).cyan(),
        expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
    println!("  {}", style(&token).yellow().bold());
    println!();

    Ok(())
}
