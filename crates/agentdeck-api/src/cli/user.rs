//! User CLI commands.

use anyhow::{Result, bail};
use chrono::Utc;
use console::style;
use uuid::Uuid;

use agentdeck_core::repository::user::UserRepository;
use agentdeck_types::user::User;

use crate::state::AppState;

/// Register a user and print its id.
pub async fn create_user(
    state: &AppState,
    email: String,
    name: Option<String>,
    json: bool,
) -> Result<()> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        bail!("'{email}' is not an email address");
    }

    let user = User {
        id: Uuid::now_v7(),
        email,
        name: name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        created_at: Utc::now(),
    };
    let user = state.users.create_user(&user).await?;
    tracing::info!(user_id = %user.id, "user created");

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    println!();
    println!("  {} User created", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Email:").bold(), style(&user.email).cyan());
    if let Some(name) = &user.name {
        println!("  {}   {}", style("Name:").bold(), name);
    }
    println!("  {}     {}", style("ID:").bold(), style(user.id).dim());
    println!();
    println!(
        "  Issue a token: {}",
        style(format!("adeck token issue --user {}", user.id)).yellow()
    );
    println!();

    Ok(())
}
