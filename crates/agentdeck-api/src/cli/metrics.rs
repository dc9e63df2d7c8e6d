//! Metrics summary CLI command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use uuid::Uuid;

use agentdeck_types::metrics::{MetricsReport, MetricsScope, Period};

use crate::state::AppState;

/// Most recent turns listed under the summary.
const RECENT_ROWS: usize = 10;

/// Print the summary for a user, or for one of their agents.
pub async fn show_metrics(
    state: &AppState,
    user_id: Uuid,
    agent_id: Option<Uuid>,
    period: Period,
    json: bool,
) -> Result<()> {
    let scope = match agent_id {
        Some(agent_id) => MetricsScope::Agent { user_id, agent_id },
        None => MetricsScope::User { user_id },
    };
    let report = state.aggregator.summarize(scope, period).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let heading = match agent_id {
        Some(id) => format!("agent {id}"),
        None => "all agents".to_string(),
    };
    println!();
    println!(
        "  {} Metrics for {} over the last {}",
        style("📊").bold(),
        style(heading).cyan(),
        style(period).bold()
    );
    println!();
    println!("{}", summary_table(&report));

    if !report.records.is_empty() {
        println!();
        println!("  {}", style("── Recent turns ──").dim());
        println!("{}", recent_table(&report));
    }
    println!();

    Ok(())
}

fn summary_table(report: &MetricsReport) -> Table {
    let summary = &report.summary;
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Tokens").fg(Color::Cyan),
            Cell::new("Messages").fg(Color::Cyan),
            Cell::new("Avg latency").fg(Color::Cyan),
            Cell::new("Conversations").fg(Color::Cyan),
            Cell::new("Agents").fg(Color::Cyan),
        ]);
    table.add_row(vec![
        Cell::new(summary.total_tokens_processed),
        Cell::new(summary.total_messages),
        Cell::new(format!("{} ms", summary.average_latency_ms)),
        Cell::new(summary.total_conversations),
        Cell::new(
            summary
                .total_agents
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]);
    table
}

fn recent_table(report: &MetricsReport) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("When").fg(Color::Cyan),
            Cell::new("Conversation").fg(Color::Cyan),
            Cell::new("Tokens").fg(Color::Cyan),
            Cell::new("Latency").fg(Color::Cyan),
            Cell::new("Messages").fg(Color::Cyan),
        ]);

    for record in report.records.iter().take(RECENT_ROWS) {
        let latency = Cell::new(format!("{} ms", record.response_latency_ms));
        let latency = if record.response_latency_ms > 5_000 {
            latency.fg(Color::Yellow)
        } else {
            latency
        };
        table.add_row(vec![
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(record.conversation_id.to_string()),
            Cell::new(record.tokens_processed),
            latency,
            Cell::new(record.message_count),
        ]);
    }
    table
}
