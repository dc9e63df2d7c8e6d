//! Per-turn metric records and the summary shapes computed over them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// One row per completed chat turn. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub id: Uuid,
    pub conversation_id: Uuid,
    /// Prompt plus completion tokens of the turn.
    pub tokens_processed: u32,
    pub response_latency_ms: u64,
    /// Messages in the conversation once the turn was stored.
    pub message_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Instantaneous metrics returned with a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMetrics {
    pub tokens_processed: u32,
    pub response_latency_ms: u64,
}

/// Lookback window for metric summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1h")]
    Hour,
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Period {
    pub fn hours(&self) -> i64 {
        match self {
            Period::Hour => 1,
            Period::Day => 24,
            Period::Week => 168,
            Period::Month => 720,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::hours(self.hours())
    }

    /// Start of the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.duration()
    }

    /// Parse a query-string value; anything unrecognized means `24h`.
    pub fn from_query(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Hour => write!(f, "1h"),
            Period::Day => write!(f, "24h"),
            Period::Week => write!(f, "7d"),
            Period::Month => write!(f, "30d"),
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(Period::Hour),
            "24h" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            other => Err(format!("invalid period: '{other}'")),
        }
    }
}

/// What a summary is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsScope {
    /// One agent, which must belong to `user_id`.
    Agent { user_id: Uuid, agent_id: Uuid },
    /// Every agent the user owns.
    User { user_id: Uuid },
}

impl MetricsScope {
    pub fn user_id(&self) -> Uuid {
        match self {
            MetricsScope::Agent { user_id, .. } | MetricsScope::User { user_id } => *user_id,
        }
    }

    pub fn agent_id(&self) -> Option<Uuid> {
        match self {
            MetricsScope::Agent { agent_id, .. } => Some(*agent_id),
            MetricsScope::User { .. } => None,
        }
    }
}

/// Totals over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_tokens_processed: u64,
    pub total_messages: u64,
    pub average_latency_ms: u64,
    pub total_conversations: u64,
    /// Present for the user-wide scope only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_agents: Option<u64>,
    pub period: Period,
}

impl MetricsSummary {
    /// Reduce records into totals. An empty slice yields zeroes.
    pub fn from_records(
        records: &[MetricRecord],
        total_conversations: u64,
        total_agents: Option<u64>,
        period: Period,
    ) -> Self {
        let total_tokens_processed = records.iter().map(|r| u64::from(r.tokens_processed)).sum();
        let total_messages = records.iter().map(|r| u64::from(r.message_count)).sum();
        let latency_sum: u64 = records.iter().map(|r| r.response_latency_ms).sum();
        let average_latency_ms = if records.is_empty() {
            0
        } else {
            let count = records.len() as u64;
            (latency_sum + count / 2) / count
        };

        Self {
            total_tokens_processed,
            total_messages,
            average_latency_ms,
            total_conversations,
            total_agents,
            period,
        }
    }
}

/// Summary plus the records it was computed from, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub summary: MetricsSummary,
    pub records: Vec<MetricRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tokens: u32, latency: u64, count: u32) -> MetricRecord {
        MetricRecord {
            id: Uuid::now_v7(),
            conversation_id: Uuid::now_v7(),
            tokens_processed: tokens,
            response_latency_ms: latency,
            message_count: count,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_period_hours() {
        assert_eq!(Period::Hour.hours(), 1);
        assert_eq!(Period::Day.hours(), 24);
        assert_eq!(Period::Week.hours(), 168);
        assert_eq!(Period::Month.hours(), 720);
    }

    #[test]
    fn test_period_from_query_falls_back_to_day() {
        assert_eq!(Period::from_query(Some("7d")), Period::Week);
        assert_eq!(Period::from_query(Some("90d")), Period::Day);
        assert_eq!(Period::from_query(None), Period::Day);
    }

    #[test]
    fn test_period_serde_uses_short_names() {
        assert_eq!(serde_json::to_string(&Period::Month).unwrap(), "\"30d\"");
        let parsed: Period = serde_json::from_str("\"1h\"").unwrap();
        assert_eq!(parsed, Period::Hour);
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        let summary = MetricsSummary::from_records(&[], 0, None, Period::Day);
        assert_eq!(summary.total_tokens_processed, 0);
        assert_eq!(summary.total_messages, 0);
        assert_eq!(summary.average_latency_ms, 0);
    }

    #[test]
    fn test_summary_rounds_average_latency() {
        let records = vec![record(10, 100, 2), record(20, 101, 4)];
        let summary = MetricsSummary::from_records(&records, 1, Some(3), Period::Hour);
        assert_eq!(summary.total_tokens_processed, 30);
        assert_eq!(summary.total_messages, 6);
        // 100.5 rounds half up
        assert_eq!(summary.average_latency_ms, 101);
        assert_eq!(summary.total_agents, Some(3));
    }

    #[test]
    fn test_summary_omits_agent_total_for_agent_scope() {
        let summary = MetricsSummary::from_records(&[], 0, None, Period::Day);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("total_agents"));
        assert!(json.contains("\"period\":\"24h\""));
    }
}
