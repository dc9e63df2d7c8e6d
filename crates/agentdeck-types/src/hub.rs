//! Live metrics channel vocabulary: subscription subjects and the JSON
//! events exchanged over the push socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

use crate::metrics::MetricRecord;

/// What a live subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum Subject {
    Agent { agent_id: Uuid },
    Overall,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Agent { agent_id } => write!(f, "agent:{agent_id}"),
            Subject::Overall => write!(f, "overall"),
        }
    }
}

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "subscribe:agent")]
    SubscribeAgent(Uuid),
    #[serde(rename = "unsubscribe:agent")]
    UnsubscribeAgent(Uuid),
    #[serde(rename = "subscribe:overall")]
    SubscribeOverall,
    #[serde(rename = "unsubscribe:overall")]
    UnsubscribeOverall,
}

impl ClientEvent {
    pub fn subject(&self) -> Subject {
        match self {
            ClientEvent::SubscribeAgent(agent_id) | ClientEvent::UnsubscribeAgent(agent_id) => {
                Subject::Agent {
                    agent_id: *agent_id,
                }
            }
            ClientEvent::SubscribeOverall | ClientEvent::UnsubscribeOverall => Subject::Overall,
        }
    }
}

/// Payload of a `metrics:update` push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsUpdate {
    pub subject: Subject,
    /// Newest first.
    pub records: Vec<MetricRecord>,
    pub timestamp: DateTime<Utc>,
}

/// Server → client frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HubEvent {
    #[serde(rename = "metrics:update")]
    MetricsUpdate(MetricsUpdate),
    #[serde(rename = "error")]
    Error { message: String },
}

impl HubEvent {
    pub fn error(message: impl Into<String>) -> Self {
        HubEvent::Error {
            message: message.into(),
        }
    }
}
