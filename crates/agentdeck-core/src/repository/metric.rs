//! MetricRepository trait definition.

use agentdeck_types::error::RepositoryError;
use agentdeck_types::metrics::MetricRecord;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Repository trait for per-turn metric records. Records are append-only.
pub trait MetricRepository: Send + Sync {
    fn save_metric(
        &self,
        record: &MetricRecord,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Records of the given conversations with `since <= timestamp <= until`,
    /// oldest first.
    fn list_metrics_between(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<MetricRecord>, RepositoryError>> + Send;

    /// Up to `limit` records of the given conversations with
    /// `timestamp >= since`, newest first.
    fn list_recent_metrics(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<MetricRecord>, RepositoryError>> + Send;
}
