//! SQLite metric repository implementation.

use agentdeck_core::repository::metric::MetricRepository;
use agentdeck_types::error::RepositoryError;
use agentdeck_types::metrics::MetricRecord;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_uuid, query_error};

/// SQLite caps bound parameters per statement; id lists are split into
/// chunks well under the limit.
const IDS_PER_QUERY: usize = 500;

#[derive(Clone)]
pub struct SqliteMetricRepository {
    pool: DatabasePool,
}

impl SqliteMetricRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn fetch(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
        newest_first: bool,
        limit: Option<u32>,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        let mut records = Vec::new();
        for chunk in conversation_ids.chunks(IDS_PER_QUERY) {
            let mut query: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM metrics WHERE timestamp >= ");
            query.push_bind(format_datetime(&since));
            if let Some(until) = &until {
                query.push(" AND timestamp <= ").push_bind(format_datetime(until));
            }
            query.push(" AND conversation_id IN (");
            let mut ids = query.separated(", ");
            for id in chunk {
                ids.push_bind(id.to_string());
            }
            ids.push_unseparated(")");
            query.push(if newest_first {
                " ORDER BY timestamp DESC, id DESC"
            } else {
                " ORDER BY timestamp ASC, id ASC"
            });
            if let Some(limit) = limit {
                query.push(" LIMIT ").push_bind(i64::from(limit));
            }

            let rows = query
                .build()
                .fetch_all(&self.pool.reader)
                .await
                .map_err(query_error)?;
            for row in &rows {
                let metric_row = MetricRow::from_row(row).map_err(query_error)?;
                records.push(metric_row.into_record()?);
            }
        }

        if conversation_ids.len() > IDS_PER_QUERY {
            if newest_first {
                records.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
            } else {
                records.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
            }
            if let Some(limit) = limit {
                records.truncate(limit as usize);
            }
        }

        Ok(records)
    }
}

struct MetricRow {
    id: String,
    conversation_id: String,
    tokens_processed: i64,
    response_latency_ms: i64,
    message_count: i64,
    timestamp: String,
}

impl MetricRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            tokens_processed: row.try_get("tokens_processed")?,
            response_latency_ms: row.try_get("response_latency_ms")?,
            message_count: row.try_get("message_count")?,
            timestamp: row.try_get("timestamp")?,
        })
    }

    fn into_record(self) -> Result<MetricRecord, RepositoryError> {
        Ok(MetricRecord {
            id: parse_uuid(&self.id, "metric id")?,
            conversation_id: parse_uuid(&self.conversation_id, "conversation_id")?,
            tokens_processed: self.tokens_processed as u32,
            response_latency_ms: self.response_latency_ms as u64,
            message_count: self.message_count as u32,
            timestamp: parse_datetime(&self.timestamp)?,
        })
    }
}

impl MetricRepository for SqliteMetricRepository {
    async fn save_metric(&self, record: &MetricRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO metrics (id, conversation_id, tokens_processed, response_latency_ms, message_count, timestamp)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(record.conversation_id.to_string())
        .bind(i64::from(record.tokens_processed))
        .bind(record.response_latency_ms as i64)
        .bind(i64::from(record.message_count))
        .bind(format_datetime(&record.timestamp))
        .execute(&self.pool.writer)
        .await
        .map_err(query_error)?;

        Ok(())
    }

    async fn list_metrics_between(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        self.fetch(conversation_ids, since, Some(until), false, None).await
    }

    async fn list_recent_metrics(
        &self,
        conversation_ids: &[Uuid],
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        self.fetch(conversation_ids, since, None, true, Some(limit)).await
    }
}
