//! Metrics summary handlers.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use agentdeck_types::metrics::{MetricsReport, MetricsScope, Period};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    /// `1h`, `24h`, `7d` or `30d`; anything else means `24h`.
    pub period: Option<String>,
}

/// GET /api/v1/metrics/overall - Summary across all of the caller's agents.
pub async fn overall_metrics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<PeriodQuery>,
) -> Result<ApiResponse<MetricsReport>, AppError> {
    summarize(&state, MetricsScope::User { user_id: user.id }, &query).await
}

/// GET /api/v1/metrics/{agent_id} - Summary for one agent.
pub async fn agent_metrics(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(agent_id): Path<Uuid>,
    Query(query): Query<PeriodQuery>,
) -> Result<ApiResponse<MetricsReport>, AppError> {
    let scope = MetricsScope::Agent {
        user_id: user.id,
        agent_id,
    };
    summarize(&state, scope, &query).await
}

async fn summarize(
    state: &AppState,
    scope: MetricsScope,
    query: &PeriodQuery,
) -> Result<ApiResponse<MetricsReport>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let period = Period::from_query(query.period.as_deref());
    let report = state.aggregator.summarize(scope, period).await?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(report, request_id, elapsed))
}
