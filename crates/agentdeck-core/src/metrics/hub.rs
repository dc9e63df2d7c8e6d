//! Live Metrics Hub: per-connection subscriptions that poll recent metric
//! records on a fixed cadence and push them to the client.
//!
//! Every subscription is one spawned ticker task. Its cancellation token is a
//! child of the connection's token, which is a child of the hub's root token.
//! The connection's subscription map stores each token's `DropGuard`, so
//! removing, replacing or dropping an entry cancels the ticker, and dropping
//! the connection cancels all of them.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use agentdeck_types::config::LiveMetricsSettings;
use agentdeck_types::error::RepositoryError;
use agentdeck_types::hub::{ClientEvent, HubEvent, MetricsUpdate, Subject};
use agentdeck_types::metrics::MetricRecord;

use crate::repository::agent::AgentRepository;
use crate::repository::conversation::{ConversationFilter, ConversationRepository};
use crate::repository::metric::MetricRepository;

pub const AGENT_NOT_FOUND: &str = "Agent not found";
pub const SUBSCRIBE_FAILED: &str = "Failed to subscribe to metrics";

#[derive(Debug, Clone, Copy)]
pub struct LiveMetricsConfig {
    pub tick_interval: Duration,
    /// How far back each tick looks for records.
    pub lookback: Duration,
    pub max_records: u32,
}

impl Default for LiveMetricsConfig {
    fn default() -> Self {
        Self::from(&LiveMetricsSettings::default())
    }
}

impl From<&LiveMetricsSettings> for LiveMetricsConfig {
    fn from(settings: &LiveMetricsSettings) -> Self {
        Self {
            tick_interval: Duration::from_secs(settings.tick_interval_secs.max(1)),
            lookback: Duration::from_secs(settings.lookback_secs),
            max_records: settings.max_records,
        }
    }
}

struct HubShared<A, C, M> {
    agents: A,
    conversations: C,
    metrics: M,
    config: LiveMetricsConfig,
    root: CancellationToken,
    active: Arc<AtomicUsize>,
}

impl<A, C, M> HubShared<A, C, M>
where
    A: AgentRepository,
    C: ConversationRepository,
    M: MetricRepository,
{
    /// Newest records for `subject`, scoped to `user_id`.
    async fn recent_records(
        &self,
        user_id: Uuid,
        subject: Subject,
    ) -> Result<Vec<MetricRecord>, RepositoryError> {
        let agent_id = match subject {
            Subject::Agent { agent_id } => Some(agent_id),
            Subject::Overall => None,
        };
        let filter = ConversationFilter::for_user(user_id).agent(agent_id);
        let ids = self.conversations.list_conversation_ids(&filter).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let lookback = chrono::Duration::from_std(self.config.lookback)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        let since = Utc::now() - lookback;
        self.metrics
            .list_recent_metrics(&ids, since, self.config.max_records)
            .await
    }
}

/// Counts a live ticker for as long as it is held.
struct TickerGuard(Arc<AtomicUsize>);

impl TickerGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MetricsHub<A, C, M> {
    shared: Arc<HubShared<A, C, M>>,
}

impl<A, C, M> Clone for MetricsHub<A, C, M> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<A, C, M> MetricsHub<A, C, M>
where
    A: AgentRepository + 'static,
    C: ConversationRepository + 'static,
    M: MetricRepository + 'static,
{
    pub fn new(agents: A, conversations: C, metrics: M, config: LiveMetricsConfig) -> Self {
        Self {
            shared: Arc::new(HubShared {
                agents,
                conversations,
                metrics,
                config,
                root: CancellationToken::new(),
                active: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    /// Open a connection for an already authenticated user. Events for the
    /// client are sent on `outbound`.
    pub fn connect(&self, user_id: Uuid, outbound: mpsc::Sender<HubEvent>) -> HubConnection<A, C, M> {
        let connection = HubConnection {
            id: Uuid::now_v7(),
            user_id,
            outbound,
            token: self.shared.root.child_token(),
            subscriptions: DashMap::new(),
            shared: self.shared.clone(),
        };
        info!(connection_id = %connection.id, user_id = %user_id, "Live metrics connection opened");
        connection
    }

    /// Ticker tasks currently running across all connections.
    pub fn active_tickers(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Cancel every ticker of every connection.
    pub fn shutdown(&self) {
        self.shared.root.cancel();
    }
}

struct Subscription {
    _cancel_on_drop: DropGuard,
    _handle: JoinHandle<()>,
}

/// One client's live channel.
pub struct HubConnection<A, C, M> {
    id: Uuid,
    user_id: Uuid,
    outbound: mpsc::Sender<HubEvent>,
    token: CancellationToken,
    subscriptions: DashMap<Subject, Subscription>,
    shared: Arc<HubShared<A, C, M>>,
}

impl<A, C, M> HubConnection<A, C, M>
where
    A: AgentRepository + 'static,
    C: ConversationRepository + 'static,
    M: MetricRepository + 'static,
{
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Subjects with a running ticker on this connection.
    pub fn subjects(&self) -> Vec<Subject> {
        self.subscriptions.iter().map(|e| *e.key()).collect()
    }

    pub async fn handle(&self, event: ClientEvent) {
        match event {
            ClientEvent::SubscribeAgent(_) | ClientEvent::SubscribeOverall => {
                self.subscribe(event.subject()).await
            }
            ClientEvent::UnsubscribeAgent(_) | ClientEvent::UnsubscribeOverall => {
                self.unsubscribe(event.subject())
            }
        }
    }

    /// Start (or restart) the ticker for `subject`. Agent subjects must
    /// belong to the connected user; otherwise an error event is sent and
    /// nothing is started.
    pub async fn subscribe(&self, subject: Subject) {
        if let Subject::Agent { agent_id } = subject {
            match self.shared.agents.get_agent(&agent_id).await {
                Ok(Some(agent)) if agent.user_id == self.user_id => {}
                Ok(_) => {
                    debug!(connection_id = %self.id, %subject, "Subscription refused");
                    self.send_error(AGENT_NOT_FOUND).await;
                    return;
                }
                Err(e) => {
                    warn!(connection_id = %self.id, %subject, error = %e, "Subscription lookup failed");
                    self.send_error(SUBSCRIBE_FAILED).await;
                    return;
                }
            }
        }

        let token = self.token.child_token();
        let guard = TickerGuard::new(self.shared.active.clone());
        let handle = tokio::spawn(run_ticker(
            self.shared.clone(),
            self.user_id,
            subject,
            self.outbound.clone(),
            token.clone(),
            guard,
        ));

        let previous = self.subscriptions.insert(
            subject,
            Subscription {
                _cancel_on_drop: token.drop_guard(),
                _handle: handle,
            },
        );
        if previous.is_some() {
            debug!(connection_id = %self.id, %subject, "Subscription replaced");
        } else {
            info!(connection_id = %self.id, %subject, "Subscribed to live metrics");
        }
    }

    /// Stop the ticker for `subject`. No-op when not subscribed.
    pub fn unsubscribe(&self, subject: Subject) {
        if self.subscriptions.remove(&subject).is_some() {
            info!(connection_id = %self.id, %subject, "Unsubscribed from live metrics");
        }
    }

    /// Cancel every ticker of this connection and close it.
    pub fn disconnect(self) {
        drop(self);
    }

    async fn send_error(&self, message: &str) {
        // A closed receiver means the client is gone; teardown follows.
        let _ = self.outbound.send(HubEvent::error(message)).await;
    }
}

impl<A, C, M> Drop for HubConnection<A, C, M> {
    fn drop(&mut self) {
        self.token.cancel();
        let count = self.subscriptions.len();
        self.subscriptions.clear();
        debug!(connection_id = %self.id, subscriptions = count, "Live metrics connection closed");
    }
}

async fn run_ticker<A, C, M>(
    shared: Arc<HubShared<A, C, M>>,
    user_id: Uuid,
    subject: Subject,
    outbound: mpsc::Sender<HubEvent>,
    token: CancellationToken,
    _guard: TickerGuard,
) where
    A: AgentRepository,
    C: ConversationRepository,
    M: MetricRepository,
{
    let period = shared.config.tick_interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = interval.tick() => {}
        }

        let records = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            fetched = shared.recent_records(user_id, subject) => fetched,
        };

        let records = match records {
            Ok(records) if records.is_empty() => continue,
            Ok(records) => records,
            Err(e) => {
                warn!(%subject, user_id = %user_id, error = %e, "Live metrics fetch failed; retrying next tick");
                continue;
            }
        };

        let event = HubEvent::MetricsUpdate(MetricsUpdate {
            subject,
            records,
            timestamp: Utc::now(),
        });
        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = outbound.send(event) => sent,
        };
        if sent.is_err() {
            break;
        }
    }

    debug!(%subject, user_id = %user_id, "Ticker stopped");
}
