//! Live Update Client
//!
//! Controller that owns the connection state machine and the dashboard
//! session. Socket, timers and fetches run as separate tasks but only post
//! [`LiveEvent`]s to the controller; all state changes happen in its single
//! event loop, one event at a time.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use super::connection::run_connection;
use super::state::{ConnectionState, ConnectionStateMachine};
use crate::api::{FetchResult, StatsSource};
use crate::model::{ClassificationEvent, StatisticsSnapshot};
use crate::session::{DashboardSession, Reaction};

/// Configuration for the live client
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// WebSocket endpoint (e.g., "ws://localhost:8000/ws")
    pub ws_url: String,
    /// Fixed delay before reconnecting after a close
    pub reconnect_delay: Duration,
    /// Interval between keepalive tokens while connected
    pub keepalive_interval: Duration,
    /// Interval of the fallback statistics poller
    pub poll_interval: Duration,
    /// Number of history entries requested on startup
    pub history_limit: usize,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws".to_string(),
            reconnect_delay: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            history_limit: 20,
        }
    }
}

/// Why a statistics fetch was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Startup load
    Initial,
    /// Re-derive aggregates after a pushed classification
    Refetch,
    /// Fallback poller while disconnected
    Poll,
}

/// Everything the controller reacts to
#[derive(Debug)]
pub(crate) enum LiveEvent {
    /// Manual connect request
    ConnectRequested,
    Opened {
        attempt: u64,
    },
    Frame {
        attempt: u64,
        text: String,
    },
    Closed {
        attempt: u64,
        reason: String,
    },
    ReconnectDue,
    PollTick,
    StatisticsFetched {
        origin: FetchOrigin,
        result: FetchResult<StatisticsSnapshot>,
    },
    HistoryFetched(FetchResult<Vec<ClassificationEvent>>),
}

/// Errors surfaced by the live client handle
#[derive(Debug, Error)]
pub enum LiveError {
    #[error("Live client task failed: {0}")]
    Task(#[from] JoinError),
}

struct ActiveConnection {
    attempt: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single owner of the live connection and the dashboard session
pub struct LiveClient {
    config: LiveConfig,
    source: Arc<dyn StatsSource>,
    session: DashboardSession,
    machine: ConnectionStateMachine,
    connection: Option<ActiveConnection>,
    pending_reconnect: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<LiveEvent>,
    events_rx: mpsc::UnboundedReceiver<LiveEvent>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl LiveClient {
    pub fn new(config: LiveConfig, source: Arc<dyn StatsSource>, session: DashboardSession) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            config,
            source,
            session,
            machine: ConnectionStateMachine::new(),
            connection: None,
            pending_reconnect: None,
            events_tx,
            events_rx,
            state_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Start the client on the current runtime
    pub fn spawn(self) -> LiveHandle {
        let cancel = self.cancel.clone();
        let events = self.events_tx.clone();
        let state = self.state_tx.subscribe();
        let task = tokio::spawn(self.run());
        LiveHandle {
            cancel: cancel.drop_guard(),
            events,
            state,
            task,
        }
    }

    /// Run until cancelled, then tear down and hand back the session
    pub async fn run(mut self) -> DashboardSession {
        tracing::info!(url = %self.config.ws_url, "Starting live client");

        self.spawn_initial_load();
        self.connect();
        let poller = self.spawn_poller();

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.events_rx.recv() => event,
            };
            match event {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }

        poller.abort();
        self.teardown();
        tracing::info!("Live client stopped");
        self.session
    }

    /// Open a connection unless one is already open or being opened
    fn connect(&mut self) {
        if self.machine.state() != ConnectionState::Disconnected || self.connection.is_some() {
            tracing::debug!(state = %self.machine.state(), "Connect ignored, attempt already active");
            return;
        }

        if let Some(pending) = self.pending_reconnect.take() {
            pending.abort();
        }

        if let Err(e) = self.machine.begin_attempt() {
            tracing::error!(error = %e, "Cannot start connection attempt");
            return;
        }
        self.publish_state();

        let attempt = self.machine.attempts();
        let cancel = self.cancel.child_token();
        let handle = tokio::spawn(run_connection(
            self.config.ws_url.clone(),
            attempt,
            self.config.keepalive_interval,
            self.events_tx.clone(),
            cancel.clone(),
        ));

        self.connection = Some(ActiveConnection {
            attempt,
            cancel,
            handle,
        });
    }

    fn handle_event(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::ConnectRequested => self.connect(),
            LiveEvent::Opened { attempt } => {
                if !self.is_current(attempt) {
                    return;
                }
                match self.machine.opened() {
                    Ok(_) => {
                        tracing::info!(attempt, "Live connection established");
                        self.publish_state();
                    }
                    Err(e) => tracing::error!(error = %e, "Unexpected open event"),
                }
            }
            LiveEvent::Frame { attempt, text } => {
                if !self.is_current(attempt) {
                    return;
                }
                if self.session.handle_text(&text) == Reaction::RefetchStatistics {
                    self.spawn_statistics_fetch(FetchOrigin::Refetch);
                }
            }
            LiveEvent::Closed { attempt, reason } => {
                if !self.is_current(attempt) {
                    return;
                }
                self.connection = None;
                tracing::warn!(attempt, reason = %reason, "Live connection closed");
                match self.machine.closed() {
                    Ok(_) => self.publish_state(),
                    Err(e) => tracing::error!(error = %e, "Unexpected close event"),
                }
                self.schedule_reconnect();
            }
            LiveEvent::ReconnectDue => {
                self.pending_reconnect = None;
                tracing::info!("Attempting to reconnect");
                self.connect();
            }
            LiveEvent::PollTick => {
                if !self.machine.is_connected() {
                    self.spawn_statistics_fetch(FetchOrigin::Poll);
                }
            }
            LiveEvent::StatisticsFetched { origin, result } => match result {
                Ok(snapshot) => {
                    if origin == FetchOrigin::Poll && self.machine.is_connected() {
                        tracing::debug!("Dropping poll result, connection is up");
                        return;
                    }
                    self.session.apply_statistics(snapshot);
                }
                Err(e) => {
                    tracing::warn!(error = %e, origin = ?origin, "Failed to load statistics");
                }
            },
            LiveEvent::HistoryFetched(result) => match result {
                Ok(history) => self.session.load_history(history),
                Err(e) => tracing::warn!(error = %e, "Failed to load history"),
            },
        }
    }

    fn is_current(&self, attempt: u64) -> bool {
        let current = self.connection.as_ref().map(|c| c.attempt);
        if current != Some(attempt) {
            tracing::debug!(attempt, current = ?current, "Ignoring event from stale connection");
            return false;
        }
        true
    }

    fn publish_state(&mut self) {
        let state = self.machine.state();
        self.session.connection_changed(state);
        self.state_tx.send_replace(state);
    }

    fn schedule_reconnect(&mut self) {
        if let Some(pending) = self.pending_reconnect.take() {
            pending.abort();
        }

        let delay = self.config.reconnect_delay;
        let events = self.events_tx.clone();
        tracing::info!(delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

        self.pending_reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(LiveEvent::ReconnectDue);
        }));
    }

    fn spawn_statistics_fetch(&self, origin: FetchOrigin) {
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch_statistics().await;
            let _ = events.send(LiveEvent::StatisticsFetched { origin, result });
        });
    }

    /// Statistics first, then history, as two ordered events
    fn spawn_initial_load(&self) {
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let limit = self.config.history_limit;
        tokio::spawn(async move {
            let result = source.fetch_statistics().await;
            let _ = events.send(LiveEvent::StatisticsFetched {
                origin: FetchOrigin::Initial,
                result,
            });
            let history = source.fetch_history(limit).await;
            let _ = events.send(LiveEvent::HistoryFetched(history));
        });
    }

    fn spawn_poller(&self) -> JoinHandle<()> {
        let period = self.config.poll_interval;
        let events = self.events_tx.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if events.send(LiveEvent::PollTick).is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn teardown(&mut self) {
        if let Some(pending) = self.pending_reconnect.take() {
            pending.abort();
        }
        if let Some(connection) = self.connection.take() {
            connection.cancel.cancel();
            connection.handle.abort();
        }
    }
}

/// Handle to a spawned [`LiveClient`]
///
/// Dropping the handle stops the client.
pub struct LiveHandle {
    cancel: DropGuard,
    events: mpsc::UnboundedSender<LiveEvent>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<DashboardSession>,
}

impl LiveHandle {
    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver notified on every state change
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Connect now, cancelling any pending reconnect timer
    ///
    /// Does nothing while a connection is open or being opened.
    pub fn reconnect(&self) {
        let _ = self.events.send(LiveEvent::ConnectRequested);
    }

    /// Stop the client and return the final session
    pub async fn shutdown(self) -> Result<DashboardSession, LiveError> {
        let LiveHandle { cancel, task, .. } = self;
        drop(cancel);
        Ok(task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FetchError, StatsSource};
    use crate::display::{DisplayAggregator, RenderOp};
    use crate::model::CategoryCounts;
    use async_trait::async_trait;
    use axum::{
        extract::ws::{Message as AxumMessage, WebSocket, WebSocketUpgrade},
        extract::State,
        response::Response,
        routing::get,
        Router,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeSource {
        calls: AtomicUsize,
        snapshot: StatisticsSnapshot,
        history: Vec<ClassificationEvent>,
        fail: bool,
    }

    impl FakeSource {
        fn new(total: u64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                snapshot: StatisticsSnapshot {
                    category_counts: CategoryCounts::new(total, 0, 0),
                    total,
                    avg_confidence: 0.5,
                    avg_processing_time: 0.1,
                },
                history: vec![ClassificationEvent::new("other", 0.4).timestamp(1_700_000_000.0)],
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatsSource for FakeSource {
        async fn fetch_statistics(&self) -> FetchResult<StatisticsSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(FetchError::Unavailable);
            }
            Ok(self.snapshot.clone())
        }

        async fn fetch_history(&self, _limit: usize) -> FetchResult<Vec<ClassificationEvent>> {
            if self.fail {
                return Err(FetchError::Unavailable);
            }
            Ok(self.history.clone())
        }
    }

    type Recorded = Arc<Mutex<Vec<RenderOp>>>;

    fn recording_session() -> (DashboardSession, Recorded) {
        let ops: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink_ops = Arc::clone(&ops);
        let sink = move |op: RenderOp| sink_ops.lock().unwrap().push(op);
        (
            DashboardSession::new(20, DisplayAggregator::default(), Box::new(sink)),
            ops,
        )
    }

    fn fast_config(ws_url: String) -> LiveConfig {
        LiveConfig {
            ws_url,
            reconnect_delay: Duration::from_millis(50),
            keepalive_interval: Duration::from_millis(50),
            poll_interval: Duration::from_millis(40),
            history_limit: 20,
        }
    }

    fn states(ops: &Recorded) -> Vec<ConnectionState> {
        ops.lock()
            .unwrap()
            .iter()
            .filter_map(|op| match op {
                RenderOp::ConnectionStatus { state } => Some(*state),
                _ => None,
            })
            .collect()
    }

    fn assert_valid_cycle(states: &[ConnectionState]) {
        use ConnectionState::*;
        let mut prev = Disconnected;
        for &next in states {
            let ok = matches!(
                (prev, next),
                (Disconnected, Connecting) | (Connecting, Connected) | (Connecting, Disconnected) | (Connected, Disconnected)
            );
            assert!(ok, "invalid transition {:?} -> {:?} in {:?}", prev, next, states);
            prev = next;
        }
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    async fn spawn_ws_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("ws://{}/ws", addr)
    }

    async fn dead_ws_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{}/ws", addr)
    }

    #[derive(Clone, Default)]
    struct WsCounters {
        connections: Arc<AtomicUsize>,
        pings: Arc<AtomicUsize>,
    }

    async fn push_then_listen(ws: WebSocketUpgrade, State(counters): State<WsCounters>) -> Response {
        counters.connections.fetch_add(1, Ordering::SeqCst);
        ws.on_upgrade(move |mut socket: WebSocket| async move {
            let stats = r#"{"type":"stats","data":{"category_counts":{"fresh_fruit":3,"spoiled_fruit":1,"other":0},"total":4,"avg_confidence":0.92,"avg_processing_time":0.15}}"#;
            let event = r#"{"type":"classification","data":{"classification":"fresh_fruit","confidence":0.97,"timestamp":1700000000}}"#;
            let _ = socket.send(AxumMessage::Text(stats.to_string())).await;
            let _ = socket.send(AxumMessage::Text("garbage".to_string())).await;
            let _ = socket.send(AxumMessage::Text(r#"{"type":"future_thing"}"#.to_string())).await;
            let _ = socket.send(AxumMessage::Text(event.to_string())).await;

            while let Some(Ok(msg)) = socket.recv().await {
                if let AxumMessage::Text(text) = msg {
                    if text == "ping" {
                        counters.pings.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
        })
    }

    async fn close_immediately(ws: WebSocketUpgrade, State(counters): State<WsCounters>) -> Response {
        counters.connections.fetch_add(1, Ordering::SeqCst);
        ws.on_upgrade(|mut socket: WebSocket| async move {
            let _ = socket.send(AxumMessage::Close(None)).await;
        })
    }

    #[test]
    fn test_default_config() {
        let config = LiveConfig::default();
        assert_eq!(config.ws_url, "ws://localhost:8000/ws");
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.keepalive_interval, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.history_limit, 20);
    }

    #[tokio::test]
    async fn test_live_messages_update_session() {
        let counters = WsCounters::default();
        let router = Router::new()
            .route("/ws", get(push_then_listen))
            .with_state(counters.clone());
        let url = spawn_ws_backend(router).await;

        // No history, so a late history load cannot replace the pushed event
        let source = Arc::new(FakeSource {
            history: Vec::new(),
            ..FakeSource::new(4)
        });
        let (session, ops) = recording_session();
        let handle = LiveClient::new(fast_config(url), source.clone(), session).spawn();

        wait_for(|| {
            ops.lock()
                .unwrap()
                .iter()
                .any(|op| matches!(op, RenderOp::ActivityPrepended { .. }))
        })
        .await;
        // Refetch after the pushed classification
        wait_for(|| source.calls() >= 2).await;
        wait_for(|| counters.pings.load(Ordering::SeqCst) >= 1).await;
        assert_eq!(handle.state(), ConnectionState::Connected);

        let session = handle.shutdown().await.unwrap();
        assert_eq!(session.feed().latest().unwrap().confidence, 0.97);
        assert_eq!(counters.connections.load(Ordering::SeqCst), 1);
        assert_valid_cycle(&states(&ops));
    }

    #[tokio::test]
    async fn test_reconnects_after_server_close() {
        let counters = WsCounters::default();
        let router = Router::new()
            .route("/ws", get(close_immediately))
            .with_state(counters.clone());
        let url = spawn_ws_backend(router).await;

        let (session, ops) = recording_session();
        let handle = LiveClient::new(fast_config(url), Arc::new(FakeSource::new(1)), session).spawn();

        wait_for(|| counters.connections.load(Ordering::SeqCst) >= 3).await;
        handle.shutdown().await.unwrap();

        let seen = states(&ops);
        assert!(seen.iter().filter(|s| **s == ConnectionState::Connected).count() >= 2);
        assert_valid_cycle(&seen);
    }

    #[tokio::test]
    async fn test_polls_while_disconnected() {
        let source = Arc::new(FakeSource::new(7));
        let (session, ops) = recording_session();
        let handle = LiveClient::new(fast_config(dead_ws_url().await), source.clone(), session).spawn();

        // Initial load plus at least two poll fetches
        wait_for(|| source.calls() >= 3).await;
        let session = handle.shutdown().await.unwrap();

        assert_eq!(session.snapshot().unwrap().total, 7);
        assert_eq!(session.feed().len(), 1);
        let seen = states(&ops);
        assert!(!seen.contains(&ConnectionState::Connected));
        assert_valid_cycle(&seen);
    }

    #[tokio::test]
    async fn test_fetch_failures_keep_display() {
        let source = Arc::new(FakeSource::failing());
        let (session, _ops) = recording_session();
        let handle = LiveClient::new(fast_config(dead_ws_url().await), source.clone(), session).spawn();

        wait_for(|| source.calls() >= 2).await;
        let session = handle.shutdown().await.unwrap();
        assert!(session.snapshot().is_none());
        assert!(session.feed().is_empty());
    }

    #[tokio::test]
    async fn test_poll_result_dropped_while_connected() {
        let (session, _ops) = recording_session();
        let mut client = LiveClient::new(
            LiveConfig::default(),
            Arc::new(FakeSource::new(3)),
            session,
        );
        client.machine.begin_attempt().unwrap();
        client.machine.opened().unwrap();

        client.handle_event(LiveEvent::StatisticsFetched {
            origin: FetchOrigin::Poll,
            result: Ok(FakeSource::new(9).snapshot),
        });
        assert!(client.session.snapshot().is_none());

        client.handle_event(LiveEvent::StatisticsFetched {
            origin: FetchOrigin::Refetch,
            result: Ok(FakeSource::new(9).snapshot),
        });
        assert_eq!(client.session.snapshot().unwrap().total, 9);
    }

    #[tokio::test]
    async fn test_poll_tick_ignored_while_connected() {
        let source = Arc::new(FakeSource::new(3));
        let (session, _ops) = recording_session();
        let mut client = LiveClient::new(LiveConfig::default(), source.clone(), session);
        client.machine.begin_attempt().unwrap();
        client.machine.opened().unwrap();

        client.handle_event(LiveEvent::PollTick);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let (session, _ops) = recording_session();
        let mut client = LiveClient::new(
            fast_config(dead_ws_url().await),
            Arc::new(FakeSource::new(0)),
            session,
        );

        client.connect();
        client.connect();
        client.handle_event(LiveEvent::ConnectRequested);
        assert_eq!(client.machine.attempts(), 1);
        assert_eq!(client.machine.state(), ConnectionState::Connecting);
        client.teardown();
    }

    #[tokio::test]
    async fn test_stale_attempt_events_ignored() {
        let (session, _ops) = recording_session();
        let mut client = LiveClient::new(
            fast_config(dead_ws_url().await),
            Arc::new(FakeSource::new(0)),
            session,
        );
        client.connect();

        client.handle_event(LiveEvent::Opened { attempt: 99 });
        client.handle_event(LiveEvent::Frame {
            attempt: 99,
            text: r#"{"type":"stats","data":{"total":5}}"#.to_string(),
        });
        assert_eq!(client.machine.state(), ConnectionState::Connecting);
        assert!(client.session.snapshot().is_none());
        client.teardown();
    }

    #[tokio::test]
    async fn test_manual_connect_cancels_pending_reconnect() {
        let (session, _ops) = recording_session();
        let mut config = fast_config(dead_ws_url().await);
        config.reconnect_delay = Duration::from_secs(3600);
        let mut client = LiveClient::new(config, Arc::new(FakeSource::new(0)), session);

        client.connect();
        let attempt = client.machine.attempts();
        client.handle_event(LiveEvent::Closed {
            attempt,
            reason: "test".into(),
        });
        assert!(client.pending_reconnect.is_some());

        client.handle_event(LiveEvent::ConnectRequested);
        assert!(client.pending_reconnect.is_none());
        assert_eq!(client.machine.attempts(), 2);
        client.teardown();
    }
}
