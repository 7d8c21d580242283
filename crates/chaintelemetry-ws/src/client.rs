//! Telemetry feed client with auto-reconnect and subscription tracking.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use chaintelemetry_core::{
    ApplyOutcome, ChainStats, ChainStatsStore, FeedDecoder, FeedMessage, GenesisHash, Location,
    LocationProvider, NodeId, NodeRecord, NodeRegistry, FEED_VERSION,
};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::logger::{Logger, TracingLogger};
use crate::notifier::{ObserverHandle, UpdateNotifier};
use crate::state::{CloseDecision, ConnectionMachine, ConnectionState};
use crate::subscription::{subscribe_frame, SubscriptionTracker};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const ERROR_CHANNEL_CAPACITY: usize = 64;

/// Command sent from callers to the background connection task.
enum Command {
    Subscribe(GenesisHash),
    Close,
}

/// State shared between the client handle and the connection task.
/// Only the task writes to `registry` and `stats`.
struct Shared {
    registry: RwLock<NodeRegistry>,
    stats: RwLock<ChainStatsStore>,
    subscription: SubscriptionTracker,
    notifier: UpdateNotifier,
    state_tx: watch::Sender<ConnectionState>,
    errors_tx: broadcast::Sender<ClientError>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }
}

struct Control {
    cmd_tx: mpsc::UnboundedSender<Command>,
    /// `None` while the initial dial is in flight.
    task: Option<JoinHandle<()>>,
}

/// Substrate telemetry feed client.
///
/// `connect()` opens the socket and hands it to a background task that
/// decodes frames, maintains the node registry and notifies observers.
/// Reads return snapshots and never block the task for long.
pub struct TelemetryClient {
    config: ClientConfig,
    shared: Arc<Shared>,
    logger: Arc<dyn Logger>,
    location: Option<Arc<dyn LocationProvider>>,
    control: Mutex<Option<Control>>,
}

impl TelemetryClient {
    pub fn new(config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            config,
            shared: Arc::new(Shared {
                registry: RwLock::new(NodeRegistry::new()),
                stats: RwLock::new(ChainStatsStore::new()),
                subscription: SubscriptionTracker::new(),
                notifier: UpdateNotifier::new(),
                state_tx,
                errors_tx,
            }),
            logger: Arc::new(TracingLogger),
            location: None,
            control: Mutex::new(None),
        }
    }

    /// Route client output through `logger` instead of `tracing`.
    pub fn with_logger(mut self, logger: impl Logger) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    /// Enrich nodes that report an IP with `provider`'s location data.
    pub fn with_location_provider(mut self, provider: impl LocationProvider) -> Self {
        self.location = Some(Arc::new(provider));
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the connection and start the background task.
    ///
    /// A failure here is returned as-is and not retried; only connections
    /// that were once open are reconnected automatically. Calling this while
    /// connected replaces the current connection. A `disconnect()` that lands
    /// while the dial is in flight makes this return `ClientError::Cancelled`.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.disconnect().await;

        let url = self.config.url.clone();
        let mut machine = ConnectionMachine::new(&self.config);

        // Registered before dialing so `subscribe()` and `disconnect()` reach
        // this attempt through the queue.
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        {
            let mut control = self.control.lock();
            *control = Some(Control {
                cmd_tx: cmd_tx.clone(),
                task: None,
            });
            self.shared.set_state(machine.begin_connect());
        }
        self.logger.debug(&format!("Connecting to {url}"));

        let dialed = tokio::select! {
            biased;
            _ = close_requested(&mut cmd_rx) => None,
            res = tokio_tungstenite::connect_async(url.as_str()) => Some(res),
        };

        let mut control = self.control.lock();
        let owned = matches!(control.as_ref(), Some(c) if c.cmd_tx.same_channel(&cmd_tx));
        let ws = match dialed {
            Some(Ok((ws, _))) if owned => ws,
            Some(Err(e)) => {
                if owned {
                    *control = None;
                    self.shared.set_state(machine.initial_failed());
                }
                let err = ClientError::connection(&url, e);
                self.logger.error(&err.to_string());
                return Err(err);
            }
            _ => {
                self.logger.debug(&format!("Connect to {url} cancelled"));
                return Err(ClientError::Cancelled { url });
            }
        };
        self.shared.set_state(machine.opened());
        self.logger.log("Connected to telemetry");

        let (geo_tx, geo_rx) = mpsc::unbounded_channel();
        let task = ConnectionTask {
            url,
            max_attempts: self.config.max_reconnect_attempts,
            shared: self.shared.clone(),
            machine,
            logger: self.logger.clone(),
            location: self.location.clone(),
            decoder: FeedDecoder::new(),
            cmd_rx,
            geo_tx,
            geo_rx,
        };
        if let Some(control) = control.as_mut() {
            control.task = Some(tokio::spawn(task.run(ws)));
        }
        Ok(())
    }

    /// Follow `chain`. Sent right away if connected, otherwise on the next
    /// open. Replaces any earlier subscription.
    pub fn subscribe(&self, chain: impl Into<GenesisHash>) {
        let chain = chain.into();
        self.shared.subscription.set(chain.clone());
        if let Some(control) = self.control.lock().as_ref() {
            let _ = control.cmd_tx.send(Command::Subscribe(chain));
        }
    }

    pub fn subscribed_chain(&self) -> Option<GenesisHash> {
        self.shared.subscription.current()
    }

    /// Register `handler` to receive the full node list after every
    /// processed frame.
    pub fn on_update<F>(&self, handler: F) -> ObserverHandle
    where
        F: Fn(&[NodeRecord]) + Send + Sync + 'static,
    {
        self.shared.notifier.register(handler)
    }

    pub fn nodes(&self) -> Vec<NodeRecord> {
        self.shared.registry.read().nodes()
    }

    pub fn node(&self, id: NodeId) -> Option<NodeRecord> {
        self.shared.registry.read().get(id).cloned()
    }

    pub fn nodes_filtered(&self, predicate: impl Fn(&NodeRecord) -> bool) -> Vec<NodeRecord> {
        self.shared.registry.read().filtered(predicate)
    }

    pub fn nodes_sorted(
        &self,
        compare: impl FnMut(&NodeRecord, &NodeRecord) -> Ordering,
    ) -> Vec<NodeRecord> {
        self.shared.registry.read().sorted(compare)
    }

    pub fn chain_stats(&self) -> Option<ChainStats> {
        self.shared.stats.read().get().cloned()
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Asynchronous failures: reconnect exhaustion, version mismatch,
    /// unexpected close without auto-reconnect.
    pub fn errors(&self) -> broadcast::Receiver<ClientError> {
        self.shared.errors_tx.subscribe()
    }

    /// Close the socket and stop the background task, cancelling any
    /// pending reconnect. Nothing reconnects until `connect()` is called.
    pub async fn disconnect(&self) {
        let control = self.control.lock().take();
        if let Some(control) = control {
            let _ = control.cmd_tx.send(Command::Close);
            if let Some(task) = control.task {
                let _ = task.await;
            }
        }
        self.shared.set_state(ConnectionState::Disconnected);
    }
}

impl Default for TelemetryClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl Drop for TelemetryClient {
    fn drop(&mut self) {
        if let Some(control) = self.control.get_mut().take() {
            let _ = control.cmd_tx.send(Command::Close);
        }
    }
}

/// Resolves once `Close` is queued or every sender is gone. Subscriptions
/// seen here are dropped; the tracker resends them on open.
async fn close_requested(cmd_rx: &mut mpsc::UnboundedReceiver<Command>) {
    while let Some(cmd) = cmd_rx.recv().await {
        if matches!(cmd, Command::Close) {
            return;
        }
    }
}

/// A geolocation result on its way back to the connection task.
struct Enrichment {
    id: NodeId,
    ip: String,
    location: Location,
}

/// How one open connection ended.
enum SessionEnd {
    Lost(String),
    Shutdown,
    Fatal(ClientError),
}

enum Redial {
    Opened(Box<WsStream>),
    Failed(String),
    Cancelled,
}

/// Background task that owns the socket and is the only registry writer.
struct ConnectionTask {
    url: String,
    max_attempts: u32,
    shared: Arc<Shared>,
    machine: ConnectionMachine,
    logger: Arc<dyn Logger>,
    location: Option<Arc<dyn LocationProvider>>,
    decoder: FeedDecoder,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    geo_tx: mpsc::UnboundedSender<Enrichment>,
    geo_rx: mpsc::UnboundedReceiver<Enrichment>,
}

impl ConnectionTask {
    async fn run(mut self, ws: WsStream) {
        let mut ws = ws;
        loop {
            let reason = match self.session(ws).await {
                SessionEnd::Lost(reason) => reason,
                SessionEnd::Shutdown => {
                    self.shared.set_state(self.machine.disconnected());
                    return;
                }
                SessionEnd::Fatal(err) => {
                    self.shared.set_state(self.machine.disconnected());
                    self.report(err);
                    return;
                }
            };
            self.logger
                .warn(&format!("Disconnected from telemetry: {reason}"));

            let mut decision = self.machine.connection_lost();
            ws = loop {
                match decision {
                    CloseDecision::Reconnect { attempt, delay } => {
                        self.shared.set_state(self.machine.state());
                        self.logger.log(&format!(
                            "Reconnecting in {}ms... Attempt {attempt} of {}",
                            delay.as_millis(),
                            self.max_attempts
                        ));
                        match self.redial(delay).await {
                            Redial::Opened(ws) => break *ws,
                            Redial::Failed(reason) => {
                                self.logger
                                    .error(&format!("Reconnection attempt failed: {reason}"));
                                decision = self.machine.reconnect_failed();
                            }
                            Redial::Cancelled => {
                                self.shared.set_state(self.machine.disconnected());
                                return;
                            }
                        }
                    }
                    CloseDecision::GiveUp { attempts } => {
                        self.shared.set_state(self.machine.state());
                        self.report(ClientError::ReconnectExhausted {
                            url: self.url.clone(),
                            attempts,
                        });
                        return;
                    }
                    CloseDecision::Stop => {
                        self.shared.set_state(self.machine.state());
                        self.report(ClientError::ConnectionClosed {
                            url: self.url.clone(),
                        });
                        return;
                    }
                }
            };
            self.shared.set_state(self.machine.opened());
            self.logger.log("Connected to telemetry");
        }
    }

    /// Drive one open connection until it ends.
    async fn session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        // Re-send the tracked subscription on every open.
        let mut sent_chain = self.shared.subscription.current();
        if let Some(chain) = &sent_chain {
            if let Err(e) = sink.send(Message::Text(subscribe_frame(chain).into())).await {
                return SessionEnd::Lost(e.to_string());
            }
        }

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        None | Some(Command::Close) => {
                            let _ = sink.close().await;
                            return SessionEnd::Shutdown;
                        }
                        Some(Command::Subscribe(chain)) if sent_chain.as_ref() == Some(&chain) => {}
                        Some(Command::Subscribe(chain)) => {
                            let frame = subscribe_frame(&chain);
                            sent_chain = Some(chain);
                            if let Err(e) = sink.send(Message::Text(frame.into())).await {
                                return SessionEnd::Lost(e.to_string());
                            }
                        }
                    }
                }
                Some(enrichment) = self.geo_rx.recv() => {
                    self.apply_enrichment(enrichment);
                }
                msg = stream.next() => {
                    match msg {
                        None => return SessionEnd::Lost("stream ended".into()),
                        Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                        Some(Ok(Message::Text(text))) => {
                            if let Err(err) = self.process_frame(text.as_str()) {
                                let _ = sink.close().await;
                                return SessionEnd::Fatal(err);
                            }
                        }
                        Some(Ok(Message::Close(_))) => {
                            return SessionEnd::Lost("closed by server".into());
                        }
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Wait out the backoff delay, then dial. `Close` cancels either step.
    async fn redial(&mut self, delay: Duration) -> Redial {
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Close) => return Redial::Cancelled,
                    // The tracker already holds it; sent on open.
                    Some(Command::Subscribe(_)) => {}
                },
            }
        }

        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        tokio::pin!(connect);
        loop {
            tokio::select! {
                res = &mut connect => {
                    return match res {
                        Ok((ws, _)) => Redial::Opened(Box::new(ws)),
                        Err(e) => Redial::Failed(e.to_string()),
                    };
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Close) => return Redial::Cancelled,
                    Some(Command::Subscribe(_)) => {}
                },
            }
        }
    }

    /// Decode and apply one frame. `Err` only for a fatal feed error.
    fn process_frame(&self, text: &str) -> Result<(), ClientError> {
        let message = match self.decoder.decode(text) {
            Ok(message) => message,
            Err(e) if e.is_ignorable() => {
                self.logger.debug(&format!("Ignoring frame: {e}"));
                self.notify();
                return Ok(());
            }
            Err(e) => {
                self.logger.warn(&format!("Dropping frame: {e}"));
                return Ok(());
            }
        };

        match message {
            FeedMessage::FeedVersion(got) if got != FEED_VERSION => {
                return Err(ClientError::VersionMismatch {
                    expected: FEED_VERSION,
                    got,
                });
            }
            FeedMessage::ChainStatsUpdate(stats) => {
                self.shared.stats.write().replace(*stats);
            }
            FeedMessage::AddedNode(node) => {
                let ip = node.details.ip.clone().filter(|ip| !ip.is_empty());
                let id = node.id;
                self.shared.registry.write().create(*node);
                if let Some(ip) = ip {
                    self.spawn_lookup(id, ip);
                }
            }
            other => {
                let (action, id) = (other.action(), other.node_id());
                let outcome = self.shared.registry.write().apply(other);
                if let (ApplyOutcome::UnknownNode, Some(id)) = (outcome, id) {
                    self.logger
                        .debug(&format!("{action} for unknown node {id}, skipped"));
                }
            }
        }
        self.notify();
        Ok(())
    }

    /// Fire-and-forget location lookup; the result comes back on `geo_rx`.
    fn spawn_lookup(&self, id: NodeId, ip: String) {
        let Some(provider) = self.location.clone() else {
            return;
        };
        let tx = self.geo_tx.clone();
        let logger = self.logger.clone();
        tokio::spawn(async move {
            match provider.lookup(&ip).await {
                Ok(location) => {
                    let _ = tx.send(Enrichment { id, ip, location });
                }
                Err(e) => logger.warn(&e.to_string()),
            }
        });
    }

    fn apply_enrichment(&self, enrichment: Enrichment) {
        let Enrichment { id, ip, location } = enrichment;
        let outcome = self
            .shared
            .registry
            .write()
            .enrich_location(id, &ip, location);
        if outcome.changed() {
            self.notify();
        }
    }

    fn notify(&self) {
        let nodes = self.shared.registry.read().nodes();
        let failed = self.shared.notifier.publish(&nodes);
        if failed > 0 {
            self.logger
                .error(&format!("{failed} update observer(s) panicked"));
        }
    }

    fn report(&self, err: ClientError) {
        self.logger.error(&err.to_string());
        let _ = self.shared.errors_tx.send(err);
    }
}
