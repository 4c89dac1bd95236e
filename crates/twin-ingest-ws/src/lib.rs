//! WebSocket transport for the telemetry stream.
//!
//! One [`TransportClient`] owns at most one live connection. All socket work
//! runs on a tokio runtime; outcomes come back as [`TransportEvent`]s on a
//! crossbeam channel so the tick thread can drain them without blocking.
//!
//! Each `connect` hands out a [`Subscription`]. `close` (and `Drop`)
//! invalidate it synchronously, after which the I/O task raises no more
//! events for that connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use model::{Command, ConnectionState};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use twin_ingest_core::{TransportEvent, TransportTx};
use uuid::Uuid;

pub const DEFAULT_URL: &str = "ws://localhost:8765";

#[derive(Clone, Debug)]
pub struct Subscription {
    id: Uuid,
    live: Arc<AtomicBool>,
}

impl Subscription {
    fn new() -> Self {
        Self { id: Uuid::new_v4(), live: Arc::new(AtomicBool::new(true)) }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.live.store(false, Ordering::Release);
    }
}

enum Outbound {
    Text(String),
    Close,
}

#[derive(Default)]
struct Link {
    state: ConnectionState,
    subscription: Option<Subscription>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
}

pub struct TransportClient {
    runtime: Handle,
    events: TransportTx,
    link: Arc<Mutex<Link>>,
}

impl TransportClient {
    pub fn new(runtime: Handle, events: TransportTx) -> Self {
        Self { runtime, events, link: Arc::new(Mutex::new(Link::default())) }
    }

    /// Starts a connection attempt and returns immediately. Skipped (returns
    /// `None`) while a connection is already pending or up.
    pub fn connect(&self, url: &str) -> Option<Subscription> {
        let mut link = self.link.lock();
        if link.state.is_busy() {
            debug!(url, state = ?link.state, "connect skipped");
            return None;
        }

        let sub = Subscription::new();
        let (tx, rx) = mpsc::unbounded_channel();
        link.state = ConnectionState::Connecting;
        link.subscription = Some(sub.clone());
        link.outbound = Some(tx);
        drop(link);

        info!(url, connection = %sub.id(), "connecting");
        let dispatch = Dispatch { link: self.link.clone(), sub: sub.clone(), events: self.events.clone() };
        self.runtime.spawn(run_link(url.to_owned(), dispatch, rx));
        Some(sub)
    }

    /// Queues a text frame. Returns false (and sends nothing) unless
    /// Connected.
    pub fn send(&self, payload: impl Into<String>) -> bool {
        let link = self.link.lock();
        if link.state != ConnectionState::Connected {
            debug!(state = ?link.state, "not connected, outbound frame dropped");
            return false;
        }
        match &link.outbound {
            Some(tx) => tx.send(Outbound::Text(payload.into())).is_ok(),
            None => false,
        }
    }

    pub fn send_command(&self, command: Command) -> bool {
        self.send(command.to_frame())
    }

    /// Closes a pending or open connection. Frames still queued may or may
    /// not reach the server.
    pub fn close(&self) {
        let mut link = self.link.lock();
        if let Some(sub) = link.subscription.take() {
            sub.cancel();
            info!(connection = %sub.id(), "closing");
        }
        if let Some(tx) = link.outbound.take() {
            let _ = tx.send(Outbound::Close);
        }
        if link.state.is_busy() {
            link.state = ConnectionState::Disconnected;
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.link.lock().state
    }

    pub fn subscription(&self) -> Option<Subscription> {
        self.link.lock().subscription.clone()
    }
}

impl Drop for TransportClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// The I/O task's view of its client. Every event goes through the link
/// lock so it cannot race with `close`.
struct Dispatch {
    link: Arc<Mutex<Link>>,
    sub: Subscription,
    events: TransportTx,
}

impl Dispatch {
    fn emit(&self, next: Option<ConnectionState>, event: TransportEvent) -> bool {
        let mut link = self.link.lock();
        if !self.sub.is_live() {
            return false;
        }
        if let Some(state) = next {
            link.state = state;
        }
        let _ = self.events.send(event);
        true
    }

    /// Terminal transition: the subscription dies with the connection.
    fn finish(&self, state: ConnectionState, event: TransportEvent) {
        let mut link = self.link.lock();
        if !self.sub.is_live() {
            return;
        }
        self.sub.cancel();
        link.state = state;
        link.subscription = None;
        link.outbound = None;
        let _ = self.events.send(event);
    }
}

async fn run_link(url: String, link: Dispatch, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let connection = link.sub.id();
    let mut ws = match connect_async(url.as_str()).await {
        Ok((ws, _resp)) => ws,
        Err(e) => {
            error!(%url, %connection, error = %e, "failed to connect to telemetry server");
            link.finish(ConnectionState::Errored, TransportEvent::ConnectionError(e.to_string()));
            return;
        }
    };

    if !link.emit(Some(ConnectionState::Connected), TransportEvent::Connected) {
        debug!(%connection, "closed before connect completed");
        let _ = ws.close(None).await;
        return;
    }
    info!(%url, %connection, "connected to telemetry server");

    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            cmd = outbound.recv() => match cmd {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        warn!(%connection, error = %e, "send failed");
                        link.finish(ConnectionState::Errored, TransportEvent::ConnectionError(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    let _ = sink.close().await;
                    debug!(%connection, "closed");
                    break;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    link.emit(None, TransportEvent::Message(text));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    debug!(%connection, len = bytes.len(), "ignoring binary frame");
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!(%connection, "server closed the connection");
                    link.finish(ConnectionState::Disconnected, TransportEvent::Disconnected);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(%connection, error = %e, "connection dropped");
                    link.finish(ConnectionState::Errored, TransportEvent::ConnectionError(e.to_string()));
                    break;
                }
            }
        }
    }
}
