use std::sync::Arc;

use hud::{DisplaySmoother, HudSurface};
use model::{Command, ConnectionState, PlaybackMode};
use parking_lot::Mutex;
use reconcile::Reconciler;
use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};
use twin_ingest_core::{
    ingest, transport_channel, IngestError, KinematicActuator, StateReader, StateStore, TransportEvent, TransportRx,
    VisualEffects,
};
use twin_ingest_ws::TransportClient;

use crate::config::TwinConfig;

/// Everything the tick thread owns. Transport notifications are queued by
/// the I/O task and only applied here, inside `pump`.
pub struct TwinSession {
    cfg: TwinConfig,
    client: TransportClient,
    events: TransportRx,
    store: StateStore,
    reconciler: Reconciler,
    hud: Arc<Mutex<DisplaySmoother>>,
    last_error: Option<IngestError>,
}

impl TwinSession {
    pub fn new(
        cfg: TwinConfig,
        runtime: Handle,
        body: impl KinematicActuator + 'static,
        effects: impl VisualEffects + 'static,
        surface: impl HudSurface + 'static,
    ) -> Self {
        let (tx, rx) = transport_channel();
        let client = TransportClient::new(runtime, tx);
        Self::from_parts(cfg, client, rx, body, effects, surface)
    }

    fn from_parts(
        cfg: TwinConfig,
        client: TransportClient,
        events: TransportRx,
        body: impl KinematicActuator + 'static,
        effects: impl VisualEffects + 'static,
        surface: impl HudSurface + 'static,
    ) -> Self {
        let hud = Arc::new(Mutex::new(
            DisplaySmoother::new().with_surface(surface).with_warn_interval(cfg.warn_interval()),
        ));
        let reconciler = Reconciler::new()
            .with_warn_interval(cfg.warn_interval())
            .with_actuator(body)
            .with_effects(effects)
            .with_display(hud.clone());
        Self { cfg, client, events, store: StateStore::new(), reconciler, hud, last_error: None }
    }

    pub fn connect(&self) -> bool {
        self.client.connect(&self.cfg.server_url).is_some()
    }

    pub fn close(&self) {
        self.client.close();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.client.state()
    }

    pub fn set_playback_mode(&self, mode: PlaybackMode) -> bool {
        let sent = self.client.send_command(Command::for_mode(mode));
        if sent {
            info!(?mode, "playback mode requested");
        } else {
            warn!(?mode, state = ?self.client.state(), "not connected, mode change not sent");
        }
        sent
    }

    pub fn reader(&self) -> StateReader {
        self.store.reader()
    }

    pub fn hud(&self) -> Arc<Mutex<DisplaySmoother>> {
        self.hud.clone()
    }

    /// Most recent transport failure; cleared by the next successful connect.
    pub fn last_error(&self) -> Option<&IngestError> {
        self.last_error.as_ref()
    }

    /// Applies every queued transport event. Returns how many telemetry
    /// samples were reconciled.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            match event {
                TransportEvent::Connected => {
                    info!(url = %self.cfg.server_url, "connected to telemetry server");
                    self.last_error = None;
                    if let Some(mode) = self.cfg.initial_mode {
                        self.set_playback_mode(mode);
                    }
                }
                TransportEvent::ConnectionError(e) => {
                    let err = IngestError::Transport(e);
                    error!(url = %self.cfg.server_url, error = %err, "telemetry connection failed");
                    self.last_error = Some(err);
                }
                TransportEvent::Disconnected => {
                    warn!("telemetry server went away");
                }
                TransportEvent::Message(text) => {
                    // bad frames are logged by ingest
                    let Ok(snap) = ingest(&mut self.store, &text) else { continue };
                    if let Some((from, to)) = snap.gear_changed() {
                        debug!(from, to, "gear change");
                    }
                    self.reconciler.reconcile(&snap);
                    applied += 1;
                }
            }
        }
        applied
    }

    /// One cooperative tick: drain the transport, then advance the HUD.
    pub fn tick(&mut self, dt: f32) -> usize {
        let applied = self.pump();
        self.hud.lock().tick(dt);
        applied
    }
}
