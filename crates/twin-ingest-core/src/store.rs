use std::sync::Arc;

use model::TelemetrySample;
use parking_lot::RwLock;
use tracing::{trace, warn};

use crate::decode::{decode, DecodeError, TelemetryFrame};

/// Current and previous sample as one consistent view. `version` counts
/// successful applies; the `*_updated` flags say whether the last frame
/// carried that group or it was carried over.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub current: Option<Arc<TelemetrySample>>,
    pub previous: Option<Arc<TelemetrySample>>,
    pub version: u64,
    pub tires_updated: bool,
    pub aero_updated: bool,
}

impl Snapshot {
    /// `(from, to)` when the last apply changed gear.
    pub fn gear_changed(&self) -> Option<(i32, i32)> {
        match (&self.previous, &self.current) {
            (Some(prev), Some(cur)) if prev.gear != cur.gear => Some((prev.gear, cur.gear)),
            _ => None,
        }
    }
}

/// Latest decoded vehicle state. Only the owner of the store writes;
/// everyone else reads through a [`StateReader`].
#[derive(Default)]
pub struct StateStore {
    inner: Arc<RwLock<Snapshot>>,
}

#[derive(Clone)]
pub struct StateReader {
    inner: Arc<RwLock<Snapshot>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reader(&self) -> StateReader {
        StateReader { inner: self.inner.clone() }
    }

    /// Merges `frame` over the current sample and swaps it in. Readers see
    /// either the old pair or the new pair, never a mix.
    pub fn apply(&mut self, frame: TelemetryFrame) -> Snapshot {
        let mut snap = self.inner.write();
        snap.tires_updated = frame.tires.is_some();
        snap.aero_updated = frame.drs.is_some();
        let prior = snap.current.take();
        let sample = frame.into_sample(prior.as_deref());
        snap.previous = prior;
        snap.current = Some(Arc::new(sample));
        snap.version += 1;
        snap.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn current(&self) -> Option<Arc<TelemetrySample>> {
        self.inner.read().current.clone()
    }

    pub fn previous(&self) -> Option<Arc<TelemetrySample>> {
        self.inner.read().previous.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

impl StateReader {
    pub fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    pub fn current(&self) -> Option<Arc<TelemetrySample>> {
        self.inner.read().current.clone()
    }

    pub fn previous(&self) -> Option<Arc<TelemetrySample>> {
        self.inner.read().previous.clone()
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

/// Decodes one text frame into the store. A bad frame is logged and
/// dropped; the store is left untouched.
pub fn ingest(store: &mut StateStore, text: &str) -> Result<Snapshot, DecodeError> {
    trace!(frame = %text, "rx");
    match decode(text) {
        Ok(frame) => Ok(store.apply(frame)),
        Err(e) => {
            warn!(error = %e, "dropping telemetry frame");
            Err(e)
        }
    }
}
