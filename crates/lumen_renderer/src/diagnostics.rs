//! Sink for bias events raised during light transport.
//!
//! Truncating a path or a photon at the depth cap is not an error, but it
//! biases the image. The core reports such events to an injected sink
//! instead of a global log so tests can observe them.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiasEvent {
    /// A camera path hit `max_ray_depth` and was cut short
    PathDepthExceeded,
    /// A photon hit `max_ray_depth` and was discarded
    PhotonDepthExceeded,
}

impl BiasEvent {
    const ALL: [BiasEvent; 2] = [BiasEvent::PathDepthExceeded, BiasEvent::PhotonDepthExceeded];

    fn index(self) -> usize {
        match self {
            BiasEvent::PathDepthExceeded => 0,
            BiasEvent::PhotonDepthExceeded => 1,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            BiasEvent::PathDepthExceeded => "camera path reached the maximum ray depth",
            BiasEvent::PhotonDepthExceeded => "photon reached the maximum ray depth",
        }
    }
}

pub trait Diagnostics: Send + Sync {
    fn report(&self, event: BiasEvent);
}

/// Default sink: counts events and warns once per kind through `log`.
#[derive(Debug, Default)]
pub struct LogDiagnostics {
    counts: [AtomicU64; 2],
}

impl LogDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, event: BiasEvent) -> u64 {
        self.counts[event.index()].load(Ordering::Relaxed)
    }

    /// Log the totals; call once a render has finished.
    pub fn summary(&self) {
        for event in BiasEvent::ALL {
            let n = self.count(event);
            if n > 0 {
                log::warn!("{} {} time(s); the image is biased", event.describe(), n);
            }
        }
    }
}

impl Diagnostics for LogDiagnostics {
    fn report(&self, event: BiasEvent) {
        let previous = self.counts[event.index()].fetch_add(1, Ordering::Relaxed);
        if previous == 0 {
            log::warn!("Bias: {} (further occurrences are counted)", event.describe());
        }
    }
}

/// Records every event in memory.
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: Mutex<Vec<BiasEvent>>,
}

impl CapturingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BiasEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, event: BiasEvent) -> usize {
        self.events.lock().iter().filter(|e| **e == event).count()
    }
}

impl Diagnostics for CapturingDiagnostics {
    fn report(&self, event: BiasEvent) {
        self.events.lock().push(event);
    }
}
