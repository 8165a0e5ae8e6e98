/// Events module - outbound notifications
///
/// The sender never logs directly on its send path; it reports to an
/// `EventSink`. `TracingSink` renders events through `tracing`,
/// `MemorySink` records them for inspection.

use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::counters::TelemetrySnapshot;
use crate::errors::SenderError;

/// Fire-and-forget notification emitted by the sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SenderEvent {
    /// Socket created; `address` is the text given to `open`, `ip` what it
    /// resolved to
    PortOpened { address: String, ip: Ipv4Addr, port: u16 },

    /// Socket creation failed; the sender stays disabled
    SocketError(String),

    /// Destination text was rejected before any socket was created
    InvalidDestination(String),

    /// One datagram could not be sent and was dropped
    SendError(String),
}

impl SenderEvent {
    /// Event reported for a contained failure
    ///
    /// Integrity faults and receive-side errors have no event; they are
    /// returned to the caller instead.
    pub fn from_error(error: &SenderError) -> Option<Self> {
        match error {
            SenderError::InvalidAddress(_) | SenderError::InvalidPort(_) => {
                Some(Self::InvalidDestination(error.to_string()))
            }
            SenderError::SocketCreate(text) => Some(Self::SocketError(text.clone())),
            SenderError::SendFailed(text) => Some(Self::SendError(text.clone())),
            _ => None,
        }
    }
}

/// Consumer of sender events and telemetry snapshots
pub trait EventSink: Send {
    fn event(&mut self, event: SenderEvent);

    fn telemetry(&mut self, snapshot: TelemetrySnapshot);
}

/// Default sink: structured `tracing` output
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn event(&mut self, event: SenderEvent) {
        match event {
            SenderEvent::PortOpened { address, ip, port } => {
                info!(%address, %ip, port, "UDP sender port opened");
            }
            SenderEvent::SocketError(error) => {
                warn!(%error, "UDP sender socket creation failed");
            }
            SenderEvent::InvalidDestination(error) => {
                warn!(%error, "UDP sender destination rejected");
            }
            SenderEvent::SendError(error) => {
                warn!(%error, "UDP sender send failed");
            }
        }
    }

    fn telemetry(&mut self, snapshot: TelemetrySnapshot) {
        info!(
            packets_sent = snapshot.packets_sent,
            bytes_sent = snapshot.bytes_sent,
            "UDP sender telemetry"
        );
    }
}

#[derive(Debug, Default)]
struct Recorded {
    events: Vec<SenderEvent>,
    snapshots: Vec<TelemetrySnapshot>,
}

/// Sink that keeps everything it receives
///
/// Clones share the same storage, so one clone can be handed to the
/// sender while another is kept for reading.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    recorded: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SenderEvent> {
        self.recorded.lock().events.clone()
    }

    pub fn snapshots(&self) -> Vec<TelemetrySnapshot> {
        self.recorded.lock().snapshots.clone()
    }

    pub fn clear(&self) {
        let mut recorded = self.recorded.lock();
        recorded.events.clear();
        recorded.snapshots.clear();
    }
}

impl EventSink for MemorySink {
    fn event(&mut self, event: SenderEvent) {
        self.recorded.lock().events.push(event);
    }

    fn telemetry(&mut self, snapshot: TelemetrySnapshot) {
        self.recorded.lock().snapshots.push(snapshot);
    }
}
