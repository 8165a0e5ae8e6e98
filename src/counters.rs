/// Counters module - running totals of successfully sent datagrams

/// Point-in-time copy of the counters, pushed to telemetry on each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub packets_sent: u64,
    pub bytes_sent: u64,
}

/// Counters - process-lifetime send totals
///
/// Only ever increased, and only together, by a successful send.
#[derive(Debug, Default)]
pub struct Counters {
    packets_sent: u64,
    bytes_sent: u64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one datagram of `bytes` bytes written by the OS
    pub fn record_sent(&mut self, bytes: usize) {
        self.packets_sent = self.packets_sent.saturating_add(1);
        self.bytes_sent = self.bytes_sent.saturating_add(bytes as u64);
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            packets_sent: self.packets_sent,
            bytes_sent: self.bytes_sent,
        }
    }
}
