/// Sender module - the per-instance UDP sender component
///
/// Ties the pieces together: the dispatch gate, the frame encoder, the
/// transport, counters and event reporting. Every operation takes
/// `&mut self`, so one instance serves one invocation at a time; wrap it in
/// the `actor` task to feed it from several producers.

use std::net::SocketAddrV4;

use crate::call::{encode_call, CALL_SCRATCH_SIZE};
use crate::config::SenderConfig;
use crate::counters::{Counters, TelemetrySnapshot};
use crate::errors::{Result, SenderError};
use crate::events::{EventSink, SenderEvent};
use crate::frame::FrameEncoder;
use crate::socket::{AddressPolicy, SocketFactory, SocketLifecycle, SocketStatus, UdpSocketFactory};
use crate::transport::DatagramTransport;

/// What happened to one inbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Frame sent in full
    Sent { sequence: u32, bytes: usize },

    /// Socket closed; nothing was encoded, counted or reported
    Disabled,

    /// Frame built but the send failed; a `SendError` event was emitted
    Dropped { sequence: u32 },
}

/// UdpSender - frames calls and forwards them to one UDP destination
pub struct UdpSender {
    lifecycle: SocketLifecycle,
    encoder: FrameEncoder,
    counters: Counters,
    sink: Box<dyn EventSink>,
}

impl UdpSender {
    /// Sender with OS sockets on an ephemeral local port and strict parsing
    pub fn new(sink: impl EventSink + 'static) -> Self {
        Self::with_factory(UdpSocketFactory::default(), AddressPolicy::Strict, sink)
    }

    /// Sender with a custom socket factory
    pub fn with_factory(
        factory: impl SocketFactory + 'static,
        policy: AddressPolicy,
        sink: impl EventSink + 'static,
    ) -> Self {
        Self {
            lifecycle: SocketLifecycle::new(Box::new(factory), policy),
            encoder: FrameEncoder::new(),
            counters: Counters::new(),
            sink: Box::new(sink),
        }
    }

    /// Sender built from configuration; the socket is not opened yet
    pub fn from_config(config: &SenderConfig, sink: impl EventSink + 'static) -> Result<Self> {
        config.validate()?;
        let factory = UdpSocketFactory::new(config.bind_socket_addr()?);
        Ok(Self::with_factory(factory, config.address_policy, sink))
    }

    pub fn status(&self) -> SocketStatus {
        self.lifecycle.status()
    }

    pub fn destination(&self) -> Option<SocketAddrV4> {
        self.lifecycle.destination()
    }

    /// Sequence number the next constructed frame will carry
    pub fn next_sequence(&self) -> u32 {
        self.encoder.next_sequence()
    }

    pub fn counters(&self) -> TelemetrySnapshot {
        self.counters.snapshot()
    }

    /// Open the socket towards `address:port`
    ///
    /// Emits `PortOpened` on success, or `InvalidDestination` /
    /// `SocketError` on failure. A failed open is not fatal: the sender
    /// simply stays disabled.
    pub fn open(&mut self, address: &str, port: &str) -> Result<SocketAddrV4> {
        match self.lifecycle.open(address, port) {
            Ok(destination) => {
                self.sink.event(SenderEvent::PortOpened {
                    address: address.to_string(),
                    ip: *destination.ip(),
                    port: destination.port(),
                });
                Ok(destination)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Open towards the destination named in `config`
    pub fn open_configured(&mut self, config: &SenderConfig) -> Result<SocketAddrV4> {
        self.open(&config.address, &config.port)
    }

    /// Release the socket; later calls become `Disabled`
    pub fn close(&mut self) {
        self.lifecycle.close();
    }

    /// Frame and send one call
    ///
    /// # Returns
    /// - `Disabled` if the socket is closed (no side effects at all)
    /// - `Sent` after a full write; counters updated
    /// - `Dropped` after an ordinary send failure; counters untouched,
    ///   the sequence number stays consumed
    ///
    /// # Errors
    /// - `BufferOverflow` if the payload cannot fit in a frame
    /// - `LengthMismatch` if the OS wrote a partial datagram
    pub fn handle_call(&mut self, source_id: u8, payload: &[u8]) -> Result<DispatchStatus> {
        if !self.lifecycle.is_open() {
            return Ok(DispatchStatus::Disabled);
        }

        let frame = self.encoder.encode(source_id, payload)?;
        let sequence = frame.sequence();

        match DatagramTransport::send(&self.lifecycle, &frame) {
            Ok(bytes) => {
                self.counters.record_sent(bytes);
                Ok(DispatchStatus::Sent { sequence, bytes })
            }
            Err(err @ SenderError::SendFailed(_)) => {
                self.report(&err);
                Ok(DispatchStatus::Dropped { sequence })
            }
            Err(err) => Err(err),
        }
    }

    /// Archive typed arguments and send them as one call
    pub fn send_typed<T>(&mut self, source_id: u8, args: &T) -> Result<DispatchStatus>
    where
        T: rkyv::Serialize<rkyv::ser::serializers::AllocSerializer<CALL_SCRATCH_SIZE>>,
    {
        if !self.lifecycle.is_open() {
            return Ok(DispatchStatus::Disabled);
        }

        let payload = encode_call(args)?;
        self.handle_call(source_id, &payload)
    }

    /// Push the current counters to telemetry
    pub fn tick(&mut self) -> TelemetrySnapshot {
        let snapshot = self.counters.snapshot();
        self.sink.telemetry(snapshot);
        snapshot
    }

    fn report(&mut self, error: &SenderError) {
        if let Some(event) = SenderEvent::from_error(error) {
            self.sink.event(event);
        }
    }
}

impl Drop for UdpSender {
    fn drop(&mut self) {
        self.lifecycle.close();
    }
}
