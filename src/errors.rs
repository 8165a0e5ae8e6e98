/// Error types for the UDP sender
///
/// One enum covers the whole send path: destination parsing, socket
/// creation, framing, transmission and the receive-side decoders.
use std::io;

use thiserror::Error;

/// Result type alias for sender operations
pub type Result<T> = std::result::Result<T, SenderError>;

/// Sender error enumeration
///
/// Recoverable conditions (`SocketCreate`, `SendFailed`) are contained by
/// the sender and reported as events. Integrity faults (`LengthMismatch`,
/// `BufferOverflow`) are handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SenderError {
    /// Destination address text is not an IPv4 address
    #[error("Invalid destination address: {0:?}")]
    InvalidAddress(String),

    /// Destination port text is not a decimal port number
    #[error("Invalid destination port: {0:?}")]
    InvalidPort(String),

    /// The OS refused to create the UDP socket
    #[error("Socket creation failed: {0}")]
    SocketCreate(String),

    /// A single datagram could not be sent; the frame is dropped
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The OS wrote a different number of bytes than the frame holds
    #[error("Length mismatch: expected {expected} bytes sent, OS reported {sent}")]
    LengthMismatch { expected: usize, sent: usize },

    /// Header plus payload does not fit in the frame buffer
    #[error("Buffer overflow: required {required}, available {available}")]
    BufferOverflow { required: usize, available: usize },

    /// Received datagram is too short to hold a frame header
    #[error("Invalid packet length: expected at least {expected}, received {received}")]
    InvalidPacketLength { expected: usize, received: usize },

    /// Typed call arguments could not be serialized
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Typed call arguments could not be validated or deserialized
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error outside the send path (receiver, config file)
    #[error("I/O error: {0}")]
    Io(String),

    /// The sender task is no longer running
    #[error("Sender task stopped")]
    ActorStopped,
}

impl SenderError {
    /// Integrity faults that must not be absorbed by the send path
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. } | Self::BufferOverflow { .. }
        )
    }

    /// Faults after which the sender must stop
    ///
    /// An overflow rejects one call before anything is written; a partial
    /// write means the socket can no longer be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LengthMismatch { .. })
    }
}

impl From<io::Error> for SenderError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
