/// Transport module - puts encoded frames on the wire
///
/// Classifies the outcome of one `send_to`: the full frame written, an
/// ordinary send failure, or a short/long write that means something below
/// us is broken.

use tracing::trace;

use crate::errors::{Result, SenderError};
use crate::frame::Frame;
use crate::socket::SocketLifecycle;

/// DatagramTransport - one frame, one datagram
pub struct DatagramTransport;

impl DatagramTransport {
    /// Send a frame to the destination recorded by the lifecycle
    ///
    /// # Returns
    /// Number of bytes the OS wrote, always equal to `frame.len()`
    ///
    /// # Errors
    /// - `SendFailed` if the lifecycle is closed or the OS rejects the send
    /// - `LengthMismatch` if the OS wrote a different number of bytes
    pub fn send(lifecycle: &SocketLifecycle, frame: &Frame<'_>) -> Result<usize> {
        let (socket, destination) = lifecycle
            .endpoint()
            .ok_or_else(|| SenderError::SendFailed("socket is not open".to_string()))?;

        let sent = socket
            .send_to(frame.as_bytes(), destination)
            .map_err(|e| SenderError::SendFailed(e.to_string()))?;

        if sent != frame.len() {
            return Err(SenderError::LengthMismatch {
                expected: frame.len(),
                sent,
            });
        }

        trace!(
            sequence = frame.sequence(),
            source_id = frame.source_id(),
            bytes = sent,
            %destination,
            "frame sent"
        );
        Ok(sent)
    }
}
