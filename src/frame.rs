/// Frame module - wire layout of a single datagram
///
/// ```text
/// [4 bytes: sequence (u32, big-endian)][1 byte: source id][payload...]
/// ```
///
/// The encoder owns one fixed-capacity buffer that is reset and reused for
/// every frame, so the send path performs no heap allocation.

use crate::errors::{Result, SenderError};
use crate::{FRAME_CAPACITY, HEADER_SIZE};

/// Width of the sequence number field
const SEQUENCE_SIZE: usize = 4;

/// A frame encoded into the encoder's buffer
///
/// Borrows the buffer; it only lives for the duration of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    sequence: u32,
    source_id: u8,
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Sequence number written into the header
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Source identifier written into the header
    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    /// Complete on-wire bytes (header + payload)
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Encoded length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Frames always carry a header, so this is never true
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// FrameEncoder - assigns sequence numbers and serializes frames
pub struct FrameEncoder {
    buffer: [u8; FRAME_CAPACITY],
    len: usize,
    next_sequence: u32,
}

impl FrameEncoder {
    /// Create an encoder whose first frame carries sequence 0
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create an encoder whose first frame carries `sequence`
    pub fn starting_at(sequence: u32) -> Self {
        Self {
            buffer: [0; FRAME_CAPACITY],
            len: 0,
            next_sequence: sequence,
        }
    }

    /// Sequence number the next successful encode will use
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Encode one frame into the reusable buffer
    ///
    /// The sequence counter advances only when the frame fits. An oversized
    /// payload is rejected whole, never truncated.
    ///
    /// # Errors
    /// `BufferOverflow` if header plus payload exceeds `FRAME_CAPACITY`
    pub fn encode(&mut self, source_id: u8, payload: &[u8]) -> Result<Frame<'_>> {
        self.len = 0;

        let required = HEADER_SIZE + payload.len();
        if required > FRAME_CAPACITY {
            return Err(SenderError::BufferOverflow {
                required,
                available: FRAME_CAPACITY,
            });
        }

        let sequence = self.next_sequence;
        self.buffer[..SEQUENCE_SIZE].copy_from_slice(&sequence.to_be_bytes());
        self.buffer[SEQUENCE_SIZE] = source_id;
        self.buffer[HEADER_SIZE..required].copy_from_slice(payload);
        self.len = required;
        self.next_sequence = sequence.wrapping_add(1);

        Ok(Frame {
            sequence,
            source_id,
            bytes: &self.buffer[..self.len],
        })
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// A frame recovered from received datagram bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame<'a> {
    pub sequence: u32,
    pub source_id: u8,
    pub payload: &'a [u8],
}

impl<'a> DecodedFrame<'a> {
    /// Split a datagram back into (sequence, source id, payload)
    ///
    /// # Errors
    /// `InvalidPacketLength` if the datagram is shorter than the header
    pub fn decode(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(SenderError::InvalidPacketLength {
                expected: HEADER_SIZE,
                received: bytes.len(),
            });
        }

        let sequence = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        Ok(Self {
            sequence,
            source_id: bytes[SEQUENCE_SIZE],
            payload: &bytes[HEADER_SIZE..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PAYLOAD_SIZE;

    #[test]
    fn test_header_layout() {
        let mut encoder = FrameEncoder::new();

        let frame = encoder.encode(3, &[0x01, 0x02]).unwrap();
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 0, 3, 1, 2]);
        assert_eq!(frame.sequence(), 0);

        let frame = encoder.encode(3, &[0x03]).unwrap();
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 1, 3, 3]);
        assert_eq!(encoder.next_sequence(), 2);
    }

    #[test]
    fn test_buffer_reset_between_frames() {
        let mut encoder = FrameEncoder::new();
        encoder.encode(1, &[0xAA; 64]).unwrap();

        let frame = encoder.encode(2, &[]).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE);
        assert_eq!(frame.as_bytes(), &[0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_overflow_leaves_sequence_untouched() {
        let mut encoder = FrameEncoder::starting_at(41);

        let err = encoder.encode(9, &[0u8; MAX_PAYLOAD_SIZE + 1]).unwrap_err();
        assert_eq!(
            err,
            SenderError::BufferOverflow {
                required: FRAME_CAPACITY + 1,
                available: FRAME_CAPACITY,
            }
        );
        assert_eq!(encoder.next_sequence(), 41);

        // Exactly at capacity still fits
        let frame = encoder.encode(9, &[0u8; MAX_PAYLOAD_SIZE]).unwrap();
        assert_eq!(frame.len(), FRAME_CAPACITY);
        assert_eq!(frame.sequence(), 41);
    }

    #[test]
    fn test_sequence_wraps() {
        let mut encoder = FrameEncoder::starting_at(u32::MAX);

        assert_eq!(encoder.encode(0, &[]).unwrap().sequence(), u32::MAX);
        assert_eq!(encoder.encode(0, &[]).unwrap().sequence(), 0);
    }

    #[test]
    fn test_decode_recovers_fields() {
        let mut encoder = FrameEncoder::starting_at(0x0102_0304);
        let bytes = encoder.encode(200, b"args").unwrap().as_bytes().to_vec();

        let decoded = DecodedFrame::decode(&bytes).unwrap();
        assert_eq!(decoded.sequence, 0x0102_0304);
        assert_eq!(decoded.source_id, 200);
        assert_eq!(decoded.payload, b"args");
    }

    #[test]
    fn test_decode_short_datagram() {
        let result = DecodedFrame::decode(&[0, 0, 0]);
        assert_eq!(
            result,
            Err(SenderError::InvalidPacketLength { expected: HEADER_SIZE, received: 3 })
        );
    }
}
