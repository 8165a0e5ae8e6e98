use std::net::{SocketAddr, UdpSocket};

use crate::errors::{Result, SenderError};
use crate::frame::DecodedFrame;

/// Half of the u32 sequence space; larger forward distances are treated as
/// frames from the past.
const SEQUENCE_HALF_RANGE: u32 = 1 << 31;

pub struct Receiver;

impl Receiver {
    pub fn receive<'a>(
        socket: &UdpSocket,
        buffer: &'a mut [u8],
    ) -> Result<(DecodedFrame<'a>, SocketAddr)> {
        let (bytes_received, sender_addr) = socket.recv_from(buffer)
            .map_err(|e| SenderError::Io(e.to_string()))?;

        let frame = DecodedFrame::decode(&buffer[..bytes_received])?;
        Ok((frame, sender_addr))
    }

    pub fn receive_batch(
        socket: &UdpSocket,
        count: usize,
        buffer_size: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let mut batch = Vec::with_capacity(count);
        let mut recv_buffer = vec![0u8; buffer_size];

        for _ in 0..count {
            let (bytes_received, _) = socket.recv_from(&mut recv_buffer)
                .map_err(|e| SenderError::Io(e.to_string()))?;

            batch.push(recv_buffer[..bytes_received].to_vec());
        }

        Ok(batch)
    }
}

/// Classification of one arriving sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    /// First frame seen
    First,
    /// Exactly the expected next frame
    InOrder,
    /// Frames were skipped; `missing` of them have not arrived (yet)
    Gap { missing: u32 },
    /// Older than the newest frame seen: late or duplicated
    Stale,
}

/// Tracks the sequence stream of one sender
///
/// `missing` counts gaps as they open; a frame that later fills a gap is
/// counted as stale rather than subtracted.
#[derive(Debug, Default, Clone)]
pub struct SequenceTracker {
    next_expected: Option<u32>,
    received: u64,
    missing: u64,
    stale: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, sequence: u32) -> SequenceCheck {
        self.received += 1;

        let Some(expected) = self.next_expected else {
            self.next_expected = Some(sequence.wrapping_add(1));
            return SequenceCheck::First;
        };

        let ahead = sequence.wrapping_sub(expected);
        if ahead == 0 {
            self.next_expected = Some(sequence.wrapping_add(1));
            SequenceCheck::InOrder
        } else if ahead < SEQUENCE_HALF_RANGE {
            self.missing += u64::from(ahead);
            self.next_expected = Some(sequence.wrapping_add(1));
            SequenceCheck::Gap { missing: ahead }
        } else {
            self.stale += 1;
            SequenceCheck::Stale
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn stale(&self) -> u64 {
        self.stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_order_stream() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.observe(10), SequenceCheck::First);
        assert_eq!(tracker.observe(11), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(12), SequenceCheck::InOrder);
        assert_eq!(tracker.missing(), 0);
        assert_eq!(tracker.received(), 3);
    }

    #[test]
    fn test_gap_and_late_arrival() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(0);
        assert_eq!(tracker.observe(3), SequenceCheck::Gap { missing: 2 });
        assert_eq!(tracker.observe(1), SequenceCheck::Stale);
        assert_eq!(tracker.observe(3), SequenceCheck::Stale);
        assert_eq!(tracker.observe(4), SequenceCheck::InOrder);

        assert_eq!(tracker.missing(), 2);
        assert_eq!(tracker.stale(), 2);
    }

    #[test]
    fn test_wraparound_is_in_order() {
        let mut tracker = SequenceTracker::new();
        tracker.observe(u32::MAX - 1);
        assert_eq!(tracker.observe(u32::MAX), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(0), SequenceCheck::InOrder);
        assert_eq!(tracker.observe(2), SequenceCheck::Gap { missing: 1 });
    }

    #[test]
    fn test_receive_rejects_runt_datagram() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        listener.set_read_timeout(Some(std::time::Duration::from_secs(2))).unwrap();
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client.send_to(&[1, 2], listener.local_addr().unwrap()).unwrap();

        let mut buffer = [0u8; 64];
        assert!(matches!(
            Receiver::receive(&listener, &mut buffer),
            Err(SenderError::InvalidPacketLength { expected: 5, received: 2 })
        ));
    }
}
