//! UDP Sender - sequenced forwarding of call events over UDP
//!
//! Each inbound call `(source_id, payload)` becomes one datagram:
//!
//! ```text
//! [4 bytes: sequence (u32, big-endian)][1 byte: source id][payload...]
//! ```
//!
//! The sequence number rises by one for every frame built, so a listener
//! can restore order and count loss across otherwise anonymous datagrams.
//!
//! # Design Principles
//! - One fixed, reused frame buffer; no allocation on the send path
//! - No retries, no reconnects: a failed send is reported and dropped
//! - A closed socket turns every call into a silent no-op
//! - Integrity faults (oversized frame, partial write) go back to the caller

pub mod actor;
pub mod call;
pub mod config;
pub mod counters;
pub mod errors;
pub mod events;
pub mod frame;
pub mod receiver;
pub mod sender;
pub mod socket;
pub mod transport;

pub use actor::SenderHandle;
pub use config::SenderConfig;
pub use counters::TelemetrySnapshot;
pub use errors::{Result, SenderError};
pub use events::{EventSink, MemorySink, SenderEvent, TracingSink};
pub use frame::{DecodedFrame, Frame, FrameEncoder};
pub use sender::{DispatchStatus, UdpSender};
pub use socket::{AddressPolicy, SocketStatus};

/// Size of the reusable frame buffer - fits a standard UDP MTU
pub const FRAME_CAPACITY: usize = 1024;

/// Sequence number (4 bytes) plus source identifier (1 byte)
pub const HEADER_SIZE: usize = 5;

/// Largest payload a single frame can carry
pub const MAX_PAYLOAD_SIZE: usize = FRAME_CAPACITY - HEADER_SIZE;
