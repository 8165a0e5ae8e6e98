/// Socket module - UDP endpoint ownership and Open/Closed state
///
/// The OS handle lives inside the `Open` state, so a handle exists exactly
/// when the lifecycle is open. Socket creation goes through a
/// `SocketFactory` so hosts can choose the local bind address and tests can
/// substitute failing or misbehaving sockets.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, SenderError};

/// How destination text given to `open` is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Reject anything that is not a dotted IPv4 address and a decimal u16
    #[default]
    Strict,
    /// Port text is read like C `atoi` (garbage becomes 0) and address
    /// text like C `inet_aton`; an address `inet_aton` rejects becomes
    /// `0.0.0.0`
    Lenient,
}

impl AddressPolicy {
    /// Turn address and port text into a destination
    ///
    /// # Errors
    /// `InvalidAddress` / `InvalidPort` under `Strict`; `Lenient` never fails
    pub fn parse_destination(self, address: &str, port: &str) -> Result<SocketAddrV4> {
        match self {
            Self::Strict => {
                let ip = Ipv4Addr::from_str(address)
                    .map_err(|_| SenderError::InvalidAddress(address.to_string()))?;
                let port = port
                    .parse::<u16>()
                    .map_err(|_| SenderError::InvalidPort(port.to_string()))?;
                Ok(SocketAddrV4::new(ip, port))
            }
            Self::Lenient => {
                let ip = inet_aton(address).unwrap_or(Ipv4Addr::UNSPECIFIED);
                Ok(SocketAddrV4::new(ip, atoi(port) as u16))
            }
        }
    }
}

/// C `inet_aton`: one to four dot-separated parts, each decimal, octal
/// (leading `0`) or hex (`0x`). The last part fills the remaining bytes,
/// so `127.1` and `2130706433` both name 127.0.0.1. Text ends at the first
/// whitespace.
fn inet_aton(text: &str) -> Option<Ipv4Addr> {
    let text = text.split(|c: char| c.is_ascii_whitespace()).next()?;

    let mut parts = [0u32; 4];
    let mut count = 0;
    for part in text.split('.') {
        if count == parts.len() {
            return None;
        }
        parts[count] = inet_part(part)?;
        count += 1;
    }

    let value = match parts[..count] {
        [a] => a,
        [a, b] if a <= 0xFF && b <= 0xFF_FFFF => a << 24 | b,
        [a, b, c] if a <= 0xFF && b <= 0xFF && c <= 0xFFFF => a << 24 | b << 16 | c,
        [a, b, c, d] if a <= 0xFF && b <= 0xFF && c <= 0xFF && d <= 0xFF => {
            a << 24 | b << 16 | c << 8 | d
        }
        _ => return None,
    };
    Some(Ipv4Addr::from(value))
}

fn inet_part(part: &str) -> Option<u32> {
    let (digits, radix) = match part.as_bytes() {
        [b'0', b'x' | b'X', ..] => (&part[2..], 16),
        [b'0', _, ..] => (&part[1..], 8),
        _ => (part, 10),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// C `atoi`: optional leading whitespace and sign, then leading digits
fn atoi(text: &str) -> i64 {
    let trimmed = text.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, digit| {
            acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
        });

    if negative { -value } else { value }
}

/// Anything that can put one datagram on the wire
pub trait DatagramSocket: Send {
    /// Send `buf` as a single datagram, returning the bytes the OS accepted
    fn send_to(&self, buf: &[u8], destination: SocketAddrV4) -> io::Result<usize>;
}

impl DatagramSocket for UdpSocket {
    fn send_to(&self, buf: &[u8], destination: SocketAddrV4) -> io::Result<usize> {
        UdpSocket::send_to(self, buf, destination)
    }
}

/// Creates the socket handle on `open`
pub trait SocketFactory: Send {
    fn create(&self) -> io::Result<Box<dyn DatagramSocket>>;
}

/// Factory for real OS sockets bound to a local address
///
/// The default `0.0.0.0:0` picks an ephemeral port on any interface,
/// which is what an unbound socket gets on its first send.
#[derive(Debug, Clone)]
pub struct UdpSocketFactory {
    bind_address: SocketAddr,
}

impl UdpSocketFactory {
    pub fn new(bind_address: SocketAddr) -> Self {
        Self { bind_address }
    }
}

impl Default for UdpSocketFactory {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    }
}

impl SocketFactory for UdpSocketFactory {
    fn create(&self) -> io::Result<Box<dyn DatagramSocket>> {
        let socket = UdpSocket::bind(self.bind_address)?;
        Ok(Box::new(socket))
    }
}

/// Externally visible socket state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SocketStatus {
    #[default]
    Closed,
    Open,
}

enum SocketState {
    Closed,
    Open {
        socket: Box<dyn DatagramSocket>,
        destination: SocketAddrV4,
    },
}

/// SocketLifecycle - owns the UDP handle and its destination
pub struct SocketLifecycle {
    factory: Box<dyn SocketFactory>,
    policy: AddressPolicy,
    state: SocketState,
}

impl SocketLifecycle {
    /// Create a closed lifecycle
    pub fn new(factory: Box<dyn SocketFactory>, policy: AddressPolicy) -> Self {
        Self {
            factory,
            policy,
            state: SocketState::Closed,
        }
    }

    pub fn status(&self) -> SocketStatus {
        match self.state {
            SocketState::Closed => SocketStatus::Closed,
            SocketState::Open { .. } => SocketStatus::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == SocketStatus::Open
    }

    /// Destination recorded by the last successful `open`
    pub fn destination(&self) -> Option<SocketAddrV4> {
        match &self.state {
            SocketState::Closed => None,
            SocketState::Open { destination, .. } => Some(*destination),
        }
    }

    /// Open handle and its destination, if any
    pub(crate) fn endpoint(&self) -> Option<(&dyn DatagramSocket, SocketAddrV4)> {
        match &self.state {
            SocketState::Closed => None,
            SocketState::Open { socket, destination } => Some((socket.as_ref(), *destination)),
        }
    }

    /// Create the socket and record the destination
    ///
    /// A handle that is already open is released first; on any failure the
    /// lifecycle is left closed.
    ///
    /// # Errors
    /// - `InvalidAddress` / `InvalidPort` if the text is rejected by the policy
    /// - `SocketCreate` if the OS refuses the socket
    pub fn open(&mut self, address: &str, port: &str) -> Result<SocketAddrV4> {
        self.close();

        let destination = self.policy.parse_destination(address, port)?;
        let socket = self
            .factory
            .create()
            .map_err(|e| SenderError::SocketCreate(e.to_string()))?;

        self.state = SocketState::Open { socket, destination };
        Ok(destination)
    }

    /// Release the handle; returns whether one was open
    pub fn close(&mut self) -> bool {
        match std::mem::replace(&mut self.state, SocketState::Closed) {
            SocketState::Closed => false,
            SocketState::Open { destination, .. } => {
                debug!(%destination, "UDP sender socket closed");
                true
            }
        }
    }
}
