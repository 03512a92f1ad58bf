//! UDP transport: one outstanding request at a time, with a 5s timeout and
//! a single retransmission.

use std::io;
use std::net::{Ipv4Addr, UdpSocket};
use std::time::Duration;

pub const DNS_PORT: u16 = 53;
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_DATAGRAM: usize = 1024;

/// An error from the transport layer. The resolver converts every variant
/// of this into an empty result set - nothing here is fatal to the overall
/// lookup.
#[derive(Debug)]
pub enum TransportError {
    Io(io::Error),
    /// Both the original send and the single retransmission timed out.
    TimedOut,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Io(err) => write!(f, "I/O error: {err}"),
            TransportError::TimedOut => write!(f, "timed out waiting for a reply"),
        }
    }
}

impl From<io::Error> for TransportError {
    fn from(err: io::Error) -> Self {
        TransportError::Io(err)
    }
}

/// Send one datagram to a nameserver and wait for its reply.
///
/// Single-threaded and blocking: only one request is ever outstanding on
/// the underlying socket. There is no correlation by transaction ID at this
/// layer - the next datagram received is assumed to be the reply.
pub trait Transport {
    fn send_and_receive(&mut self, payload: &[u8], server: Ipv4Addr) -> Result<Vec<u8>, TransportError>;
}

/// The real, `std::net::UdpSocket`-backed transport.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub fn new() -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(RECEIVE_TIMEOUT))?;
        Ok(Self { socket })
    }

    fn try_once(&mut self, payload: &[u8], server: Ipv4Addr) -> Result<Vec<u8>, TransportError> {
        self.socket.send_to(payload, (server, DNS_PORT))?;
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let (size, _peer) = match self.socket.recv_from(&mut buf) {
            Ok(result) => result,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut => {
                return Err(TransportError::TimedOut)
            }
            Err(err) => return Err(TransportError::Io(err)),
        };
        buf.truncate(size);
        Ok(buf)
    }
}

impl Transport for UdpTransport {
    fn send_and_receive(&mut self, payload: &[u8], server: Ipv4Addr) -> Result<Vec<u8>, TransportError> {
        match self.try_once(payload, server) {
            Err(TransportError::TimedOut) => {
                tracing::debug!(%server, "query timed out, retrying once");
                self.try_once(payload, server)
            }
            other => other,
        }
    }
}
