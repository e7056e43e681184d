//! Transport module - the socket the session talks to the daemon over.
//!
//! Provides:
//! - [`Transport`]: what the session needs from a connection
//! - [`BootSocket`]: a Unix domain stream socket to the daemon
//! - [`SocketPath`]: abstract or filesystem socket addresses

mod socket;

pub use socket::{BootSocket, SocketPath};

use std::io::{Read, Write};
use std::os::unix::io::RawFd;

/// What a non-consuming look at the socket found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// At least one byte is waiting to be read.
    Data,
    /// Nothing to read right now.
    Empty,
    /// The peer closed its end.
    Closed,
}

/// A connection the session can write requests to and read replies from.
///
/// `read` and `write` must be blocking-safe: once a readiness event fired,
/// a whole frame either goes through or the call fails.
pub trait Transport: Read + Write {
    /// Descriptor to register with the reactor.
    fn raw_fd(&self) -> RawFd;

    /// Look at the socket without consuming anything from the caller's
    /// point of view; a byte taken to find out must be returned by the next
    /// `read`.
    fn peer_state(&mut self) -> std::io::Result<PeerState>;
}
