//! Unix domain socket connection to the daemon.
//!
//! The socket is kept in non-blocking mode so it can be registered with a
//! readiness reactor. Reads and writes are blocking-safe: if a frame is cut
//! short by `WouldBlock`, the socket is switched to blocking mode for the
//! remainder of that one call.
//!
//! # Example
//!
//! ```ignore
//! use boot_client::transport::{BootSocket, SocketPath};
//!
//! let socket = BootSocket::connect(&SocketPath::default())?;
//! ```

use std::fmt;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{PeerState, Transport};
use crate::protocol::SOCKET_NAME;

/// Address of the daemon's listening socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketPath {
    /// Linux abstract namespace name (no leading NUL).
    Abstract(String),
    /// Socket file on disk.
    Filesystem(PathBuf),
}

impl Default for SocketPath {
    fn default() -> Self {
        SocketPath::Abstract(SOCKET_NAME.to_string())
    }
}

impl fmt::Display for SocketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketPath::Abstract(name) => write!(f, "@{}", name),
            SocketPath::Filesystem(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Connected, non-blocking stream socket to the daemon.
#[derive(Debug)]
pub struct BootSocket {
    stream: UnixStream,
    /// Byte consumed by [`Transport::peer_state`], handed out by the next read.
    lookahead: Option<u8>,
}

impl BootSocket {
    /// Connect to the daemon at `path`.
    pub fn connect(path: &SocketPath) -> io::Result<Self> {
        let stream = match path {
            SocketPath::Filesystem(path) => UnixStream::connect(path)?,
            SocketPath::Abstract(name) => connect_abstract(name)?,
        };
        tracing::debug!("Connected to boot status daemon at {}", path);
        Self::from_stream(stream)
    }

    /// Wrap an already connected stream, switching it to non-blocking mode.
    pub fn from_stream(stream: UnixStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            lookahead: None,
        })
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &UnixStream {
        &self.stream
    }

    /// Run `op` with the socket temporarily in blocking mode.
    fn blocking<T>(&mut self, op: impl FnOnce(&mut UnixStream) -> io::Result<T>) -> io::Result<T> {
        self.stream.set_nonblocking(false)?;
        let result = op(&mut self.stream);
        self.stream.set_nonblocking(true)?;
        result
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn connect_abstract(name: &str) -> io::Result<UnixStream> {
    #[cfg(target_os = "android")]
    use std::os::android::net::SocketAddrExt;
    #[cfg(target_os = "linux")]
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    UnixStream::connect_addr(&addr)
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn connect_abstract(name: &str) -> io::Result<UnixStream> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("abstract socket @{} needs Linux", name),
    ))
}

impl Read for BootSocket {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(byte) = self.lookahead.take() {
            buf[0] = byte;
            return Ok(1);
        }
        match self.stream.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.blocking(|s| s.read(buf)),
            result => result,
        }
    }
}

impl Write for BootSocket {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.stream.write(buf) {
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => self.blocking(|s| s.write(buf)),
            result => result,
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl AsRawFd for BootSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

impl Transport for BootSocket {
    fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    fn peer_state(&mut self) -> io::Result<PeerState> {
        if self.lookahead.is_some() {
            return Ok(PeerState::Data);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.stream.read(&mut byte) {
                Ok(0) => return Ok(PeerState::Closed),
                Ok(_) => {
                    self.lookahead = Some(byte[0]);
                    return Ok(PeerState::Data);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(PeerState::Empty),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
}
