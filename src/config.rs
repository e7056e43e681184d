//! Session configuration.
//!
//! # Example
//!
//! ```
//! use boot_client::{ClientConfig, SocketPath};
//!
//! let config = ClientConfig::new()
//!     .socket_path(SocketPath::Filesystem("/run/boot.sock".into()))
//!     .escalate_decode_failures(false);
//! assert!(!config.escalate_decode_failures);
//! ```

use serde::{Deserialize, Serialize};

use crate::transport::SocketPath;

/// Default for [`ClientConfig::escalate_decode_failures`].
pub const DEFAULT_ESCALATE_DECODE_FAILURES: bool = true;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Where the daemon listens.
    pub socket_path: SocketPath,
    /// Treat a malformed or truncated reply as loss of the whole connection.
    ///
    /// The protocol has no resynchronization marker, so after a decode
    /// failure later bytes cannot be trusted. When `false`, only the head
    /// request fails and the connection stays up.
    pub escalate_decode_failures: bool,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the daemon socket address.
    pub fn socket_path(mut self, path: SocketPath) -> Self {
        self.socket_path = path;
        self
    }

    /// Set whether decode failures drop the connection.
    ///
    /// Default: true
    pub fn escalate_decode_failures(mut self, escalate: bool) -> Self {
        self.escalate_decode_failures = escalate;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: SocketPath::default(),
            escalate_decode_failures: DEFAULT_ESCALATE_DECODE_FAILURES,
        }
    }
}
