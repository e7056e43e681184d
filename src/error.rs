//! Error types for boot-client.

use thiserror::Error;

/// Main error type for all boot-client operations.
///
/// The same type is handed to request failure handlers, so a handler can
/// tell a broken write apart from a lost connection or a teardown.
#[derive(Debug, Error)]
pub enum BootClientError {
    /// I/O error during socket operations (includes short reads).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session has no open connection to the daemon.
    #[error("Not connected to the boot status daemon")]
    NotConnected,

    /// `connect` was called on a session that is already connected.
    #[error("Already connected to the boot status daemon")]
    AlreadyConnected,

    /// The session is not attached to a reactor.
    #[error("Session is not attached to a reactor")]
    NotAttached,

    /// `attach` was called on a session that already has a reactor.
    #[error("Session is already attached to a reactor")]
    AlreadyAttached,

    /// Request argument does not fit the one-byte length prefix.
    #[error("Argument is {len} bytes, maximum is 254")]
    ArgumentTooLong { len: usize },

    /// Request argument contains a NUL byte.
    #[error("Argument contains a NUL byte")]
    ArgumentContainsNul,

    /// Reply type byte is neither ack nor answer.
    #[error("Unexpected response type byte: {0:#04x}")]
    UnexpectedResponse(u8),

    /// Reply shape does not match what the request expects.
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The daemon hung up or the connection was declared lost.
    #[error("Connection closed")]
    ConnectionClosed,

    /// The session was dropped while the request was still queued.
    #[error("Request cancelled")]
    Cancelled,

    /// The caller disconnected while the request was still queued.
    #[error("Disconnected by caller")]
    Disconnected,
}

/// Result type alias using BootClientError.
pub type Result<T> = std::result::Result<T, BootClientError>;
