//! Request encoding.
//!
//! A request is the command token, an optional length-prefixed argument,
//! and a terminating NUL:
//! ```text
//! ┌──────────┬──────┬─────────┬──────────────┬──────┐
//! │ Command  │ 0x02 │ Len + 1 │ Argument     │ 0x00 │
//! │ 1 byte   │ opt. │ opt.    │ 0..=254 opt. │      │
//! └──────────┴──────┴─────────┴──────────────┴──────┘
//! ```
//!
//! The daemon parses the argument as a C string, so it may not contain NUL.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{BootClientError, Result};

/// Marker byte introducing a request argument.
pub const ARGUMENT_MARKER: u8 = 0x02;

/// Byte terminating every request frame.
pub const REQUEST_TERMINATOR: u8 = 0x00;

/// Longest argument whose `len + 1` still fits the length byte.
pub const MAX_ARGUMENT_LEN: usize = u8::MAX as usize - 1;

/// Abstract socket name the daemon listens on.
pub const SOCKET_NAME: &str = "/ply-boot-protocol";

/// Protocol verbs understood by the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Ping,
    Update,
    SystemInitialized,
    Password,
    Quit,
}

impl Command {
    /// Wire token for this command.
    pub fn token(self) -> &'static [u8] {
        match self {
            Command::Ping => b"P",
            Command::Update => b"U",
            Command::SystemInitialized => b"S",
            Command::Password => b"*",
            Command::Quit => b"Q",
        }
    }

    /// Human-readable name, used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Command::Ping => "ping",
            Command::Update => "update",
            Command::SystemInitialized => "system-initialized",
            Command::Password => "password",
            Command::Quit => "quit",
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Check that an argument can be carried by a request frame.
pub fn validate_argument(argument: &str) -> Result<()> {
    if argument.len() > MAX_ARGUMENT_LEN {
        return Err(BootClientError::ArgumentTooLong {
            len: argument.len(),
        });
    }
    if argument.as_bytes().contains(&0) {
        return Err(BootClientError::ArgumentContainsNul);
    }
    Ok(())
}

/// Encode a request frame.
///
/// # Example
///
/// ```
/// use boot_client::protocol::{encode_request, Command};
///
/// let frame = encode_request(Command::Update, Some("boot")).unwrap();
/// assert_eq!(&frame[..], b"U\x02\x05boot\0");
/// ```
pub fn encode_request(command: Command, argument: Option<&str>) -> Result<Bytes> {
    let token = command.token();

    let Some(argument) = argument else {
        let mut buf = BytesMut::with_capacity(token.len() + 1);
        buf.put_slice(token);
        buf.put_u8(REQUEST_TERMINATOR);
        return Ok(buf.freeze());
    };

    validate_argument(argument)?;

    let mut buf = BytesMut::with_capacity(token.len() + 3 + argument.len());
    buf.put_slice(token);
    buf.put_u8(ARGUMENT_MARKER);
    buf.put_u8((argument.len() + 1) as u8);
    buf.put_slice(argument.as_bytes());
    buf.put_u8(REQUEST_TERMINATOR);
    Ok(buf.freeze())
}
