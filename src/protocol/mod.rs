//! Protocol module - request and reply wire formats.
//!
//! This module implements the byte-exact frames of the boot status protocol:
//! - Request encoding (command token, optional argument, NUL terminator)
//! - Reply decoding (ack, or answer with a one-byte size prefix)
//!
//! The protocol carries no request identifiers. Replies arrive in the order
//! the requests were written.

mod reply;
mod wire_format;

pub use reply::{encode_reply, read_reply, Reply, RESPONSE_ACK, RESPONSE_ANSWER};
pub use wire_format::{
    encode_request, validate_argument, Command, ARGUMENT_MARKER, MAX_ARGUMENT_LEN,
    REQUEST_TERMINATOR, SOCKET_NAME,
};
