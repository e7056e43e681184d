//! Reply decoding.
//!
//! ```text
//! Ack:    ┌──────┐
//!         │ 0x06 │
//!         └──────┘
//! Answer: ┌──────┬──────┬────────────────┐
//!         │ 0x02 │ Size │ Payload        │
//!         │      │ u8   │ Size bytes     │
//!         └──────┴──────┴────────────────┘
//! ```
//!
//! The answer size is a single byte, so answers are capped at 255 bytes.
//! Payloads are raw bytes; the daemon forwards whatever was typed, in the
//! console's encoding.

use std::io::Read;

use crate::error::{BootClientError, Result};

/// Reply type byte: bare success.
pub const RESPONSE_ACK: u8 = 0x06;

/// Reply type byte: success carrying a payload.
pub const RESPONSE_ANSWER: u8 = 0x02;

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    /// Payload up to the first NUL, byte for byte.
    Answer(Vec<u8>),
}

/// Read exactly one reply frame from `reader`.
///
/// Short reads surface as [`BootClientError::Io`] with
/// `UnexpectedEof`; whatever was consumed before the failure is lost.
///
/// # Example
///
/// ```
/// use boot_client::protocol::{read_reply, Reply};
///
/// let mut wire: &[u8] = b"\x02\x05hello";
/// assert_eq!(read_reply(&mut wire).unwrap(), Reply::Answer(b"hello".to_vec()));
/// ```
pub fn read_reply<R: Read + ?Sized>(reader: &mut R) -> Result<Reply> {
    let mut kind = [0u8; 1];
    reader.read_exact(&mut kind)?;

    match kind[0] {
        RESPONSE_ACK => Ok(Reply::Ack),
        RESPONSE_ANSWER => {
            let mut size = [0u8; 1];
            reader.read_exact(&mut size)?;

            let mut payload = vec![0u8; size[0] as usize];
            reader.read_exact(&mut payload)?;

            truncate_at_nul(&mut payload);
            Ok(Reply::Answer(payload))
        }
        other => Err(BootClientError::UnexpectedResponse(other)),
    }
}

fn truncate_at_nul(payload: &mut Vec<u8>) {
    if let Some(end) = payload.iter().position(|&b| b == 0) {
        payload.truncate(end);
    }
}

/// Encode a reply frame, as the daemon would send it.
///
/// Answers longer than 255 bytes are truncated to fit the size byte.
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    match reply {
        Reply::Ack => vec![RESPONSE_ACK],
        Reply::Answer(payload) => {
            let payload = &payload[..payload.len().min(u8::MAX as usize)];
            let mut buf = Vec::with_capacity(2 + payload.len());
            buf.push(RESPONSE_ANSWER);
            buf.push(payload.len() as u8);
            buf.extend_from_slice(payload);
            buf
        }
    }
}
