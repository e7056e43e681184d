//! Diagnostics sink for protocol anomalies.
//!
//! The session reports conditions it tolerates but that indicate a
//! misbehaving daemon to a [`Diagnostics`] implementation handed to it at
//! construction. The default, [`TracingDiagnostics`], logs them.

/// Receiver of protocol anomalies the session does not escalate.
pub trait Diagnostics {
    /// A reply byte arrived while no request was awaiting one.
    fn unexpected_reply(&self, byte: Option<u8>);
}

/// Logs anomalies through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn unexpected_reply(&self, byte: Option<u8>) {
        match byte {
            Some(byte) => tracing::warn!(
                "Received unexpected response from boot status daemon (type byte {:#04x})",
                byte
            ),
            None => tracing::warn!("Received unexpected response from boot status daemon"),
        }
    }
}
