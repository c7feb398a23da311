use thiserror::Error;

/// Errors raised by a [`crate::QuantumLink`] implementation.
#[derive(Debug, Error)]
pub enum QuantumError {
    /// No EPR half or qubit arrived before the deadline.
    #[error("timed out waiting for a qubit")]
    Timeout,

    /// The named peer is not known to this link.
    #[error("unknown quantum peer: {0}")]
    UnknownPeer(String),
}
