use thiserror::Error;

/// Errors that end a protocol session. The caller decides whether to retry.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("timed out waiting for a control message")]
    Timeout,

    #[error("received a control message out of protocol order")]
    Misframe,

    #[error("protocol aborted: {0}")]
    Abort(String),

    #[error("quantum backend error: {0}")]
    Quantum(#[from] qchat_quantum::QuantumError),
}
