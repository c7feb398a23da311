use thiserror::Error;

/// Errors raised while dispatching an inbound frame.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("frame requiring a signature carried none")]
    MissingSignature,

    #[error("signature verification failed for sender {0}")]
    BadSignature(String),

    #[error("malformed payload for header {0:?}: {1}")]
    Malformed(qchat_wire::HeaderTag, String),

    #[error(transparent)]
    Directory(#[from] qchat_directory::DirectoryError),

    #[error(transparent)]
    Net(#[from] qchat_net::NetError),

    #[error(transparent)]
    Wire(#[from] qchat_wire::WireError),

    #[error(transparent)]
    Quantum(#[from] qchat_quantum::QuantumError),
}
