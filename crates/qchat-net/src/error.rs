use thiserror::Error;

/// Errors raised while accepting, framing, or sending on the classical
/// channel.
#[derive(Debug, Error)]
pub enum NetError {
    #[error("frame error: {0}")]
    Frame(#[from] qchat_wire::WireError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
