use thiserror::Error;

/// Errors raised by a node's lifecycle and public API.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("no config entry for node {0:?}")]
    UnknownNode(String),

    #[error("config file error: {0}")]
    Config(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("timed out waiting for {0}'s directory entry")]
    DirectoryTimeout(String),

    #[error("no message key established with {0}")]
    NoMessageKey(String),

    #[error(transparent)]
    Directory(#[from] qchat_directory::DirectoryError),

    #[error(transparent)]
    Net(#[from] qchat_net::NetError),

    #[error(transparent)]
    Wire(#[from] qchat_wire::WireError),

    #[error(transparent)]
    Crypto(#[from] qchat_crypto::CryptoError),

    #[error(transparent)]
    Protocol(#[from] qchat_protocol::ProtocolError),

    #[error(transparent)]
    Router(#[from] qchat_router::RouterError),

    #[error("malformed mailbox entry from {0}: {1:?}")]
    MalformedMailboxEntry(String, qchat_wire::HeaderTag),
}
