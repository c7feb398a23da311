//! # Node Core
//!
//! Ties the directory, router, and net queues (qchat-directory,
//! qchat-router, qchat-net) together into a runnable peer: config loading,
//! the registry handshake, the outbound-queue sender and inbox drainer
//! loops, and the public send/receive API a CLI or RPC shell would call
//! into (`sendQChatMessage`/`sendSuperDenseMessage`/`getMessageHistory` in
//! the vocabulary this engine was ported from).

mod config;
mod core;
mod error;

pub use config::NodeConfig;
pub use core::NodeCore;
pub use error::NodeError;
