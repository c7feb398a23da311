//! # Protocol Engine
//!
//! The two-role (leader/follower) interactive state machines that turn a
//! [`qchat_quantum::QuantumLink`] and a pair of [`qchat_net`] queues into a
//! derived AES-GCM key (`BB84Purified`, `Diqkd`) or a decoded plaintext
//! message (`SuperDenseCoding`). Every protocol shares the same framing
//! (`Session`) and, for the key protocols, the same reconcile/amplify tail
//! (`key_derivation`).

mod bb84;
mod diqkd;
mod error;
mod key_derivation;
mod session;
mod superdense;

pub use bb84::{BB84Purified, PROTOCOL_NAME as BB84_PURIFIED};
pub use diqkd::{Diqkd, PROTOCOL_NAME as DIQKD};
pub use error::ProtocolError;
pub use key_derivation::IDLE_TIMEOUT;
pub use session::{Role, Session};
pub use superdense::{SuperDenseCoding, PROTOCOL_NAME as SUPERDENSE};
