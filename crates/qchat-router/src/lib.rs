//! # Message Router
//!
//! Turns inbound [`qchat_wire::Frame`]s into directory updates, protocol
//! follower sessions, and mailbox deliveries. A node's event loop pops
//! frames off its [`qchat_net::Inbox`] and hands each one to
//! [`Router::dispatch`]; everything else (replies, spawned follower
//! sessions, EPR distribution when running as the registry) happens inside
//! the router.

mod error;
mod mailbox;
mod router;

pub use error::RouterError;
pub use mailbox::Mailbox;
pub use router::Router;
