//! TCP framing and queueing plumbing for qchat nodes: the acceptor/handler
//! pair that turns inbound bytes into [`qchat_wire::Frame`]s, a one-shot
//! classical sender, and the three queues the rest of the node drains
//! (inbox, per-peer control queues, outbound).

mod connection;
mod control_queue;
mod error;
mod inbox;
mod outbound;

pub use connection::{listen, send_message};
pub use control_queue::ControlQueues;
pub use error::NetError;
pub use inbox::Inbox;
pub use outbound::{OutboundItem, OutboundQueue};
