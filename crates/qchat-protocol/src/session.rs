use crate::error::ProtocolError;
use qchat_net::{ControlQueues, OutboundQueue};
use qchat_quantum::QuantumLink;
use qchat_wire::{Frame, HeaderTag};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Which side of a two-party protocol this session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Leader,
    Follower,
}

/// Shared state for one running protocol instance: who it talks to, which
/// header tag frames it with, and the queues/quantum link it uses to talk
/// to that peer. `BB84Purified`, `Diqkd`, and `SuperDenseCoding` are thin
/// wrappers around a `Session` that add their own distill/reconcile or
/// encode/decode logic on top of the common exchange primitive.
pub struct Session<L: QuantumLink> {
    pub own_name: String,
    pub peer: String,
    pub registry: String,
    pub role: Role,
    header: HeaderTag,
    control: Arc<ControlQueues>,
    outbound: Arc<OutboundQueue>,
    pub link: Arc<L>,
}

impl<L: QuantumLink> Session<L> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        own_name: impl Into<String>,
        peer: impl Into<String>,
        registry: impl Into<String>,
        role: Role,
        header: HeaderTag,
        control: Arc<ControlQueues>,
        outbound: Arc<OutboundQueue>,
        link: Arc<L>,
    ) -> Self {
        Self {
            own_name: own_name.into(),
            peer: peer.into(),
            registry: registry.into(),
            role,
            header,
            control,
            outbound,
            link,
        }
    }

    /// Sends an RQQB frame to the registry, naming this session's peer as
    /// the user to pair the distributed EPR with.
    pub fn request_epr(&self) {
        let frame = Frame::new(HeaderTag::Rqqb, self.own_name.clone(), json!({"user": self.peer}));
        self.outbound.push(self.registry.clone(), frame);
    }

    /// Enqueues a control frame tagged with this session's protocol header.
    pub fn send_control(&self, payload: Value) {
        self.send_tagged(self.header, payload);
    }

    /// Enqueues a control frame under an explicit header, used only for the
    /// PTCL frame that starts a follower session on the peer.
    pub fn send_tagged(&self, header: HeaderTag, payload: Value) {
        let frame = Frame::new(header, self.own_name.clone(), payload);
        self.outbound.push(self.peer.clone(), frame);
    }

    /// Waits up to `timeout` for the peer's next control frame, failing
    /// with [`ProtocolError::Misframe`] if it doesn't carry this session's
    /// header (the per-peer queue may also hold frames from a different,
    /// unrelated session).
    pub async fn wait_control(&self, timeout: Duration) -> Result<Frame, ProtocolError> {
        let frame = self.control.pop(&self.peer, timeout).await.ok_or(ProtocolError::Timeout)?;
        if frame.header != self.header {
            return Err(ProtocolError::Misframe);
        }
        Ok(frame)
    }

    /// The protocol's lockstep exchange primitive: the leader sends then
    /// receives; the follower receives then sends.
    pub async fn exchange(&self, payload: Value, timeout: Duration) -> Result<Frame, ProtocolError> {
        match self.role {
            Role::Leader => {
                self.send_control(payload);
                self.wait_control(timeout).await
            }
            Role::Follower => {
                let frame = self.wait_control(timeout).await?;
                self.send_control(payload);
                Ok(frame)
            }
        }
    }

    /// Leader-side role establishment: send the PTCL frame that spins up a
    /// follower session on the peer, then await its protocol-specific ACK.
    pub async fn establish_leader(
        &self,
        protocol_name: &str,
        key_size: Option<usize>,
        timeout: Duration,
    ) -> Result<(), ProtocolError> {
        let mut payload = json!({"name": protocol_name});
        if let Some(size) = key_size {
            payload["key_size"] = json!(size);
        }
        self.send_tagged(HeaderTag::Ptcl, payload);

        let response = self.wait_control(timeout).await?;
        if response.payload.get("ACK").and_then(Value::as_str) != Some("ACK") {
            return Err(ProtocolError::Abort("failed to establish leader role".to_string()));
        }
        Ok(())
    }

    /// Follower-side role establishment: the router already consumed the
    /// PTCL frame and spawned this session, so all that remains is the ACK.
    pub fn establish_follower(&self) {
        self.send_control(json!({"ACK": "ACK"}));
    }

    /// Exchanges the closing `{"FIN": true}` handshake both protocols end
    /// with.
    pub async fn end(&self, timeout: Duration) -> Result<(), ProtocolError> {
        let response = self.exchange(json!({"FIN": true}), timeout).await?;
        if response.payload.get("FIN").and_then(Value::as_bool) != Some(true) {
            return Err(ProtocolError::Abort("peer failed to terminate protocol".to_string()));
        }
        Ok(())
    }
}
