//! Superdense coding: two classical bits per transmitted qubit, using a
//! pre-shared EPR pair and the standard X/Z encoding plus CNOT+Hadamard
//! decoding. Unlike the key protocols this one carries plaintext, not a
//! derived key, and never touches the registry.

use crate::error::ProtocolError;
use crate::key_derivation::IDLE_TIMEOUT;
use crate::session::{Role, Session};
use qchat_quantum::{Qubit, QuantumLink};
use serde_json::{json, Value};

pub const PROTOCOL_NAME: &str = "SUPERDENSE";

pub struct SuperDenseCoding<L: QuantumLink> {
    session: Session<L>,
}

impl<L: QuantumLink> SuperDenseCoding<L> {
    pub fn new(session: Session<L>) -> Self {
        Self { session }
    }

    /// Leader-side: streams `message` to the peer, four bit-pairs per byte
    /// (LSB pair first; within a pair `b2` is the lower bit, `b1` the
    /// upper).
    pub async fn send(&self, message: &[u8]) -> Result<(), ProtocolError> {
        self.session.establish_leader(PROTOCOL_NAME, None, IDLE_TIMEOUT).await?;

        let response =
            self.session.exchange(json!({"message_length": message.len()}), IDLE_TIMEOUT).await?;
        if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
            return Err(ProtocolError::Abort("peer failed to acknowledge message length".to_string()));
        }

        for &byte in message {
            for pair in 0..4 {
                let b2 = (byte >> (2 * pair)) & 1;
                let b1 = (byte >> (2 * pair + 1)) & 1;

                let mut qa = self.session.link.create_epr(&self.session.peer).await?;

                let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort(format!("failed to signal {}'s qubit", self.session.peer)));
                }

                if b2 == 1 {
                    qa.x();
                }
                if b1 == 1 {
                    qa.z();
                }

                self.session.link.send_qubit(qa, &self.session.peer).await?;

                let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort(format!("failed to send EPR to {}", self.session.peer)));
                }

                let response = self.session.wait_control(IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort(format!("failed to send EPR to {}", self.session.peer)));
                }
            }
        }

        self.session.end(IDLE_TIMEOUT).await
    }

    /// Follower-side: receives and decodes a message sent via [`Self::send`].
    pub async fn receive(&self) -> Result<Vec<u8>, ProtocolError> {
        debug_assert_eq!(self.session.role, Role::Follower);
        self.session.establish_follower();

        let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
        let message_length =
            response.payload["message_length"].as_u64().ok_or(ProtocolError::Misframe)? as usize;

        let mut message = Vec::with_capacity(message_length);

        for _ in 0..message_length {
            let mut byte = 0u8;
            for pair in 0..4 {
                let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort("failed to receive half of EPR".to_string()));
                }
                let mut local_half = self.session.link.recv_epr().await?;

                let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort(format!(
                        "failed to obtain {}'s half of the EPR",
                        self.session.peer
                    )));
                }
                let mut encoded_half = self.session.link.recv_qubit().await?;

                encoded_half.cnot(&mut local_half);
                encoded_half.h();

                let b1 = encoded_half.measure();
                let b2 = local_half.measure();

                byte |= b2 << (2 * pair);
                byte |= b1 << (2 * pair + 1);

                self.session.send_control(json!({"ack": true}));
            }
            message.push(byte);
        }

        self.session.end(IDLE_TIMEOUT).await?;
        Ok(message)
    }
}
