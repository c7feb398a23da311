//! Purified BB84: EPR-pair distribution, basis sift, error estimation,
//! then the shared reconcile/amplify pipeline in [`crate::key_derivation`].

use crate::error::ProtocolError;
use crate::key_derivation::{
    amplify_privacy, bits_to_byte, reconcile_information, BYTE_LEN, IDLE_TIMEOUT, MAX_GOLAY_ERROR,
    ROUND_SIZE,
};
use crate::session::{Role, Session};
use qchat_quantum::{follow_receive_epr, lead_receive_epr, Qubit, QuantumLink};
use rand::Rng;
use serde_json::{json, Value};

pub const PROTOCOL_NAME: &str = "BB84_PURIFIED";

/// A running purified-BB84 key-establishment session.
pub struct BB84Purified<L: QuantumLink> {
    session: Session<L>,
}

impl<L: QuantumLink> BB84Purified<L> {
    pub fn new(session: Session<L>) -> Self {
        Self { session }
    }

    async fn receive_bb84_states(&self) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
        let mut x = Vec::with_capacity(ROUND_SIZE);
        let mut theta = Vec::with_capacity(ROUND_SIZE);
        let mut rng = rand::thread_rng();

        while x.len() < ROUND_SIZE {
            let mut q = if self.session.role == Role::Leader {
                self.session.request_epr();
                lead_receive_epr(&*self.session.link).await?
            } else {
                follow_receive_epr(&*self.session.link).await?
            };

            let basisflip: u8 = rng.gen_range(0..2);
            if basisflip == 1 {
                q.h();
            }
            theta.push(basisflip);
            x.push(q.measure());

            let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
            if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                return Err(ProtocolError::Abort("peer reported a state-distribution error".to_string()));
            }
        }
        Ok((x, theta))
    }

    async fn filter_theta(&self, x: Vec<u8>, theta: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        let response = self.session.exchange(json!({"theta": theta.clone()}), IDLE_TIMEOUT).await?;
        let theta_hat: Vec<u8> =
            serde_json::from_value(response.payload["theta"].clone()).map_err(|_| ProtocolError::Misframe)?;

        Ok(x
            .into_iter()
            .zip(theta.iter())
            .zip(theta_hat.iter())
            .filter(|((_, basis), basis_hat)| basis == basis_hat)
            .map(|((bit, _), _)| bit)
            .collect())
    }

    /// Mutates `x` in place, popping out the sampled test bits, and returns
    /// the hamming-distance error rate measured against the peer's copy.
    async fn estimate_error_rate(&self, x: &mut Vec<u8>) -> Result<f64, ProtocolError> {
        let mut test_bits = Vec::new();
        let mut rng = rand::thread_rng();

        match self.session.role {
            Role::Leader => {
                let mut test_indices = Vec::new();
                while test_indices.len() < ROUND_SIZE / 4 && !x.is_empty() {
                    let index = rng.gen_range(0..x.len());
                    test_bits.push(x.remove(index));
                    test_indices.push(index);
                }
                let response =
                    self.session.exchange(json!({"test_indices": test_indices}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort("peer rejected test indices".to_string()));
                }
            }
            Role::Follower => {
                let message = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                let test_indices: Vec<usize> = serde_json::from_value(message.payload["test_indices"].clone())
                    .map_err(|_| ProtocolError::Misframe)?;
                for index in test_indices {
                    test_bits.push(x.remove(index));
                }
            }
        }

        let response = self.session.exchange(json!({"test_bits": test_bits}), IDLE_TIMEOUT).await?;
        let target_test_bits: Vec<u8> =
            serde_json::from_value(response.payload["test_bits"].clone()).map_err(|_| ProtocolError::Misframe)?;

        let num_errors = test_bits.iter().zip(target_test_bits.iter()).filter(|(a, b)| a != b).count();

        let response = self.session.exchange(json!({"fin": true}), IDLE_TIMEOUT).await?;
        if response.payload.get("fin").and_then(Value::as_bool) != Some(true) {
            return Err(ProtocolError::Abort("peer did not conclude error estimation".to_string()));
        }

        Ok(if test_bits.is_empty() { 1.0 } else { num_errors as f64 / test_bits.len() as f64 })
    }

    async fn distill_tested_data(&self) -> Result<Vec<u8>, ProtocolError> {
        let (x, theta) = self.receive_bb84_states().await?;
        let mut x_remain = self.filter_theta(x, theta).await?;
        let error_rate = self.estimate_error_rate(&mut x_remain).await?;
        if error_rate >= MAX_GOLAY_ERROR {
            return Ok(Vec::new());
        }
        Ok(x_remain)
    }

    /// Runs the protocol to completion, returning the derived key.
    pub async fn execute(&self, key_size: usize) -> Result<Vec<u8>, ProtocolError> {
        match self.session.role {
            Role::Leader => self.session.establish_leader(PROTOCOL_NAME, Some(key_size), IDLE_TIMEOUT).await?,
            Role::Follower => self.session.establish_follower(),
        }

        let mut key = Vec::with_capacity(key_size);
        let mut secret_bits: Vec<u8> = Vec::new();
        let mut reconciled: Vec<u8> = Vec::new();

        while key.len() < key_size {
            while reconciled.len() < 2 * BYTE_LEN {
                while secret_bits.len() < qchat_ecc::CODEWORD_LENGTH {
                    secret_bits.extend(self.distill_tested_data().await?);
                }
                let (remainder, reconciled_bits) =
                    reconcile_information(&self.session, secret_bits).await?;
                secret_bits = remainder;
                reconciled.extend(reconciled_bits);
            }

            let byte0 = bits_to_byte(&reconciled[0..BYTE_LEN]);
            let byte1 = bits_to_byte(&reconciled[BYTE_LEN..2 * BYTE_LEN]);
            reconciled.drain(0..2 * BYTE_LEN);

            if let Some(extracted) = amplify_privacy(&self.session, [byte0, byte1]).await? {
                key.push(extracted);
            }
        }

        self.session.end(IDLE_TIMEOUT).await?;
        Ok(key)
    }
}
