//! Device-independent QKD: same reconcile/amplify pipeline as purified
//! BB84, but distillation is replaced by a CHSH Bell-inequality test that
//! bootstraps trust from the observed winning probability rather than from
//! the measurement hardware.

use crate::error::ProtocolError;
use crate::key_derivation::{
    amplify_privacy, bits_to_byte, reconcile_information, BYTE_LEN, IDLE_TIMEOUT, ROUND_SIZE,
};
use crate::session::{Role, Session};
use qchat_quantum::{follow_measure, follow_receive_epr, lead_measure, lead_receive_epr, QuantumLink};
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashSet;

pub const PROTOCOL_NAME: &str = "DIQKD";

/// The quantum maximum CHSH winning probability, `(1 + 1/sqrt(2)) / 2`.
const PCHSH: f64 = 0.8535533905932737;
const EPSILON: f64 = 0.1;

pub struct Diqkd<L: QuantumLink> {
    session: Session<L>,
}

impl<L: QuantumLink> Diqkd<L> {
    pub fn new(session: Session<L>) -> Self {
        Self { session }
    }

    async fn distribute_leader(&self) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
        let mut rng = rand::thread_rng();
        let theta: Vec<u8> = (0..ROUND_SIZE).map(|_| rng.gen_range(0..2)).collect();
        let mut x = Vec::with_capacity(ROUND_SIZE);

        for &basis in &theta {
            self.session.request_epr();
            let mut q = lead_receive_epr(&*self.session.link).await?;
            x.push(lead_measure(&mut q, basis));

            let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
            if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                return Err(ProtocolError::Abort("peer reported a DI-distribution error".to_string()));
            }
        }
        Ok((x, theta))
    }

    async fn distribute_follower(&self) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
        let mut rng = rand::thread_rng();
        let theta: Vec<u8> = (0..ROUND_SIZE).map(|_| rng.gen_range(0..3)).collect();
        let mut x = Vec::with_capacity(ROUND_SIZE);

        for &basis in &theta {
            let mut q = follow_receive_epr(&*self.session.link).await?;
            x.push(follow_measure(&mut q, basis));

            let response = self.session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
            if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                return Err(ProtocolError::Abort("peer reported a DI-distribution error".to_string()));
            }
        }
        Ok((x, theta))
    }

    /// Runs the CHSH test over a uniformly random half of `x`, aborting if
    /// the observed winning/matching rates fall short of the Tsirelson
    /// bound within tolerance, and returns the surviving key-round bits.
    async fn chsh_test(&self, x: Vec<u8>, theta: Vec<u8>) -> Result<Vec<u8>, ProtocolError> {
        let response = self.session.exchange(json!({"theta": theta.clone()}), IDLE_TIMEOUT).await?;
        let theta_hat: Vec<u8> =
            serde_json::from_value(response.payload["theta"].clone()).map_err(|_| ProtocolError::Misframe)?;

        let n = x.len();
        let test_set: Vec<usize> = match self.session.role {
            Role::Leader => {
                let mut rng = rand::thread_rng();
                let sample = rand::seq::index::sample(&mut rng, n, n / 2).into_vec();
                self.session.send_control(json!({"T": sample.clone()}));
                sample
            }
            Role::Follower => {
                let message = self.session.wait_control(IDLE_TIMEOUT).await?;
                serde_json::from_value(message.payload["T"].clone()).map_err(|_| ProtocolError::Misframe)?
            }
        };

        // The leader's theta is always in {0,1} and the follower's always in
        // {0,1,2}; theta_hat is the peer's. Which side plays the {0,1}/{2}
        // role in these filters swaps with it, so the follower checks its
        // own theta where the leader checks theta_hat, and vice versa.
        let test_set_lookup: HashSet<usize> = test_set.iter().copied().collect();
        let (chsh_rounds, match_rounds, key_rounds): (HashSet<usize>, HashSet<usize>, Vec<usize>) =
            match self.session.role {
                Role::Leader => (
                    test_set.iter().copied().filter(|&j| theta_hat[j] <= 1).collect(),
                    test_set.iter().copied().filter(|&j| theta[j] == 0 && theta_hat[j] == 2).collect(),
                    (0..n)
                        .filter(|j| !test_set_lookup.contains(j) && theta[*j] == 0 && theta_hat[*j] == 2)
                        .collect(),
                ),
                Role::Follower => (
                    test_set.iter().copied().filter(|&j| theta[j] <= 1).collect(),
                    test_set.iter().copied().filter(|&j| theta_hat[j] == 0 && theta[j] == 2).collect(),
                    (0..n)
                        .filter(|j| !test_set_lookup.contains(j) && theta_hat[*j] == 0 && theta[*j] == 2)
                        .collect(),
                ),
            };

        let x_t: Vec<u8> = test_set.iter().map(|&j| x[j]).collect();
        let response = self.session.exchange(json!({"x_T": x_t.clone()}), IDLE_TIMEOUT).await?;
        let x_t_hat: Vec<u8> =
            serde_json::from_value(response.payload["x_T"].clone()).map_err(|_| ProtocolError::Misframe)?;

        let mut wins = 0usize;
        let mut matches = 0usize;
        for (i, &j) in test_set.iter().enumerate() {
            let (x1, x2) = (x_t[i], x_t_hat[i]);
            if chsh_rounds.contains(&j) && (x1 ^ x2) == (theta[j] & theta_hat[j]) {
                wins += 1;
            }
            if match_rounds.contains(&j) && x1 == x2 {
                matches += 1;
            }
        }

        let p_win = wins as f64 / chsh_rounds.len() as f64;
        let p_match = matches as f64 / match_rounds.len() as f64;

        if p_win < PCHSH - EPSILON || p_match < 1.0 - EPSILON {
            return Err(ProtocolError::Abort(format!(
                "failed CHSH test: p_win={p_win:.3} p_match={p_match:.3}"
            )));
        }

        Ok(key_rounds.into_iter().map(|j| x[j]).collect())
    }

    async fn distill(&self) -> Result<Vec<u8>, ProtocolError> {
        let (x, theta) = match self.session.role {
            Role::Leader => self.distribute_leader().await?,
            Role::Follower => self.distribute_follower().await?,
        };
        self.chsh_test(x, theta).await
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
                    secret_bits.extend(self.distill().await?);
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
