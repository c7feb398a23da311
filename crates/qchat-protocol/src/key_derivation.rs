//! Reconciliation and privacy amplification shared by [`crate::bb84`] and
//! [`crate::diqkd`] — everything downstream of each protocol's own
//! basis-distillation stage is identical.

use crate::error::ProtocolError;
use crate::session::{Role, Session};
use qchat_quantum::QuantumLink;
use rand::Rng;
use serde_json::{json, Value};
use std::time::Duration;

pub const ROUND_SIZE: usize = 100;
pub const BYTE_LEN: usize = 8;
pub const MAX_GOLAY_ERROR: f64 = 3.0 / 23.0;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn bits_to_byte(bits: &[u8]) -> u8 {
    bits.iter().fold(0u8, |acc, &b| (acc << 1) | (b & 1))
}

/// Golay-reconciles as many full 23-bit codewords as `secret_bits` holds,
/// returning the leftover bits (recycled into the next round) and the
/// reconciled bits accumulated from the codewords that were processed.
pub(crate) async fn reconcile_information<L: QuantumLink>(
    session: &Session<L>,
    secret_bits: Vec<u8>,
) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
    let (codewords, remainder) = qchat_ecc::chunk(&secret_bits);
    let mut reconciled = Vec::with_capacity(codewords.len() * qchat_ecc::CODEWORD_LENGTH);

    for codeword in codewords {
        let syndrome = match session.role {
            Role::Leader => {
                let s = qchat_ecc::encode(&codeword);
                let response = session.exchange(json!({"s": s.to_vec()}), IDLE_TIMEOUT).await?;
                if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                    return Err(ProtocolError::Abort("peer failed to reconcile secrets".to_string()));
                }
                s
            }
            Role::Follower => {
                let response = session.exchange(json!({"ack": true}), IDLE_TIMEOUT).await?;
                let s_vec: Vec<u8> = serde_json::from_value(response.payload["s"].clone())
                    .map_err(|_| ProtocolError::Misframe)?;
                let mut s = [0u8; 11];
                s.copy_from_slice(&s_vec);
                s
            }
        };
        reconciled.extend_from_slice(&qchat_ecc::decode(&codeword, &syndrome));
    }

    Ok((remainder, reconciled))
}

/// One-round privacy amplification (Renner et al. 2010): distills two
/// reconciled bytes down to a single extracted byte, authenticated by a
/// one-time-pad-style tag so a mismatched byte is caught (and discarded)
/// rather than silently corrupting the derived key.
///
/// Returns `None` when the tag doesn't match — the byte contributes nothing
/// to the key, it is not an error.
pub(crate) async fn amplify_privacy<L: QuantumLink>(
    session: &Session<L>,
    x: [u8; 2],
) -> Result<Option<u8>, ProtocolError> {
    match session.role {
        Role::Leader => {
            let seed: u8 = rand::thread_rng().gen_range(0..=255);
            let tmp = (seed as u16 * x[0] as u16).to_be_bytes();
            let extracted = tmp[0];
            let tag = (tmp[1] as u16 + x[1] as u16) % 256;

            let response = session.exchange(json!({"Y": seed, "T": tag}), IDLE_TIMEOUT).await?;
            if response.payload.get("ack").and_then(Value::as_bool) != Some(true) {
                return Ok(None);
            }
            Ok(Some(extracted))
        }
        Role::Follower => {
            let message = session.wait_control(IDLE_TIMEOUT).await?;
            let seed = message.payload["Y"].as_u64().ok_or(ProtocolError::Misframe)? as u16;
            let tag = message.payload["T"].as_u64().ok_or(ProtocolError::Misframe)? as u16;

            let tmp = (seed * x[0] as u16).to_be_bytes();
            let expected_tag = (tmp[1] as u16 + x[1] as u16) % 256;

            if tag != expected_tag {
                session.send_control(json!({"ack": false}));
                return Ok(None);
            }
            session.send_control(json!({"ack": true}));
            Ok(Some(tmp[0]))
        }
    }
}
