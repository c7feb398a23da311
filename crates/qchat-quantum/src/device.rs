//! Lead/follow measurement devices: the thin layer between a protocol
//! session and its [`QuantumLink`], fixing the basis convention each role
//! uses.

use crate::error::QuantumError;
use crate::link::QuantumLink;
use crate::qubit::Qubit;

/// Measures a qubit in the leader's basis convention: `0` is the standard
/// (Z) basis, `1` is the Hadamard (X) basis.
pub fn lead_measure<Q: Qubit>(q: &mut Q, basis: u8) -> u8 {
    if basis == 1 {
        q.h();
    }
    q.measure()
}

/// Measures a qubit in the follower's basis convention used by DIQKD:
/// basis `2` matches the leader's standard basis; `0` and `1` are rotated
/// bases chosen to hit the CHSH-optimal winning probability together with
/// the leader's Z/X bases (see crate-level docs for the angle convention).
pub fn follow_measure<Q: Qubit>(q: &mut Q, basis: u8) -> u8 {
    match basis {
        0 => q.rot_y(FOLLOWER_BASIS_0_UNITS),
        1 => q.rot_y(FOLLOWER_BASIS_1_UNITS),
        _ => {}
    }
    q.measure()
}

/// Rotation, in the backend's native units, for the follower's first CHSH
/// test basis: Bloch angle +45 degrees relative to the leader's Z basis.
pub const FOLLOWER_BASIS_0_UNITS: i64 = 32;
/// Rotation for the follower's second CHSH test basis: Bloch angle -45
/// degrees (315 degrees).
pub const FOLLOWER_BASIS_1_UNITS: i64 = 224;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimQubit;

    /// Validates the chosen angle convention against the CHSH win
    /// predicate from the protocol spec: `x1 xor x2 == theta_leader AND
    /// theta_follower`, Monte-Carlo sampled over many trials. The quantum
    /// optimum is `p_win = (1 + 1/sqrt(2)) / 2 ~= 0.8536`.
    #[test]
    fn test_chsh_win_probability_hits_tsirelson_bound() {
        let trials = 20_000;
        let mut wins = 0u32;
        let mut rng = rand::thread_rng();

        for _ in 0..trials {
            let (mut leader_q, mut follower_q) = SimQubit::entangled_pair();
            let theta: u8 = rand::Rng::gen_range(&mut rng, 0..2);
            let theta_hat: u8 = rand::Rng::gen_range(&mut rng, 0..2);

            let x1 = lead_measure(&mut leader_q, theta);
            let x2 = follow_measure(&mut follower_q, theta_hat);

            let predicate = theta & theta_hat;
            if (x1 ^ x2) == predicate {
                wins += 1;
            }
        }

        let p_win = wins as f64 / trials as f64;
        assert!((p_win - 0.8536).abs() < 0.03, "p_win = {p_win}");
    }
}

/// Leader-side EPR receive: the registry routed the pair's other half to
/// this node's EPR inbox.
pub async fn lead_receive_epr<L: QuantumLink>(link: &L) -> Result<L::Qubit, QuantumError> {
    link.recv_epr().await
}

/// Follower-side EPR receive: the registry forwards the follower's half as
/// a plain qubit, not through the EPR channel.
pub async fn follow_receive_epr<L: QuantumLink>(link: &L) -> Result<L::Qubit, QuantumError> {
    link.recv_qubit().await
}
