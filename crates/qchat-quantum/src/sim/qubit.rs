use super::pair::{rot_y_gate, PairCore, H_GATE, X_GATE, Z_GATE};
use crate::qubit::Qubit;
use rand::rngs::ThreadRng;
use std::sync::Arc;

/// One half of a simulated (possibly entangled) qubit pair.
pub struct SimQubit {
    core: Arc<PairCore>,
    slot: u8,
    rng: ThreadRng,
}

impl SimQubit {
    pub fn fresh() -> Self {
        Self { core: Arc::new(PairCore::product_zero()), slot: 0, rng: rand::thread_rng() }
    }

    /// Creates an entangled pair, returning (this side's half, the other
    /// side's half) sharing one `PairCore`.
    pub fn entangled_pair() -> (Self, Self) {
        let core = Arc::new(PairCore::bell_phi_plus());
        (
            Self { core: core.clone(), slot: 0, rng: rand::thread_rng() },
            Self { core, slot: 1, rng: rand::thread_rng() },
        )
    }

    /// Own reduced amplitude pair, valid when this qubit's pair partner is
    /// pinned to the classical `0` branch (true for a fresh or already-sent
    /// qubit that was never jointly measured).
    fn local_amplitudes(&self) -> [f64; 2] {
        let amps = self.core.amps_snapshot();
        let other_slot = 1 - self.slot;
        let mut out = [0.0; 2];
        for (i, amp) in amps.iter().enumerate() {
            let bits = [(i >> 1) & 1, i & 1];
            if bits[other_slot as usize] == 0 {
                out[bits[self.slot as usize]] = *amp;
            }
        }
        out
    }
}

impl Qubit for SimQubit {
    fn h(&mut self) {
        self.core.apply_single(self.slot, H_GATE);
    }

    fn x(&mut self) {
        self.core.apply_single(self.slot, X_GATE);
    }

    fn z(&mut self) {
        self.core.apply_single(self.slot, Z_GATE);
    }

    fn cnot(&mut self, target: &mut Self) {
        if Arc::ptr_eq(&self.core, &target.core) {
            self.core.apply_cnot(self.slot, target.slot);
            return;
        }

        // Two qubits sourced from different pairs: merge their independent
        // product states into one shared core going forward.
        let mine = self.local_amplitudes();
        let theirs = target.local_amplitudes();
        let merged = PairCore::from_product(mine, theirs);
        merged.apply_cnot(0, 1);
        let merged = Arc::new(merged);
        self.core = merged.clone();
        self.slot = 0;
        target.core = merged;
        target.slot = 1;
    }

    fn rot_y(&mut self, units: i64) {
        let theta = units as f64 * crate::ROT_Y_RADIANS_PER_UNIT;
        self.core.apply_single(self.slot, rot_y_gate(theta));
    }

    fn measure(&mut self) -> u8 {
        self.core.measure(self.slot, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entangled_pair_agrees_when_measured_in_same_basis() {
        for _ in 0..200 {
            let (mut a, mut b) = SimQubit::entangled_pair();
            assert_eq!(a.measure(), b.measure());
        }
    }

    #[test]
    fn test_fresh_qubit_measures_as_zero() {
        let mut q = SimQubit::fresh();
        assert_eq!(q.measure(), 0);
    }

    #[test]
    fn test_x_gate_flips_fresh_qubit() {
        let mut q = SimQubit::fresh();
        q.x();
        assert_eq!(q.measure(), 1);
    }
}
