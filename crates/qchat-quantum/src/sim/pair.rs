//! A two-qubit real-amplitude statevector shared by the two halves of a
//! simulated EPR pair (or, for a standalone qubit, a product state whose
//! second slot is never touched).
//!
//! Every gate this backend needs to support (H, X, Z, CNOT, Y-rotation) is
//! real-orthogonal, so the joint state never needs complex amplitudes.

use parking_lot::Mutex;
use rand::Rng;
use std::f64::consts::FRAC_1_SQRT_2;

type Matrix2 = [[f64; 2]; 2];

pub const H_GATE: Matrix2 = [[FRAC_1_SQRT_2, FRAC_1_SQRT_2], [FRAC_1_SQRT_2, -FRAC_1_SQRT_2]];
pub const X_GATE: Matrix2 = [[0.0, 1.0], [1.0, 0.0]];
pub const Z_GATE: Matrix2 = [[1.0, 0.0], [0.0, -1.0]];

pub fn rot_y_gate(theta: f64) -> Matrix2 {
    let (s, c) = (theta / 2.0).sin_cos();
    [[c, -s], [s, c]]
}

/// Amplitudes indexed `2*b0 + b1` over basis states `|b0 b1>`.
pub struct PairCore {
    amps: Mutex<[f64; 4]>,
}

impl PairCore {
    pub fn product_zero() -> Self {
        Self { amps: Mutex::new([1.0, 0.0, 0.0, 0.0]) }
    }

    /// The Bell state `|Phi+> = (|00> + |11>) / sqrt(2)`.
    pub fn bell_phi_plus() -> Self {
        Self { amps: Mutex::new([FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2]) }
    }

    /// Builds the joint product state of two independent single-qubit
    /// amplitude pairs: `|psi> = a (x) b`.
    pub fn from_product(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            amps: Mutex::new([a[0] * b[0], a[0] * b[1], a[1] * b[0], a[1] * b[1]]),
        }
    }

    pub fn amps_snapshot(&self) -> [f64; 4] {
        *self.amps.lock()
    }

    pub fn apply_single(&self, slot: u8, gate: Matrix2) {
        let mut amps = self.amps.lock();
        let mut next = [0.0; 4];
        for i in 0..4 {
            let bits = [(i >> 1) & 1, i & 1];
            let own = bits[slot as usize];
            let mut acc = 0.0;
            for own_prime in 0..2usize {
                let mut src_bits = bits;
                src_bits[slot as usize] = own_prime;
                let src_idx = (src_bits[0] << 1) | src_bits[1];
                acc += gate[own][own_prime] * amps[src_idx];
            }
            next[i] = acc;
        }
        *amps = next;
    }

    pub fn apply_cnot(&self, control: u8, target: u8) {
        let mut amps = self.amps.lock();
        let mut next = [0.0; 4];
        for i in 0..4 {
            let mut bits = [(i >> 1) & 1, i & 1];
            if bits[control as usize] == 1 {
                bits[target as usize] ^= 1;
            }
            let src_idx = (bits[0] << 1) | bits[1];
            next[i] = amps[src_idx];
        }
        *amps = next;
    }

    /// Projectively measures `slot`, collapsing the joint state and
    /// returning the classical outcome.
    pub fn measure(&self, slot: u8, rng: &mut impl Rng) -> u8 {
        let mut amps = self.amps.lock();
        let mut p0 = 0.0;
        for (i, amp) in amps.iter().enumerate() {
            let bits = [(i >> 1) & 1, i & 1];
            if bits[slot as usize] == 0 {
                p0 += amp * amp;
            }
        }

        let outcome = u8::from(rng.gen::<f64>() >= p0);
        let norm = if outcome == 0 { p0 } else { 1.0 - p0 };
        let inv_norm = if norm > 1e-12 { 1.0 / norm.sqrt() } else { 0.0 };

        let mut next = [0.0; 4];
        for (i, amp) in amps.iter().enumerate() {
            let bits = [(i >> 1) & 1, i & 1];
            if bits[slot as usize] == outcome as usize {
                next[i] = amp * inv_norm;
            }
        }
        *amps = next;
        outcome
    }
}
