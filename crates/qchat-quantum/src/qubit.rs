//! The `Qubit` capability: the handful of single- and two-qubit operations
//! a protocol session needs from whatever backend the host provides.

/// Operations available on a single quantum-backend-provided qubit handle.
///
/// `cnot` takes `target: &mut Self` rather than a trait object: the backend
/// is expected to be a single concrete type per link, so there is no need
/// to pay for dynamic dispatch on the hot path of a protocol session.
pub trait Qubit: Send {
    /// Hadamard gate.
    fn h(&mut self);
    /// Pauli-X (bit flip).
    fn x(&mut self);
    /// Pauli-Z (phase flip).
    fn z(&mut self);
    /// Controlled-NOT with `self` as control and `target` as target.
    fn cnot(&mut self, target: &mut Self);
    /// Rotation about the Bloch-sphere Y axis, parameterised in the
    /// backend's native "units" (see [`crate::ROT_Y_UNITS_PER_TURN`]).
    fn rot_y(&mut self, units: i64);
    /// Projective measurement in the computational basis, collapsing the
    /// qubit and returning the classical outcome.
    fn measure(&mut self) -> u8;
}
