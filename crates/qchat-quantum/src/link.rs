use crate::error::QuantumError;
use crate::qubit::Qubit;
use async_trait::async_trait;

/// The abstract quantum backend capability a node needs: creating and
/// exchanging EPR halves and fresh qubits with named peers.
///
/// Per the host contract, a concrete implementation owns whatever hardware
/// or simulator sits behind it; sessions only ever see this trait.
#[async_trait]
pub trait QuantumLink: Send + Sync {
    /// The concrete qubit handle this backend hands out.
    type Qubit: Qubit;

    /// Creates a fresh EPR pair entangled with `peer`, returning this side's
    /// half. The backend is responsible for making the other half available
    /// to `peer` via its own `recv_epr`.
    async fn create_epr(&self, peer: &str) -> Result<Self::Qubit, QuantumError>;

    /// Receives this side's half of an EPR pair created by a remote peer's
    /// `create_epr`.
    async fn recv_epr(&self) -> Result<Self::Qubit, QuantumError>;

    /// Receives a plain (non-EPR) qubit sent by a peer's `send_qubit`.
    async fn recv_qubit(&self) -> Result<Self::Qubit, QuantumError>;

    /// Sends `qubit` to `peer`.
    async fn send_qubit(&self, qubit: Self::Qubit, peer: &str) -> Result<(), QuantumError>;

    /// Mints a fresh qubit in the |0> state, unentangled with anything.
    async fn new_qubit(&self) -> Result<Self::Qubit, QuantumError>;
}
