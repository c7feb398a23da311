use super::hub::LocalQuantumHub;
use super::qubit::SimQubit;
use crate::error::QuantumError;
use crate::link::QuantumLink;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

const EPR_TIMEOUT: Duration = Duration::from_secs(60);

/// An in-process [`QuantumLink`] simulator: every node in a test topology
/// shares one [`LocalQuantumHub`] and exchanges genuinely entangled qubits
/// over it. Stands in for a real quantum backend, which this crate's host
/// contract otherwise leaves unspecified.
pub struct LocalQuantumLink {
    name: String,
    hub: Arc<LocalQuantumHub>,
    qubit_rx: Mutex<mpsc::UnboundedReceiver<SimQubit>>,
    epr_rx: Mutex<mpsc::UnboundedReceiver<SimQubit>>,
}

impl LocalQuantumLink {
    pub fn new(name: impl Into<String>, hub: Arc<LocalQuantumHub>) -> Self {
        let name = name.into();
        let (qubit_rx, epr_rx) = hub.register(&name);
        Self { name, hub, qubit_rx: Mutex::new(qubit_rx), epr_rx: Mutex::new(epr_rx) }
    }
}

#[async_trait]
impl QuantumLink for LocalQuantumLink {
    type Qubit = SimQubit;

    async fn create_epr(&self, peer: &str) -> Result<SimQubit, QuantumError> {
        let (mine, theirs) = SimQubit::entangled_pair();
        self.hub
            .send_epr_half(peer, theirs)
            .ok_or_else(|| QuantumError::UnknownPeer(peer.to_string()))?;
        Ok(mine)
    }

    async fn recv_epr(&self) -> Result<SimQubit, QuantumError> {
        let mut rx = self.epr_rx.lock().await;
        tokio::time::timeout(EPR_TIMEOUT, rx.recv()).await.map_err(|_| QuantumError::Timeout)?.ok_or(QuantumError::Timeout)
    }

    async fn recv_qubit(&self) -> Result<SimQubit, QuantumError> {
        let mut rx = self.qubit_rx.lock().await;
        tokio::time::timeout(EPR_TIMEOUT, rx.recv()).await.map_err(|_| QuantumError::Timeout)?.ok_or(QuantumError::Timeout)
    }

    async fn send_qubit(&self, qubit: SimQubit, peer: &str) -> Result<(), QuantumError> {
        self.hub
            .send_qubit(peer, qubit)
            .ok_or_else(|| QuantumError::UnknownPeer(peer.to_string()))
    }

    async fn new_qubit(&self) -> Result<SimQubit, QuantumError> {
        Ok(SimQubit::fresh())
    }
}

impl LocalQuantumLink {
    /// This link's own registered name, used by peers addressing it.
    pub fn name(&self) -> &str {
        &self.name
    }
}
