use super::qubit::SimQubit;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Routes qubits and EPR halves between the [`super::LocalQuantumLink`]
/// instances of every node in a single test process, by name.
pub struct LocalQuantumHub {
    qubit_senders: Mutex<HashMap<String, mpsc::UnboundedSender<SimQubit>>>,
    epr_senders: Mutex<HashMap<String, mpsc::UnboundedSender<SimQubit>>>,
}

impl LocalQuantumHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { qubit_senders: Mutex::new(HashMap::new()), epr_senders: Mutex::new(HashMap::new()) })
    }

    pub(super) fn register(
        self: &Arc<Self>,
        name: &str,
    ) -> (mpsc::UnboundedReceiver<SimQubit>, mpsc::UnboundedReceiver<SimQubit>) {
        let (qtx, qrx) = mpsc::unbounded_channel();
        let (etx, erx) = mpsc::unbounded_channel();
        self.qubit_senders.lock().insert(name.to_string(), qtx);
        self.epr_senders.lock().insert(name.to_string(), etx);
        (qrx, erx)
    }

    pub(super) fn send_qubit(&self, peer: &str, qubit: SimQubit) -> Option<()> {
        self.qubit_senders.lock().get(peer).and_then(|tx| tx.send(qubit).ok())
    }

    pub(super) fn send_epr_half(&self, peer: &str, qubit: SimQubit) -> Option<()> {
        self.epr_senders.lock().get(peer).and_then(|tx| tx.send(qubit).ok())
    }
}

