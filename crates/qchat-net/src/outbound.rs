use qchat_wire::Frame;
use tokio::sync::{mpsc, Mutex};

/// An outbound item: the destination user and the frame to send them, once
/// the sender loop resolves their endpoint.
pub struct OutboundItem {
    pub destination: String,
    pub frame: Frame,
}

/// Thread-safe FIFO of outbound items, drained by the node's sender loop.
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<OutboundItem>,
    rx: Mutex<mpsc::UnboundedReceiver<OutboundItem>>,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx: Mutex::new(rx) }
    }

    pub fn push(&self, destination: impl Into<String>, frame: Frame) {
        let _ = self.tx.send(OutboundItem { destination: destination.into(), frame });
    }

    /// Blocks until an item is available or the queue is closed.
    pub async fn pop(&self) -> Option<OutboundItem> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qchat_wire::HeaderTag;
    use serde_json::json;

    #[tokio::test]
    async fn test_pop_returns_pushed_items_in_order() {
        let q = OutboundQueue::new();
        q.push("Bob", Frame::new(HeaderTag::Qcht, "Alice", json!({})));
        q.push("Carol", Frame::new(HeaderTag::Qcht, "Alice", json!({})));

        assert_eq!(q.pop().await.unwrap().destination, "Bob");
        assert_eq!(q.pop().await.unwrap().destination, "Carol");
    }
}
