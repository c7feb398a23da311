//! Thread-safe storage for delivered QCHT/SPDS frames, pending decryption
//! and retrieval by the application layer.

use parking_lot::Mutex;
use qchat_wire::Frame;

/// Stores inbound chat deliveries until the application layer drains them.
#[derive(Default)]
pub struct Mailbox {
    messages: Mutex<Vec<Frame>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self { messages: Mutex::new(Vec::new()) }
    }

    pub fn store(&self, frame: Frame) {
        self.messages.lock().push(frame);
    }

    /// Returns a snapshot of the currently stored messages without
    /// removing them.
    pub fn peek(&self) -> Vec<Frame> {
        self.messages.lock().clone()
    }

    /// Removes and returns every stored message.
    pub fn drain(&self) -> Vec<Frame> {
        std::mem::take(&mut self.messages.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qchat_wire::HeaderTag;
    use serde_json::json;

    #[test]
    fn test_drain_empties_the_mailbox() {
        let mailbox = Mailbox::new();
        mailbox.store(Frame::new(HeaderTag::Qcht, "Alice", json!({})));
        assert_eq!(mailbox.peek().len(), 1);

        let drained = mailbox.drain();
        assert_eq!(drained.len(), 1);
        assert!(mailbox.peek().is_empty());
    }
}
