use parking_lot::Mutex;
use qchat_wire::Frame;
use std::collections::VecDeque;

/// The node's shared inbound queue. Handler tasks push completed frames;
/// the drainer pops them in handler-completion order, which need not match
/// accept order.
#[derive(Default)]
pub struct Inbox {
    queue: Mutex<VecDeque<Frame>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self { queue: Mutex::new(VecDeque::new()) }
    }

    pub fn push(&self, frame: Frame) {
        self.queue.lock().push_back(frame);
    }

    /// Non-blocking pop of the oldest queued frame.
    pub fn pop(&self) -> Option<Frame> {
        self.queue.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
