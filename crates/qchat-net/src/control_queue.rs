use parking_lot::Mutex;
use qchat_wire::Frame;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

struct PeerQueue {
    frames: Mutex<std::collections::VecDeque<Frame>>,
    notify: Notify,
}

impl PeerQueue {
    fn new() -> Self {
        Self { frames: Mutex::new(std::collections::VecDeque::new()), notify: Notify::new() }
    }
}

/// Per-peer FIFOs of inbound protocol frames the router didn't handle
/// itself (BB84/DQKD/SPDS and any unknown header). A running protocol task
/// consumes its peer's queue with a timeout; ordering within one peer's
/// queue reflects router enqueue order.
#[derive(Default)]
pub struct ControlQueues {
    peers: Mutex<HashMap<String, Arc<PeerQueue>>>,
}

impl ControlQueues {
    pub fn new() -> Self {
        Self { peers: Mutex::new(HashMap::new()) }
    }

    fn queue_for(&self, peer: &str) -> Arc<PeerQueue> {
        self.peers.lock().entry(peer.to_string()).or_insert_with(|| Arc::new(PeerQueue::new())).clone()
    }

    pub fn push(&self, peer: &str, frame: Frame) {
        let q = self.queue_for(peer);
        q.frames.lock().push_back(frame);
        q.notify.notify_one();
    }

    /// Waits up to `timeout` for a frame from `peer`, returning `None` on
    /// timeout.
    pub async fn pop(&self, peer: &str, timeout: Duration) -> Option<Frame> {
        let q = self.queue_for(peer);
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(frame) = q.frames.lock().pop_front() {
                return Some(frame);
            }
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let _ = tokio::time::timeout(remaining, q.notify.notified()).await;
        }
    }
}
