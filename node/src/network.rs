//! Outbound network seam. The node publishes blocks, confirm-reqs and votes
//! through this trait; the wire transport behind it is out of scope here.

use lattice_messages::Message;
use std::sync::Mutex;

pub trait NetworkSink: Send + Sync {
    /// Broadcast to every known peer.
    fn flood(&self, message: Message);

    /// Send to a single peer.
    fn send(&self, peer: &str, message: Message);
}

/// Records everything instead of sending it. Used in tests and as the
/// default sink until a transport is attached.
#[derive(Default)]
pub struct LoopbackNetwork {
    sent: Mutex<Vec<Message>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_sent(&self) -> Vec<Message> {
        std::mem::take(&mut self.sent.lock().unwrap())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl NetworkSink for LoopbackNetwork {
    fn flood(&self, message: Message) {
        self.sent.lock().unwrap().push(message);
    }

    fn send(&self, _peer: &str, message: Message) {
        self.sent.lock().unwrap().push(message);
    }
}
