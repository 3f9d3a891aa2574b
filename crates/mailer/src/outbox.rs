use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::EmailMessage;

const DEFAULT_CAPACITY: usize = 100;

/// In-process mailbox used when no relay is configured.
///
/// Keeps the most recent messages so local runs and tests can inspect what
/// would have been sent. Older messages are dropped once the ring is full.
#[derive(Clone)]
pub struct Outbox {
    ring: Arc<Mutex<VecDeque<EmailMessage>>>,
    capacity: usize,
}

impl Default for Outbox {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Outbox {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ring: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub async fn deliver(&self, message: &EmailMessage) {
        info!(stage = "mail", to = %message.to, subject = %message.subject, "email captured in outbox");
        let mut ring = self.ring.lock().await;
        if ring.len() == self.capacity {
            ring.pop_front();
        }
        ring.push_back(message.clone());
    }

    /// Messages in delivery order, oldest first.
    pub async fn messages(&self) -> Vec<EmailMessage> {
        self.ring.lock().await.iter().cloned().collect()
    }

    /// Messages addressed to `to`, oldest first.
    pub async fn messages_to(&self, to: &str) -> Vec<EmailMessage> {
        self.ring
            .lock()
            .await
            .iter()
            .filter(|message| message.to == to)
            .cloned()
            .collect()
    }
}
