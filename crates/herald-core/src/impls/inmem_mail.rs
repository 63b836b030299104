//! InMemoryMailTransport - 送信したメールを保持するだけのトランスポート

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::OutgoingMail;
use crate::ports::{MailError, MailTransport};

#[derive(Default)]
pub struct InMemoryMailTransport {
    outbox: Mutex<Vec<OutgoingMail>>,
    failing: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl InMemoryMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries to `address` fail with a relay error.
    pub async fn fail_for(&self, address: impl Into<String>) {
        self.failing.lock().await.insert(address.into());
    }

    pub async fn outbox(&self) -> Vec<OutgoingMail> {
        self.outbox.lock().await.clone()
    }
}

#[async_trait]
impl MailTransport for InMemoryMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        if self.failing.lock().await.contains(&mail.to) {
            return Err(MailError::Delivery(format!(
                "550 mailbox unavailable: {}",
                mail.to
            )));
        }
        self.outbox.lock().await.push(mail.clone());
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("<dry-run-{n}@herald.local>"))
    }
}
