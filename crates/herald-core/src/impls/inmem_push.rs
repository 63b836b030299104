//! InMemoryPushGateway - 送信を記録するだけのプッシュゲートウェイ
//!
//! `--dry-run` とテストで使います。特定トークンを stale / 拒否扱いにできます。

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::PlatformEnvelope;
use crate::ports::{PushError, PushGateway};

#[derive(Debug, Clone, PartialEq)]
pub struct SentPush {
    pub token: String,
    pub envelope: PlatformEnvelope,
}

#[derive(Default)]
pub struct InMemoryPushGateway {
    sent: Mutex<Vec<SentPush>>,
    stale: Mutex<HashSet<String>>,
    rejected: Mutex<HashSet<String>>,
    counter: AtomicU64,
}

impl InMemoryPushGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends to `token` will fail as unregistered.
    pub async fn mark_stale(&self, token: impl Into<String>) {
        self.stale.lock().await.insert(token.into());
    }

    /// Sends to `token` will be rejected by the "provider".
    pub async fn mark_rejected(&self, token: impl Into<String>) {
        self.rejected.lock().await.insert(token.into());
    }

    pub async fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl PushGateway for InMemoryPushGateway {
    async fn send(&self, token: &str, envelope: &PlatformEnvelope) -> Result<String, PushError> {
        if self.stale.lock().await.contains(token) {
            return Err(PushError::StaleToken(
                "messaging/registration-token-not-registered".to_string(),
            ));
        }
        if self.rejected.lock().await.contains(token) {
            return Err(PushError::Rejected {
                status: 500,
                detail: "internal error".to_string(),
            });
        }

        self.sent.lock().await.push(SentPush {
            token: token.to_string(),
            envelope: envelope.clone(),
        });
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("projects/dry-run/messages/{n}"))
    }
}
