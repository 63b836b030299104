//! Dispatcher - プッシュゲートウェイへの送信と broadcast の展開
//!
//! # 責務
//! - `send`: 1 トークン宛てに 1 リクエスト。失敗は `DispatchOutcome::failed` に変換（panic / 伝播しない）
//! - `plan_broadcast`: broadcast を受信者ごとの直接通知レコードに分解する（ゲートウェイは呼ばない）
//! - `materialize`: 計画したレコードを並行に作成する（順序なし）
//!
//! 作成されたレコードは作成トリガー経由で Reconciler に戻り、直接通知として配送されます。

use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::domain::{
    DispatchOutcome, FailureKind, MaterializedIntent, NotificationIntent, NotificationRecord,
    PlatformEnvelope, Recipient, UserId,
};
use crate::observability::redact_token;
use crate::ports::{Clock, DocumentStore, IdGenerator, PushGateway};

use super::payload::title_for;
use super::resolver::BroadcastAudience;

pub const PROJECT_CHAT_TYPE: &str = "project";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub created: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    push: Arc<dyn PushGateway>,
    store: Arc<dyn DocumentStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Dispatcher {
    pub fn new(
        push: Arc<dyn PushGateway>,
        store: Arc<dyn DocumentStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            push,
            store,
            ids,
            clock,
        }
    }

    pub async fn send(
        &self,
        recipient_id: &UserId,
        token: &str,
        envelope: &PlatformEnvelope,
    ) -> DispatchOutcome {
        match self.push.send(token, envelope).await {
            Ok(message_id) => {
                info!(recipient = %recipient_id, message_id = %message_id, "push sent");
                DispatchOutcome::sent(recipient_id.as_str(), message_id)
            }
            Err(err) => {
                let kind = err.failure_kind();
                if kind == FailureKind::StaleToken {
                    warn!(recipient = %recipient_id, token = %redact_token(token), "stale push token");
                } else {
                    warn!(recipient = %recipient_id, error = %err, "push failed");
                }
                DispatchOutcome::failed(recipient_id.as_str(), kind, err.to_string())
            }
        }
    }

    /// `None` when the recipient has no token (skipped, not a failure).
    pub async fn dispatch_direct(
        &self,
        recipient: &Recipient,
        envelope: &PlatformEnvelope,
    ) -> Option<DispatchOutcome> {
        let token = recipient.push_token.as_deref().filter(|t| !t.is_empty())?;
        let outcome = self.send(&recipient.user_id, token, envelope).await;
        Some(match recipient.display_name.as_deref() {
            Some(name) => outcome.with_name(name),
            None => outcome,
        })
    }

    /// One direct project-chat record per recipient. The intent's sender name
    /// must already be resolved.
    pub fn plan_broadcast(
        &self,
        intent: &NotificationIntent,
        audience: &BroadcastAudience,
    ) -> Vec<MaterializedIntent> {
        let Some(project) = intent.scope() else {
            return Vec::new();
        };
        let scoped = intent.clone().with_scope_name(audience.scope_name.clone());
        let title = title_for(&scoped);
        let now = self.clock.now();

        audience
            .recipients
            .iter()
            .map(|recipient| MaterializedIntent {
                id: self.ids.generate_notification_id(),
                receiver: recipient.user_id.clone(),
                record: NotificationRecord {
                    sender_id: intent.sender_id.as_ref().map(|id| id.to_string()),
                    receiver_id: Some(recipient.user_id.to_string()),
                    title: Some(title.clone()),
                    message: Some(intent.body_text.clone()),
                    chat_type: Some(PROJECT_CHAT_TYPE.to_string()),
                    chat_id: Some(project.to_string()),
                    scope_name: Some(audience.scope_name.clone()),
                    read: false,
                    timestamp: Some(now),
                    ..NotificationRecord::default()
                },
            })
            .collect()
    }

    /// Create all planned records concurrently. Individual failures are logged
    /// and counted; they do not stop the others.
    pub async fn materialize(&self, plan: Vec<MaterializedIntent>) -> MaterializeReport {
        let creates = plan.into_iter().map(|item| async move {
            let result = self.store.create_notification(&item.id, item.record).await;
            if let Err(e) = &result {
                warn!(receiver = %item.receiver, error = %e, "failed to materialize broadcast record");
            }
            result.is_ok()
        });

        let results = join_all(creates).await;
        let created = results.iter().filter(|ok| **ok).count();
        MaterializeReport {
            created,
            failed: results.len() - created,
        }
    }
}
