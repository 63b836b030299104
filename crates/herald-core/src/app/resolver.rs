//! RecipientResolver - intent から受信者の集合を求める
//!
//! # 設計原則
//! - 読み取り専用（ストアへの書き込みはしない）
//! - 受信者レコードが無い / push token が無い → 空集合（エラーではない）
//! - アンカーレコードの読み取りエラー → intent を中断（呼び出し元でログ出力、リトライなし）
//!
//! # Broadcast
//! プロジェクトが存在すれば `users` を全件走査し、送信者以外で
//! `BROADCAST_ROLES` のいずれかのロールを持ち、token を持つユーザーを選びます。
//! O(n)（メンバーシップのインデックスは持たない）。

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    Audience, HeraldError, NotificationIntent, ProjectId, Recipient, UserId, UserRecord,
};
use crate::ports::DocumentStore;

/// Roles that receive project chat broadcasts.
pub const BROADCAST_ROLES: [&str; 3] = ["Manager", "Designer", "Supervisor"];

pub const DEFAULT_SENDER_NAME: &str = "Someone";

pub const DEFAULT_SCOPE_NAME: &str = "Project Chat";

/// Recipients of one project broadcast, plus the project's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastAudience {
    pub scope_name: String,
    pub recipients: Vec<Recipient>,
}

pub struct RecipientResolver {
    store: Arc<dyn DocumentStore>,
}

impl RecipientResolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, intent: &NotificationIntent) -> Result<Vec<Recipient>, HeraldError> {
        match &intent.audience {
            Audience::Direct(receiver) => Ok(self.resolve_direct(receiver).await?.into_iter().collect()),
            Audience::Broadcast(project) => Ok(self
                .resolve_broadcast(project, intent.sender_id.as_ref())
                .await?
                .map(|audience| audience.recipients)
                .unwrap_or_default()),
        }
    }

    async fn resolve_direct(&self, receiver: &UserId) -> Result<Option<Recipient>, HeraldError> {
        if receiver.is_blank() {
            return Ok(None);
        }
        let Some(user) = self.store.get_user(receiver).await? else {
            debug!(receiver = %receiver, "receiver not found");
            return Ok(None);
        };
        let Some(token) = user.push_token() else {
            debug!(receiver = %receiver, "receiver has no push token");
            return Ok(None);
        };
        Ok(Some(Recipient {
            user_id: receiver.clone(),
            push_token: Some(token.to_string()),
            display_name: user.display_name().map(str::to_string),
        }))
    }

    /// `None` when the project does not exist.
    pub async fn resolve_broadcast(
        &self,
        project: &ProjectId,
        sender: Option<&UserId>,
    ) -> Result<Option<BroadcastAudience>, HeraldError> {
        let Some(record) = self.store.get_project(project).await? else {
            debug!(project = %project, "project not found");
            return Ok(None);
        };

        let recipients = self
            .store
            .list_users()
            .await?
            .into_iter()
            .filter(|(id, _)| Some(id) != sender)
            .filter_map(|(id, user)| broadcast_recipient(id, &user))
            .collect();

        Ok(Some(BroadcastAudience {
            scope_name: record.name().unwrap_or(DEFAULT_SCOPE_NAME).to_string(),
            recipients,
        }))
    }

    /// The intent's own sender name if set, otherwise the sender's user record,
    /// otherwise `"Someone"`.
    pub async fn sender_name(&self, intent: &NotificationIntent) -> Result<String, HeraldError> {
        if let Some(name) = intent
            .sender_display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            return Ok(name.to_string());
        }
        let Some(sender) = intent.sender_id.as_ref() else {
            return Ok(DEFAULT_SENDER_NAME.to_string());
        };
        let name = self
            .store
            .get_user(sender)
            .await?
            .and_then(|user| user.display_name().map(str::to_string));
        Ok(name.unwrap_or_else(|| DEFAULT_SENDER_NAME.to_string()))
    }
}

fn broadcast_recipient(id: UserId, user: &UserRecord) -> Option<Recipient> {
    let role = user.role()?;
    if !BROADCAST_ROLES.contains(&role) {
        return None;
    }
    let token = user.push_token()?;
    Some(Recipient {
        user_id: id,
        push_token: Some(token.to_string()),
        display_name: user.display_name().map(str::to_string),
    })
}
