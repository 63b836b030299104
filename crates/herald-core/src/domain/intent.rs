//! NotificationIntent - 「誰かに通知したい」という論理的な要求
//!
//! 上流イベント（通知ドキュメントの作成、プロジェクトチャットへの投稿）から作られ、
//! Reconciler が一度だけ読みます。
//!
//! # Audience
//! - `Direct`: 受信者 1 名（チャット通知・アプリ通知）
//! - `Broadcast`: プロジェクト単位のファンアウト（materialization 経由で Direct に分解）
//!
//! `receiverId` と `broadcastScope` の「どちらか一方だけ」という制約は enum で表現しています。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ids::{NotificationId, ProjectId, UserId};
use super::records::{NotificationRecord, ProjectMessage, non_blank};

/// Opaque key/value data for client-side deep-linking. Never interpreted here.
pub type RoutingMetadata = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum Audience {
    Direct(UserId),
    Broadcast(ProjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Personal,
    Project,
    General,
}

impl IntentKind {
    /// Chat records store `chatType`; anything but `"project"` is a personal chat.
    pub fn from_chat_type(chat_type: Option<&str>) -> Self {
        match chat_type {
            Some("project") => IntentKind::Project,
            _ => IntentKind::Personal,
        }
    }
}

/// Which of the two `notifications` shapes a record has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// Has `receiverId`.
    Chat,
    /// Has `userId` and no `receiverId`.
    App,
}

impl RecordShape {
    /// Classify a created record. `receiverId` wins, so a record is never
    /// handled twice; records with neither id are not ours to deliver.
    pub fn classify(record: &NotificationRecord) -> Option<Self> {
        if non_blank(record.receiver_id.as_deref()).is_some() {
            Some(RecordShape::Chat)
        } else if non_blank(record.user_id.as_deref()).is_some() {
            Some(RecordShape::App)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub audience: Audience,
    pub kind: IntentKind,

    #[serde(default)]
    pub sender_id: Option<UserId>,

    /// Resolved lazily from the sender's user record when absent.
    #[serde(default)]
    pub sender_display_name: Option<String>,

    /// Explicit title (app notifications only).
    #[serde(default)]
    pub title: Option<String>,

    pub body_text: String,

    /// Scope name for project titles; the builder falls back to a placeholder.
    #[serde(default)]
    pub scope_name: Option<String>,

    #[serde(default)]
    pub routing: RoutingMetadata,
}

impl NotificationIntent {
    pub fn direct(receiver: UserId, kind: IntentKind, body_text: impl Into<String>) -> Self {
        Self {
            audience: Audience::Direct(receiver),
            kind,
            sender_id: None,
            sender_display_name: None,
            title: None,
            body_text: body_text.into(),
            scope_name: None,
            routing: RoutingMetadata::new(),
        }
    }

    pub fn broadcast(scope: ProjectId, body_text: impl Into<String>) -> Self {
        Self {
            audience: Audience::Broadcast(scope),
            kind: IntentKind::Project,
            sender_id: None,
            sender_display_name: None,
            title: None,
            body_text: body_text.into(),
            scope_name: None,
            routing: RoutingMetadata::new(),
        }
    }

    pub fn with_sender(mut self, sender: UserId) -> Self {
        self.sender_id = Some(sender);
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_display_name = Some(name.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_scope_name(mut self, scope_name: impl Into<String>) -> Self {
        self.scope_name = Some(scope_name.into());
        self
    }

    pub fn with_route(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.routing.insert(key.into(), value.into());
        self
    }

    /// Build the intent for a created `notifications` record.
    ///
    /// Returns `None` for records that carry neither `receiverId` nor `userId`.
    pub fn from_record(record: &NotificationRecord) -> Option<Self> {
        match RecordShape::classify(record)? {
            RecordShape::Chat => Some(Self::from_chat_record(record)),
            RecordShape::App => Some(Self::from_app_record(record)),
        }
    }

    fn from_chat_record(record: &NotificationRecord) -> Self {
        let receiver = UserId::new(record.receiver_id.clone().unwrap_or_default());
        let chat_type = record.chat_type.as_deref().unwrap_or("personal");
        let kind = IntentKind::from_chat_type(Some(chat_type));

        let mut intent = Self::direct(receiver, kind, record.message.clone().unwrap_or_default())
            .with_route("chatType", chat_type);
        if let Some(chat_id) = record.chat_id.as_deref() {
            intent = intent.with_route("chatId", chat_id);
        }
        if let Some(sender) = non_blank(record.sender_id.as_deref()) {
            intent = intent.with_sender(UserId::new(sender));
        }
        if let Some(scope_name) = non_blank(record.scope_name.as_deref()) {
            intent = intent.with_scope_name(scope_name);
        }
        intent
    }

    fn from_app_record(record: &NotificationRecord) -> Self {
        let receiver = UserId::new(record.user_id.clone().unwrap_or_default());
        let kind_label = non_blank(record.kind.as_deref()).unwrap_or("general");

        let mut intent = Self::direct(
            receiver,
            IntentKind::General,
            record.body.clone().unwrap_or_default(),
        )
        .with_route("type", kind_label)
        .with_route("taskId", record.task_id.clone().unwrap_or_default())
        .with_route("teamId", record.team_id.clone().unwrap_or_default())
        .with_route("isAppNotification", "true");
        if let Some(title) = non_blank(record.title.as_deref()) {
            intent = intent.with_title(title);
        }
        if let Some(sender) = non_blank(record.sender_id.as_deref()) {
            intent = intent.with_sender(UserId::new(sender));
        }
        intent
    }

    /// Build the broadcast intent for a project chat message.
    pub fn from_project_message(project: ProjectId, message: &ProjectMessage) -> Self {
        let mut intent = Self::broadcast(project, message.text.clone().unwrap_or_default());
        if let Some(sender) = non_blank(message.sender_id.as_deref()) {
            intent = intent.with_sender(UserId::new(sender));
        }
        if let Some(name) = non_blank(message.sender_name.as_deref()) {
            intent = intent.with_sender_name(name);
        }
        intent
    }

    pub fn receiver(&self) -> Option<&UserId> {
        match &self.audience {
            Audience::Direct(user) => Some(user),
            Audience::Broadcast(_) => None,
        }
    }

    pub fn scope(&self) -> Option<&ProjectId> {
        match &self.audience {
            Audience::Direct(_) => None,
            Audience::Broadcast(project) => Some(project),
        }
    }
}

/// A resolved delivery target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: UserId,

    /// Absent tokens are filtered out by the resolver, so dispatch never sees `None`.
    pub push_token: Option<String>,

    pub display_name: Option<String>,
}

/// A direct notification record to be created for one broadcast recipient.
///
/// Delivery is deferred to the reconciler re-triggering on the new record.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedIntent {
    pub id: NotificationId,
    pub receiver: UserId,
    pub record: NotificationRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> NotificationRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn chat_record_becomes_direct_intent() {
        let intent = NotificationIntent::from_record(&record(json!({
            "senderId": "s1",
            "receiverId": "r1",
            "message": "hello",
            "chatId": "c1",
        })))
        .unwrap();

        assert_eq!(intent.receiver(), Some(&UserId::new("r1")));
        assert_eq!(intent.kind, IntentKind::Personal);
        assert_eq!(intent.body_text, "hello");
        assert_eq!(intent.routing.get("chatId").map(String::as_str), Some("c1"));
        assert_eq!(intent.routing.get("chatType").map(String::as_str), Some("personal"));
        assert_eq!(intent.sender_id, Some(UserId::new("s1")));
    }

    #[test]
    fn app_record_becomes_general_intent() {
        let intent = NotificationIntent::from_record(&record(json!({
            "userId": "u1",
            "title": "Task assigned",
            "body": "Please review",
            "type": "task",
            "taskId": "t9",
        })))
        .unwrap();

        assert_eq!(intent.kind, IntentKind::General);
        assert_eq!(intent.title.as_deref(), Some("Task assigned"));
        assert_eq!(intent.routing["type"], "task");
        assert_eq!(intent.routing["taskId"], "t9");
        assert_eq!(intent.routing["teamId"], "");
        assert_eq!(intent.routing["isAppNotification"], "true");
    }

    #[test]
    fn receiver_id_wins_over_user_id() {
        let r = record(json!({"receiverId": "r1", "userId": "u1"}));
        assert_eq!(RecordShape::classify(&r), Some(RecordShape::Chat));
    }

    #[test]
    fn record_without_any_receiver_is_ignored() {
        assert!(NotificationIntent::from_record(&record(json!({"message": "x"}))).is_none());
    }

    #[test]
    fn project_message_becomes_broadcast() {
        let message = ProjectMessage {
            sender_id: Some("s1".into()),
            sender_name: None,
            text: Some("standup in 5".into()),
        };
        let intent = NotificationIntent::from_project_message(ProjectId::new("p1"), &message);
        assert_eq!(intent.scope(), Some(&ProjectId::new("p1")));
        assert_eq!(intent.kind, IntentKind::Project);
        assert_eq!(intent.sender_display_name, None);
    }
}
