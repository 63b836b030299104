//! Persisted record shapes.
//!
//! These mirror the documents the mobile / web clients write, so field names
//! stay camelCase on the wire. Most fields are optional because several
//! generations of clients write slightly different shapes into the same
//! collections (`receiverId` vs `userId`, `message` vs `body`, `name` vs `empName`).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::outcome::BatchResult;

/// `users/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emp_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcm_token: Option<String>,
}

impl UserRecord {
    /// `empName` wins over the legacy `name` field; blank strings count as absent.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(self.emp_name.as_deref()).or_else(|| non_blank(self.name.as_deref()))
    }

    pub fn push_token(&self) -> Option<&str> {
        non_blank(self.fcm_token.as_deref())
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }
}

/// `projects/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

impl ProjectRecord {
    pub fn name(&self) -> Option<&str> {
        non_blank(self.project_name.as_deref())
    }
}

/// `project_chats/{projectId}/messages/{messageId}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMessage {
    #[serde(default)]
    pub sender_id: Option<String>,

    #[serde(default)]
    pub sender_name: Option<String>,

    #[serde(default)]
    pub text: Option<String>,
}

/// `notifications/{id}`
///
/// Two shapes share this collection:
/// - chat notifications (`receiverId`, `message`, `chatType`, `chatId`)
/// - app notifications (`userId`, `title`, `body`, `type`, `taskId`, `teamId`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,

    /// Written on materialized project notifications so the direct pass can
    /// render the real project name instead of the placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_name: Option<String>,

    #[serde(default)]
    pub read: bool,

    #[serde(default)]
    pub sent: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    /// Records without a timestamp never match an age filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Per-send log status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Sent,
    Failed,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogStatus::Sent => f.write_str("sent"),
            LogStatus::Failed => f.write_str("failed"),
        }
    }
}

/// `salarySlipLogs/{id}`: one per logical send attempt, append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipLogRecord {
    pub employee_email: String,
    pub employee_name: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub month: Option<String>,

    #[serde(default, deserialize_with = "string_or_number")]
    pub year: Option<String>,

    pub status: LogStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// `salarySlipBulkLogs/{id}`: one summary per bulk call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkLogRecord {
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: BatchResult,
    pub timestamp: DateTime<Utc>,
}

/// Clients send `month` / `year` either as numbers or strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.trim().is_empty())
}
