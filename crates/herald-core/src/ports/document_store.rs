//! DocumentStore port - マネージドなドキュメントデータベース
//!
//! コレクション単位の型付きメソッドを提供します。読み取りは ID 指定か単純なフィルタ
//! （等価・順序）のみ、書き込みは単一ドキュメントか、まとめて削除する grouped write のみです。
//!
//! # コレクション
//! - `users`, `projects`, `notifications`, `settings`
//! - `salarySlipLogs`, `salarySlipBulkLogs`（append-only）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::domain::{
    BulkLogRecord, LogId, LogStatus, NotificationId, NotificationRecord, ProjectId, ProjectRecord,
    SlipLogRecord, UserId, UserRecord,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("document already exists: {0}")]
    AlreadyExists(String),

    #[error("document store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Full scan of `users`. O(n); there is no membership index.
    async fn list_users(&self) -> Result<Vec<(UserId, UserRecord)>, StoreError>;

    async fn get_project(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, StoreError>;

    async fn get_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<NotificationRecord>, StoreError>;

    async fn create_notification(
        &self,
        id: &NotificationId,
        record: NotificationRecord,
    ) -> Result<(), StoreError>;

    /// Set `sent = true` and `sentAt = at`. Fails with `NotFound` if the record is gone.
    async fn mark_notification_sent(
        &self,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Ids of notifications whose `timestamp` is strictly before `cutoff`.
    async fn notifications_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<NotificationId>, StoreError>;

    /// Delete all given notifications in one atomic grouped write.
    async fn delete_notifications(&self, ids: &[NotificationId]) -> Result<usize, StoreError>;

    /// `settings/{key}` as raw JSON.
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError>;

    async fn append_slip_log(&self, id: &LogId, record: SlipLogRecord) -> Result<(), StoreError>;

    async fn append_bulk_log(&self, id: &LogId, record: BulkLogRecord) -> Result<(), StoreError>;

    /// Newest first, optionally filtered by status.
    async fn recent_slip_logs(
        &self,
        status: Option<LogStatus>,
        limit: usize,
    ) -> Result<Vec<(LogId, SlipLogRecord)>, StoreError>;
}

/// Document-create events, the trigger model of the managed database.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    NotificationCreated(NotificationId),
}

/// ChangeFeed は作成イベントを購読するためのポート
///
/// 購読者ごとに独立した受信側を返します（取りこぼしは `Lagged` として受信側に通知される）。
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
