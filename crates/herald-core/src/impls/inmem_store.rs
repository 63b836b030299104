//! InMemoryDocumentStore - 開発用・テスト用のドキュメントストア
//!
//! # 実装詳細
//! - コレクションごとに HashMap / BTreeMap で保持
//! - tokio::sync::Mutex で排他制御（await を跨いでロックを保持しない）
//! - 通知ドキュメントの作成時に broadcast チャネルへ `StoreEvent` を流す
//! - `fail_writes` で書き込み失敗を再現できる（Recorder / Sweeper のテスト用）

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{
    BulkLogRecord, LogId, LogStatus, NotificationId, NotificationRecord, ProjectId, ProjectRecord,
    SlipLogRecord, UserId, UserRecord,
};
use crate::ports::{ChangeFeed, DocumentStore, StoreError, StoreEvent};

const EVENT_CAPACITY: usize = 1024;

#[derive(Default)]
struct StoreState {
    users: BTreeMap<UserId, UserRecord>,
    projects: HashMap<ProjectId, ProjectRecord>,
    notifications: HashMap<NotificationId, NotificationRecord>,
    settings: HashMap<String, serde_json::Value>,
    slip_logs: Vec<(LogId, SlipLogRecord)>,
    bulk_logs: Vec<(LogId, BulkLogRecord)>,
}

/// Seed file shape: `{"users": {id: {...}}, "projects": {...}, "settings": {...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub users: HashMap<String, UserRecord>,
    #[serde(default)]
    pub projects: HashMap<String, ProjectRecord>,
    #[serde(default)]
    pub notifications: HashMap<String, NotificationRecord>,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

pub struct InMemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
    events: broadcast::Sender<StoreEvent>,
    fail_writes: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_state(StoreState::default())
    }

    /// Build a store from a seed document. Seeded notifications do not emit events.
    pub fn from_seed(seed: StoreSeed) -> Self {
        Self::with_state(StoreState {
            users: seed
                .users
                .into_iter()
                .map(|(id, user)| (UserId::new(id), user))
                .collect(),
            projects: seed
                .projects
                .into_iter()
                .map(|(id, project)| (ProjectId::new(id), project))
                .collect(),
            notifications: seed
                .notifications
                .into_iter()
                .map(|(id, record)| (NotificationId::new(id), record))
                .collect(),
            settings: seed.settings,
            ..StoreState::default()
        })
    }

    fn with_state(state: StoreState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            fail_writes: AtomicBool::new(false),
        }
    }

    pub async fn insert_user(&self, id: impl Into<UserId>, user: UserRecord) {
        self.state.lock().await.users.insert(id.into(), user);
    }

    pub async fn insert_project(&self, id: impl Into<ProjectId>, project: ProjectRecord) {
        self.state.lock().await.projects.insert(id.into(), project);
    }

    pub async fn insert_setting(&self, key: impl Into<String>, value: serde_json::Value) {
        self.state.lock().await.settings.insert(key.into(), value);
    }

    /// Insert a notification without emitting a create event.
    pub async fn insert_notification(&self, id: impl Into<NotificationId>, record: NotificationRecord) {
        self.state.lock().await.notifications.insert(id.into(), record);
    }

    /// Make every subsequent write fail with `Unavailable` until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn notifications(&self) -> Vec<(NotificationId, NotificationRecord)> {
        let state = self.state.lock().await;
        state
            .notifications
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub async fn bulk_logs(&self) -> Vec<(LogId, BulkLogRecord)> {
        self.state.lock().await.bulk_logs.clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes are disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<(UserId, UserRecord)>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .map(|(id, user)| (id.clone(), user.clone()))
            .collect())
    }

    async fn get_project(&self, id: &ProjectId) -> Result<Option<ProjectRecord>, StoreError> {
        Ok(self.state.lock().await.projects.get(id).cloned())
    }

    async fn get_notification(
        &self,
        id: &NotificationId,
    ) -> Result<Option<NotificationRecord>, StoreError> {
        Ok(self.state.lock().await.notifications.get(id).cloned())
    }

    async fn create_notification(
        &self,
        id: &NotificationId,
        record: NotificationRecord,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        {
            let mut state = self.state.lock().await;
            if state.notifications.contains_key(id) {
                return Err(StoreError::AlreadyExists(id.to_string()));
            }
            state.notifications.insert(id.clone(), record);
        }
        // 受信者がいなくても作成は成功扱い
        let _ = self.events.send(StoreEvent::NotificationCreated(id.clone()));
        Ok(())
    }

    async fn mark_notification_sent(
        &self,
        id: &NotificationId,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let record = state
            .notifications
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.sent = true;
        record.sent_at = Some(at);
        Ok(())
    }

    async fn notifications_older_than(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<NotificationId>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .notifications
            .iter()
            .filter(|(_, record)| record.timestamp.is_some_and(|ts| ts < cutoff))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_notifications(&self, ids: &[NotificationId]) -> Result<usize, StoreError> {
        self.check_writable()?;
        // 一つのロック区間で全件削除するので、途中で失敗して半分だけ消えることはない
        let mut state = self.state.lock().await;
        let deleted = ids
            .iter()
            .filter(|id| state.notifications.remove(*id).is_some())
            .count();
        Ok(deleted)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.state.lock().await.settings.get(key).cloned())
    }

    async fn append_slip_log(&self, id: &LogId, record: SlipLogRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.state.lock().await.slip_logs.push((id.clone(), record));
        Ok(())
    }

    async fn append_bulk_log(&self, id: &LogId, record: BulkLogRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.state.lock().await.bulk_logs.push((id.clone(), record));
        Ok(())
    }

    async fn recent_slip_logs(
        &self,
        status: Option<LogStatus>,
        limit: usize,
    ) -> Result<Vec<(LogId, SlipLogRecord)>, StoreError> {
        let state = self.state.lock().await;
        let mut logs: Vec<(LogId, SlipLogRecord)> = state
            .slip_logs
            .iter()
            .filter(|(_, log)| status.is_none_or(|s| log.status == s))
            .cloned()
            .collect();
        // 同時刻なら後から追加したものを先に
        logs.reverse();
        logs.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        logs.truncate(limit);
        Ok(logs)
    }
}

impl ChangeFeed for InMemoryDocumentStore {
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).unwrap()
    }

    fn slip_log(status: LogStatus, ts: DateTime<Utc>) -> SlipLogRecord {
        SlipLogRecord {
            employee_email: "e@example.com".into(),
            employee_name: "E".into(),
            month: None,
            year: None,
            status,
            message_id: None,
            error: None,
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn create_emits_event() {
        let store = InMemoryDocumentStore::new();
        let mut rx = store.subscribe();

        let id = NotificationId::new("n1");
        store
            .create_notification(&id, NotificationRecord::default())
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::NotificationCreated(id));
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = InMemoryDocumentStore::new();
        let id = NotificationId::new("n1");
        store.create_notification(&id, NotificationRecord::default()).await.unwrap();
        let err = store
            .create_notification(&id, NotificationRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn mark_sent_on_missing_record_is_not_found() {
        let store = InMemoryDocumentStore::new();
        let err = store
            .mark_notification_sent(&NotificationId::new("gone"), at(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn older_than_skips_records_without_timestamp() {
        let store = InMemoryDocumentStore::new();
        let old = NotificationRecord {
            timestamp: Some(at(1)),
            ..Default::default()
        };
        store.insert_notification("old", old).await;
        store.insert_notification("undated", NotificationRecord::default()).await;

        let ids = store.notifications_older_than(at(1) + Duration::hours(1)).await.unwrap();
        assert_eq!(ids, vec![NotificationId::new("old")]);
    }

    #[tokio::test]
    async fn failed_grouped_delete_removes_nothing() {
        let store = InMemoryDocumentStore::new();
        store.insert_notification("a", NotificationRecord::default()).await;
        store.insert_notification("b", NotificationRecord::default()).await;

        store.fail_writes(true);
        let ids = [NotificationId::new("a"), NotificationId::new("b")];
        assert!(store.delete_notifications(&ids).await.is_err());
        assert_eq!(store.notifications().await.len(), 2);
    }

    #[tokio::test]
    async fn recent_logs_are_newest_first_and_filtered() {
        let store = InMemoryDocumentStore::new();
        store.append_slip_log(&LogId::new("1"), slip_log(LogStatus::Sent, at(1))).await.unwrap();
        store.append_slip_log(&LogId::new("2"), slip_log(LogStatus::Failed, at(2))).await.unwrap();
        store.append_slip_log(&LogId::new("3"), slip_log(LogStatus::Failed, at(3))).await.unwrap();

        let all = store.recent_slip_logs(None, 2).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);

        let failed = store.recent_slip_logs(Some(LogStatus::Failed), 10).await.unwrap();
        assert_eq!(failed.len(), 2);
    }

    #[test]
    fn seed_loads_collections() {
        let seed: StoreSeed = serde_json::from_value(serde_json::json!({
            "users": {"u1": {"empName": "Asha", "fcmToken": "tok"}},
            "projects": {"p1": {"projectName": "Tower"}},
            "settings": {"salarySlipFormat": {"emailSubject": "Payslip"}},
        }))
        .unwrap();
        let store = InMemoryDocumentStore::from_seed(seed);
        let state = store.state.try_lock().unwrap();
        assert_eq!(state.users.len(), 1);
        assert_eq!(state.projects.len(), 1);
        assert!(state.settings.contains_key("salarySlipFormat"));
    }
}
