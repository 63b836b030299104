//! DeliveryRecorder - 送信結果の記録
//!
//! - `record_direct`: 成功した通知に `sent = true` / `sentAt = now` を立てる（べき等）
//! - `record_email`: メール 1 通ごとに `salarySlipLogs` へ追記
//! - `record_bulk`: 一括送信 1 回ごとに `salarySlipBulkLogs` へサマリを追記
//!
//! いずれも best-effort：書き込み失敗はログに残して受け入れます（送信はもう終わっているため）。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::{
    BatchResult, BulkLogRecord, DispatchOutcome, LogStatus, NotificationId, SlipLogRecord,
};
use crate::ports::{Clock, DocumentStore, IdGenerator};

/// One logical email send, as written to the send log.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailAttempt {
    pub employee_email: String,
    pub employee_name: String,
    pub month: Option<String>,
    pub year: Option<String>,
    pub outcome: DispatchOutcome,
}

pub struct DeliveryRecorder {
    store: Arc<dyn DocumentStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl DeliveryRecorder {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, ids, clock }
    }

    /// Returns whether the record was marked. Failed outcomes are not recorded.
    pub async fn record_direct(&self, id: &NotificationId, outcome: &DispatchOutcome) -> bool {
        if !outcome.is_sent() {
            return false;
        }
        match self.store.mark_notification_sent(id, self.clock.now()).await {
            Ok(()) => {
                debug!(notification = %id, "marked sent");
                true
            }
            Err(e) => {
                warn!(notification = %id, error = %e, "failed to mark notification sent");
                false
            }
        }
    }

    pub async fn record_email(&self, attempt: &EmailAttempt) {
        let outcome = &attempt.outcome;
        let record = SlipLogRecord {
            employee_email: attempt.employee_email.clone(),
            employee_name: attempt.employee_name.clone(),
            month: attempt.month.clone(),
            year: attempt.year.clone(),
            status: if outcome.is_sent() {
                LogStatus::Sent
            } else {
                LogStatus::Failed
            },
            message_id: outcome.provider_message_id().map(str::to_string),
            error: outcome.error_detail().map(str::to_string),
            timestamp: self.clock.now(),
        };

        let id = self.ids.generate_log_id();
        if let Err(e) = self.store.append_slip_log(&id, record).await {
            warn!(to = %attempt.employee_email, error = %e, "failed to append salary slip log");
        }
    }

    pub async fn record_bulk(&self, total: usize, result: &BatchResult) {
        let record = BulkLogRecord {
            total_count: total,
            success_count: result.sent.len(),
            failure_count: result.failed.len(),
            results: result.clone(),
            timestamp: self.clock.now(),
        };

        let id = self.ids.generate_log_id();
        if let Err(e) = self.store.append_bulk_log(&id, record).await {
            warn!(error = %e, "failed to append bulk log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, NotificationRecord};
    use crate::impls::InMemoryDocumentStore;
    use crate::ports::{FixedClock, UlidGenerator};
    use chrono::{DateTime, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn recorder(store: Arc<InMemoryDocumentStore>) -> DeliveryRecorder {
        let clock = Arc::new(FixedClock::new(now()));
        DeliveryRecorder::new(store, Arc::new(UlidGenerator::new(clock.clone())), clock)
    }

    #[tokio::test]
    async fn mark_sent_twice_is_safe() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("n1", NotificationRecord::default()).await;
        let recorder = recorder(store.clone());
        let id = NotificationId::new("n1");
        let outcome = DispatchOutcome::sent("r1", "m1");

        assert!(recorder.record_direct(&id, &outcome).await);
        assert!(recorder.record_direct(&id, &outcome).await);

        let record = store.get_notification(&id).await.unwrap().unwrap();
        assert!(record.sent);
        assert_eq!(record.sent_at, Some(now()));
    }

    #[tokio::test]
    async fn failed_outcome_is_not_marked() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("n1", NotificationRecord::default()).await;
        let recorder = recorder(store.clone());
        let id = NotificationId::new("n1");

        let outcome = DispatchOutcome::failed("r1", FailureKind::StaleToken, "unregistered");
        assert!(!recorder.record_direct(&id, &outcome).await);
        assert!(!store.get_notification(&id).await.unwrap().unwrap().sent);
    }

    #[tokio::test]
    async fn mark_sent_on_deleted_record_is_accepted() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let recorder = recorder(store);
        let outcome = DispatchOutcome::sent("r1", "m1");
        assert!(!recorder.record_direct(&NotificationId::new("gone"), &outcome).await);
    }

    #[tokio::test]
    async fn email_attempts_are_logged_with_status() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let recorder = recorder(store.clone());

        recorder
            .record_email(&EmailAttempt {
                employee_email: "a@example.com".into(),
                employee_name: "A".into(),
                month: Some("3".into()),
                year: Some("2025".into()),
                outcome: DispatchOutcome::failed("a@example.com", FailureKind::Rejected, "550"),
            })
            .await;

        let logs = store.recent_slip_logs(None, 10).await.unwrap();
        assert_eq!(logs.len(), 1);
        let log = &logs[0].1;
        assert_eq!(log.status, LogStatus::Failed);
        assert_eq!(log.error.as_deref(), Some("550"));
        assert_eq!(log.message_id, None);
    }

    #[tokio::test]
    async fn log_write_failure_is_swallowed() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.fail_writes(true);
        let recorder = recorder(store.clone());
        recorder.record_bulk(0, &BatchResult::new()).await;
        assert!(store.bulk_logs().await.is_empty());
    }
}
