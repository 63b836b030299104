//! RetentionSweeper - 古い通知レコードの削除
//!
//! # フロー
//! 1. `timestamp < now - max_age`（strict）のレコードを検索
//! 2. 一回の grouped write でまとめて削除（失敗したら何も消えない、次の実行でやり直し）
//!
//! `SweepLoop` は一定間隔（既定 24 時間）で `sweep` を呼びます。
//! 最初の実行は起動直後ではなく、一周期後です。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{error, info};

use crate::domain::HeraldError;
use crate::ports::{Clock, DocumentStore};

pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

pub struct RetentionSweeper {
    store: Arc<dyn DocumentStore>,
    max_age: chrono::Duration,
}

impl RetentionSweeper {
    pub fn new(store: Arc<dyn DocumentStore>, max_age: chrono::Duration) -> Self {
        Self { store, max_age }
    }

    /// Delete every notification older than `now - max_age`. Returns the deleted count.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, HeraldError> {
        let cutoff = now.checked_sub_signed(self.max_age).ok_or_else(|| {
            HeraldError::Configuration(format!(
                "retention window of {} days reaches past the clock range",
                self.max_age.num_days()
            ))
        })?;
        let expired = self.store.notifications_older_than(cutoff).await?;
        if expired.is_empty() {
            info!(%cutoff, "no expired notifications");
            return Ok(0);
        }

        let deleted = self.store.delete_notifications(&expired).await?;
        info!(%cutoff, deleted, "deleted expired notifications");
        Ok(deleted)
    }
}

/// Periodic sweep task.
/// - `shutdown_and_join()` で停止して終了を待つ
pub struct SweepLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl SweepLoop {
    pub fn spawn(sweeper: Arc<RetentionSweeper>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = ticker.tick() => {}
                }
                // 失敗しても次の周期で最初からやり直す
                if let Err(e) = sweeper.sweep(clock.now()).await {
                    error!(error = %e, kind = ?e.kind(), "retention sweep failed");
                }
            }
        });

        Self { shutdown_tx, join }
    }

    pub async fn shutdown_and_join(self) {
        // ignore send error: the loop may already have exited
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, NotificationId, NotificationRecord};
    use crate::impls::InMemoryDocumentStore;
    use crate::ports::FixedClock;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap()
    }

    fn aged(days: i64) -> NotificationRecord {
        NotificationRecord {
            timestamp: Some(now() - chrono::Duration::days(days)),
            ..NotificationRecord::default()
        }
    }

    fn sweeper(store: Arc<InMemoryDocumentStore>) -> RetentionSweeper {
        RetentionSweeper::new(store, chrono::Duration::days(DEFAULT_MAX_AGE_DAYS))
    }

    #[rstest]
    #[case::older(31, true)]
    #[case::younger(29, false)]
    #[case::exactly_at_cutoff(30, false)]
    #[tokio::test]
    async fn deletes_only_strictly_older(#[case] days: i64, #[case] deleted: bool) {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("n", aged(days)).await;

        let count = sweeper(store.clone()).sweep(now()).await.unwrap();

        assert_eq!(count, usize::from(deleted));
        let remaining = store.get_notification(&NotificationId::new("n")).await.unwrap();
        assert_eq!(remaining.is_none(), deleted);
    }

    #[tokio::test]
    async fn undated_records_are_kept() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("undated", NotificationRecord::default()).await;
        assert_eq!(sweeper(store.clone()).sweep(now()).await.unwrap(), 0);
        assert_eq!(store.notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_leaves_everything_for_next_run() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("a", aged(40)).await;
        store.insert_notification("b", aged(35)).await;
        let sweeper = sweeper(store.clone());

        store.fail_writes(true);
        assert!(sweeper.sweep(now()).await.is_err());
        assert_eq!(store.notifications().await.len(), 2);

        store.fail_writes(false);
        assert_eq!(sweeper.sweep(now()).await.unwrap(), 2);
        assert!(store.notifications().await.is_empty());
    }

    #[tokio::test]
    async fn window_past_clock_range_is_a_configuration_error() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("old", aged(45)).await;
        let sweeper = RetentionSweeper::new(store.clone(), chrono::Duration::days(1_000_000_000));

        let err = sweeper.sweep(now()).await.unwrap_err();

        assert!(matches!(err, HeraldError::Configuration(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(store.notifications().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_keeps_running_after_failed_sweeps() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let sweeper = Arc::new(RetentionSweeper::new(
            store,
            chrono::Duration::days(1_000_000_000),
        ));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        let period = Duration::from_secs(3600);

        let sweep_loop = SweepLoop::spawn(sweeper, clock, period);
        tokio::time::sleep(period * 3).await;

        assert!(!sweep_loop.join.is_finished());
        sweep_loop.shutdown_and_join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn loop_sweeps_each_period_until_shutdown() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.insert_notification("old", aged(45)).await;
        let sweeper = Arc::new(sweeper(store.clone()));
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));

        let sweep_loop = SweepLoop::spawn(sweeper, clock, Duration::from_secs(24 * 3600));

        // nothing happens before the first period elapses
        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(store.notifications().await.len(), 1);

        tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        assert!(store.notifications().await.is_empty());

        sweep_loop.shutdown_and_join().await;
    }
}
