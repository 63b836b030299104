//! TriggerLoop - ChangeFeed の作成イベントを Reconciler に流す
//!
//! ドキュメントストアの「作成トリガー」モデルの再現です。
//! イベントごとに独立したタスクとして処理し（invocation は互いに独立）、
//! 停止時は処理中のタスクの終了を待ちます。

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::ports::{ChangeFeed, StoreEvent};

use super::reconciler::NotificationReconciler;

pub struct TriggerLoop {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TriggerLoop {
    /// Subscribes immediately, so events emitted after `spawn` returns are not missed.
    pub fn spawn(feed: &dyn ChangeFeed, reconciler: Arc<NotificationReconciler>) -> Self {
        let mut events = feed.subscribe();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                let event = tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    event = events.recv() => event,
                };

                match event {
                    Ok(StoreEvent::NotificationCreated(id)) => {
                        let reconciler = Arc::clone(&reconciler);
                        in_flight.spawn(async move {
                            let report = reconciler.on_notification_created(&id).await;
                            debug!(notification = %id, ?report, "trigger handled");
                        });
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "change feed lagged; some create events were dropped");
                    }
                    Err(RecvError::Closed) => break,
                }

                // 終わったタスクを回収しておく
                while in_flight.try_join_next().is_some() {}
            }

            while in_flight.join_next().await.is_some() {}
        });

        Self { shutdown_tx, join }
    }

    pub async fn shutdown_and_join(self) {
        // ignore send error: the loop may already have exited
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}
