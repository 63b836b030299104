//! NotificationReconciler - イベント 1 件を配送まで運ぶ
//!
//! # フロー
//! - 通知レコード作成: 読み取り → 分類 → Resolver → Builder → Dispatcher → Recorder
//! - プロジェクトチャット投稿: Resolver（broadcast）→ plan_broadcast → materialize
//!
//! # エラー方針
//! イベント起点なので呼び出し元へエラーを返しません。
//! 結果は `ReconcileReport` として返し（ログとテスト用）、失敗はログに残して終わります。

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::{
    DispatchOutcome, NotificationId, NotificationIntent, ProjectId, ProjectMessage, Recipient,
};
use crate::ports::DocumentStore;

use super::dispatcher::{Dispatcher, MaterializeReport};
use super::payload::PayloadBuilder;
use super::recorder::DeliveryRecorder;
use super::resolver::RecipientResolver;

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileReport {
    /// One push attempt was made.
    Dispatched { outcome: DispatchOutcome, recorded: bool },
    /// Broadcast planned and materialized into direct records.
    Materialized(MaterializeReport),
    /// The anchor record is gone.
    NotFound,
    /// Already delivered by an earlier trigger.
    AlreadySent,
    /// Neither `receiverId` nor `userId`.
    Ignored,
    /// Receiver missing or without a push token.
    NoRecipient,
    /// A store lookup failed; nothing was sent.
    Aborted(String),
}

pub struct NotificationReconciler {
    store: Arc<dyn DocumentStore>,
    resolver: RecipientResolver,
    builder: PayloadBuilder,
    dispatcher: Dispatcher,
    recorder: DeliveryRecorder,
}

impl NotificationReconciler {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        resolver: RecipientResolver,
        builder: PayloadBuilder,
        dispatcher: Dispatcher,
        recorder: DeliveryRecorder,
    ) -> Self {
        Self {
            store,
            resolver,
            builder,
            dispatcher,
            recorder,
        }
    }

    pub async fn on_notification_created(&self, id: &NotificationId) -> ReconcileReport {
        let record = match self.store.get_notification(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(notification = %id, "notification vanished before delivery");
                return ReconcileReport::NotFound;
            }
            Err(e) => {
                error!(notification = %id, error = %e, "failed to read notification");
                return ReconcileReport::Aborted(e.to_string());
            }
        };
        if record.sent {
            debug!(notification = %id, "already sent");
            return ReconcileReport::AlreadySent;
        }

        let Some(intent) = NotificationIntent::from_record(&record) else {
            info!(notification = %id, "notification has no receiver, ignoring");
            return ReconcileReport::Ignored;
        };

        let recipients = match self.resolver.resolve(&intent).await {
            Ok(recipients) => recipients,
            Err(e) => {
                error!(notification = %id, error = %e, kind = ?e.kind(), "recipient lookup failed");
                return ReconcileReport::Aborted(e.to_string());
            }
        };
        let Some(recipient) = recipients.into_iter().next() else {
            info!(notification = %id, receiver = ?intent.receiver(), "no deliverable recipient");
            return ReconcileReport::NoRecipient;
        };

        let intent = match self.resolver.sender_name(&intent).await {
            Ok(name) => intent.with_sender_name(name),
            Err(e) => {
                error!(notification = %id, error = %e, kind = ?e.kind(), "sender lookup failed");
                return ReconcileReport::Aborted(e.to_string());
            }
        };

        self.deliver(id, &intent, &recipient).await
    }

    async fn deliver(
        &self,
        id: &NotificationId,
        intent: &NotificationIntent,
        recipient: &Recipient,
    ) -> ReconcileReport {
        let envelope = self.builder.build(intent, recipient);
        let Some(outcome) = self.dispatcher.dispatch_direct(recipient, &envelope).await else {
            return ReconcileReport::NoRecipient;
        };
        let recorded = self.recorder.record_direct(id, &outcome).await;
        ReconcileReport::Dispatched { outcome, recorded }
    }

    pub async fn on_project_message(
        &self,
        project: &ProjectId,
        message: &ProjectMessage,
    ) -> ReconcileReport {
        let intent = NotificationIntent::from_project_message(project.clone(), message);

        let audience = match self
            .resolver
            .resolve_broadcast(project, intent.sender_id.as_ref())
            .await
        {
            Ok(Some(audience)) => audience,
            Ok(None) => {
                debug!(project = %project, "project not found");
                return ReconcileReport::NotFound;
            }
            Err(e) => {
                error!(project = %project, error = %e, kind = ?e.kind(), "broadcast lookup failed");
                return ReconcileReport::Aborted(e.to_string());
            }
        };

        let intent = match self.resolver.sender_name(&intent).await {
            Ok(name) => intent.with_sender_name(name),
            Err(e) => {
                error!(project = %project, error = %e, kind = ?e.kind(), "sender lookup failed");
                return ReconcileReport::Aborted(e.to_string());
            }
        };

        let plan = self.dispatcher.plan_broadcast(&intent, &audience);
        let planned = plan.len();
        let report = self.dispatcher.materialize(plan).await;
        if report.failed > 0 {
            warn!(project = %project, planned, failed = report.failed, "broadcast partially materialized");
        } else {
            info!(project = %project, created = report.created, "broadcast materialized");
        }
        ReconcileReport::Materialized(report)
    }
}
