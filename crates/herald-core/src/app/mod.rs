//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: コンポジションルート
//! - **NotificationReconciler**: 作成イベント → Resolver → Builder → Dispatcher → Recorder
//! - **TriggerLoop**: ChangeFeed を Reconciler に流すループ
//! - **RetentionSweeper / SweepLoop**: 古い通知の定期削除
//! - **SalarySlipService / UserAdmin**: 呼び出し元向けの操作

pub mod admin;
pub mod auth;
pub mod batch;
pub mod builder;
pub mod dispatcher;
pub mod mail_service;
pub mod payload;
pub mod reconciler;
pub mod recorder;
pub mod resolver;
pub mod sweeper;
pub mod transport;
pub mod trigger_loop;

// 主要な型を再エクスポート
pub use self::admin::UserAdmin;
pub use self::auth::{AuthInfo, CallerContext};
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatcher::Dispatcher;
pub use self::mail_service::SalarySlipService;
pub use self::payload::PayloadBuilder;
pub use self::reconciler::{NotificationReconciler, ReconcileReport};
pub use self::recorder::DeliveryRecorder;
pub use self::resolver::RecipientResolver;
pub use self::sweeper::{RetentionSweeper, SweepLoop};
pub use self::transport::LazyHandle;
pub use self::trigger_loop::TriggerLoop;
