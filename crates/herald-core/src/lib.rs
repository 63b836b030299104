//! herald-core
//!
//! Push-notification and email relay for a project-management app.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, records, intent, envelope, mail, outcome, errors）
//! - **ports**: 抽象化レイヤー（DocumentStore, PushGateway, MailTransport, IdentityProvider, Clock）
//! - **impls**: 実装（FCM, SMTP, 開発・テスト用のインメモリ実装）
//! - **app**: アプリケーションロジック（reconciler, sweeper, mail service, builder）
//! - **config**: `herald.toml` と環境変数による設定
//! - **observability**: tracing の初期化とトークンのマスク

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
