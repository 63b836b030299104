//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryDocumentStore**: 開発用・テスト用のドキュメントストア（ChangeFeed 付き）
//! - **InMemoryPushGateway / InMemoryMailTransport**: `--dry-run` とテスト用
//! - **InMemoryIdentityProvider**: テスト用の認証基盤
//! - **FcmGateway**: FCM HTTP v1（reqwest）
//! - **SmtpMailTransport**: SMTP リレー（lettre）

pub mod fcm;
pub mod inmem_identity;
pub mod inmem_mail;
pub mod inmem_push;
pub mod inmem_store;
pub mod smtp;

pub use self::fcm::FcmGateway;
pub use self::inmem_identity::InMemoryIdentityProvider;
pub use self::inmem_mail::InMemoryMailTransport;
pub use self::inmem_push::{InMemoryPushGateway, SentPush};
pub use self::inmem_store::{InMemoryDocumentStore, StoreSeed};
pub use self::smtp::SmtpMailTransport;
