//! PushGateway port - モバイル / Web プッシュの送信
//!
//! 1 回の `send` は 1 デバイストークン宛て 1 リクエストです。
//! 成功時はプロバイダのメッセージ ID を返します。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{FailureKind, PlatformEnvelope};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    /// The token is invalid or no longer registered.
    #[error("stale push token: {0}")]
    StaleToken(String),

    #[error("push gateway rejected the message (status {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("push transport error: {0}")]
    Transport(String),

    #[error("push gateway not configured: {0}")]
    Configuration(String),
}

impl PushError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            PushError::StaleToken(_) => FailureKind::StaleToken,
            PushError::Rejected { .. } => FailureKind::Rejected,
            PushError::Transport(_) => FailureKind::Transport,
            PushError::Configuration(_) => FailureKind::Configuration,
        }
    }
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, token: &str, envelope: &PlatformEnvelope) -> Result<String, PushError>;
}
