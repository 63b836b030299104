//! Errors - エラー型と分類
//!
//! # ErrorKind（運用分類）
//! - NotFound: アンカーとなるレコードが無い → その intent を黙って中断
//! - MissingAddress: 受信者に push token が無い → スキップ（エラーではない）
//! - Provider: push / mail の送信がプロバイダに拒否された
//! - Configuration: トランスポートを初期化できない → 以降の送信は即座に失敗
//! - Authorization: 呼び出し元が未認証・権限不足
//! - Infrastructure: ドキュメントストアなどの障害
//!
//! イベント起点のハンドラはエラーを呼び出し元へ伝播しません（伝播先が無いため）。
//! リクエスト/レスポンス型の操作は `CallError` を返します。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::outcome::FailureKind;
use crate::ports::{IdentityError, MailError, PushError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    MissingAddress,
    Provider,
    Configuration,
    Authorization,
    Infrastructure,
}

/// HeraldError はドメインエラー
#[derive(Debug, Error)]
pub enum HeraldError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("no push token for user {0}")]
    MissingAddress(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HeraldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HeraldError::NotFound { .. } => ErrorKind::NotFound,
            HeraldError::MissingAddress(_) => ErrorKind::MissingAddress,
            HeraldError::Store(_) | HeraldError::Identity(_) => ErrorKind::Infrastructure,
            HeraldError::Push(PushError::Configuration(_))
            | HeraldError::Mail(MailError::Configuration(_))
            | HeraldError::Configuration(_) => ErrorKind::Configuration,
            HeraldError::Push(_) | HeraldError::Mail(_) => ErrorKind::Provider,
        }
    }

    /// Failure category recorded on a `DispatchOutcome`.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            HeraldError::Push(e) => e.failure_kind(),
            HeraldError::Mail(e) => e.failure_kind(),
            HeraldError::Configuration(_) => FailureKind::Configuration,
            HeraldError::NotFound { .. } | HeraldError::MissingAddress(_) => FailureKind::InvalidInput,
            HeraldError::Store(_) | HeraldError::Identity(_) => FailureKind::Transport,
        }
    }
}

/// Machine-readable category of a caller-facing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallErrorCode {
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    Internal,
}

impl CallErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallErrorCode::Unauthenticated => "unauthenticated",
            CallErrorCode::PermissionDenied => "permission-denied",
            CallErrorCode::InvalidArgument => "invalid-argument",
            CallErrorCode::Internal => "internal",
        }
    }
}

impl fmt::Display for CallErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned by request/response operations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct CallError {
    pub code: CallErrorCode,
    pub message: String,
}

impl CallError {
    pub fn new(code: CallErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(CallErrorCode::Unauthenticated, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(CallErrorCode::PermissionDenied, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(CallErrorCode::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CallErrorCode::Internal, message)
    }
}
