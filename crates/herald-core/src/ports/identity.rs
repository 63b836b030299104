//! IdentityProvider port - 認証基盤（ユーザーアカウントとカスタムクレーム）

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Custom claims attached to an account (e.g. `{"role": "admin"}`).
pub type Claims = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("no account for uid {0}")]
    UnknownUser(String),

    #[error("identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Claims of an existing account; `None` when it has none set.
    async fn custom_claims(&self, uid: &str) -> Result<Option<Claims>, IdentityError>;

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError>;
}
