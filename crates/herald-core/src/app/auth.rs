//! 呼び出し元のコンテキスト（リクエスト/レスポンス型の操作用）

use serde::{Deserialize, Serialize};

use crate::domain::CallError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub uid: String,
}

/// `auth` is `None` for unauthenticated calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub auth: Option<AuthInfo>,
}

impl CallerContext {
    pub fn authenticated(uid: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthInfo { uid: uid.into() }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    /// `unauthenticated` with `message` when there is no auth.
    pub fn require_auth(&self, message: &str) -> Result<&AuthInfo, CallError> {
        self.auth
            .as_ref()
            .ok_or_else(|| CallError::unauthenticated(message))
    }
}
