//! UserAdmin - アカウント削除（管理者のみ）
//!
//! チェックの順序: 認証 → 管理者ロール → 引数。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::domain::CallError;
use crate::ports::IdentityProvider;

use super::auth::CallerContext;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
}

pub struct UserAdmin {
    identity: Arc<dyn IdentityProvider>,
}

impl UserAdmin {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self { identity }
    }

    pub async fn delete_user(
        &self,
        ctx: &CallerContext,
        uid: &str,
    ) -> Result<DeleteUserResponse, CallError> {
        let requester = ctx.require_auth("Request has no authentication.")?;

        let claims = self
            .identity
            .custom_claims(&requester.uid)
            .await
            .map_err(|e| {
                error!(requester = %requester.uid, error = %e, "failed to load requester claims");
                CallError::internal(e.to_string())
            })?;
        let is_admin = claims
            .as_ref()
            .and_then(|c| c.get("role"))
            .and_then(|role| role.as_str())
            == Some(ADMIN_ROLE);
        if !is_admin {
            warn!(requester = %requester.uid, "non-admin tried to delete a user");
            return Err(CallError::permission_denied("Only admins can delete users."));
        }

        if uid.trim().is_empty() {
            return Err(CallError::invalid_argument("No UID provided."));
        }

        self.identity.delete_user(uid).await.map_err(|e| {
            error!(uid, error = %e, "delete user failed");
            CallError::internal(e.to_string())
        })?;

        info!(requester = %requester.uid, uid, "user deleted");
        Ok(DeleteUserResponse {
            success: true,
            message: "User deleted successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CallErrorCode;
    use crate::impls::InMemoryIdentityProvider;
    use crate::ports::Claims;
    use rstest::rstest;
    use serde_json::json;

    fn claims(role: &str) -> Option<Claims> {
        Some(Claims::from([("role".to_string(), json!(role))]))
    }

    async fn admin() -> (Arc<InMemoryIdentityProvider>, UserAdmin) {
        let identity = Arc::new(InMemoryIdentityProvider::new());
        identity.insert_account("boss", claims("admin")).await;
        identity.insert_account("staff", claims("employee")).await;
        identity.insert_account("plain", None).await;
        identity.insert_account("victim", None).await;
        (identity.clone(), UserAdmin::new(identity))
    }

    #[tokio::test]
    async fn admin_deletes_user() {
        let (identity, admin) = admin().await;
        let response = admin
            .delete_user(&CallerContext::authenticated("boss"), "victim")
            .await
            .unwrap();
        assert!(response.success);
        assert!(!identity.contains("victim").await);
    }

    #[rstest]
    #[case::anonymous(CallerContext::anonymous(), "victim", CallErrorCode::Unauthenticated)]
    #[case::wrong_role(CallerContext::authenticated("staff"), "victim", CallErrorCode::PermissionDenied)]
    #[case::no_claims(CallerContext::authenticated("plain"), "victim", CallErrorCode::PermissionDenied)]
    #[case::empty_uid(CallerContext::authenticated("boss"), "", CallErrorCode::InvalidArgument)]
    #[case::unknown_target(CallerContext::authenticated("boss"), "ghost", CallErrorCode::Internal)]
    #[tokio::test]
    async fn rejected_calls_carry_distinct_codes(
        #[case] ctx: CallerContext,
        #[case] uid: &str,
        #[case] code: CallErrorCode,
    ) {
        let (identity, admin) = admin().await;
        let err = admin.delete_user(&ctx, uid).await.unwrap_err();
        assert_eq!(err.code, code);
        assert!(identity.contains("victim").await);
    }

    #[tokio::test]
    async fn authorization_is_checked_before_arguments() {
        let (_, admin) = admin().await;
        let err = admin
            .delete_user(&CallerContext::authenticated("staff"), "")
            .await
            .unwrap_err();
        assert_eq!(err.code, CallErrorCode::PermissionDenied);
    }
}
