//! InMemoryIdentityProvider - アカウントとカスタムクレームの簡易実装

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{Claims, IdentityError, IdentityProvider};

#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Option<Claims>>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_account(&self, uid: impl Into<String>, claims: Option<Claims>) {
        self.accounts.lock().await.insert(uid.into(), claims);
    }

    pub async fn contains(&self, uid: &str) -> bool {
        self.accounts.lock().await.contains_key(uid)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn custom_claims(&self, uid: &str) -> Result<Option<Claims>, IdentityError> {
        self.accounts
            .lock()
            .await
            .get(uid)
            .cloned()
            .ok_or_else(|| IdentityError::UnknownUser(uid.to_string()))
    }

    async fn delete_user(&self, uid: &str) -> Result<(), IdentityError> {
        self.accounts
            .lock()
            .await
            .remove(uid)
            .map(|_| ())
            .ok_or_else(|| IdentityError::UnknownUser(uid.to_string()))
    }
}
