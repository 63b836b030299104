//! MailTransport port - SMTP リレー

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{FailureKind, OutgoingMail};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MailError {
    #[error("mail transport not configured: {0}")]
    Configuration(String),

    #[error("invalid address {0}")]
    InvalidAddress(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("{0}")]
    Delivery(String),
}

impl MailError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            MailError::Configuration(_) => FailureKind::Configuration,
            MailError::InvalidAddress(_) | MailError::Build(_) => FailureKind::InvalidInput,
            MailError::Delivery(_) => FailureKind::Rejected,
        }
    }
}

/// MailTransport は 1 通のメールを送信してメッセージ ID を返す
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError>;
}
