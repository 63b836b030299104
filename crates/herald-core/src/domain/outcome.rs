//! Outcome model: the result of one send attempt and of a fan-out.
//!
//! This module is transport-agnostic: the same shape records a push to a
//! device token and an email to an address.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Sent,
    Failed,
}

/// Why a send failed. `StaleToken` lets callers plan token invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StaleToken,
    Rejected,
    Transport,
    Configuration,
    InvalidInput,
}

/// Result of one send attempt.
///
/// `provider_message_id` is present iff `status == Sent`;
/// `error_detail` / `failure` are present iff `status == Failed`.
/// The constructors are the only way to build one, which keeps that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    recipient_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    recipient_name: Option<String>,

    status: DispatchStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    provider_message_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
}

impl DispatchOutcome {
    pub fn sent(recipient_id: impl Into<String>, provider_message_id: impl Into<String>) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            recipient_name: None,
            status: DispatchStatus::Sent,
            provider_message_id: Some(provider_message_id.into()),
            error_detail: None,
            failure: None,
        }
    }

    pub fn failed(
        recipient_id: impl Into<String>,
        failure: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            recipient_id: recipient_id.into(),
            recipient_name: None,
            status: DispatchStatus::Failed,
            provider_message_id: None,
            error_detail: Some(detail.into()),
            failure: Some(failure),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.recipient_name = Some(name.into());
        self
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    pub fn recipient_name(&self) -> Option<&str> {
        self.recipient_name.as_deref()
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn is_sent(&self) -> bool {
        self.status == DispatchStatus::Sent
    }

    pub fn provider_message_id(&self) -> Option<&str> {
        self.provider_message_id.as_deref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }
}

/// Aggregated outcomes of a fan-out.
///
/// Owned by the call that produced it; returned to the caller and then persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub sent: Vec<DispatchOutcome>,
    pub failed: Vec<DispatchOutcome>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: DispatchOutcome) {
        match outcome.status() {
            DispatchStatus::Sent => self.sent.push(outcome),
            DispatchStatus::Failed => self.failed.push(outcome),
        }
    }

    pub fn total(&self) -> usize {
        self.sent.len() + self.failed.len()
    }

    pub fn summary(&self) -> String {
        format!("Sent: {}, Failed: {}", self.sent.len(), self.failed.len())
    }
}

impl FromIterator<DispatchOutcome> for BatchResult {
    fn from_iter<I: IntoIterator<Item = DispatchOutcome>>(iter: I) -> Self {
        let mut result = BatchResult::new();
        for outcome in iter {
            result.push(outcome);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_keep_fields_exclusive() {
        let ok = DispatchOutcome::sent("u1", "projects/p/messages/1");
        assert!(ok.is_sent());
        assert_eq!(ok.provider_message_id(), Some("projects/p/messages/1"));
        assert_eq!(ok.error_detail(), None);

        let ko = DispatchOutcome::failed("u2", FailureKind::StaleToken, "unregistered");
        assert!(!ko.is_sent());
        assert_eq!(ko.provider_message_id(), None);
        assert_eq!(ko.failure(), Some(FailureKind::StaleToken));
    }

    #[test]
    fn batch_result_partitions_by_status() {
        let result: BatchResult = vec![
            DispatchOutcome::sent("a", "1"),
            DispatchOutcome::failed("b", FailureKind::Rejected, "nope"),
            DispatchOutcome::sent("c", "2"),
        ]
        .into_iter()
        .collect();

        assert_eq!(result.sent.len(), 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.total(), 3);
        assert_eq!(result.summary(), "Sent: 2, Failed: 1");
    }

    #[test]
    fn failure_kind_serializes_snake_case() {
        let s = serde_json::to_string(&FailureKind::StaleToken).unwrap();
        assert_eq!(s, "\"stale_token\"");
    }
}
