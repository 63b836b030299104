//! Domain identifiers (strongly-typed document ids).
//!
//! ドキュメント ID は外部（クライアント・ドキュメントストア）で採番されることが多いため、
//! 中身は文字列のまま保持します。Herald 自身が作るレコード（展開された通知、送信ログ）は
//! `IdGenerator` が ULID 文字列で採番します。
//!
//! ## Phantom Type パターン
//! `Id<T>` は共通実装を一つにまとめつつ、`T`（PhantomData のマーカー型）で
//! `UserId` と `NotificationId` のような取り違えをコンパイル時に防ぎます。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// `kind()` はログ出力や NotFound エラーで使う種別名です。
pub trait IdMarker: Send + Sync + 'static {
    fn kind() -> &'static str;
}

/// ジェネリック ID 型
///
/// シリアライズ時は素の文字列になります（`#[serde(transparent)]`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum User {}

impl IdMarker for User {
    fn kind() -> &'static str {
        "user"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Notification {}

impl IdMarker for Notification {
    fn kind() -> &'static str {
        "notification"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Project {}

impl IdMarker for Project {
    fn kind() -> &'static str {
        "project"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogEntry {}

impl IdMarker for LogEntry {
    fn kind() -> &'static str {
        "log"
    }
}

/// Identifier of a user document (`users/{id}`).
pub type UserId = Id<User>;

/// Identifier of a notification document (`notifications/{id}`).
pub type NotificationId = Id<Notification>;

/// Identifier of a project document; also the broadcast scope of project chats.
pub type ProjectId = Id<Project>;

/// Identifier of an append-only log document.
pub type LogId = Id<LogEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = UserId::new("u-42");
        let s = serde_json::to_string(&id).unwrap();
        assert_eq!(s, "\"u-42\"");

        let back: UserId = serde_json::from_str(&s).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn kind_comes_from_marker() {
        assert_eq!(UserId::new("a").kind(), "user");
        assert_eq!(NotificationId::new("a").kind(), "notification");
        assert_eq!(ProjectId::new("a").kind(), "project");
        // let _: UserId = ProjectId::new("a"); // <- does not compile
    }

    #[test]
    fn blank_ids_are_detected() {
        assert!(UserId::new("  ").is_blank());
        assert!(!UserId::new("x").is_blank());
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;
        assert_eq!(size_of::<UserId>(), size_of::<String>());
    }
}
