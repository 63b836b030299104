//! IdGenerator port - ID 生成の抽象化
//!
//! Herald が自分で作るドキュメント（展開された通知、送信ログ）の ID を生成します。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{LogId, NotificationId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はドキュメント ID を生成
///
/// # ULID の特性
/// - 時刻でソート可能（ログを作成順に並べられる）
/// - 分散環境で生成可能（調整不要）
///
/// # Thread Safety
/// - `Send + Sync` を要求（並行する invocation から使える）
pub trait IdGenerator: Send + Sync {
    fn generate_notification_id(&self) -> NotificationId;

    fn generate_log_id(&self) -> LogId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って timestamp 部分を決めるので、FixedClock と組み合わせると
/// timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_notification_id(&self) -> NotificationId {
        NotificationId::new(self.next().to_string())
    }

    fn generate_log_id(&self) -> LogId {
        LogId::new(self.next().to_string())
    }
}
