//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ドキュメントストア、プッシュゲートウェイ、SMTP リレー、
//! 認証基盤）へのインターフェースで、実装の詳細は `impls` に隠蔽します。

pub mod clock;
pub mod document_store;
pub mod id_generator;
pub mod identity;
pub mod mail_transport;
pub mod push_gateway;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::document_store::{ChangeFeed, DocumentStore, StoreError, StoreEvent};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::identity::{Claims, IdentityError, IdentityProvider};
pub use self::mail_transport::{MailError, MailTransport};
pub use self::push_gateway::{PushError, PushGateway};
