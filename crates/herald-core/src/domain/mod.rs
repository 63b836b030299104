//! Domain model (ids, records, intents, envelopes, outcomes, errors).
//!
//! ドメイン層は外部システムを知りません。ドキュメントストアやプロバイダとのやりとりは
//! `ports` を経由します。

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod intent;
pub mod mail;
pub mod outcome;
pub mod records;

pub use self::envelope::PlatformEnvelope;
pub use self::errors::{CallError, CallErrorCode, ErrorKind, HeraldError};
pub use self::ids::{LogId, NotificationId, ProjectId, UserId};
pub use self::intent::{
    Audience, IntentKind, MaterializedIntent, NotificationIntent, Recipient, RecordShape,
    RoutingMetadata,
};
pub use self::mail::{
    BulkSlipRequest, CustomEmailRequest, EmployeeSlip, EncodedAttachment, MailAttachment,
    OutgoingMail, SalarySlipRequest, SlipFormat,
};
pub use self::outcome::{BatchResult, DispatchOutcome, DispatchStatus, FailureKind};
pub use self::records::{
    BulkLogRecord, LogStatus, NotificationRecord, ProjectMessage, ProjectRecord, SlipLogRecord,
    UserRecord,
};
