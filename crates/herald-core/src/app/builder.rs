//! AppBuilder - アプリケーションの構築とワイヤリング（コンポジションルート）
//!
//! # 設計原則
//! - 設定は build() 時に検証する（Fail-fast）
//! - トランスポートはここで LazyHandle に包んで注入する
//!   （資格情報が無くても build() は成功し、最初の送信で設定エラーになる）
//! - テストや dry-run ではインメモリ実装を `with_*` で差し込む

use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, Settings};
use crate::impls::{FcmGateway, InMemoryIdentityProvider, SmtpMailTransport};
use crate::ports::{
    Clock, DocumentStore, IdGenerator, IdentityProvider, MailTransport, PushGateway, SystemClock,
    UlidGenerator,
};

use super::admin::UserAdmin;
use super::dispatcher::Dispatcher;
use super::mail_service::SalarySlipService;
use super::payload::PayloadBuilder;
use super::reconciler::NotificationReconciler;
use super::recorder::DeliveryRecorder;
use super::resolver::RecipientResolver;
use super::sweeper::RetentionSweeper;
use super::transport::LazyHandle;

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(settings)
///     .with_store(store)
///     .with_push(Arc::new(InMemoryPushGateway::new()))
///     .build()?;
/// ```
pub struct AppBuilder {
    settings: Settings,
    store: Option<Arc<dyn DocumentStore>>,
    clock: Option<Arc<dyn Clock>>,
    push: Option<Arc<dyn PushGateway>>,
    mail: Option<Arc<dyn MailTransport>>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no document store was provided")]
    MissingStore,

    #[error(transparent)]
    InvalidSettings(#[from] ConfigError),
}

impl AppBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            store: None,
            clock: None,
            push: None,
            mail: None,
            identity: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to `SystemClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Replaces the FCM gateway.
    pub fn with_push(mut self, push: Arc<dyn PushGateway>) -> Self {
        self.push = Some(push);
        self
    }

    /// Replaces the SMTP transport.
    pub fn with_mail(mut self, mail: Arc<dyn MailTransport>) -> Self {
        self.mail = Some(mail);
        self
    }

    /// Defaults to an empty in-memory identity provider.
    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.settings.validate()?;
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(clock.clone()));
        let settings = self.settings;

        let push: Arc<LazyHandle<dyn PushGateway>> = Arc::new(match self.push {
            Some(push) => LazyHandle::ready("push", push),
            None => {
                let push_settings = settings.push.clone();
                LazyHandle::new("push", move || {
                    FcmGateway::from_settings(&push_settings)
                        .map(|gateway| Arc::new(gateway) as Arc<dyn PushGateway>)
                        .map_err(|e| e.to_string())
                })
            }
        });
        let mail: Arc<LazyHandle<dyn MailTransport>> = Arc::new(match self.mail {
            Some(mail) => LazyHandle::ready("mail", mail),
            None => {
                let mail_settings = settings.mail.clone();
                LazyHandle::new("mail", move || {
                    SmtpMailTransport::from_settings(&mail_settings)
                        .map(|transport| Arc::new(transport) as Arc<dyn MailTransport>)
                        .map_err(|e| e.to_string())
                })
            }
        });
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(InMemoryIdentityProvider::new()));

        let reconciler = NotificationReconciler::new(
            store.clone(),
            RecipientResolver::new(store.clone()),
            PayloadBuilder::new(
                settings.push.chat_channel_id.as_str(),
                settings.push.app_channel_id.as_str(),
            ),
            Dispatcher::new(push, store.clone(), ids.clone(), clock.clone()),
            DeliveryRecorder::new(store.clone(), ids.clone(), clock.clone()),
        );

        let max_age = chrono::Duration::try_days(settings.retention.max_age_days).ok_or_else(|| {
            ConfigError::Invalid("retention.max_age_days is out of range".to_string())
        })?;
        let sweep_period = settings
            .retention
            .sweep_interval_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| {
                ConfigError::Invalid("retention.sweep_interval_hours is out of range".to_string())
            })?;
        let sweeper = RetentionSweeper::new(store.clone(), max_age);

        let mail_service = SalarySlipService::new(
            mail,
            store.clone(),
            Arc::new(DeliveryRecorder::new(store, ids, clock.clone())),
            clock.clone(),
            settings.mail.from_address().map(str::to_string),
            settings.dispatch.email_batch_width,
        );

        Ok(App {
            reconciler: Arc::new(reconciler),
            sweeper: Arc::new(sweeper),
            mail: mail_service,
            admin: UserAdmin::new(identity),
            clock,
            sweep_period,
        })
    }
}

/// App は組み立て済みのコンポーネント一式
pub struct App {
    pub reconciler: Arc<NotificationReconciler>,
    pub sweeper: Arc<RetentionSweeper>,
    pub mail: SalarySlipService,
    pub admin: UserAdmin,
    pub clock: Arc<dyn Clock>,
    pub sweep_period: Duration,
}
