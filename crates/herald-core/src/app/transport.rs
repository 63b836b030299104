//! LazyHandle - 遅延初期化されるトランスポートハンドル
//!
//! # 設計原則
//! - 最初の利用時に一度だけ初期化する（once-cell、並行呼び出しでも初期化は一回）
//! - 初期化の失敗もキャッシュする → 以降の送信は設定エラーで即座に失敗
//! - コンポジションルート（AppBuilder）で生成して注入する（グローバル変数にしない）

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tracing::error;

use crate::domain::{OutgoingMail, PlatformEnvelope};
use crate::ports::{MailError, MailTransport, PushError, PushGateway};

type Init<T> = Box<dyn Fn() -> Result<Arc<T>, String> + Send + Sync>;

pub struct LazyHandle<T: ?Sized> {
    label: &'static str,
    cell: OnceCell<Result<Arc<T>, String>>,
    init: Init<T>,
}

impl<T: ?Sized> LazyHandle<T> {
    pub fn new<F>(label: &'static str, init: F) -> Self
    where
        F: Fn() -> Result<Arc<T>, String> + Send + Sync + 'static,
    {
        Self {
            label,
            cell: OnceCell::new(),
            init: Box::new(init),
        }
    }

    /// Already-initialized handle (tests, dry-run).
    pub fn ready(label: &'static str, value: Arc<T>) -> Self {
        Self {
            label,
            cell: OnceCell::with_value(Ok(value)),
            init: Box::new(|| Err("handle was created initialized".to_string())),
        }
    }

    /// Initialize on first call; later calls return the cached value or error.
    pub fn get(&self) -> Result<&Arc<T>, &str> {
        self.cell
            .get_or_init(|| {
                let result = (self.init)();
                if let Err(e) = &result {
                    error!(transport = self.label, error = %e, "transport initialization failed");
                }
                result
            })
            .as_ref()
            .map_err(String::as_str)
    }
}

#[async_trait]
impl MailTransport for LazyHandle<dyn MailTransport> {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        let transport = self
            .get()
            .map_err(|e| MailError::Configuration(e.to_string()))?;
        transport.send(mail).await
    }
}

#[async_trait]
impl PushGateway for LazyHandle<dyn PushGateway> {
    async fn send(&self, token: &str, envelope: &PlatformEnvelope) -> Result<String, PushError> {
        let gateway = self
            .get()
            .map_err(|e| PushError::Configuration(e.to_string()))?;
        gateway.send(token, envelope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryMailTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn mail() -> OutgoingMail {
        OutgoingMail {
            from: "hr@example.com".into(),
            to: "a@example.com".into(),
            subject: "s".into(),
            html_body: "<p>b</p>".into(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn init_runs_once_across_sends() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle: LazyHandle<dyn MailTransport> = LazyHandle::new("mail", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(InMemoryMailTransport::new()) as Arc<dyn MailTransport>)
        });

        handle.send(&mail()).await.unwrap();
        handle.send(&mail()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn init_failure_is_cached_and_fails_fast() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle: LazyHandle<dyn MailTransport> = LazyHandle::new("mail", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err("SMTP user and password must both be set".to_string())
        });

        for _ in 0..3 {
            let err = handle.send(&mail()).await.unwrap_err();
            assert!(matches!(err, MailError::Configuration(_)));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_first_use_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle: Arc<LazyHandle<dyn MailTransport>> = Arc::new(LazyHandle::new("mail", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(InMemoryMailTransport::new()) as Arc<dyn MailTransport>)
        }));

        let sends = (0..8).map(|_| {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.send(&mail()).await })
        });
        for joined in futures::future::join_all(sends).await {
            assert!(joined.unwrap().is_ok());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
