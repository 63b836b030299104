//! Config - 設定ファイル（herald.toml）と環境変数の読み込み
//!
//! # 優先順位
//! 環境変数 > herald.toml > デフォルト値
//!
//! メールの認証情報が無くても読み込みエラーにはしません。
//! 最初の送信時にトランスポートの初期化失敗（キャッシュされる）として表面化します。

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::batch::DEFAULT_BATCH_WIDTH;
use crate::app::sweeper::DEFAULT_MAX_AGE_DAYS;

pub const DEFAULT_CONFIG_PATH: &str = "herald.toml";

pub const ENV_SMTP_USER: &str = "HERALD_SMTP_USER";
pub const ENV_SMTP_PASS: &str = "HERALD_SMTP_PASS";
pub const ENV_FCM_PROJECT_ID: &str = "HERALD_FCM_PROJECT_ID";
pub const ENV_FCM_ACCESS_TOKEN: &str = "HERALD_FCM_ACCESS_TOKEN";
pub const ENV_LOG_FORMAT: &str = "HERALD_LOG_FORMAT";

/// Upper bounds keep the retention window and sweep period representable.
pub const MAX_RETENTION_DAYS: i64 = 36_500;
pub const MAX_SWEEP_INTERVAL_HOURS: u64 = 24 * 365;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub push: PushSettings,
    pub mail: MailSettings,
    pub retention: RetentionSettings,
    pub dispatch: DispatchSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSettings {
    pub endpoint: String,
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    /// Android channel for chat notifications.
    pub chat_channel_id: String,
    /// Android channel for app notifications.
    pub app_channel_id: String,
    pub request_timeout_secs: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://fcm.googleapis.com".to_string(),
            project_id: None,
            access_token: None,
            chat_channel_id: "chat_channel".to_string(),
            app_channel_id: "high_importance_channel".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub user: Option<String>,
    pub pass: Option<String>,
    /// Sender address; falls back to `user`.
    pub from: Option<String>,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            user: None,
            pass: None,
            from: None,
        }
    }
}

impl MailSettings {
    pub fn from_address(&self) -> Option<&str> {
        self.from.as_deref().or(self.user.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub max_age_days: i64,
    pub sweep_interval_hours: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            sweep_interval_hours: 24,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub email_batch_width: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            email_batch_width: DEFAULT_BATCH_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            with_target: true,
        }
    }
}

impl Settings {
    /// Load `path` if it exists, otherwise start from defaults; then apply env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?
        } else {
            Self::default()
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply overrides from a variable lookup (`std::env::var` in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user) = lookup(ENV_SMTP_USER) {
            self.mail.user = Some(user);
        }
        if let Some(pass) = lookup(ENV_SMTP_PASS) {
            self.mail.pass = Some(pass);
        }
        if let Some(project_id) = lookup(ENV_FCM_PROJECT_ID) {
            self.push.project_id = Some(project_id);
        }
        if let Some(token) = lookup(ENV_FCM_ACCESS_TOKEN) {
            self.push.access_token = Some(token);
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = match format.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" => LogFormat::Text,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "{ENV_LOG_FORMAT} must be `text` or `json`, got `{other}`"
                    )));
                }
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_RETENTION_DAYS).contains(&self.retention.max_age_days) {
            return Err(ConfigError::Invalid(format!(
                "retention.max_age_days must be between 1 and {MAX_RETENTION_DAYS}"
            )));
        }
        if !(1..=MAX_SWEEP_INTERVAL_HOURS).contains(&self.retention.sweep_interval_hours) {
            return Err(ConfigError::Invalid(format!(
                "retention.sweep_interval_hours must be between 1 and {MAX_SWEEP_INTERVAL_HOURS}"
            )));
        }
        if self.dispatch.email_batch_width == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.email_batch_width must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
