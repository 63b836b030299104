//! Observability - ログ初期化とログ出力用ヘルパー
//!
//! `RUST_LOG` があればそれを優先し、無ければ設定ファイルのレベルを使います。

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingSettings};

/// Push tokens are logged only up to this many characters.
pub const TOKEN_LOG_PREFIX: usize = 20;

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init_tracing(settings: &LoggingSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str()));

    let builder = fmt::Subscriber::builder()
        .with_target(settings.with_target)
        .with_env_filter(env_filter);

    let _ = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

/// `abcdefghijklmnopqrstuvwxyz` → `abcdefghijklmnopqrst...`
pub fn redact_token(token: &str) -> String {
    match token.char_indices().nth(TOKEN_LOG_PREFIX) {
        Some((cut, _)) => format!("{}...", &token[..cut]),
        None => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_tokens_are_cut_to_prefix() {
        let token = "eXaMpLeToKeN0123456789:APA91b";
        assert_eq!(redact_token(token), "eXaMpLeToKeN01234567...");
    }

    #[test]
    fn short_tokens_are_kept() {
        assert_eq!(redact_token("short"), "short");
    }
}
