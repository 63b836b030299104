//! FcmGateway - FCM HTTP v1 API を使うプッシュゲートウェイ
//!
//! `POST {endpoint}/v1/projects/{project_id}/messages:send`
//!
//! # エラー分類
//! - `UNREGISTERED` / HTTP 404 / トークンに関する `INVALID_ARGUMENT` → `StaleToken`
//! - それ以外の非 2xx → `Rejected`
//! - 接続・タイムアウトなど → `Transport`
//!
//! アクセストークンの取得（サービスアカウントの OAuth フロー）はこのクレートの外で行い、
//! 設定か環境変数で渡します。

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PushSettings;
use crate::domain::envelope::{CLICK_ACTION, Priority};
use crate::domain::PlatformEnvelope;
use crate::observability::redact_token;
use crate::ports::{PushError, PushGateway};

pub struct FcmGateway {
    client: Client,
    send_url: String,
    access_token: String,
}

impl FcmGateway {
    /// Fails with `Configuration` when the project id or access token is missing.
    pub fn from_settings(settings: &PushSettings) -> Result<Self, PushError> {
        let project_id = settings
            .project_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PushError::Configuration("push.project_id is not set".to_string()))?;
        let access_token = settings
            .access_token
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PushError::Configuration("push.access_token is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| PushError::Configuration(format!("http client: {e}")))?;

        Ok(Self {
            client,
            send_url: format!(
                "{}/v1/projects/{}/messages:send",
                settings.endpoint.trim_end_matches('/'),
                project_id
            ),
            access_token,
        })
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, token: &str, envelope: &PlatformEnvelope) -> Result<String, PushError> {
        let request = SendRequest {
            message: WireMessage::new(token, envelope),
        };

        debug!(token = %redact_token(token), "fcm send");
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &body));
        }

        let sent: SendResponse = serde_json::from_str(&body).map_err(|e| PushError::Rejected {
            status: status.as_u16(),
            detail: format!("unreadable response: {e}"),
        })?;
        Ok(sent.name)
    }
}

/// Map a non-2xx FCM response to a `PushError`.
pub fn classify_error(status: u16, body: &str) -> PushError {
    let parsed: Option<ErrorResponse> = serde_json::from_str(body).ok();
    let Some(ErrorResponse { error }) = parsed else {
        return if status == 404 {
            PushError::StaleToken(format!("HTTP {status}"))
        } else {
            PushError::Rejected {
                status,
                detail: body.to_string(),
            }
        };
    };

    let unregistered = error
        .details
        .iter()
        .any(|d| d.error_code.as_deref() == Some("UNREGISTERED"));
    let bad_token = error.status.as_deref() == Some("INVALID_ARGUMENT")
        && error.message.to_ascii_lowercase().contains("registration token");

    if unregistered || bad_token || status == 404 {
        PushError::StaleToken(error.message)
    } else {
        PushError::Rejected {
            status,
            detail: error.message,
        }
    }
}

// ========================================
// ワイヤーフォーマット
// ========================================

#[derive(Serialize)]
struct SendRequest<'a> {
    message: WireMessage<'a>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    token: &'a str,
    notification: WireNotification<'a>,
    data: &'a BTreeMap<String, String>,
    android: WireAndroid<'a>,
    apns: WireApns<'a>,
    webpush: WireWebpush<'a>,
}

#[derive(Serialize)]
struct WireNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Serialize)]
struct WireAndroid<'a> {
    priority: &'static str,
    notification: WireAndroidNotification<'a>,
}

#[derive(Serialize)]
struct WireAndroidNotification<'a> {
    channel_id: &'a str,
    sound: &'a str,
    default_sound: bool,
    click_action: &'static str,
    notification_priority: &'static str,
}

#[derive(Serialize)]
struct WireApns<'a> {
    payload: WireApnsPayload<'a>,
}

#[derive(Serialize)]
struct WireApnsPayload<'a> {
    aps: WireAps<'a>,
}

#[derive(Serialize)]
struct WireAps<'a> {
    sound: &'a str,
    badge: u32,
}

#[derive(Serialize)]
struct WireWebpush<'a> {
    notification: WireWebpushNotification<'a>,
    fcm_options: WireFcmOptions<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireWebpushNotification<'a> {
    title: &'a str,
    body: &'a str,
    icon: &'a str,
    badge: &'a str,
    tag: &'a str,
    require_interaction: bool,
    vibrate: &'a [u32],
}

#[derive(Serialize)]
struct WireFcmOptions<'a> {
    link: &'a str,
}

impl<'a> WireMessage<'a> {
    fn new(token: &'a str, envelope: &'a PlatformEnvelope) -> Self {
        let (priority, notification_priority) = match envelope.android.priority {
            Priority::High => ("HIGH", "PRIORITY_HIGH"),
            Priority::Normal => ("NORMAL", "PRIORITY_DEFAULT"),
        };
        let webpush = &envelope.webpush;

        Self {
            token,
            notification: WireNotification {
                title: envelope.title(),
                body: envelope.body(),
            },
            data: &envelope.data,
            android: WireAndroid {
                priority,
                notification: WireAndroidNotification {
                    channel_id: &envelope.android.channel_id,
                    sound: &envelope.android.sound,
                    default_sound: envelope.android.default_sound,
                    click_action: CLICK_ACTION,
                    notification_priority,
                },
            },
            apns: WireApns {
                payload: WireApnsPayload {
                    aps: WireAps {
                        sound: &envelope.apns.sound,
                        badge: envelope.apns.badge,
                    },
                },
            },
            webpush: WireWebpush {
                notification: WireWebpushNotification {
                    title: &webpush.title,
                    body: &webpush.body,
                    icon: &webpush.icon,
                    badge: &webpush.badge,
                    tag: &webpush.tag,
                    require_interaction: webpush.require_interaction,
                    vibrate: &webpush.vibrate,
                },
                fcm_options: WireFcmOptions {
                    link: &webpush.link,
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::{
        AndroidConfig, ApnsConfig, NotificationContent, WebpushConfig,
    };
    use rstest::rstest;
    use serde_json::json;

    fn envelope() -> PlatformEnvelope {
        PlatformEnvelope {
            notification: NotificationContent {
                title: "Asha".into(),
                body: "hi".into(),
            },
            data: BTreeMap::from([("chatId".to_string(), "c1".to_string())]),
            android: AndroidConfig {
                priority: Priority::High,
                channel_id: "chat_channel".into(),
                sound: "default".into(),
                default_sound: true,
            },
            apns: ApnsConfig {
                sound: "default".into(),
                badge: 1,
            },
            webpush: WebpushConfig {
                title: "Asha".into(),
                body: "hi".into(),
                icon: "/icons/Icon-192.png".into(),
                badge: "/icons/Icon-192.png".into(),
                tag: "default".into(),
                require_interaction: false,
                vibrate: vec![200, 100, 200],
                link: "/".into(),
            },
        }
    }

    #[test]
    fn wire_message_matches_v1_shape() {
        let env = envelope();
        let value = serde_json::to_value(SendRequest {
            message: WireMessage::new("tok", &env),
        })
        .unwrap();

        let message = &value["message"];
        assert_eq!(message["token"], "tok");
        assert_eq!(message["android"]["priority"], "HIGH");
        assert_eq!(message["android"]["notification"]["channel_id"], "chat_channel");
        assert_eq!(
            message["android"]["notification"]["click_action"],
            "FLUTTER_NOTIFICATION_CLICK"
        );
        assert_eq!(message["apns"]["payload"]["aps"]["badge"], 1);
        assert_eq!(message["webpush"]["notification"]["requireInteraction"], false);
        assert_eq!(message["webpush"]["fcm_options"]["link"], "/");
        assert_eq!(message["data"]["chatId"], "c1");
    }

    #[rstest]
    #[case::unregistered(
        404,
        json!({"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND",
            "details": [{"@type": "type.googleapis.com/google.firebase.fcm.v1.FcmError", "errorCode": "UNREGISTERED"}]}})
    )]
    #[case::invalid_token(
        400,
        json!({"error": {"code": 400, "message": "The registration token is not a valid FCM registration token",
            "status": "INVALID_ARGUMENT"}})
    )]
    fn token_errors_are_stale(#[case] status: u16, #[case] body: serde_json::Value) {
        let err = classify_error(status, &body.to_string());
        assert!(matches!(err, PushError::StaleToken(_)), "{err:?}");
    }

    #[test]
    fn other_errors_are_rejections() {
        let body = json!({"error": {"code": 500, "message": "Internal error", "status": "INTERNAL"}});
        let err = classify_error(500, &body.to_string());
        assert_eq!(
            err,
            PushError::Rejected {
                status: 500,
                detail: "Internal error".into()
            }
        );
    }

    #[test]
    fn non_json_404_is_stale() {
        assert!(matches!(classify_error(404, "<html>"), PushError::StaleToken(_)));
    }

    #[test]
    fn missing_credentials_are_configuration_errors() {
        let err = FcmGateway::from_settings(&PushSettings::default()).err().unwrap();
        assert!(matches!(err, PushError::Configuration(_)));
    }
}
