//! PlatformEnvelope - プッシュゲートウェイに渡すメッセージ構造
//!
//! プラットフォームごとの設定（Android / APNs / Web Push）をまとめた中立的な表現です。
//! ワイヤーフォーマット（FCM HTTP v1 など）への変換はアダプタ側で行います。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker the mobile client uses to recognise push-triggered launches.
pub const CLICK_ACTION: &str = "FLUTTER_NOTIFICATION_CLICK";

/// Badge is a fixed default, not a computed unread count.
pub const APNS_BADGE: u32 = 1;

pub const DEFAULT_SOUND: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformEnvelope {
    pub notification: NotificationContent,
    pub data: BTreeMap<String, String>,
    pub android: AndroidConfig,
    pub apns: ApnsConfig,
    pub webpush: WebpushConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidConfig {
    pub priority: Priority,
    pub channel_id: String,
    pub sound: String,
    pub default_sound: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApnsConfig {
    pub sound: String,
    pub badge: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebpushConfig {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub require_interaction: bool,
    pub vibrate: Vec<u32>,
    pub link: String,
}

impl PlatformEnvelope {
    pub fn title(&self) -> &str {
        &self.notification.title
    }

    pub fn body(&self) -> &str {
        &self.notification.body
    }
}
