//! PayloadBuilder - intent と受信者からプラットフォーム別のエンベロープを組み立てる
//!
//! 純粋関数（I/O なし、エラーなし）。送信者名は呼び出し前に解決済みであること。

use crate::domain::envelope::{
    APNS_BADGE, AndroidConfig, ApnsConfig, CLICK_ACTION, DEFAULT_SOUND, NotificationContent,
    Priority, WebpushConfig,
};
use crate::domain::{IntentKind, NotificationIntent, PlatformEnvelope, Recipient};

use super::resolver::{DEFAULT_SCOPE_NAME, DEFAULT_SENDER_NAME};

pub const DEFAULT_GENERAL_TITLE: &str = "New Notification";
pub const DEFAULT_GENERAL_BODY: &str = "You have a new notification";

pub const WEB_ICON: &str = "/icons/Icon-192.png";
pub const WEB_VIBRATE: [u32; 3] = [200, 100, 200];
const DEFAULT_WEB_TAG: &str = "default";

#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    chat_channel_id: String,
    app_channel_id: String,
}

impl PayloadBuilder {
    pub fn new(chat_channel_id: impl Into<String>, app_channel_id: impl Into<String>) -> Self {
        Self {
            chat_channel_id: chat_channel_id.into(),
            app_channel_id: app_channel_id.into(),
        }
    }

    pub fn build(&self, intent: &NotificationIntent, recipient: &Recipient) -> PlatformEnvelope {
        let title = title_for(intent);
        let body = body_for(intent);

        let mut data = intent.routing.clone();
        data.insert(
            "senderId".to_string(),
            intent
                .sender_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        );
        data.insert("senderName".to_string(), sender_name(intent).to_string());
        data.insert("click_action".to_string(), CLICK_ACTION.to_string());

        let channel_id = match intent.kind {
            IntentKind::Personal | IntentKind::Project => &self.chat_channel_id,
            IntentKind::General => &self.app_channel_id,
        };

        let task_id = route(intent, "taskId");
        let team_id = route(intent, "teamId");
        let tag = task_id.or(team_id).unwrap_or(DEFAULT_WEB_TAG);
        let link = match (task_id, team_id) {
            (Some(task), _) => format!("/#/task/{task}"),
            (None, Some(team)) => format!("/#/team/{team}"),
            (None, None) => "/".to_string(),
        };

        tracing::trace!(recipient = %recipient.user_id, %title, "envelope built");

        PlatformEnvelope {
            notification: NotificationContent {
                title: title.clone(),
                body: body.clone(),
            },
            data,
            android: AndroidConfig {
                priority: Priority::High,
                channel_id: channel_id.clone(),
                sound: DEFAULT_SOUND.to_string(),
                default_sound: true,
            },
            apns: ApnsConfig {
                sound: DEFAULT_SOUND.to_string(),
                badge: APNS_BADGE,
            },
            webpush: WebpushConfig {
                title,
                body,
                icon: WEB_ICON.to_string(),
                badge: WEB_ICON.to_string(),
                tag: tag.to_string(),
                require_interaction: false,
                vibrate: WEB_VIBRATE.to_vec(),
                link,
            },
        }
    }
}

/// `personal` → sender, `project` → `"{sender} ({scope})"`, `general` → explicit title.
pub fn title_for(intent: &NotificationIntent) -> String {
    match intent.kind {
        IntentKind::Personal => sender_name(intent).to_string(),
        IntentKind::Project => {
            let scope = intent
                .scope_name
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SCOPE_NAME);
            format!("{} ({scope})", sender_name(intent))
        }
        IntentKind::General => intent
            .title
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_GENERAL_TITLE)
            .to_string(),
    }
}

fn body_for(intent: &NotificationIntent) -> String {
    if intent.kind == IntentKind::General && intent.body_text.is_empty() {
        return DEFAULT_GENERAL_BODY.to_string();
    }
    intent.body_text.clone()
}

fn sender_name(intent: &NotificationIntent) -> &str {
    intent
        .sender_display_name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(DEFAULT_SENDER_NAME)
}

fn route<'a>(intent: &'a NotificationIntent, key: &str) -> Option<&'a str> {
    intent
        .routing
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProjectId, UserId};
    use rstest::rstest;

    fn builder() -> PayloadBuilder {
        PayloadBuilder::new("chat_channel", "high_importance_channel")
    }

    fn recipient() -> Recipient {
        Recipient {
            user_id: UserId::new("r1"),
            push_token: Some("tok".into()),
            display_name: None,
        }
    }

    #[rstest]
    #[case::personal_named(IntentKind::Personal, Some("Asha"), None, "Asha")]
    #[case::personal_anonymous(IntentKind::Personal, None, None, "Someone")]
    #[case::project_named(IntentKind::Project, Some("Asha"), Some("Tower"), "Asha (Tower)")]
    #[case::project_placeholder(IntentKind::Project, Some("Asha"), None, "Asha (Project Chat)")]
    fn chat_titles(
        #[case] kind: IntentKind,
        #[case] sender: Option<&str>,
        #[case] scope: Option<&str>,
        #[case] expected: &str,
    ) {
        let mut intent = NotificationIntent::direct(UserId::new("r1"), kind, "hello");
        intent.sender_display_name = sender.map(str::to_string);
        intent.scope_name = scope.map(str::to_string);
        assert_eq!(title_for(&intent), expected);
    }

    #[test]
    fn general_defaults_title_and_body() {
        let intent = NotificationIntent::direct(UserId::new("r1"), IntentKind::General, "");
        let envelope = builder().build(&intent, &recipient());
        assert_eq!(envelope.title(), DEFAULT_GENERAL_TITLE);
        assert_eq!(envelope.body(), DEFAULT_GENERAL_BODY);
        assert_eq!(envelope.android.channel_id, "high_importance_channel");
    }

    #[test]
    fn chat_envelope_carries_fixed_platform_fields() {
        let intent = NotificationIntent::direct(UserId::new("r1"), IntentKind::Personal, "hello")
            .with_sender(UserId::new("s1"))
            .with_sender_name("Asha")
            .with_route("chatId", "c1")
            .with_route("chatType", "personal");

        let envelope = builder().build(&intent, &recipient());

        assert_eq!(envelope.title(), "Asha");
        assert_eq!(envelope.body(), "hello");
        assert_eq!(envelope.data["chatId"], "c1");
        assert_eq!(envelope.data["senderId"], "s1");
        assert_eq!(envelope.data["senderName"], "Asha");
        assert_eq!(envelope.data["click_action"], CLICK_ACTION);
        assert_eq!(envelope.android.priority, Priority::High);
        assert_eq!(envelope.android.channel_id, "chat_channel");
        assert_eq!(envelope.apns.badge, 1);
        assert_eq!(envelope.apns.sound, "default");
        assert_eq!(envelope.webpush.tag, "default");
        assert_eq!(envelope.webpush.link, "/");
    }

    #[rstest]
    #[case::task("t1", "team1", "t1", "/#/task/t1")]
    #[case::team("", "team1", "team1", "/#/team/team1")]
    fn webpush_tag_and_link_follow_routing(
        #[case] task: &str,
        #[case] team: &str,
        #[case] tag: &str,
        #[case] link: &str,
    ) {
        let intent = NotificationIntent::direct(UserId::new("r1"), IntentKind::General, "x")
            .with_route("taskId", task)
            .with_route("teamId", team);
        let envelope = builder().build(&intent, &recipient());
        assert_eq!(envelope.webpush.tag, tag);
        assert_eq!(envelope.webpush.link, link);
        assert_eq!(envelope.webpush.vibrate, vec![200, 100, 200]);
        assert!(!envelope.webpush.require_interaction);
    }

    #[test]
    fn broadcast_intent_title_uses_scope() {
        let intent = NotificationIntent::broadcast(ProjectId::new("p1"), "standup")
            .with_sender_name("Ravi")
            .with_scope_name("Tower");
        assert_eq!(title_for(&intent), "Ravi (Tower)");
    }
}
