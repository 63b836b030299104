//! SmtpMailTransport - lettre の非同期 SMTP トランスポート
//!
//! HTML 本文と添付ファイルを multipart/mixed で送ります。
//! Message-ID はこちらで採番して返します（SMTP 応答にはメッセージ ID が含まれないため）。

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;
use ulid::Ulid;

use crate::config::MailSettings;
use crate::domain::OutgoingMail;
use crate::ports::{MailError, MailTransport};

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    message_id_domain: String,
}

impl SmtpMailTransport {
    /// Requires `user` and `pass`; anything missing is a configuration error.
    pub fn from_settings(settings: &MailSettings) -> Result<Self, MailError> {
        let (Some(user), Some(pass)) = (
            settings.user.as_deref().filter(|s| !s.is_empty()),
            settings.pass.as_deref().filter(|s| !s.is_empty()),
        ) else {
            return Err(MailError::Configuration(
                "SMTP user and password must both be set".to_string(),
            ));
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .map_err(|e| MailError::Configuration(format!("SMTP relay {}: {e}", settings.smtp_host)))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(user.to_string(), pass.to_string()))
            .build();

        let message_id_domain = user
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| settings.smtp_host.clone());

        Ok(Self {
            transport,
            message_id_domain,
        })
    }

    fn build_message(&self, mail: &OutgoingMail, message_id: &str) -> Result<Message, MailError> {
        let from: Mailbox = mail
            .from
            .parse()
            .map_err(|_| MailError::InvalidAddress(mail.from.clone()))?;
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|_| MailError::InvalidAddress(mail.to.clone()))?;

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(mail.html_body.clone()));
        for attachment in &mail.attachments {
            let content_type = ContentType::parse(&attachment.content_type)
                .map_err(|e| MailError::Build(format!("{}: {e}", attachment.filename)))?;
            body = body.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }

        Message::builder()
            .from(from)
            .to(to)
            .subject(mail.subject.clone())
            .message_id(Some(message_id.to_string()))
            .multipart(body)
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, mail: &OutgoingMail) -> Result<String, MailError> {
        let message_id = format!("<{}@{}>", Ulid::new(), self.message_id_domain);
        let message = self.build_message(mail, &message_id)?;

        let response = self
            .transport
            .send(message)
            .await
            .map_err(|e| MailError::Delivery(e.to_string()))?;
        debug!(to = %mail.to, code = %response.code(), "smtp accepted");

        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MailAttachment;
    use crate::domain::mail::PDF_CONTENT_TYPE;

    fn settings() -> MailSettings {
        MailSettings {
            user: Some("hr@example.com".into()),
            pass: Some("app-password".into()),
            ..MailSettings::default()
        }
    }

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            from: "hr@example.com".into(),
            to: to.into(),
            subject: "Salary Slip - 3/2025".into(),
            html_body: "<p>Dear Asha,</p>".into(),
            attachments: vec![MailAttachment {
                filename: "Salary_Slip_3_2025.pdf".into(),
                content_type: PDF_CONTENT_TYPE.into(),
                content: b"%PDF-1.4".to_vec(),
            }],
        }
    }

    #[test]
    fn missing_password_is_configuration_error() {
        let settings = MailSettings {
            pass: None,
            ..settings()
        };
        let err = SmtpMailTransport::from_settings(&settings).err().unwrap();
        assert!(matches!(err, MailError::Configuration(_)));
    }

    #[tokio::test]
    async fn message_carries_attachment_and_id() {
        let transport = SmtpMailTransport::from_settings(&settings()).unwrap();
        let message = transport
            .build_message(&mail("asha@example.com"), "<id-1@example.com>")
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Message-ID: <id-1@example.com>"));
        assert!(raw.contains("Salary_Slip_3_2025.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[tokio::test]
    async fn bad_recipient_is_invalid_address() {
        let transport = SmtpMailTransport::from_settings(&settings()).unwrap();
        let err = transport
            .build_message(&mail("not an address"), "<id@example.com>")
            .unwrap_err();
        assert_eq!(err, MailError::InvalidAddress("not an address".into()));
    }
}
