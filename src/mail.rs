use anyhow::Context as _;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport as _, Message, Tokio1Executor};

use crate::model::EmailSettings;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, account: &EmailSettings, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// STARTTLS SMTP relay authenticated with the user's own mailbox.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, account: &EmailSettings, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = build_message(account, subject, body)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            .with_context(|| format!("configure smtp relay {}", self.host))?
            .port(self.port)
            .credentials(Credentials::new(
                account.email_username.clone(),
                account.email_password.clone(),
            ))
            .build();

        transport
            .send(message)
            .await
            .with_context(|| format!("send mail via {}:{}", self.host, self.port))?;
        Ok(())
    }
}

fn build_message(account: &EmailSettings, subject: &str, body: &str) -> anyhow::Result<Message> {
    let from: Mailbox = account
        .email_username
        .parse()
        .with_context(|| format!("invalid sender address: {:?}", account.email_username))?;
    let to: Mailbox = account
        .recipient()
        .parse()
        .with_context(|| format!("invalid recipient address: {:?}", account.recipient()))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_owned())
        .context("build mail message")
}

/// Insight digest body: the source urls first, then the narrative.
pub fn insight_body(urls: &[String], insights: &str) -> String {
    format!("{}\n\n{insights}", urls.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insight_body_lists_urls_before_text() {
        let body = insight_body(&["https://a".to_owned(), "https://b".to_owned()], "Trends.");
        assert_eq!(body, "https://a\nhttps://b\n\nTrends.");
    }

    #[test]
    fn build_message_falls_back_to_sender_as_recipient() {
        let account = EmailSettings {
            email_username: "me@example.com".to_owned(),
            email_password: "pw".to_owned(),
            email_recipient: String::new(),
        };
        let message = build_message(&account, "Feedly Insights", "body").unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("Subject: Feedly Insights"));
    }

    #[test]
    fn build_message_rejects_bad_address() {
        let account = EmailSettings {
            email_username: "not an address".to_owned(),
            ..Default::default()
        };
        assert!(build_message(&account, "s", "b").is_err());
    }
}
