use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::info;

use crate::{
    config::MailConfig,
    retry::{retry, RetryPolicy},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Notification {
    pub fn new_comment(to: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "New comment".into(),
            text: "New comment in your post.".into(),
            html: "<h1>New Comment</h1>".into(),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Picks SMTP when a relay is configured, logging otherwise.
pub fn from_config(cfg: &MailConfig) -> anyhow::Result<Arc<dyn Mailer>> {
    match &cfg.smtp_host {
        Some(host) => Ok(Arc::new(SmtpMailer::new(cfg, host)?)),
        None => {
            info!("SMTP_HOST not set; notifications will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

pub struct SmtpMailer {
    transport: Arc<SmtpTransport>,
    from: Mailbox,
    retry: RetryPolicy,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig, host: &str) -> anyhow::Result<Self> {
        let mut builder = SmtpTransport::starttls_relay(host)
            .with_context(|| format!("smtp relay {host}"))?
            .port(cfg.smtp_port);
        if let (Some(user), Some(pass)) = (&cfg.smtp_username, &cfg.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = cfg
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid MAIL_FROM {}", cfg.from))?;

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
            retry: RetryPolicy::default(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, n: Notification) -> anyhow::Result<()> {
        let to = n
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {}", n.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(n.subject)
            .multipart(MultiPart::alternative_plain_html(n.text, n.html))
            .context("build email")?;

        retry(
            self.retry,
            || {
                let transport = Arc::clone(&self.transport);
                let message = message.clone();
                async move {
                    tokio::task::spawn_blocking(move || transport.send(&message))
                        .await
                        .context("smtp task")?
                        .map(|_| ())
                        .map_err(anyhow::Error::from)
                }
            },
            |e: &anyhow::Error| {
                e.downcast_ref::<lettre::transport::smtp::Error>()
                    .map(|smtp| smtp.is_transient())
                    .unwrap_or(false)
            },
        )
        .await
        .context("smtp send")?;

        info!("notification sent");
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, n: Notification) -> anyhow::Result<()> {
        info!(subject = %n.subject, "notification (not delivered, SMTP disabled)");
        Ok(())
    }
}
