// src/contact/mailer.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment as MailPart, Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use tracing::warn;

use super::form::{Attachment, ValidContact};
use crate::config::MailConfig;

/// Transport-neutral message built from a validated submission.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    /// Submitter's address, used as `Reply-To`.
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachment: Option<Attachment>,
}

impl OutgoingMail {
    pub fn compose(c: ValidContact) -> Self {
        let subject = format!("Portfolio Contact: {}", c.subject);
        let text = format!(
            "Name: {}\nEmail: {}\n\nMessage:\n{}\n",
            c.name, c.email, c.message
        );

        let esc = |s: &str| html_escape::encode_text(s).to_string();
        let html = format!(
            concat!(
                r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">"#,
                "<h2>New Contact Form Submission</h2>",
                "<p><strong>From:</strong> {name} ({email})</p>",
                "<p><strong>Subject:</strong> {subject}</p>",
                r#"<div style="margin-top: 20px; padding: 15px; background-color: #f5f5f5; border-radius: 5px;">"#,
                "<p><strong>Message:</strong></p><p>{message}</p></div></div>"
            ),
            name = esc(&c.name),
            email = esc(&c.email),
            subject = esc(&c.subject),
            message = esc(&c.message).replace('\n', "<br>"),
        );

        Self {
            reply_to: c.email,
            subject,
            text,
            html,
            attachment: c.attachment,
        }
    }
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// SMTP relay that delivers submissions to the site owner's own mailbox.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    owner: Mailbox,
}

impl SmtpMailer {
    /// `Ok(None)` when no mailbox is configured.
    pub fn from_config(cfg: &MailConfig) -> Result<Option<Self>> {
        let Some(user) = cfg.user.clone() else {
            return Ok(None);
        };
        let pass = cfg.pass.clone().context("EMAIL_PASS missing")?;

        let owner: Mailbox = user.parse().context("invalid EMAIL_USER")?;
        let creds = Credentials::new(user, pass);
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        Ok(Some(Self { mailer, owner }))
    }

    fn build(&self, mail: OutgoingMail) -> Result<Message> {
        let mut builder = Message::builder()
            .from(self.owner.clone())
            .to(self.owner.clone())
            .subject(mail.subject);

        match mail.reply_to.parse::<Mailbox>() {
            Ok(rt) => builder = builder.reply_to(rt),
            Err(e) => warn!(error = %e, "unparsable reply-to; sending without it"),
        }

        let body = MultiPart::alternative_plain_html(mail.text, mail.html);
        let body = match mail.attachment {
            None => body,
            Some(att) => {
                let ct = ContentType::parse(
                    att.content_type
                        .as_deref()
                        .unwrap_or("application/octet-stream"),
                )
                .or_else(|_| ContentType::parse("application/octet-stream"))
                .context("attachment content type")?;
                MultiPart::mixed()
                    .multipart(body)
                    .singlepart(MailPart::new(att.filename).body(att.data.to_vec(), ct))
            }
        };

        builder.multipart(body).context("build email")
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<()> {
        let msg = self.build(mail)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Stand-in when no mailbox is configured; every send fails.
pub struct DisabledMailer;

#[async_trait]
impl MailTransport for DisabledMailer {
    async fn send(&self, _mail: OutgoingMail) -> Result<()> {
        Err(anyhow!("mail transport not configured (EMAIL_USER unset)"))
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
