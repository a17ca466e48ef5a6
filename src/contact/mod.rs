// src/contact/mod.rs
//! Contact relay: validate a submitted form and forward it as one email.

pub mod form;
pub mod mailer;

pub use form::{read_multipart, Attachment, ContactForm, ValidContact};
pub use mailer::{DisabledMailer, MailTransport, OutgoingMail, SmtpMailer};

use metrics::counter;
use tracing::{info, warn};

/// Largest accepted attachment, in bytes.
pub const ATTACHMENT_LIMIT_BYTES: usize = 5 * 1024 * 1024;

pub const MSG_SENT: &str = "Message sent successfully!";
pub const MSG_SEND_FAILED: &str = "Failed to send message. Please try again later.";

#[derive(Debug, thiserror::Error)]
pub enum ContactError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Attachment exceeds the 5MB limit")]
    AttachmentTooLarge,
    #[error("Only one attachment is allowed")]
    TooManyAttachments,
    #[error("Malformed form data: {0}")]
    Malformed(String),
    #[error("Failed to send message. Please try again later.")]
    Transport(#[source] anyhow::Error),
}

impl ContactError {
    /// Problems the submitter can fix by editing the form.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ContactError::Transport(_))
    }
}

/// Validate and send. The transport is invoked at most once, and only for a valid form.
pub async fn relay(form: ContactForm, transport: &dyn MailTransport) -> Result<(), ContactError> {
    let valid = match form.validate() {
        Ok(v) => v,
        Err(e) => {
            counter!("contact_rejected_total").increment(1);
            info!(reason = %e, "contact form rejected");
            return Err(e);
        }
    };

    let mail = OutgoingMail::compose(valid);
    let has_attachment = mail.attachment.is_some();

    if let Err(e) = transport.send(mail).await {
        counter!("contact_transport_errors_total").increment(1);
        warn!(transport = transport.name(), error = %format!("{e:#}"), "contact mail failed");
        return Err(ContactError::Transport(e));
    }

    counter!("contact_sent_total").increment(1);
    info!(transport = transport.name(), has_attachment, "contact mail sent");
    Ok(())
}
