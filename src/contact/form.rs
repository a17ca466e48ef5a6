// src/contact/form.rs
use axum::body::Bytes;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{ContactError, ATTACHMENT_LIMIT_BYTES};

const ATTACHMENT_FIELD: &str = "attachment";

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw submission, as posted either as JSON or as multipart form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(skip)]
    pub attachment: Option<Attachment>,
}

/// A form whose four text fields are present and non-blank.
#[derive(Debug, Clone)]
pub struct ValidContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub attachment: Option<Attachment>,
}

impl ContactForm {
    pub fn validate(self) -> Result<ValidContact, ContactError> {
        let name = self.name.trim().to_string();
        let email = self.email.trim().to_string();
        let subject = self.subject.trim().to_string();
        let message = self.message.trim().to_string();

        if [&name, &email, &subject, &message].iter().any(|f| f.is_empty()) {
            return Err(ContactError::MissingFields);
        }
        if let Some(a) = &self.attachment {
            if a.data.len() > ATTACHMENT_LIMIT_BYTES {
                return Err(ContactError::AttachmentTooLarge);
            }
        }

        Ok(ValidContact {
            name,
            email,
            subject,
            message,
            attachment: self.attachment,
        })
    }
}

/// Strings stay strings; numbers and booleans are stringified; null is empty.
fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

/// Read a multipart submission. The attachment is consumed chunk by chunk and
/// rejected as soon as it passes the size limit.
pub async fn read_multipart(mut mp: Multipart) -> Result<ContactForm, ContactError> {
    let mut form = ContactForm::default();

    while let Some(mut field) = mp.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == ATTACHMENT_FIELD {
            let filename = field.file_name().map(str::to_string).unwrap_or_default();
            let content_type = field.content_type().map(str::to_string);

            let mut data: Vec<u8> = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                if data.len() + chunk.len() > ATTACHMENT_LIMIT_BYTES {
                    return Err(ContactError::AttachmentTooLarge);
                }
                data.extend_from_slice(&chunk);
            }

            // An untouched file input still posts an empty part.
            if filename.is_empty() && data.is_empty() {
                continue;
            }
            if form.attachment.is_some() {
                return Err(ContactError::TooManyAttachments);
            }
            form.attachment = Some(Attachment {
                filename: if filename.is_empty() {
                    "attachment".to_string()
                } else {
                    filename
                },
                content_type,
                data: Bytes::from(data),
            });
            continue;
        }

        let slot = match name.as_str() {
            "name" => &mut form.name,
            "email" => &mut form.email,
            "subject" => &mut form.subject,
            "message" => &mut form.message,
            _ => continue,
        };
        *slot = field.text().await.map_err(multipart_error)?;
    }

    Ok(form)
}

fn multipart_error(e: MultipartError) -> ContactError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ContactError::AttachmentTooLarge
    } else {
        ContactError::Malformed(e.body_text())
    }
}
