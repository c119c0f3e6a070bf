use std::fmt::Write as _;
use std::path::PathBuf;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use memento_core::device::{MailComposer, MailDraft, MailStatus};
use memento_core::Result;

const BOUNDARY_PREFIX: &str = "memento-boundary";
const LINE_WIDTH: usize = 76;

/// Writes each draft as an `.eml` file for the user's mail client to send.
pub struct OutboxMailer {
    outbox_dir: PathBuf,
}

impl OutboxMailer {
    pub const fn new(outbox_dir: PathBuf) -> Self {
        Self { outbox_dir }
    }
}

#[async_trait]
impl MailComposer for OutboxMailer {
    async fn is_available(&self) -> bool {
        match tokio::fs::create_dir_all(&self.outbox_dir).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    "Outbox {} is not writable: {error}",
                    self.outbox_dir.display()
                );
                false
            }
        }
    }

    async fn compose(&self, draft: MailDraft) -> Result<MailStatus> {
        let mut attachments = Vec::with_capacity(draft.attachments.len());
        for uri in &draft.attachments {
            let attachment = match uri.to_local_path() {
                Some(path) => {
                    let bytes = tokio::fs::read(&path).await?;
                    let name = uri.file_name().unwrap_or("attachment").to_string();
                    let content_type = mime_guess::from_path(&path)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string();
                    Attachment::File {
                        name,
                        content_type,
                        bytes,
                    }
                }
                None => Attachment::Link(uri.to_string()),
            };
            attachments.push(attachment);
        }

        let stamp = Utc::now().format("%Y%m%d-%H%M%S%3f").to_string();
        let message = render_message(&draft, &attachments, &format!("{BOUNDARY_PREFIX}-{stamp}"));
        let path = self.outbox_dir.join(format!("share-{stamp}.eml"));
        tokio::fs::create_dir_all(&self.outbox_dir).await?;
        tokio::fs::write(&path, message).await?;

        println!("Message saved to {}", path.display());
        Ok(MailStatus::Saved)
    }
}

/// Draft attachment resolved for rendering.
pub enum Attachment {
    File {
        name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    /// Remote asset, referenced in the body instead of attached.
    Link(String),
}

/// Render a multipart MIME message.
pub fn render_message(draft: &MailDraft, attachments: &[Attachment], boundary: &str) -> String {
    let mut body = draft.body.clone();
    for attachment in attachments {
        if let Attachment::Link(url) = attachment {
            body.push_str("\r\n\r\n");
            body.push_str(url);
        }
    }

    let mut message = String::new();
    let _ = write!(
        message,
        "Subject: {}\r\nMIME-Version: 1.0\r\nContent-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n",
        draft.subject
    );
    let _ = write!(
        message,
        "--{boundary}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{body}\r\n"
    );

    for attachment in attachments {
        let Attachment::File {
            name,
            content_type,
            bytes,
        } = attachment
        else {
            continue;
        };
        let _ = write!(
            message,
            "--{boundary}\r\nContent-Type: {content_type}; name=\"{name}\"\r\nContent-Transfer-Encoding: base64\r\nContent-Disposition: attachment; filename=\"{name}\"\r\n\r\n"
        );
        let encoded = STANDARD.encode(bytes);
        for line in encoded.as_bytes().chunks(LINE_WIDTH) {
            message.push_str(&String::from_utf8_lossy(line));
            message.push_str("\r\n");
        }
    }

    let _ = write!(message, "--{boundary}--\r\n");
    message
}
