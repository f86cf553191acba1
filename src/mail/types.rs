use serde::{Deserialize, Serialize};

/// Listing record used to order a mailbox before bodies are fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageHeader {
    pub uid: u32,
    pub sender: Sender,
    pub subject: String,
    /// Seconds since the Unix epoch, UTC
    pub date: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub name: Option<String>,
    pub address: String,
}

impl Sender {
    pub fn display(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

/// A fetched message. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub uid: u32,
    pub message_id: Option<String>,
    pub sender: Sender,
    pub subject: String,
    pub date: i64,
    pub body: EmailBody,
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn header(&self) -> MessageHeader {
        MessageHeader {
            uid: self.uid,
            sender: self.sender.clone(),
            subject: self.subject.clone(),
            date: self.date,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmailBody {
    pub text: Option<String>,
    pub html: Option<String>,
}

impl EmailBody {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().is_none_or(|t| t.trim().is_empty())
            && self.html.as_deref().is_none_or(|h| h.trim().is_empty())
    }
}

/// Where an attachment record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentOrigin {
    /// A MIME part of the message
    Attached,
    /// A filename referenced in the body text
    Mentioned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    /// Unknown for mentioned files
    pub size: Option<u64>,
    /// Position among the message's MIME attachments, used for downloads
    pub index: Option<usize>,
    pub origin: AttachmentOrigin,
    /// Free-text label filled in by the extractor
    pub purpose: Option<String>,
    /// Sentence that references the file
    pub context: Option<String>,
}

impl Attachment {
    pub fn human_size(&self) -> Option<String> {
        let size = self.size?;
        Some(if size < 1024 {
            format!("{} B", size)
        } else if size < 1024 * 1024 {
            format!("{:.1} KB", size as f64 / 1024.0)
        } else {
            format!("{:.1} MB", size as f64 / (1024.0 * 1024.0))
        })
    }
}

/// Raw attachment bytes for download.
#[derive(Debug, Clone)]
pub struct AttachmentData {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}
