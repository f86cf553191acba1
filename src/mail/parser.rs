use mail_parser::{MessageParser, MimeHeaders, PartType};

use super::types::{Attachment, AttachmentData, AttachmentOrigin, EmailBody, Message, MessageHeader, Sender};

const UNKNOWN_SENDER: &str = "(unknown sender)";

/// Parse the header block of a listing fetch.
///
/// `fallback_date` is the server's INTERNALDATE, used when the Date header
/// is missing or unparsable.
pub fn parse_header(uid: u32, raw: &[u8], fallback_date: Option<i64>) -> Option<MessageHeader> {
    let message = MessageParser::default().parse(raw)?;
    let date = message
        .date()
        .map(|d| d.to_timestamp())
        .or(fallback_date)
        .unwrap_or_default();

    Some(MessageHeader {
        uid,
        sender: extract_sender(&message),
        subject: message.subject().map(|s| s.to_string()).unwrap_or_default(),
        date,
    })
}

/// Parse a full RFC 5322 message.
pub fn parse_message(uid: u32, raw: &[u8], fallback_date: Option<i64>) -> Option<Message> {
    let message = MessageParser::default().parse(raw)?;

    let date = message
        .date()
        .map(|d| d.to_timestamp())
        .or(fallback_date)
        .unwrap_or_default();

    let attachments = message
        .attachments()
        .enumerate()
        .map(|(index, part)| Attachment {
            filename: attachment_name(part, index),
            mime_type: mime_type(part),
            size: Some(part.contents().len() as u64),
            index: Some(index),
            origin: AttachmentOrigin::Attached,
            purpose: None,
            context: None,
        })
        .collect();

    Some(Message {
        uid,
        message_id: message.message_id().map(|s| s.to_string()),
        sender: extract_sender(&message),
        subject: message.subject().map(|s| s.to_string()).unwrap_or_default(),
        date,
        body: EmailBody {
            text: extract_text_body(&message),
            html: extract_html_body(&message),
        },
        attachments,
    })
}

/// Pull the bytes of one attachment out of a raw message.
pub fn parse_attachment(raw: &[u8], index: usize) -> Option<AttachmentData> {
    let message = MessageParser::default().parse(raw)?;
    let part = message.attachments().nth(index)?;

    Some(AttachmentData {
        filename: attachment_name(part, index),
        mime_type: mime_type(part),
        data: part.contents().to_vec(),
    })
}

fn extract_sender(message: &mail_parser::Message) -> Sender {
    match message.from().and_then(|from| from.first()) {
        Some(addr) => Sender {
            name: addr.name().map(|s| s.to_string()).filter(|s| !s.is_empty()),
            address: addr.address().unwrap_or(UNKNOWN_SENDER).to_string(),
        },
        None => Sender {
            name: None,
            address: UNKNOWN_SENDER.to_string(),
        },
    }
}

fn extract_text_body(message: &mail_parser::Message) -> Option<String> {
    for part in message.text_bodies() {
        if let PartType::Text(text) = &part.body {
            return Some(text.to_string());
        }
    }

    // Fallback: any inline text/plain part
    for part in message.parts.iter() {
        if let PartType::Text(text) = &part.body {
            let is_plain = part
                .content_type()
                .map(|ct| ct.subtype() == Some("plain"))
                .unwrap_or(true);
            if is_plain && part.attachment_name().is_none() {
                return Some(text.to_string());
            }
        }
    }

    None
}

fn extract_html_body(message: &mail_parser::Message) -> Option<String> {
    for part in message.html_bodies() {
        if let PartType::Html(html) = &part.body {
            return Some(html.to_string());
        }
    }

    None
}

fn attachment_name(part: &mail_parser::MessagePart, index: usize) -> String {
    part.attachment_name()
        .map(|s| s.to_string())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("attachment-{}", index + 1))
}

fn mime_type(part: &mail_parser::MessagePart) -> String {
    match part.content_type() {
        Some(ct) => match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        },
        None => "application/octet-stream".to_string(),
    }
}
