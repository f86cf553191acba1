//! Mail retrieval: IMAP backend, message parsing, and the seams the
//! dashboard uses to talk to a mailbox.

pub mod imap;
pub mod parser;
pub mod types;

use std::collections::HashSet;
use std::future::Future;

use crate::error::DigestResult;

pub use imap::ImapConnector;
pub use types::{Attachment, AttachmentData, AttachmentOrigin, EmailBody, Message, MessageHeader, Sender};

/// Login details for one mailbox.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opens authenticated mailbox sessions.
pub trait MailConnector: Send + Sync + 'static {
    type Session: MailSession;

    fn connect(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = DigestResult<Self::Session>> + Send;
}

/// One logged-in mailbox session.
///
/// Headers come back newest first; full messages are fetched one UID at a
/// time so a caller can stop early.
pub trait MailSession: Send {
    fn list_mailboxes(&mut self) -> impl Future<Output = DigestResult<Vec<String>>> + Send;

    fn list_recent(
        &mut self,
        mailbox: &str,
        limit: usize,
    ) -> impl Future<Output = DigestResult<Vec<MessageHeader>>> + Send;

    fn fetch_message(
        &mut self,
        mailbox: &str,
        uid: u32,
    ) -> impl Future<Output = DigestResult<Message>> + Send;

    fn fetch_attachment(
        &mut self,
        mailbox: &str,
        uid: u32,
        index: usize,
    ) -> impl Future<Output = DigestResult<AttachmentData>> + Send;

    fn logout(self) -> impl Future<Output = ()> + Send;
}

/// Order headers newest first and drop repeated UIDs.
///
/// Ties on timestamp fall back to the higher UID, which IMAP assigns in
/// arrival order. Keeps at most `limit` entries.
pub fn order_recent(mut headers: Vec<MessageHeader>, limit: usize) -> Vec<MessageHeader> {
    headers.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.uid.cmp(&a.uid)));

    let mut seen = HashSet::with_capacity(headers.len());
    headers.retain(|h| seen.insert(h.uid));
    headers.truncate(limit);
    headers
}

/// Sort mailbox names with the common ones first.
pub fn sort_mailboxes(folders: &mut [String]) {
    folders.sort_by(|a, b| {
        let priority = |s: &str| -> u8 {
            match s.to_uppercase().as_str() {
                "INBOX" => 0,
                s if s.contains("SENT") => 1,
                s if s.contains("DRAFT") => 2,
                s if s.contains("ARCHIVE") => 3,
                s if s.contains("SPAM") || s.contains("JUNK") => 4,
                s if s.contains("TRASH") || s.contains("DELETED") => 5,
                _ => 10,
            }
        };
        priority(a).cmp(&priority(b)).then_with(|| a.cmp(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(uid: u32, date: i64) -> MessageHeader {
        MessageHeader {
            uid,
            sender: Sender::default(),
            subject: format!("msg {}", uid),
            date,
        }
    }

    #[test]
    fn test_order_recent_descending_without_duplicates() {
        let headers = vec![
            header(1, 100),
            header(3, 300),
            header(2, 200),
            header(3, 300),
            header(4, 300),
        ];

        let ordered = order_recent(headers, 10);
        let uids: Vec<u32> = ordered.iter().map(|h| h.uid).collect();
        assert_eq!(uids, vec![4, 3, 2, 1]);
        assert!(ordered.windows(2).all(|w| w[0].date >= w[1].date));
    }

    #[test]
    fn test_order_recent_respects_limit() {
        let headers = (1..=50).map(|uid| header(uid, uid as i64 * 10)).collect();
        let ordered = order_recent(headers, 5);
        assert_eq!(ordered.len(), 5);
        assert_eq!(ordered[0].uid, 50);
        assert_eq!(ordered[4].uid, 46);
    }

    #[test]
    fn test_sort_mailboxes() {
        let mut folders = vec![
            "Receipts".to_string(),
            "Trash".to_string(),
            "INBOX".to_string(),
            "Sent Items".to_string(),
        ];
        sort_mailboxes(&mut folders);
        assert_eq!(folders, vec!["INBOX", "Sent Items", "Trash", "Receipts"]);
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            server: "imap.example.com".into(),
            port: 993,
            username: "me".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("imap.example.com"));
    }
}
