//! In-memory mailbox and stub summarizer for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ai::Summarizer;
use crate::error::{DigestError, DigestResult};
use crate::mail::{
    AttachmentData, Credentials, EmailBody, MailConnector, MailSession, Message, MessageHeader,
    Sender, order_recent, sort_mailboxes,
};

pub const FAKE_PASSWORD: &str = "app-password";

/// Plain-text message fixture.
pub fn text_message(uid: u32, date: i64, subject: &str, body: &str) -> Message {
    Message {
        uid,
        message_id: Some(format!("<{}@example.com>", uid)),
        sender: Sender {
            name: Some("Dana Lee".into()),
            address: "dana@example.com".into(),
        },
        subject: subject.to_string(),
        date,
        body: EmailBody {
            text: Some(body.to_string()),
            html: None,
        },
        attachments: Vec::new(),
    }
}

pub fn fake_credentials(password: &str) -> Credentials {
    Credentials {
        server: "imap.example.com".into(),
        port: 993,
        username: "me@example.com".into(),
        password: password.into(),
    }
}

#[derive(Default)]
pub struct FakeStats {
    pub connects: AtomicUsize,
    pub fetches: AtomicUsize,
    pub logouts: AtomicUsize,
}

impl FakeStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

/// Accepts [`FAKE_PASSWORD`] and serves a fixed INBOX.
#[derive(Clone)]
pub struct FakeConnector {
    messages: Vec<Message>,
    attachments: HashMap<(u32, usize), AttachmentData>,
    connect_error: Option<DigestError>,
    pub stats: Arc<FakeStats>,
    /// Errors returned by `fetch_message` for a UID, shared with the test
    pub fetch_errors: Arc<Mutex<HashMap<u32, DigestError>>>,
}

impl FakeConnector {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            attachments: HashMap::new(),
            connect_error: None,
            stats: Arc::new(FakeStats::default()),
            fetch_errors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn unreachable() -> Self {
        let mut connector = Self::new(Vec::new());
        connector.connect_error = Some(DigestError::Connectivity(
            "cannot reach imap.example.com:993: connection refused".into(),
        ));
        connector
    }

    pub fn fail_fetch(&self, uid: u32, error: DigestError) {
        self.fetch_errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(uid, error);
    }

    pub fn with_attachment(mut self, uid: u32, index: usize, data: AttachmentData) -> Self {
        self.attachments.insert((uid, index), data);
        self
    }
}

impl MailConnector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, credentials: &Credentials) -> DigestResult<FakeSession> {
        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.connect_error {
            return Err(err.clone());
        }
        if credentials.password != FAKE_PASSWORD {
            return Err(DigestError::Authentication(
                "[AUTHENTICATIONFAILED] Invalid credentials".into(),
            ));
        }
        Ok(FakeSession {
            messages: self.messages.clone(),
            attachments: self.attachments.clone(),
            stats: Arc::clone(&self.stats),
            fetch_errors: Arc::clone(&self.fetch_errors),
        })
    }
}

pub struct FakeSession {
    messages: Vec<Message>,
    attachments: HashMap<(u32, usize), AttachmentData>,
    stats: Arc<FakeStats>,
    fetch_errors: Arc<Mutex<HashMap<u32, DigestError>>>,
}

impl MailSession for FakeSession {
    async fn list_mailboxes(&mut self) -> DigestResult<Vec<String>> {
        let mut folders = vec!["Archive".to_string(), "INBOX".to_string(), "Sent".to_string()];
        sort_mailboxes(&mut folders);
        Ok(folders)
    }

    async fn list_recent(&mut self, mailbox: &str, limit: usize) -> DigestResult<Vec<MessageHeader>> {
        if !mailbox.eq_ignore_ascii_case("INBOX") {
            return Ok(Vec::new());
        }
        let headers = self.messages.iter().map(Message::header).collect();
        Ok(order_recent(headers, limit))
    }

    async fn fetch_message(&mut self, mailbox: &str, uid: u32) -> DigestResult<Message> {
        self.stats.fetches.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .fetch_errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&uid)
            .cloned();
        if let Some(err) = injected {
            return Err(err);
        }
        self.messages
            .iter()
            .find(|m| m.uid == uid)
            .cloned()
            .ok_or_else(|| DigestError::NotFound {
                mailbox: mailbox.to_string(),
                uid,
            })
    }

    async fn fetch_attachment(
        &mut self,
        mailbox: &str,
        uid: u32,
        index: usize,
    ) -> DigestResult<AttachmentData> {
        self.attachments
            .get(&(uid, index))
            .cloned()
            .ok_or_else(|| DigestError::NotFound {
                mailbox: mailbox.to_string(),
                uid,
            })
    }

    async fn logout(self) {
        self.stats.logouts.fetch_add(1, Ordering::SeqCst);
    }
}

/// Returns a fixed summary (or a fixed failure) and records its inputs.
pub struct StubSummarizer {
    reply: Result<String, String>,
    /// Never resolve, like a model endpoint that stops responding
    hang: bool,
    calls: AtomicUsize,
    last_input: Mutex<Option<String>>,
}

impl StubSummarizer {
    pub fn new(summary: &str) -> Self {
        Self {
            reply: Ok(summary.to_string()),
            hang: false,
            calls: AtomicUsize::new(0),
            last_input: Mutex::new(None),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            ..Self::new("")
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<String> {
        self.last_input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Summarizer for StubSummarizer {
    async fn summarize(&self, input: &str) -> DigestResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap_or_else(|e| e.into_inner()) = Some(input.to_string());
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.reply
            .clone()
            .map_err(DigestError::ModelUnavailable)
    }
}
