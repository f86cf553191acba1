//! Application core: sessions, the refresh pipeline and its state machine
//!
//! - `state.rs` - per-session phase, banner and digests
//! - `sessions.rs` - cookie-keyed session store
//! - `pipeline.rs` - message to digest processing

pub mod pipeline;
pub mod sessions;
pub mod state;

use chrono::Local;

use crate::ai::Summarizer;
use crate::config::Config;
use crate::error::{DigestError, DigestResult};
use crate::mail::{AttachmentData, Credentials, MailConnector, MailSession, Message};

pub use pipeline::{Digest, Summary, SummaryStatus};
pub use sessions::{Session, SessionStore};
pub use state::{Banner, BannerLevel, Phase, SessionSnapshot, SessionState};

/// Shared by every request: configuration, backends and sessions.
pub struct AppState<C, S> {
    pub config: Config,
    pub sessions: SessionStore,
    connector: C,
    summarizer: S,
}

impl<C: MailConnector, S: Summarizer> AppState<C, S> {
    pub fn new(config: Config, connector: C, summarizer: S) -> Self {
        let sessions = SessionStore::new(&config.session, &config.fetch.mailbox);
        Self {
            config,
            sessions,
            connector,
            summarizer,
        }
    }

    pub fn summarizer(&self) -> &S {
        &self.summarizer
    }

    /// Fetch, extract and summarize the session's mailbox.
    ///
    /// Mail errors put the session into `Error` and are returned; model
    /// errors only mark individual digests. If the returned future is
    /// dropped early the session lands in `Error` rather than staying busy.
    pub async fn refresh(&self, session: &Session) -> DigestResult<()> {
        let Some(_running) = session.try_begin_refresh() else {
            return Err(DigestError::InvalidTransition {
                from: session.state().phase,
                to: Phase::Fetching,
            });
        };
        // Declared after `_running` so it runs while the refresh slot is still held
        let _interrupted = InterruptGuard(session);

        let (credentials, mailbox) = {
            let mut state = session.state();
            let credentials = state.credentials.clone().ok_or(DigestError::NotConnected)?;
            state.begin_refresh()?;
            (credentials, state.mailbox.clone())
        };

        let messages = match self.fetch_messages(&credentials, &mailbox).await {
            Ok(messages) => messages,
            Err(e) => {
                session.state().fail(&e);
                return Err(e);
            }
        };

        session.state().transition(Phase::Processing)?;

        let now = Local::now().naive_local();
        let mut digests = Vec::with_capacity(messages.len());
        for message in &messages {
            digests.push(pipeline::process_message(message, &self.summarizer, &self.config, now).await);
        }

        tracing::info!("Digested {} messages from {}", digests.len(), mailbox);
        session.state().finish(digests)
    }

    async fn fetch_messages(&self, credentials: &Credentials, mailbox: &str) -> DigestResult<Vec<Message>> {
        let mut session = self.connector.connect(credentials).await?;
        let result = fetch_recent(&mut session, mailbox, self.config.fetch.limit).await;
        session.logout().await;
        result
    }

    pub async fn list_mailboxes(&self, credentials: &Credentials) -> DigestResult<Vec<String>> {
        let mut session = self.connector.connect(credentials).await?;
        let result = session.list_mailboxes().await;
        session.logout().await;
        result
    }

    pub async fn fetch_attachment(
        &self,
        credentials: &Credentials,
        mailbox: &str,
        uid: u32,
        index: usize,
    ) -> DigestResult<AttachmentData> {
        let mut session = self.connector.connect(credentials).await?;
        let result = session.fetch_attachment(mailbox, uid, index).await;
        session.logout().await;
        result
    }
}

/// Fails a refresh that was cancelled while fetching or processing.
struct InterruptGuard<'a>(&'a Session);

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state();
        if state.phase.is_busy() {
            state.fail(&DigestError::Connectivity(
                "refresh was interrupted before it finished".into(),
            ));
        }
    }
}

/// Newest messages first. A message deleted between listing and fetching
/// is skipped; any other error aborts.
async fn fetch_recent<M: MailSession>(
    session: &mut M,
    mailbox: &str,
    limit: usize,
) -> DigestResult<Vec<Message>> {
    let headers = session.list_recent(mailbox, limit).await?;
    let mut messages = Vec::with_capacity(headers.len());
    for header in headers {
        match session.fetch_message(mailbox, header.uid).await {
            Ok(message) => messages.push(message),
            Err(DigestError::NotFound { uid, .. }) => {
                tracing::warn!("Message {} disappeared from {} before fetch", uid, mailbox);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(messages)
}
