//! In-memory browser sessions keyed by a random cookie value.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::config::SessionConfig;
use crate::constants::SESSION_ID_BYTES;
use crate::error::{DigestError, DigestResult};

use super::state::{SessionSnapshot, SessionState};

pub struct Session {
    pub id: String,
    state: Mutex<SessionState>,
    /// Held for the whole refresh so only one runs per session
    refresh: tokio::sync::Mutex<()>,
}

impl Session {
    fn new(id: String, mailbox: &str) -> Self {
        Self {
            id,
            state: Mutex::new(SessionState::new(mailbox)),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Lock the state. Never hold the guard across an await point.
    pub fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state().snapshot()
    }

    /// Claim the refresh slot, or `None` if a refresh is already running.
    pub fn try_begin_refresh(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        self.refresh.try_lock().ok()
    }
}

pub type SessionCache = moka::future::Cache<String, Arc<Session>>;

pub struct SessionStore {
    cache: SessionCache,
    default_mailbox: String,
}

impl SessionStore {
    pub fn new(config: &SessionConfig, default_mailbox: &str) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(Duration::from_secs(config.idle_timeout_secs))
            .build();
        Self {
            cache,
            default_mailbox: default_mailbox.to_string(),
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.cache.get(id).await
    }

    /// Look up the session for a cookie value, creating a fresh one when the
    /// cookie is missing or has expired. The flag is true for new sessions.
    pub async fn get_or_create(&self, id: Option<&str>) -> DigestResult<(Arc<Session>, bool)> {
        if let Some(id) = id
            && let Some(session) = self.get(id).await
        {
            return Ok((session, false));
        }

        let id = new_session_id()?;
        let session = Arc::new(Session::new(id.clone(), &self.default_mailbox));
        self.cache.insert(id.clone(), Arc::clone(&session)).await;
        tracing::debug!("Created session {}…", &id[..8]);
        Ok((session, true))
    }

    pub async fn remove(&self, id: &str) {
        self.cache.invalidate(id).await;
    }

    /// Approximate number of live sessions.
    pub fn active_sessions(&self) -> u64 {
        self.cache.entry_count()
    }
}

/// Hex-encoded random session id.
pub fn new_session_id() -> DigestResult<String> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    getrandom::fill(&mut bytes)
        .map_err(|e| DigestError::Config(format!("failed to generate session id: {}", e)))?;
    Ok(bytes.iter().map(|b| format!("{:02x}", b)).collect())
}
