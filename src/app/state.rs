//! Per-session state
//!
//! One browser session moves through
//! `Idle -> Fetching -> Processing -> Displaying`, back to `Idle` when the
//! user refreshes, and into `Error` when the mailbox cannot be read.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DigestError, DigestResult};
use crate::mail::Credentials;

use super::pipeline::{Digest, SummaryStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Fetching,
    Processing,
    Displaying,
    Error,
}

impl Phase {
    pub fn can_transition(self, to: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, to),
            (Idle, Fetching)
                | (Fetching, Processing)
                | (Fetching, Error)
                | (Processing, Displaying)
                | (Processing, Error)
                | (Displaying, Idle)
                | (Error, Fetching)
                | (Error, Idle)
        )
    }

    /// A refresh is running and the page should poll.
    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Fetching | Phase::Processing)
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::Fetching => "Fetching mail",
            Phase::Processing => "Summarizing",
            Phase::Displaying => "Up to date",
            Phase::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    Info,
    Notice,
    Error,
}

/// Message shown above the digest list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub title: String,
    pub message: String,
}

impl Banner {
    pub fn info(title: impl ToString, message: impl ToString) -> Self {
        Self {
            level: BannerLevel::Info,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    pub fn notice(title: impl ToString, message: impl ToString) -> Self {
        Self {
            level: BannerLevel::Notice,
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    pub fn from_error(error: &DigestError) -> Self {
        Self {
            level: BannerLevel::Error,
            title: error.title().to_string(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: Phase,
    pub banner: Option<Banner>,
    pub credentials: Option<Credentials>,
    pub mailbox: String,
    pub digests: Vec<Digest>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(mailbox: &str) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            ..Self::default()
        }
    }

    pub fn transition(&mut self, to: Phase) -> DigestResult<()> {
        if !self.phase.can_transition(to) {
            return Err(DigestError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Session phase {:?} -> {:?}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    /// Enter `Fetching` from any resting phase.
    pub fn begin_refresh(&mut self) -> DigestResult<()> {
        if self.phase == Phase::Displaying {
            self.transition(Phase::Idle)?;
        }
        self.transition(Phase::Fetching)?;
        self.banner = Some(Banner::info("Refreshing", format!("Fetching {}", self.mailbox)));
        Ok(())
    }

    /// Abort the refresh with an error banner. Digests from an earlier
    /// refresh are dropped so stale results are not shown as current.
    pub fn fail(&mut self, error: &DigestError) {
        tracing::warn!("Refresh failed: {}", error);
        if self.transition(Phase::Error).is_err() {
            self.phase = Phase::Error;
        }
        self.digests.clear();
        self.banner = Some(Banner::from_error(error));
    }

    /// Store finished digests and enter `Displaying`.
    pub fn finish(&mut self, digests: Vec<Digest>) -> DigestResult<()> {
        self.transition(Phase::Displaying)?;

        let unavailable: Vec<&str> = digests
            .iter()
            .filter_map(|d| match &d.summary.status {
                SummaryStatus::Unavailable { reason } => Some(reason.as_str()),
                _ => None,
            })
            .collect();

        self.banner = match unavailable.first() {
            Some(reason) => Some(Banner::notice(
                DigestError::ModelUnavailable(String::new()).title(),
                format!(
                    "{} of {} messages could not be summarized ({}). They are shown as fetched.",
                    unavailable.len(),
                    digests.len(),
                    reason
                ),
            )),
            None if digests.is_empty() => {
                Some(Banner::info("No messages", format!("{} is empty", self.mailbox)))
            }
            None => None,
        };

        self.digests = digests;
        self.last_refresh = Some(Utc::now());
        Ok(())
    }

    /// Forget credentials and results.
    pub fn disconnect(&mut self) -> DigestResult<()> {
        match self.phase {
            Phase::Idle => {}
            Phase::Displaying | Phase::Error => self.transition(Phase::Idle)?,
            busy => {
                return Err(DigestError::InvalidTransition {
                    from: busy,
                    to: Phase::Idle,
                });
            }
        }
        self.credentials = None;
        self.digests.clear();
        self.last_refresh = None;
        self.banner = Some(Banner::info("Disconnected", "Credentials cleared from this session"));
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            banner: self.banner.clone(),
            connected: self.credentials.is_some(),
            username: self.credentials.as_ref().map(|c| c.username.clone()),
            mailbox: self.mailbox.clone(),
            last_refresh: self.last_refresh,
            digests: self.digests.clone(),
        }
    }
}

/// Serializable view of a session for the JSON API and the page renderer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub banner: Option<Banner>,
    pub connected: bool,
    pub username: Option<String>,
    pub mailbox: String,
    pub last_refresh: Option<DateTime<Utc>>,
    pub digests: Vec<Digest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut state = SessionState::new("INBOX");
        state.begin_refresh().unwrap();
        assert_eq!(state.phase, Phase::Fetching);
        state.transition(Phase::Processing).unwrap();
        state.finish(Vec::new()).unwrap();
        assert_eq!(state.phase, Phase::Displaying);

        // Refresh from Displaying passes through Idle
        state.begin_refresh().unwrap();
        assert_eq!(state.phase, Phase::Fetching);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut state = SessionState::new("INBOX");
        assert_eq!(
            state.transition(Phase::Displaying),
            Err(DigestError::InvalidTransition {
                from: Phase::Idle,
                to: Phase::Displaying
            })
        );

        state.begin_refresh().unwrap();
        assert!(state.begin_refresh().is_err());
        assert!(state.disconnect().is_err());
    }

    #[test]
    fn test_failure_sets_error_banner() {
        let mut state = SessionState::new("INBOX");
        state.begin_refresh().unwrap();
        state.fail(&DigestError::Authentication("bad password".into()));

        assert_eq!(state.phase, Phase::Error);
        let banner = state.banner.as_ref().unwrap();
        assert_eq!(banner.level, BannerLevel::Error);
        assert_eq!(banner.title, "Login rejected");

        // Retry is allowed from Error
        state.begin_refresh().unwrap();
        assert_eq!(state.phase, Phase::Fetching);
    }

    #[test]
    fn test_disconnect_clears_credentials() {
        let mut state = SessionState::new("INBOX");
        state.credentials = Some(crate::testing::fake_credentials("pw"));
        state.begin_refresh().unwrap();
        state.transition(Phase::Processing).unwrap();
        state.finish(Vec::new()).unwrap();

        state.disconnect().unwrap();
        assert_eq!(state.phase, Phase::Idle);
        assert!(state.credentials.is_none());
        assert!(!state.snapshot().connected);
    }

    #[test]
    fn test_busy_phases() {
        assert!(Phase::Fetching.is_busy());
        assert!(Phase::Processing.is_busy());
        assert!(!Phase::Displaying.is_busy());
        assert!(!Phase::Error.is_busy());
    }
}
