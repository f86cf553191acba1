//! Error types shared by the digest pipeline.

use thiserror::Error;

use crate::app::state::Phase;

/// Failures that can reach the dashboard.
///
/// Authentication and connectivity errors abort a refresh and put the
/// session into its error state. Model failures only degrade the message
/// being summarized.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DigestError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("connection failed: {0}")]
    Connectivity(String),

    #[error("summarization model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("not connected: enter your mailbox credentials first")]
    NotConnected,

    #[error("message {uid} not found in {mailbox}")]
    NotFound { mailbox: String, uid: u32 },

    #[error("cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DigestError {
    /// Short heading used for the dashboard banner.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "Login rejected",
            Self::Connectivity(_) => "Mail server unreachable",
            Self::ModelUnavailable(_) => "Summaries unavailable",
            Self::NotConnected => "Not connected",
            Self::NotFound { .. } => "Message missing",
            Self::InvalidTransition { .. } => "Busy",
            Self::Config(_) => "Configuration problem",
        }
    }
}

pub type DigestResult<T> = Result<T, DigestError>;
