//! Inbox digest: fetch recent mail over IMAP, pull out links, attachments,
//! deadlines, action items and questions, summarize each message with a
//! hosted model and serve the result as a local dashboard.
//!
//! - `mail` - IMAP access and MIME parsing
//! - `extract` - text normalization, links, attachments, newsletter sections
//! - `facts` - deadlines, actions and questions
//! - `ai` - summarization client
//! - `app` - sessions and the refresh state machine
//! - `web` - axum routes and HTML

pub mod ai;
pub mod app;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod facts;
pub mod mail;
#[cfg(test)]
mod testing;
pub mod web;
