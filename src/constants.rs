//! Application-wide constants for tuning and configuration
//!
//! Centralizes magic numbers to make them discoverable.

/// Text returned instead of calling the model when a message has no content.
pub const EMPTY_SUMMARY_TEXT: &str = "No content to summarize.";

/// Implicit-TLS IMAP port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Column width used when rendering HTML bodies as text.
pub const HTML_RENDER_WIDTH: usize = 100;

/// Characters of surrounding text kept when a sentence is unavailable as context.
pub const CONTEXT_FALLBACK_RADIUS: usize = 80;

/// Context snippets shorter than this are dropped as noise.
pub const MIN_CONTEXT_CHARS: usize = 10;

/// Upper bound on text handed to the fact extractor.
/// Longer bodies are usually mailing list digests where rules misfire.
pub const MAX_FACT_INPUT_CHARS: usize = 50_000;

/// Seconds between dashboard auto-reloads while a refresh is running.
pub const BUSY_RELOAD_SECS: u64 = 2;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "digest_session";

/// Random bytes in a session id (hex encoded on the wire).
pub const SESSION_ID_BYTES: usize = 16;

/// Maximum body accepted by the connect form.
pub const MAX_FORM_BYTES: usize = 16 * 1024;
