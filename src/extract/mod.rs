//! Text extraction: turns a fetched message into clean text, links,
//! annotated attachments and, for newsletters, verbatim sections.
//!
//! - `normalize.rs` - body selection, HTML conversion, quote and footer removal
//! - `links.rs` - URL discovery, deduplication and purpose labels
//! - `attachments.rs` - attachment purpose labels and mentioned files
//! - `newsletter.rs` - template detection and section splitting
//!
//! Everything here is pure: the same message always gives the same output.

pub mod attachments;
pub mod links;
pub mod newsletter;
pub mod normalize;

use serde::Serialize;

use crate::constants::{CONTEXT_FALLBACK_RADIUS, MIN_CONTEXT_CHARS};
use crate::facts::sentences::sentence_spans;
use crate::mail::{Attachment, Message};

pub use links::Link;
pub use newsletter::Section;

/// Sentences longer than this are replaced by a window around the match.
const MAX_SENTENCE_CONTEXT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub text: String,
    pub links: Vec<Link>,
    pub attachments: Vec<Attachment>,
    /// Present only when newsletter mode is on and the text is a newsletter
    pub sections: Option<Vec<Section>>,
}

pub fn extract(message: &Message, newsletter_mode: bool) -> Extraction {
    let text = normalize::normalize_body(&message.body);
    let links = links::extract_links(&text);
    let attachments = attachments::annotate_attachments(&message.attachments, &text);

    let sections = (newsletter_mode && newsletter::is_newsletter(&text))
        .then(|| newsletter::split_sections(&text));

    tracing::debug!(
        "Extracted uid {}: {} chars, {} links, {} attachments, newsletter={}",
        message.uid,
        text.len(),
        links.len(),
        attachments.len(),
        sections.is_some()
    );

    Extraction {
        text,
        links,
        attachments,
        sections,
    }
}

/// The sentence around `start..end`, or a window of nearby text when the
/// sentence is unusually long. `None` if nothing meaningful remains.
pub(crate) fn context_snippet(text: &str, start: usize, end: usize) -> Option<String> {
    let sentence = sentence_spans(text)
        .into_iter()
        .find(|s| s.start <= start && end <= s.end)
        .filter(|s| text[s.clone()].chars().count() <= MAX_SENTENCE_CONTEXT);

    let raw = match sentence {
        Some(span) => &text[span],
        None => {
            let mut from = start.saturating_sub(CONTEXT_FALLBACK_RADIUS);
            while !text.is_char_boundary(from) {
                from -= 1;
            }
            let mut to = (end + CONTEXT_FALLBACK_RADIUS).min(text.len());
            while !text.is_char_boundary(to) {
                to += 1;
            }
            &text[from..to]
        }
    };

    let snippet = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (snippet.chars().count() >= MIN_CONTEXT_CHARS).then_some(snippet)
}
