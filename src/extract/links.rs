//! URL discovery and labelling.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use super::context_snippet;

static RE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"'()\[\]{}]+"#).unwrap());

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '*', '>'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub url: String,
    pub context: Option<String>,
    pub purpose: String,
}

/// A URL occurrence in the text, by byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UrlSpan {
    pub start: usize,
    pub end: usize,
}

/// Byte ranges of every URL in `text`, trailing punctuation excluded.
pub(crate) fn url_spans(text: &str) -> Vec<UrlSpan> {
    RE_URL
        .find_iter(text)
        .filter_map(|m| {
            let trimmed = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            (!trimmed.is_empty()).then(|| UrlSpan {
                start: m.start(),
                end: m.start() + trimmed.len(),
            })
        })
        .collect()
}

/// Collect links in order of first appearance, one per distinct URL.
pub fn extract_links(text: &str) -> Vec<Link> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for span in url_spans(text) {
        let raw = &text[span.start..span.end];
        let Some(parsed) = parse_url(raw) else {
            continue;
        };
        if !seen.insert(dedup_key(&parsed)) {
            continue;
        }

        let context = context_snippet(text, span.start, span.end);
        let purpose = link_purpose(&parsed, context.as_deref().unwrap_or_default());
        links.push(Link {
            url: if raw.to_ascii_lowercase().starts_with("www.") {
                parsed.to_string()
            } else {
                raw.to_string()
            },
            context,
            purpose: purpose.to_string(),
        });
    }

    links
}

fn parse_url(raw: &str) -> Option<Url> {
    let candidate = if raw.to_ascii_lowercase().starts_with("www.") {
        format!("https://{}", raw)
    } else {
        raw.to_string()
    };
    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(url)
}

/// Host (lowercased by the parser), path and query. Scheme, fragment and a
/// trailing slash do not make a link distinct.
fn dedup_key(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    let mut key = format!("{}{}", url.host_str().unwrap_or_default(), path);
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

/// Guess why a link is in the email from its host, path and sentence.
pub fn link_purpose(url: &Url, context: &str) -> &'static str {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let path = url.path().to_ascii_lowercase();
    let context = context.to_ascii_lowercase();
    let target = format!("{}{}", host, path);

    let has = |needles: &[&str], hay: &str| needles.iter().any(|n| hay.contains(n));

    if has(&["unsubscribe", "opt-out", "optout", "preferences"], &target) {
        "Unsubscribe / preferences"
    } else if has(&["zoom.us", "meet.google.", "teams.microsoft.", "webex.", "whereby."], &host) {
        "Meeting link"
    } else if has(
        &["docs.google.", "drive.google.", "dropbox.", "onedrive.", "sharepoint.", "box.com", "notion.so"],
        &host,
    ) {
        "Shared document"
    } else if has(&["calendar", "calendly", ".ics"], &target) {
        "Calendar"
    } else if has(&["github.", "gitlab.", "bitbucket."], &host) {
        "Code repository"
    } else if has(&["login", "signin", "sign-in", "password", "reset", "verify"], &path) {
        "Account access"
    } else if has(&["track", "shipment", "delivery"], &target) {
        "Shipment tracking"
    } else if has(&["invoice", "billing", "pay", "checkout"], &target) {
        "Payment"
    } else if has(&[".pdf", ".zip", ".docx", ".xlsx", ".pptx", ".csv"], &path) {
        "File download"
    } else if has(&["register", "sign up", "signup", "rsvp", "apply"], &context)
        || has(&["register", "signup", "rsvp"], &path)
    {
        "Registration"
    } else {
        "Reference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_and_trims_punctuation() {
        let text = "Brief is at https://example.com/brief. Thanks!";
        let links = extract_links(text);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://example.com/brief");
        assert_eq!(links[0].purpose, "Reference");
        assert_eq!(links[0].context.as_deref(), Some("Brief is at https://example.com/brief."));
    }

    #[test]
    fn test_deduplicates_by_url() {
        let text = "See https://Example.com/a and again https://example.com/a/ \
                    plus https://example.com/a#top and https://example.com/b";
        let urls: Vec<String> = extract_links(text).into_iter().map(|l| l.url).collect();
        assert_eq!(urls, vec!["https://Example.com/a", "https://example.com/b"]);
    }

    #[test]
    fn test_www_links_get_scheme() {
        let links = extract_links("Visit www.example.org/events for details");
        assert_eq!(links[0].url, "https://www.example.org/events");
    }

    #[test]
    fn test_purpose_labels() {
        let purpose = |u: &str, ctx: &str| link_purpose(&Url::parse(u).unwrap(), ctx);
        assert_eq!(purpose("https://zoom.us/j/123", ""), "Meeting link");
        assert_eq!(purpose("https://news.example.com/unsubscribe?id=1", ""), "Unsubscribe / preferences");
        assert_eq!(purpose("https://docs.google.com/document/d/1", ""), "Shared document");
        assert_eq!(purpose("https://example.com/files/q3.pdf", ""), "File download");
        assert_eq!(purpose("https://example.com/event", "Register here before Friday"), "Registration");
        assert_eq!(purpose("https://example.com/brief", ""), "Reference");
    }

    #[test]
    fn test_no_links() {
        assert!(extract_links("no urls here, just example dot com").is_empty());
    }
}
