//! Raw body to clean plain text.

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::HTML_RENDER_WIDTH;
use crate::mail::EmailBody;

static RE_REPLY_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^on\s.+\swrote:$").unwrap());

static RE_ORIGINAL_MESSAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[-_=]{2,}\s*original message\s*[-_=]{2,}$").unwrap());

static RE_LIST_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(to unsubscribe from this group|you received this message because)").unwrap()
});

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\u{00a0}\u{200b}]+").unwrap());

/// Pick the best body part and normalize it.
pub fn normalize_body(body: &EmailBody) -> String {
    if body.is_empty() {
        return String::new();
    }
    if let Some(text) = body.text.as_deref().filter(|t| !t.trim().is_empty()) {
        return normalize_text(text);
    }

    match body.html.as_deref() {
        Some(html) => normalize_text(&html_to_text(html)),
        None => String::new(),
    }
}

fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), HTML_RENDER_WIDTH) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("html2text failed ({}), stripping tags", e);
            RE_TAG.replace_all(html, " ").into_owned()
        }
    }
}

/// Strip quoted replies, forwarded originals, list footers and signatures,
/// then tidy whitespace. Applying it twice changes nothing.
pub fn normalize_text(raw: &str) -> String {
    let lines: Vec<String> = raw
        .lines()
        .map(|line| RE_SPACES.replace_all(line, " ").trim().to_string())
        .collect();

    let end = body_end(&lines);

    let mut out: Vec<&str> = Vec::with_capacity(end);
    for line in &lines[..end] {
        if line.starts_with('>') {
            continue;
        }
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }

    out.join("\n")
}

/// Index of the first line that starts trailing noise.
fn body_end(lines: &[String]) -> usize {
    for (i, line) in lines.iter().enumerate() {
        if line == "--" && i > 0 {
            return i;
        }
        if RE_ORIGINAL_MESSAGE.is_match(line) || RE_LIST_FOOTER.is_match(line) {
            return i;
        }
        if RE_REPLY_HEADER.is_match(line) {
            let next = lines[i + 1..].iter().find(|l| !l.is_empty());
            if next.is_some_and(|l| l.starts_with('>')) {
                return i;
            }
        }
    }
    lines.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        let text = "Hello   there,\t\tfriend\n\n\n\nSecond   paragraph  \n";
        assert_eq!(normalize_text(text), "Hello there, friend\n\nSecond paragraph");
    }

    #[test]
    fn test_drops_quoted_reply() {
        let text = "Sounds good, see you then.\n\n\
                    On Tue, Mar 4, 2025 at 9:00 AM Bob <bob@example.com> wrote:\n\
                    > Can we meet Thursday?\n\
                    > Bob";
        assert_eq!(normalize_text(text), "Sounds good, see you then.");
    }

    #[test]
    fn test_keeps_wrote_line_without_quote() {
        let text = "On reflection she wrote:\nthe plan is fine.";
        assert_eq!(normalize_text(text), text);
    }

    #[test]
    fn test_drops_signature_and_list_footer() {
        let text = "Agenda attached.\n--\nAlice\nCEO";
        assert_eq!(normalize_text(text), "Agenda attached.");

        let text = "Meetup on Friday.\n\nTo unsubscribe from this group, send an email to x";
        assert_eq!(normalize_text(text), "Meetup on Friday.");
    }

    #[test]
    fn test_drops_forwarded_original() {
        let text = "FYI below.\n\n-----Original Message-----\nFrom: someone";
        assert_eq!(normalize_text(text), "FYI below.");
    }

    #[test]
    fn test_html_body_is_converted() {
        let body = EmailBody {
            text: None,
            html: Some("<html><body><p>Hello <b>world</b></p><p>Second</p></body></html>".into()),
        };
        let text = normalize_body(&body);
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_prefers_text_part() {
        let body = EmailBody {
            text: Some("plain version".into()),
            html: Some("<p>html version</p>".into()),
        };
        assert_eq!(normalize_body(&body), "plain version");
    }

    #[test]
    fn test_blank_parts_give_empty_text() {
        let body = EmailBody {
            text: Some("  \n ".into()),
            html: Some("   ".into()),
        };
        assert!(body.is_empty());
        assert_eq!(normalize_body(&body), "");
        assert_eq!(normalize_body(&EmailBody::default()), "");
    }

    #[test]
    fn test_idempotent() {
        let raw = "  Hi team,\n\n\n> old quote\nPlease   review.\n\nOn Mon Bob wrote:\n\nthanks\n-- \nme";
        let once = normalize_text(raw);
        assert_eq!(normalize_text(&once), once);
    }
}
