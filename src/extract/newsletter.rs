//! Newsletter detection and section splitting.
//!
//! A newsletter is recognised from layout markers (unsubscribe links,
//! "view in browser" banners, issue tables of contents) together with
//! heading lines. Detected text is split at the headings so the dashboard
//! can show each block as written.

use std::collections::HashSet;
use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use serde::Serialize;

const MARKERS: &[&str] = &[
    "unsubscribe",
    "view in browser",
    "view this email in your browser",
    "view online",
    "manage preferences",
    "manage your preferences",
    "email preferences",
    "in this issue",
    "in today's issue",
    "newsletter",
    "top stories",
    "this week's",
    "read more",
    "you're receiving this",
    "you are receiving this",
    "forward to a friend",
    "sponsored by",
];

static MARKER_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(MARKERS)
        .unwrap()
});

/// One block of a newsletter: its heading and the text under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub heading: Option<String>,
    pub body: String,
}

/// Number of distinct layout markers present.
fn marker_count(text: &str) -> usize {
    MARKER_MATCHER
        .find_overlapping_iter(text)
        .map(|m| m.pattern())
        .collect::<HashSet<_>>()
        .len()
}

fn is_underline(line: &str) -> bool {
    let line = line.trim();
    line.len() >= 3 && (line.chars().all(|c| c == '=') || line.chars().all(|c| c == '-'))
}

/// Heading text if `line` is a markdown or ALL-CAPS heading.
fn inline_heading(line: &str) -> Option<String> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('#') {
        let title = rest.trim_start_matches('#').trim();
        return (!title.is_empty()).then(|| title.to_string());
    }

    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    let is_caps = letters >= 3
        && line.chars().count() <= 80
        && line.chars().filter(|c| c.is_alphabetic()).all(|c| c.is_uppercase())
        && !line.ends_with(['.', ',', ';']);
    is_caps.then(|| line.trim_end_matches(':').trim().to_string())
}

enum LineKind {
    Heading(String),
    /// Setext underline below a heading
    Skip,
    Body,
}

/// Classify every line; the result has the same length as `lines`.
fn classify_lines(lines: &[&str]) -> Vec<LineKind> {
    let mut kinds = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let next_is_underline = lines.get(i + 1).is_some_and(|n| is_underline(n));
        if !line.trim().is_empty() && !is_underline(line) && next_is_underline {
            kinds.push(LineKind::Heading(line.trim().to_string()));
            kinds.push(LineKind::Skip);
            i += 2;
            continue;
        }
        kinds.push(match inline_heading(line) {
            Some(title) => LineKind::Heading(title),
            None => LineKind::Body,
        });
        i += 1;
    }
    kinds
}

fn heading_count(text: &str) -> usize {
    let lines: Vec<&str> = text.lines().collect();
    classify_lines(&lines)
        .iter()
        .filter(|k| matches!(k, LineKind::Heading(_)))
        .count()
}

/// Whether the text looks like a structured newsletter template.
pub fn is_newsletter(text: &str) -> bool {
    let markers = marker_count(text);
    if markers == 0 {
        return false;
    }
    let headings = heading_count(text);
    (markers >= 2 && headings >= 2) || (headings >= 3 && markers >= 1)
}

/// Split at heading lines. Sections keep the original order and body text;
/// text before the first heading becomes a section without a heading.
pub fn split_sections(text: &str) -> Vec<Section> {
    let lines: Vec<&str> = text.lines().collect();
    let kinds = classify_lines(&lines);

    let mut sections = Vec::new();
    let mut heading: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();

    for (line, kind) in lines.iter().copied().zip(kinds) {
        match kind {
            LineKind::Heading(title) => {
                push_section(&mut sections, heading.take(), &mut body);
                heading = Some(title);
            }
            LineKind::Skip => {}
            LineKind::Body => body.push(line),
        }
    }
    push_section(&mut sections, heading, &mut body);

    sections
}

fn push_section(sections: &mut Vec<Section>, heading: Option<String>, body: &mut Vec<&str>) {
    let text = body.join("\n").trim_matches('\n').to_string();
    body.clear();
    if heading.is_some() || !text.trim().is_empty() {
        sections.push(Section { heading, body: text });
    }
}
