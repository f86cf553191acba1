//! Attachment annotation and detection of files mentioned in the text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::mail::{Attachment, AttachmentOrigin};

use super::context_snippet;
use super::links::url_spans;

static RE_FILENAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\w[\w\-]*\.(pdf|docx?|xlsx?|pptx?|odt|ods|jpe?g|png|gif|zip|rar|7z|txt|csv|mp4|mov|mp3|wav|ics)\b",
    )
    .unwrap()
});

/// Filename keyword groups, checked in order. A keyword matches a whole
/// token of the file stem, or the start of a token when it is at least
/// [`PREFIX_MIN_CHARS`] long ("reports", "financials").
const NAME_KEYWORDS: &[(&[&str], &str)] = &[
    (&["invoice", "receipt", "bill", "statement"], "Invoice / receipt"),
    (&["budget", "forecast", "financ", "expense", "pnl"], "Financial figures"),
    (&["contract", "agreement", "nda", "terms"], "Contract / agreement"),
    (&["resume", "cv"], "Résumé"),
    (&["agenda", "minutes"], "Meeting material"),
    (&["report"], "Report"),
    (&["deck", "slides", "presentation", "pitch"], "Presentation"),
    (&["schedule", "timeline", "roadmap", "plan"], "Schedule / plan"),
    (&["itinerary", "ticket", "boarding"], "Travel document"),
];

const PREFIX_MIN_CHARS: usize = 5;

const SIGNATURE_CUES: &[&str] = &["sign and return", "signature", "e-sign", "countersign", "please sign"];

/// Annotate the message's own attachments and append files that are only
/// mentioned in `text`.
pub fn annotate_attachments(attachments: &[Attachment], text: &str) -> Vec<Attachment> {
    let lower = text.to_lowercase();

    let mut result: Vec<Attachment> = attachments
        .iter()
        .map(|a| {
            let context = find_mention(text, &lower, &a.filename);
            let purpose = infer_purpose(&a.filename, context.as_deref().unwrap_or_default());
            Attachment {
                purpose: Some(purpose.to_string()),
                context,
                ..a.clone()
            }
        })
        .collect();

    let mut known: HashSet<String> = attachments.iter().map(|a| a.filename.to_lowercase()).collect();
    let urls = url_spans(text);

    for m in RE_FILENAME.find_iter(text) {
        if urls.iter().any(|u| m.start() >= u.start && m.start() < u.end) {
            continue;
        }
        let filename = m.as_str();
        if !known.insert(filename.to_lowercase()) {
            continue;
        }

        let context = context_snippet(text, m.start(), m.end());
        let purpose = infer_purpose(filename, context.as_deref().unwrap_or_default());
        result.push(Attachment {
            filename: filename.to_string(),
            mime_type: mime_from_extension(filename).to_string(),
            size: None,
            index: None,
            origin: AttachmentOrigin::Mentioned,
            purpose: Some(purpose.to_string()),
            context,
        });
    }

    result
}

fn find_mention(text: &str, lower: &str, filename: &str) -> Option<String> {
    let needle = filename.to_lowercase();
    // Lowercasing can shift byte offsets for some scripts; only trust exact-length matches
    if lower.len() != text.len() {
        return None;
    }
    let start = lower.find(&needle)?;
    context_snippet(text, start, start + needle.len())
}

/// Label a file by what it is probably for.
pub fn infer_purpose(filename: &str, context: &str) -> &'static str {
    let context = context.to_lowercase();
    if SIGNATURE_CUES.iter().any(|cue| context.contains(cue)) {
        return "Needs signature";
    }

    let name = filename.to_lowercase();
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(&name);
    let tokens: Vec<&str> = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    for (keywords, label) in NAME_KEYWORDS {
        if keywords
            .iter()
            .any(|k| tokens.iter().any(|t| keyword_matches(t, k)))
        {
            return label;
        }
    }

    match extension(&name) {
        "pdf" | "doc" | "docx" | "odt" | "txt" => "Document",
        "xls" | "xlsx" | "ods" | "csv" => "Spreadsheet",
        "ppt" | "pptx" | "key" => "Presentation",
        "jpg" | "jpeg" | "png" | "gif" | "heic" => "Image",
        "zip" | "rar" | "7z" | "gz" | "tar" => "Archive",
        "mp4" | "mov" => "Video",
        "mp3" | "wav" | "m4a" => "Audio",
        "ics" => "Calendar invite",
        _ => "File",
    }
}

fn keyword_matches(token: &str, keyword: &str) -> bool {
    token == keyword || (keyword.len() >= PREFIX_MIN_CHARS && token.starts_with(keyword))
}

fn extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default()
}

pub fn mime_from_extension(filename: &str) -> &'static str {
    match extension(&filename.to_lowercase()) {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "rar" => "application/vnd.rar",
        "7z" => "application/x-7z-compressed",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ics" => "text/calendar",
        _ => "application/octet-stream",
    }
}
