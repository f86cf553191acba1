//! Action item and question detection.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

const ACTION_CUES: &[&str] = &[
    "please",
    "kindly",
    "could you",
    "can you",
    "would you",
    "need to",
    "needs to",
    "must",
    "make sure",
    "be sure to",
    "action required",
    "action item",
    "required to",
    "don't forget",
    "do not forget",
    "remember to",
    "let me know",
    "you should",
    "we should",
    "todo",
];

/// Sentence openers read as instructions. "See" is left out on purpose:
/// "see attached" and "see below" are pointers, not requests.
const IMPERATIVE_VERBS: &[&str] = &[
    "add", "approve", "attend", "book", "bring", "call", "check", "complete", "confirm",
    "contact", "email", "fill", "finish", "follow", "forward", "join", "pay", "prepare", "print",
    "read", "register", "reply", "respond", "return", "review", "rsvp", "schedule", "send",
    "share", "sign", "submit", "update", "upload", "verify",
];

static ACTION_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build(ACTION_CUES)
        .unwrap()
});

/// Drop list bullets and numbering in front of a sentence.
pub fn strip_bullet(sentence: &str) -> &str {
    let trimmed = sentence.trim_start_matches(['-', '*', '•', '>', ' ', '\t']);
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    trimmed
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    before.is_none_or(|c| !c.is_alphanumeric()) && after.is_none_or(|c| !c.is_alphanumeric())
}

/// Whether a sentence asks the reader to do something.
pub fn is_action(sentence: &str) -> bool {
    let sentence = strip_bullet(sentence);

    let has_cue = ACTION_MATCHER
        .find_iter(sentence)
        .any(|m| is_word_boundary(sentence, m.start(), m.end()));
    if has_cue {
        return true;
    }

    let first = sentence
        .split(|c: char| !c.is_alphanumeric())
        .next()
        .unwrap_or_default()
        .to_lowercase();
    IMPERATIVE_VERBS.contains(&first.as_str())
}

/// Whether a sentence is phrased as a question.
pub fn is_question(sentence: &str) -> bool {
    sentence
        .trim_end()
        .trim_end_matches(['"', '\'', ')', '\u{201d}'])
        .ends_with('?')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_cues() {
        assert!(is_action("Please send the report by next Friday."));
        assert!(is_action("Could you take a look at the draft?"));
        assert!(is_action("We need to finalize the venue."));
        assert!(is_action("ACTION REQUIRED: renew your certificate"));
    }

    #[test]
    fn test_imperative_openers() {
        assert!(is_action("Review the attached slides before the call."));
        assert!(is_action("- sign the form"));
        assert!(is_action("2. Submit your timesheet"));
        assert!(!is_action("See attached budget.xlsx and https://example.com/brief"));
    }

    #[test]
    fn test_cues_need_word_boundaries() {
        assert!(!is_action("The mustard arrived yesterday."));
        assert!(!is_action("Thanks for a great meeting."));
    }

    #[test]
    fn test_questions() {
        assert!(is_question("Is the budget final?"));
        assert!(is_question("Did you see \"the memo?\""));
        assert!(!is_question("The budget is final."));
    }

    #[test]
    fn test_strip_bullet() {
        assert_eq!(strip_bullet("- item"), "item");
        assert_eq!(strip_bullet("3) third"), "third");
        assert_eq!(strip_bullet("2025 plans"), "2025 plans");
    }
}
