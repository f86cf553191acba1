//! Rule-based sentence segmentation.
//!
//! Sentences end at `.`, `!` or `?` followed by whitespace and a
//! non-lowercase character. Lines end a sentence too, except when a long
//! line is hard-wrapped into a lowercase continuation.

use std::ops::Range;

/// Lines at least this long may be wrapped prose.
const WRAP_MIN_CHARS: usize = 60;

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "no", "approx", "dept", "a.m", "p.m", "jan", "feb", "mar", "apr", "jun", "jul", "aug",
    "sep", "sept", "oct", "nov", "dec",
];

/// Byte ranges of every sentence in `text`, trimmed of surrounding whitespace.
pub fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    for block in blocks(text) {
        split_block(text, block, &mut spans);
    }
    spans
}

/// Group lines into blocks that may hold several sentences.
fn blocks(text: &str) -> Vec<Range<usize>> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        if !content.trim().is_empty() {
            lines.push(offset..offset + content.len());
        }
        offset += line.len();
    }

    let mut blocks: Vec<Range<usize>> = Vec::new();
    let mut previous: Option<Range<usize>> = None;
    for line in lines {
        let joins = previous.as_ref().is_some_and(|prev| {
            let prev_text = text[prev.clone()].trim_end();
            let adjacent = text[prev.end..line.start].matches('\n').count() == 1;
            adjacent
                && prev_text.chars().count() >= WRAP_MIN_CHARS
                && !prev_text.ends_with(['.', '!', '?', ':'])
                && text[line.clone()].trim_start().starts_with(char::is_lowercase)
        });

        match blocks.last_mut() {
            Some(block) if joins => block.end = line.end,
            _ => blocks.push(line.clone()),
        }
        previous = Some(line);
    }
    blocks
}

fn split_block(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let block = &text[range.clone()];
    let mut start = 0;
    let mut chars = block.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, n)) = chars.peek() {
            if !matches!(n, '.' | '!' | '?' | '"' | '\'' | ')' | '\u{201d}' | '\u{2019}') {
                break;
            }
            end = j + n.len_utf8();
            chars.next();
        }

        let rest = &block[end..];
        if !rest.starts_with(char::is_whitespace) {
            continue;
        }
        let following = rest.trim_start().chars().next();
        if following.is_some_and(|f| f.is_lowercase() || f.is_ascii_digit()) {
            continue;
        }
        if c == '.' && is_abbreviation(&block[start..i]) {
            continue;
        }

        push_trimmed(text, range.start + start..range.start + end, out);
        start = end;
    }

    push_trimmed(text, range.start + start..range.end, out);
}

fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['(', '"', '\''])
        .to_lowercase();
    (word.chars().count() == 1 && word.chars().all(char::is_alphabetic))
        || ABBREVIATIONS.contains(&word.as_str())
}

fn push_trimmed(text: &str, range: Range<usize>, out: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading + trailing < slice.len() {
        out.push(range.start + leading..range.end - trailing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_sentences(text: &str) -> Vec<String> {
        sentence_spans(text)
            .into_iter()
            .map(|r| text[r].split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn test_splits_on_terminal_punctuation() {
        let sentences = split_sentences("Please send the report. Is it done? Great!");
        assert_eq!(sentences, vec!["Please send the report.", "Is it done?", "Great!"]);
    }

    #[test]
    fn test_abbreviations_do_not_split() {
        let sentences = split_sentences("Ask Dr. Smith about it, e.g. the budget. Then reply.");
        assert_eq!(sentences, vec!["Ask Dr. Smith about it, e.g. the budget.", "Then reply."]);
    }

    #[test]
    fn test_lines_are_boundaries() {
        let sentences = split_sentences("ACTION ITEMS\n- send the deck\n- book the room");
        assert_eq!(sentences, vec!["ACTION ITEMS", "- send the deck", "- book the room"]);
    }

    #[test]
    fn test_wrapped_prose_is_joined() {
        let text = "We have moved the quarterly planning review to a later slot this\n\
                    week because of the offsite. Please confirm.";
        let sentences = split_sentences(text);
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].contains("slot this week because"));
    }

    #[test]
    fn test_spans_point_into_text() {
        let text = "  Hello there.  Bye.  ";
        let spans = sentence_spans(text);
        assert_eq!(&text[spans[0].clone()], "Hello there.");
        assert_eq!(&text[spans[1].clone()], "Bye.");
    }

    #[test]
    fn test_urls_stay_whole() {
        let sentences = split_sentences("Brief is at https://example.com/brief. Thanks!");
        assert_eq!(sentences, vec!["Brief is at https://example.com/brief.", "Thanks!"]);
    }

    #[test]
    fn test_empty() {
        assert!(sentence_spans("").is_empty());
        assert!(sentence_spans(" \n\n ").is_empty());
    }
}
