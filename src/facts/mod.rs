//! Fact extraction: deadlines, action items and questions.
//!
//! - `sentences.rs` - rule-based sentence segmentation
//! - `dates.rs` - date phrase detection and resolution
//! - `phrases.rs` - action and question patterns
//!
//! Extraction never fails from the caller's point of view. Problems are
//! reported as [`ExtractionWarning`], logged, and turned into empty lists.

pub mod dates;
pub mod phrases;
pub mod sentences;

use std::ops::Range;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::constants::MAX_FACT_INPUT_CHARS;

pub use dates::{DateMention, MentionKind};

/// Deadlines further out than this are only kept with a deadline cue.
pub const DEFAULT_HORIZON_DAYS: i64 = 30;

static RE_DEADLINE_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(deadline|due|by|before|until|till|no later than|expires?|expiring|submit|register|apply|last date|closes?|cut-?off)\b",
    )
    .unwrap()
});

/// Sentence segmentation and date detection, swappable in tests.
pub trait NlpBackend: Send + Sync {
    fn sentences(&self, text: &str) -> Vec<Range<usize>>;
    fn find_dates(&self, sentence: &str, now: NaiveDateTime) -> Vec<DateMention>;
}

/// Regex and rule based backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleNlp;

impl NlpBackend for RuleNlp {
    fn sentences(&self, text: &str) -> Vec<Range<usize>> {
        sentences::sentence_spans(text)
    }

    fn find_dates(&self, sentence: &str, now: NaiveDateTime) -> Vec<DateMention> {
        dates::find_dates(sentence, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Deadline {
    /// Phrase as written, e.g. "next Friday"
    pub phrase: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    /// Resolved from a relative phrase
    pub fuzzy: bool,
    /// Sentence the phrase came from
    pub snippet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facts {
    pub deadlines: Vec<Deadline>,
    pub actions: Vec<String>,
    pub questions: Vec<String>,
}

impl Facts {
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty() && self.actions.is_empty() && self.questions.is_empty()
    }
}

/// Why extraction produced nothing. Never shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionWarning {
    #[error("no text to analyse")]
    EmptyText,

    #[error("input of {len} chars exceeds the {max} char limit")]
    Oversize { len: usize, max: usize },
}

pub struct FactExtractor<N = RuleNlp> {
    nlp: N,
    horizon_days: i64,
}

impl FactExtractor<RuleNlp> {
    pub fn new(horizon_days: i64) -> Self {
        Self::with_backend(RuleNlp, horizon_days)
    }
}

impl Default for FactExtractor<RuleNlp> {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_DAYS)
    }
}

impl<N: NlpBackend> FactExtractor<N> {
    pub fn with_backend(nlp: N, horizon_days: i64) -> Self {
        Self {
            nlp,
            horizon_days: horizon_days.max(0),
        }
    }

    /// Extract facts, downgrading any warning to empty lists.
    pub fn extract(&self, text: &str, now: NaiveDateTime) -> Facts {
        match self.try_extract(text, now) {
            Ok(facts) => facts,
            Err(warning) => {
                tracing::debug!("Fact extraction skipped: {}", warning);
                Facts::default()
            }
        }
    }

    pub fn try_extract(&self, text: &str, now: NaiveDateTime) -> Result<Facts, ExtractionWarning> {
        if text.trim().is_empty() {
            return Err(ExtractionWarning::EmptyText);
        }
        let len = text.chars().count();
        if len > MAX_FACT_INPUT_CHARS {
            return Err(ExtractionWarning::Oversize {
                len,
                max: MAX_FACT_INPUT_CHARS,
            });
        }

        let today = now.date();
        let horizon = today.checked_add_days(Days::new(self.horizon_days.unsigned_abs()));
        let mut facts = Facts::default();

        for span in self.nlp.sentences(text) {
            let sentence = text[span].split_whitespace().collect::<Vec<_>>().join(" ");
            if sentence.is_empty() {
                continue;
            }

            let has_cue = RE_DEADLINE_CUE.is_match(&sentence);
            for mention in self.nlp.find_dates(&sentence, now) {
                if mention.date < today {
                    continue;
                }
                let within_horizon = horizon.is_some_and(|h| mention.date <= h);
                let keep = match mention.kind {
                    MentionKind::TimeOnly => has_cue,
                    _ => has_cue || within_horizon,
                };
                if keep {
                    push_deadline(&mut facts.deadlines, &mention, &sentence);
                }
            }

            let item = phrases::strip_bullet(&sentence).to_string();
            if phrases::is_action(&sentence) && !facts.actions.contains(&item) {
                facts.actions.push(item.clone());
            }
            if phrases::is_question(&sentence) && !facts.questions.contains(&item) {
                facts.questions.push(item);
            }
        }

        Ok(facts)
    }
}

/// Add a deadline unless the same date and time is already known. An exact
/// date replaces a fuzzy one for the same day.
fn push_deadline(deadlines: &mut Vec<Deadline>, mention: &DateMention, sentence: &str) {
    let deadline = Deadline {
        phrase: mention.phrase.clone(),
        date: Some(mention.date),
        time: mention.time,
        fuzzy: mention.is_fuzzy(),
        snippet: sentence.to_string(),
    };

    match deadlines
        .iter_mut()
        .find(|d| d.date == deadline.date && d.time == deadline.time)
    {
        Some(existing) if existing.fuzzy && !deadline.fuzzy => *existing = deadline,
        Some(_) => {}
        None => deadlines.push(deadline),
    }
}

/// Extract facts with the rule backend and the default horizon.
pub fn extract_facts(text: &str, now: NaiveDateTime) -> Facts {
    FactExtractor::default().extract(text, now)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wednesday, 5 March 2025
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_report_scenario() {
        let text = "Please send the report by next Friday. \
                    See attached budget.xlsx and https://example.com/brief";
        let facts = extract_facts(text, now());

        assert_eq!(facts.deadlines.len(), 1);
        let deadline = &facts.deadlines[0];
        assert!(deadline.fuzzy);
        assert_eq!(deadline.date, date(2025, 3, 7));
        assert_eq!(deadline.snippet, "Please send the report by next Friday.");

        assert_eq!(facts.actions.len(), 1);
        assert!(facts.actions[0].contains("send the report"));
        assert!(facts.questions.is_empty());
    }

    #[test]
    fn test_exact_deadline() {
        let facts = extract_facts("The application deadline is March 5, 2025 at 5pm.", now());
        assert_eq!(facts.deadlines.len(), 1);
        assert_eq!(facts.deadlines[0].date, date(2025, 3, 5));
        assert_eq!(facts.deadlines[0].time, NaiveTime::from_hms_opt(17, 0, 0));
        assert!(!facts.deadlines[0].fuzzy);
    }

    #[test]
    fn test_empty_text_yields_empty_lists() {
        assert!(extract_facts("", now()).is_empty());
        assert!(extract_facts("   \n\n", now()).is_empty());
        assert_eq!(
            FactExtractor::default().try_extract("", now()),
            Err(ExtractionWarning::EmptyText)
        );
    }

    #[test]
    fn test_oversize_input_is_a_warning() {
        let text = "Please reply. ".repeat(MAX_FACT_INPUT_CHARS / 10);
        let result = FactExtractor::default().try_extract(&text, now());
        assert!(matches!(result, Err(ExtractionWarning::Oversize { .. })));
        assert!(extract_facts(&text, now()).is_empty());
    }

    #[test]
    fn test_past_and_distant_dates() {
        let facts = extract_facts("We met on January 10, 2025 to plan.", now());
        assert!(facts.deadlines.is_empty());

        let facts = extract_facts("The conference is on October 20, 2025.", now());
        assert!(facts.deadlines.is_empty());

        let facts = extract_facts("Abstracts are due October 20, 2025.", now());
        assert_eq!(facts.deadlines.len(), 1);
    }

    #[test]
    fn test_time_only_needs_cue() {
        let facts = extract_facts("Lunch is at noon.", now());
        assert!(facts.deadlines.is_empty());

        let facts = extract_facts("Submit your slides before 3pm.", now());
        assert_eq!(facts.deadlines.len(), 1);
        assert_eq!(facts.deadlines[0].date, date(2025, 3, 5));
        assert!(facts.deadlines[0].fuzzy);
    }

    #[test]
    fn test_duplicates_prefer_exact() {
        let text = "Deliver it Friday. To be clear, the deadline is March 7, 2025.";
        let facts = extract_facts(text, now());
        assert_eq!(facts.deadlines.len(), 1);
        assert!(!facts.deadlines[0].fuzzy);
        assert_eq!(facts.deadlines[0].phrase, "March 7, 2025");
    }

    #[test]
    fn test_questions_collected() {
        let facts = extract_facts("Hi Ana. Are you free Thursday? Can we move the call?", now());
        assert_eq!(
            facts.questions,
            vec!["Are you free Thursday?", "Can we move the call?"]
        );
    }

    struct NoSentences;

    impl NlpBackend for NoSentences {
        fn sentences(&self, _text: &str) -> Vec<Range<usize>> {
            Vec::new()
        }

        fn find_dates(&self, _sentence: &str, _now: NaiveDateTime) -> Vec<DateMention> {
            Vec::new()
        }
    }

    #[test]
    fn test_custom_backend() {
        let extractor = FactExtractor::with_backend(NoSentences, 30);
        assert!(extractor.extract("Please reply by tomorrow.", now()).is_empty());
    }
}
