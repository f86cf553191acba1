//! Abstractive summarization through a hosted model
//!
//! The model sits behind the [`Summarizer`] trait. [`summarize`] adds the
//! parts that never need the network: URL stripping, input truncation, the
//! empty-message shortcut and the output length bound.

mod client;
mod prompts;

use std::future::Future;

use crate::config::SummarizerConfig;
use crate::constants::EMPTY_SUMMARY_TEXT;
use crate::error::DigestResult;
use crate::extract::links::url_spans;

pub use client::ModelClient;

/// A backend that turns prepared text into a summary.
pub trait Summarizer: Send + Sync + 'static {
    fn summarize(&self, input: &str) -> impl Future<Output = DigestResult<String>> + Send;
}

impl Summarizer for ModelClient {
    async fn summarize(&self, input: &str) -> DigestResult<String> {
        self.generate(input).await
    }
}

/// Summarize `text`, bounded by `config.max_summary_chars`.
///
/// Text with nothing left after URL stripping gets [`EMPTY_SUMMARY_TEXT`]
/// without a model call.
pub async fn summarize<S: Summarizer>(
    summarizer: &S,
    text: &str,
    config: &SummarizerConfig,
) -> DigestResult<String> {
    let input = prepare_input(text, config.max_input_chars);
    if input.is_empty() {
        return Ok(bound_summary(EMPTY_SUMMARY_TEXT, config.max_summary_chars));
    }

    let summary = summarizer.summarize(&input).await?;
    Ok(bound_summary(&summary, config.max_summary_chars))
}

/// Remove URLs, fold whitespace and cut to `max_chars` at a word boundary.
pub fn prepare_input(text: &str, max_chars: usize) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut last = 0;
    for span in url_spans(text) {
        stripped.push_str(&text[last..span.start]);
        stripped.push(' ');
        last = span.end;
    }
    stripped.push_str(&text[last..]);

    let folded = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_at_word(&folded, max_chars).to_string()
}

fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text;
    };
    let head = &text[..cut];
    match head.rfind(' ') {
        Some(space) if space > cut / 2 => &head[..space],
        _ => head,
    }
}

/// Shorten a summary to at most `max_chars` characters, ending with an
/// ellipsis when anything was cut.
pub fn bound_summary(summary: &str, max_chars: usize) -> String {
    let summary = summary.trim();
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let head = truncate_at_word(summary, max_chars - 1);
    let head = head.trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-'));
    format!("{}…", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubSummarizer;

    #[test]
    fn test_prepare_strips_urls_and_truncates() {
        let text = "Read https://example.com/a?b=c now.\n\nThen   reply.";
        assert_eq!(prepare_input(text, 100), "Read now. Then reply.");
        assert_eq!(prepare_input("alpha beta gamma delta", 13), "alpha beta");
    }

    #[test]
    fn test_bound_summary_never_exceeds_limit() {
        let long = "The quarterly numbers look strong and the team will present them on Friday. ".repeat(20);
        for max in [16, 50, 120, 599] {
            let bounded = bound_summary(&long, max);
            assert!(bounded.chars().count() <= max, "{} > {}", bounded.chars().count(), max);
            assert!(bounded.ends_with('…'));
        }
        assert_eq!(bound_summary("  short  ", 50), "short");
    }

    #[tokio::test]
    async fn test_empty_input_skips_model() {
        let stub = StubSummarizer::new("unused");
        let config = SummarizerConfig::default();

        let summary = summarize(&stub, "  https://example.com/only-a-link \n", &config)
            .await
            .unwrap();
        assert_eq!(summary, EMPTY_SUMMARY_TEXT);
        assert_eq!(stub.calls(), 0);
    }

    #[tokio::test]
    async fn test_summary_is_bounded() {
        let stub = StubSummarizer::new(&"word ".repeat(500));
        let config = SummarizerConfig {
            max_summary_chars: 40,
            ..SummarizerConfig::default()
        };
        let summary = summarize(&stub, "Some body text.", &config).await.unwrap();
        assert!(summary.chars().count() <= 40);
        assert_eq!(stub.calls(), 1);
        assert_eq!(stub.last_input().as_deref(), Some("Some body text."));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let stub = StubSummarizer::failing("503 Service Unavailable");
        let result = summarize(&stub, "Body.", &SummarizerConfig::default()).await;
        assert!(matches!(result, Err(crate::error::DigestError::ModelUnavailable(_))));
    }
}
