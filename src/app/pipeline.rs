//! Turning one fetched message into a digest card.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ai::{self, Summarizer};
use crate::config::Config;
use crate::error::DigestError;
use crate::extract::{self, Link, Section};
use crate::facts::{Deadline, FactExtractor};
use crate::mail::{Attachment, Message, Sender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum SummaryStatus {
    Summarized,
    /// Newsletter shown as its own sections instead of model output
    Sections,
    Unavailable { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub uid: u32,
    /// Absent when the model failed or the message is shown as sections
    pub text: Option<String>,
    pub status: SummaryStatus,
    pub deadlines: Vec<Deadline>,
    pub actions: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Digest {
    pub uid: u32,
    pub sender: Sender,
    pub subject: String,
    pub date: i64,
    pub summary: Summary,
    pub links: Vec<Link>,
    pub attachments: Vec<Attachment>,
    pub sections: Option<Vec<Section>>,
}

impl Digest {
    pub fn is_summarized(&self) -> bool {
        self.summary.status == SummaryStatus::Summarized
    }
}

/// Extract, summarize and analyse one message.
///
/// A model failure only marks this digest as unavailable.
pub async fn process_message<S: Summarizer>(
    message: &Message,
    summarizer: &S,
    config: &Config,
    now: NaiveDateTime,
) -> Digest {
    let extraction = extract::extract(message, config.extraction.newsletter_mode);
    let facts = FactExtractor::new(config.extraction.deadline_horizon_days)
        .extract(&extraction.text, now);

    let (text, status) = if extraction.sections.is_some() {
        (None, SummaryStatus::Sections)
    } else {
        match ai::summarize(summarizer, &extraction.text, &config.summarizer).await {
            Ok(text) => (Some(text), SummaryStatus::Summarized),
            Err(DigestError::ModelUnavailable(reason)) => {
                tracing::warn!("Summary unavailable for uid {}: {}", message.uid, reason);
                (None, SummaryStatus::Unavailable { reason })
            }
            Err(other) => {
                tracing::warn!("Summary failed for uid {}: {}", message.uid, other);
                (
                    None,
                    SummaryStatus::Unavailable {
                        reason: other.to_string(),
                    },
                )
            }
        }
    };

    Digest {
        uid: message.uid,
        sender: message.sender.clone(),
        subject: message.subject.clone(),
        date: message.date,
        summary: Summary {
            uid: message.uid,
            text,
            status,
            deadlines: facts.deadlines,
            actions: facts.actions,
            questions: facts.questions,
        },
        links: extraction.links,
        attachments: extraction.attachments,
        sections: extraction.sections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubSummarizer, text_message};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    const REPORT: &str = "Please send the report by next Friday. \
                          See attached budget.xlsx and https://example.com/brief";

    #[tokio::test]
    async fn test_report_digest() {
        let stub = StubSummarizer::new("Dana needs the report by Friday.");
        let message = text_message(1, 1_741_160_000, "Report", REPORT);

        let digest = process_message(&message, &stub, &Config::default(), now()).await;

        assert!(digest.is_summarized());
        assert_eq!(digest.summary.text.as_deref(), Some("Dana needs the report by Friday."));
        assert_eq!(digest.summary.deadlines.len(), 1);
        assert!(digest.summary.deadlines[0].fuzzy);
        assert_eq!(digest.summary.deadlines[0].date, NaiveDate::from_ymd_opt(2025, 3, 7));
        assert_eq!(digest.summary.actions.len(), 1);
        assert!(digest.summary.actions[0].contains("send the report"));
        assert_eq!(digest.links.len(), 1);
        assert_eq!(digest.attachments.len(), 1);
        assert_eq!(digest.attachments[0].filename, "budget.xlsx");

        // The model never sees the URL
        assert!(!stub.last_input().unwrap().contains("https://"));
    }

    #[tokio::test]
    async fn test_model_failure_keeps_facts() {
        let stub = StubSummarizer::failing("503 Service Unavailable");
        let message = text_message(2, 1_741_160_000, "Report", REPORT);

        let digest = process_message(&message, &stub, &Config::default(), now()).await;

        assert_eq!(
            digest.summary.status,
            SummaryStatus::Unavailable {
                reason: "503 Service Unavailable".into()
            }
        );
        assert!(digest.summary.text.is_none());
        assert_eq!(digest.summary.deadlines.len(), 1);
        assert_eq!(digest.links.len(), 1);
    }

    #[tokio::test]
    async fn test_newsletter_skips_model() {
        let stub = StubSummarizer::new("unused");
        let body = "View in browser\n# Headlines\nOne.\n# Deals\nTwo.\n# Events\nThree.\nUnsubscribe";
        let message = text_message(3, 1_741_160_000, "Weekly", body);

        let digest = process_message(&message, &stub, &Config::default(), now()).await;

        assert_eq!(digest.summary.status, SummaryStatus::Sections);
        assert_eq!(stub.calls(), 0);
        let headings: Vec<_> = digest
            .sections
            .unwrap()
            .into_iter()
            .filter_map(|s| s.heading)
            .collect();
        assert_eq!(headings, vec!["Headlines", "Deals", "Events"]);
    }

    #[tokio::test]
    async fn test_empty_message() {
        let stub = StubSummarizer::new("unused");
        let message = text_message(4, 1_741_160_000, "(no subject)", "");

        let digest = process_message(&message, &stub, &Config::default(), now()).await;

        assert_eq!(digest.summary.text.as_deref(), Some(crate::constants::EMPTY_SUMMARY_TEXT));
        assert_eq!(stub.calls(), 0);
        assert!(digest.summary.deadlines.is_empty());
        assert!(digest.summary.actions.is_empty());
    }
}
