//! Phrase-extraction collaborators.
//!
//! A [`PhraseSource`] turns a text sample into candidate phrases. The call is
//! made once per run; [`collect_phrases`] absorbs every failure and returns
//! an empty list, so a broken collaborator only removes the AI phrases from
//! the primary group.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;
use thiserror::Error;

use crate::text_utils::truncate_chars;

pub mod mock;
pub mod openai;

pub use mock::MockPhraseSource;
pub use openai::{OpenAiConfig, OpenAiPhraseSource};

/// Characters of document text sent to the collaborator by default.
pub const DEFAULT_SAMPLE_CHARS: usize = 8000;
pub const DEFAULT_MIN_PHRASES: usize = 15;
pub const DEFAULT_MAX_PHRASES: usize = 25;

#[derive(Error, Debug)]
pub enum PhraseError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("reply contained no message content")]
    EmptyReply,
    #[error("malformed phrase list: {0}")]
    MalformedResponse(String),
}

/// What to ask the collaborator for.
#[derive(Debug, Clone, PartialEq)]
pub struct PhraseRequest {
    /// Bounded document text.
    pub sample: String,
    pub min_count: usize,
    pub max_count: usize,
}

impl PhraseRequest {
    /// Build a request from extracted text, keeping at most `sample_chars`
    /// characters.
    pub fn new(text: &str, sample_chars: usize) -> Self {
        Self {
            sample: truncate_chars(text, sample_chars).to_string(),
            min_count: DEFAULT_MIN_PHRASES,
            max_count: DEFAULT_MAX_PHRASES,
        }
    }

    pub fn with_count_range(mut self, min: usize, max: usize) -> Self {
        self.min_count = min.min(max);
        self.max_count = max.max(min);
        self
    }
}

/// External service that suggests phrases worth highlighting.
pub trait PhraseSource: Send + Sync {
    fn name(&self) -> &str;

    fn extract_phrases<'a>(
        &'a self,
        request: &'a PhraseRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, PhraseError>> + Send + 'a>>;
}

/// Ask `source` once. Any error is logged and treated as "no phrases".
pub async fn collect_phrases(source: &dyn PhraseSource, request: &PhraseRequest) -> Vec<String> {
    match source.extract_phrases(request).await {
        Ok(phrases) => {
            tracing::info!(source = source.name(), count = phrases.len(), "phrases received");
            phrases
        }
        Err(e) => {
            tracing::warn!(source = source.name(), error = %e, "phrase extraction failed, continuing with static terms");
            Vec::new()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhraseReply {
    List(Vec<String>),
    Object { phrases: Vec<String> },
}

/// Parse a collaborator reply into phrases.
///
/// Accepts exactly a JSON array of strings or an object with a `phrases`
/// array of strings, optionally wrapped in one Markdown code fence. Blank
/// entries are dropped. Anything else is [`PhraseError::MalformedResponse`].
pub fn parse_phrase_list(content: &str) -> Result<Vec<String>, PhraseError> {
    let body = strip_code_fence(content.trim())?;
    let reply: PhraseReply = serde_json::from_str(body)
        .map_err(|e| PhraseError::MalformedResponse(e.to_string()))?;
    let phrases = match reply {
        PhraseReply::List(v) | PhraseReply::Object { phrases: v } => v,
    };
    Ok(phrases
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

fn strip_code_fence(text: &str) -> Result<&str, PhraseError> {
    let Some(rest) = text.strip_prefix("```") else {
        return Ok(text);
    };
    // drop the info string (e.g. "json") on the opening line
    let after_info = rest
        .find('\n')
        .map(|i| &rest[i + 1..])
        .ok_or_else(|| PhraseError::MalformedResponse("unterminated code fence".into()))?;
    after_info
        .trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .ok_or_else(|| PhraseError::MalformedResponse("unterminated code fence".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_array() {
        let got = parse_phrase_list(r#"["self-attention", " positional encoding ", ""]"#).unwrap();
        assert_eq!(got, vec!["self-attention", "positional encoding"]);
    }

    #[test]
    fn parses_object_form() {
        let got = parse_phrase_list(r#"{"phrases": ["BLEU score"]}"#).unwrap();
        assert_eq!(got, vec!["BLEU score"]);
    }

    #[test]
    fn parses_fenced_reply() {
        let got = parse_phrase_list("```json\n[\"layer norm\"]\n```").unwrap();
        assert_eq!(got, vec!["layer norm"]);
    }

    #[test]
    fn rejects_prose_around_json() {
        let err = parse_phrase_list("Here you go: [\"a\", \"b\"] hope it helps").unwrap_err();
        assert!(matches!(err, PhraseError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_non_string_items() {
        let err = parse_phrase_list("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, PhraseError::MalformedResponse(_)));
    }

    #[test]
    fn rejects_unterminated_fence() {
        assert!(parse_phrase_list("```json\n[\"a\"]").is_err());
    }

    #[test]
    fn request_truncates_sample() {
        let text = "x".repeat(9000);
        let req = PhraseRequest::new(&text, DEFAULT_SAMPLE_CHARS);
        assert_eq!(req.sample.len(), 8000);
        assert_eq!((req.min_count, req.max_count), (15, 25));
    }

    #[test]
    fn count_range_is_ordered() {
        let req = PhraseRequest::new("t", 10).with_count_range(30, 10);
        assert_eq!((req.min_count, req.max_count), (10, 30));
    }

    #[tokio::test]
    async fn failing_source_degrades_to_empty() {
        let source = MockPhraseSource::failing("quota exceeded");
        let req = PhraseRequest::new("text", 100);
        assert!(collect_phrases(&source, &req).await.is_empty());
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn successful_source_passes_phrases_through() {
        let source = MockPhraseSource::returning(&["graph neural network"]);
        let req = PhraseRequest::new("text", 100);
        assert_eq!(collect_phrases(&source, &req).await, vec!["graph neural network"]);
    }
}
