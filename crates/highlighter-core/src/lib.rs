use thiserror::Error;

pub mod annotate;
pub mod backend;
pub mod config_file;
pub mod extract;
pub mod geometry;
pub mod groups;
pub mod layout;
pub mod locate;
pub mod memory;
pub mod persist;
pub mod phrases;
pub mod pipeline;
pub mod text_utils;

// Re-export for convenience
pub use annotate::{AnnotationApplier, AnnotationRecord, AnnotationStyle};
pub use backend::{DocumentError, Highlight, PdfDocument};
pub use extract::{DEFAULT_SAMPLE_PAGES, extract_sample};
pub use geometry::{Color, Point, Quad, Rect};
pub use groups::{Category, ColorGroup, ColorMode, HighlightProfile, build_color_groups};
pub use layout::{Glyph, PageText, TextBlock, TextLine};
pub use locate::{MatchPolicy, Occurrence, PageIndex, PhraseLocator};
pub use memory::MemoryDocument;
pub use persist::persist;
pub use phrases::{PhraseError, PhraseRequest, PhraseSource};
pub use pipeline::{HighlightOptions, HighlightReport, PipelineState, highlight_document};

/// Environment variable holding the phrase-extraction credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no API key: set OPENAI_API_KEY or pass --api-key")]
    MissingCredential,
}

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("invalid pipeline transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

/// Pick the credential: an explicit value wins over the environment.
/// Blank values count as absent.
pub fn resolve_api_key(
    explicit: Option<String>,
    env: Option<String>,
) -> Result<String, ConfigError> {
    explicit
        .into_iter()
        .chain(env)
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
        .ok_or(ConfigError::MissingCredential)
}

/// Progress events emitted during a highlighting run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    TextExtracted {
        pages: usize,
        chars: usize,
    },
    PhrasesReceived {
        count: usize,
    },
    GroupsBuilt {
        groups: usize,
        terms: usize,
    },
    PageStarted {
        index: usize,
        total: usize,
    },
    PageDone {
        index: usize,
        total: usize,
        annotations: usize,
    },
    Saved {
        annotations: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_wins() {
        let key = resolve_api_key(Some("flag".into()), Some("env".into())).unwrap();
        assert_eq!(key, "flag");
    }

    #[test]
    fn env_key_used_when_no_flag() {
        assert_eq!(resolve_api_key(None, Some("env".into())).unwrap(), "env");
    }

    #[test]
    fn blank_keys_are_missing() {
        let err = resolve_api_key(Some("  ".into()), Some(String::new())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential));
    }
}
