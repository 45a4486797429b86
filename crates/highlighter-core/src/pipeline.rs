//! End-to-end run: extract → ask for phrases → group → locate/annotate per
//! page → persist.
//!
//! The run is a strict state machine. Every stage failure aborts the run and
//! the document is closed before the error is returned.

use std::path::Path;

use crate::annotate::{AnnotationApplier, AnnotationRecord, AnnotationStyle};
use crate::backend::PdfDocument;
use crate::config_file::ConfigFile;
use crate::extract::{DEFAULT_SAMPLE_PAGES, extract_sample};
use crate::groups::{Category, ColorGroup, ColorMode, HighlightProfile, build_color_groups};
use crate::locate::{MatchPolicy, PageIndex, PhraseLocator};
use crate::persist::persist;
use crate::phrases::{
    DEFAULT_MAX_PHRASES, DEFAULT_MIN_PHRASES, DEFAULT_SAMPLE_CHARS, PhraseRequest, PhraseSource,
    collect_phrases,
};
use crate::{HighlightError, ProgressEvent};

/// Where a run currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Opened,
    TextExtracted,
    GroupsBuilt,
    /// Page `page` (0-based) has been searched and annotated.
    PerPageApplied { page: usize },
    Persisted,
    Failed(String),
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Persisted | PipelineState::Failed(_))
    }

    /// Validate and perform a transition.
    ///
    /// Pages must be applied in index order starting at 0. A document with
    /// no pages may go straight from `GroupsBuilt` to `Persisted`. Any
    /// non-terminal state may fail; terminal states accept nothing.
    pub fn advance(&self, next: PipelineState) -> Result<PipelineState, HighlightError> {
        use PipelineState::*;

        let valid = match (self, &next) {
            (Persisted | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Opened, TextExtracted) => true,
            (TextExtracted, GroupsBuilt) => true,
            (GroupsBuilt, PerPageApplied { page: 0 }) => true,
            (PerPageApplied { page: p }, PerPageApplied { page: q }) => *q == p + 1,
            (GroupsBuilt | PerPageApplied { .. }, Persisted) => true,
            _ => false,
        };

        if valid {
            Ok(next)
        } else {
            Err(HighlightError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Opened => write!(f, "opened"),
            PipelineState::TextExtracted => write!(f, "text-extracted"),
            PipelineState::GroupsBuilt => write!(f, "groups-built"),
            PipelineState::PerPageApplied { page } => write!(f, "page-applied({})", page),
            PipelineState::Persisted => write!(f, "persisted"),
            PipelineState::Failed(reason) => write!(f, "failed({})", reason),
        }
    }
}

/// Everything a run needs besides the document and the phrase source.
#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub profile: HighlightProfile,
    pub mode: ColorMode,
    pub policy: MatchPolicy,
    pub style: AnnotationStyle,
    /// Pages sampled for phrase discovery.
    pub sample_pages: usize,
    /// Characters of the sample sent to the phrase source.
    pub sample_chars: usize,
    pub min_phrases: usize,
    pub max_phrases: usize,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            profile: HighlightProfile::default(),
            mode: ColorMode::Multi,
            policy: MatchPolicy::Substring,
            style: AnnotationStyle::default(),
            sample_pages: DEFAULT_SAMPLE_PAGES,
            sample_chars: DEFAULT_SAMPLE_CHARS,
            min_phrases: DEFAULT_MIN_PHRASES,
            max_phrases: DEFAULT_MAX_PHRASES,
        }
    }
}

impl HighlightOptions {
    /// Defaults with every value present in `file` applied on top.
    pub fn from_config(file: &ConfigFile) -> Self {
        let mut opts = Self::default();

        if let Some(p) = &file.phrases {
            if let Some(v) = p.sample_pages {
                opts.sample_pages = v;
            }
            if let Some(v) = p.sample_chars {
                opts.sample_chars = v;
            }
            if let Some(v) = p.min_phrases {
                opts.min_phrases = v;
            }
            if let Some(v) = p.max_phrases {
                opts.max_phrases = v;
            }
            if let Some(v) = p.primary_phrase_cap {
                opts.profile.primary_phrase_cap = v;
            }
        }
        if let Some(policy) = file.matching.as_ref().and_then(|m| m.policy) {
            opts.policy = policy;
        }
        if let Some(h) = &file.highlight {
            match h.mode.as_deref() {
                Some("single") => opts.mode = ColorMode::Single,
                Some("multi") => opts.mode = ColorMode::Multi,
                Some(other) => tracing::warn!(mode = other, "unknown highlight mode in config, ignoring"),
                None => {}
            }
            if let Some(v) = h.opacity {
                opts.style.opacity = v;
            }
            if let Some(v) = h.include_contents {
                opts.style.include_contents = v;
            }
            if let Some(v) = &h.author {
                opts.style.author = Some(v.clone()).filter(|a| !a.is_empty());
            }
        }
        if let Some(cats) = &file.categories {
            cats.apply_to(&mut opts.profile);
        }
        opts
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct HighlightReport {
    /// Phrases returned by the phrase source (empty in degraded mode).
    pub phrases: Vec<String>,
    pub groups: Vec<ColorGroup>,
    /// Every annotation written, in creation order.
    pub records: Vec<AnnotationRecord>,
    /// Annotations per page, indexed by page.
    pub per_page: Vec<usize>,
    pub final_state: PipelineState,
}

impl HighlightReport {
    pub fn total_annotations(&self) -> usize {
        self.records.len()
    }

    pub fn count_for(&self, category: Category) -> usize {
        self.records.iter().filter(|r| r.category == category).count()
    }
}

/// Run the whole pipeline on `doc` and write the result to `output`.
///
/// The phrase source is asked exactly once; its failure degrades to an empty
/// phrase list. The document is consumed and closed on every path.
pub async fn highlight_document<D: PdfDocument>(
    mut doc: D,
    output: &Path,
    source: &dyn PhraseSource,
    options: &HighlightOptions,
    progress: impl Fn(ProgressEvent),
) -> Result<HighlightReport, HighlightError> {
    let mut state = PipelineState::Opened;

    let applied = annotate_all(&mut doc, &mut state, source, options, &progress).await;
    let (phrases, groups, records, per_page) = match applied {
        Ok(parts) => parts,
        Err(e) => {
            doc.close();
            return Err(abort(&state, e));
        }
    };

    if let Err(e) = persist(doc, output) {
        return Err(abort(&state, e.into()));
    }
    state = state.advance(PipelineState::Persisted)?;
    progress(ProgressEvent::Saved {
        annotations: records.len(),
    });

    tracing::info!(
        annotations = records.len(),
        pages = per_page.len(),
        phrases = phrases.len(),
        "highlighting complete"
    );

    Ok(HighlightReport {
        phrases,
        groups,
        records,
        per_page,
        final_state: state,
    })
}

fn abort(state: &PipelineState, e: HighlightError) -> HighlightError {
    let failed = state
        .advance(PipelineState::Failed(e.to_string()))
        .unwrap_or_else(|_| PipelineState::Failed(e.to_string()));
    tracing::warn!(last = %state, state = %failed, "highlighting aborted");
    e
}

type Applied = (Vec<String>, Vec<ColorGroup>, Vec<AnnotationRecord>, Vec<usize>);

async fn annotate_all<D: PdfDocument>(
    doc: &mut D,
    state: &mut PipelineState,
    source: &dyn PhraseSource,
    options: &HighlightOptions,
    progress: &impl Fn(ProgressEvent),
) -> Result<Applied, HighlightError> {
    let total = doc.page_count()?;

    let sample = extract_sample(&*doc, options.sample_pages)?;
    *state = state.advance(PipelineState::TextExtracted)?;
    progress(ProgressEvent::TextExtracted {
        pages: total.min(options.sample_pages),
        chars: sample.chars().count(),
    });

    let request = PhraseRequest::new(&sample, options.sample_chars)
        .with_count_range(options.min_phrases, options.max_phrases);
    let phrases = collect_phrases(source, &request).await;
    progress(ProgressEvent::PhrasesReceived {
        count: phrases.len(),
    });

    let groups = build_color_groups(&phrases, &options.profile, options.mode);
    *state = state.advance(PipelineState::GroupsBuilt)?;
    progress(ProgressEvent::GroupsBuilt {
        groups: groups.len(),
        terms: groups.iter().map(|g| g.terms.len()).sum(),
    });

    let locator = PhraseLocator::new(options.policy);
    let applier = AnnotationApplier::new(options.style.clone());
    let mut records = Vec::new();
    let mut per_page = Vec::with_capacity(total);

    for index in 0..total {
        progress(ProgressEvent::PageStarted { index, total });

        let page = doc.page_text(index)?;
        let page_index = PageIndex::build(&page);
        let located: Vec<_> = groups
            .iter()
            .map(|g| (g.clone(), locator.locate_group(&page_index, g)))
            .collect();

        let page_records = applier.apply_page(doc, index, &located)?;
        *state = state.advance(PipelineState::PerPageApplied { page: index })?;
        progress(ProgressEvent::PageDone {
            index,
            total,
            annotations: page_records.len(),
        });

        per_page.push(page_records.len());
        records.extend(page_records);
    }

    Ok((phrases, groups, records, per_page))
}
