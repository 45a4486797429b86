use std::path::Path;

use thiserror::Error;

use crate::geometry::{Color, Quad};
use crate::layout::PageText;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to open PDF: {0}")]
    Open(String),
    #[error("failed to extract text: {0}")]
    Extraction(String),
    #[error("failed to write annotation: {0}")]
    Write(String),
    #[error("page {index} out of range (document has {count} pages)")]
    PageOutOfRange { index: usize, count: usize },
    #[error("document is closed")]
    Closed,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully configured highlight mark, ready to be written to a page.
///
/// The backend writes geometry, color and appearance in one step, so the
/// annotation is complete as soon as [`PdfDocument::add_highlight`] returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    /// One quad per line fragment, in page space.
    pub quads: Vec<Quad>,
    pub color: Color,
    /// Fill opacity, `0.0..=1.0`.
    pub opacity: f32,
    /// Unique annotation name (`/NM`), deterministic for identical input.
    pub name: String,
    /// Popup text; the matched term when enabled.
    pub contents: Option<String>,
    pub author: Option<String>,
}

/// Document backend: positioned text in, highlight annotations out.
///
/// Implementors own their file handles. After [`close`](Self::close) every
/// other method fails with [`DocumentError::Closed`].
pub trait PdfDocument {
    fn page_count(&self) -> Result<usize, DocumentError>;

    /// Positioned text for the 0-based page `index`. A page without
    /// extractable text yields an empty [`PageText`], not an error.
    fn page_text(&self, index: usize) -> Result<PageText, DocumentError>;

    /// Attach one highlight annotation to page `index`.
    fn add_highlight(&mut self, index: usize, highlight: &Highlight) -> Result<(), DocumentError>;

    /// Write the whole document, annotations included, to `path`.
    fn save(&mut self, path: &Path) -> Result<(), DocumentError>;

    /// Release the underlying resources. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}
