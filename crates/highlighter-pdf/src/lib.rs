use std::path::Path;

use lopdf::ObjectId;

use highlighter_core::{DocumentError, Highlight, PageText, PdfDocument};

pub mod annot;
pub mod layout;
pub mod transform;

use transform::{Matrix, PageTransform};

/// A PDF opened for highlighting.
///
/// MuPDF reads positioned text; lopdf holds the object graph that receives
/// the annotations and is written on save. This crate is the sole AGPL
/// island: it isolates the mupdf dependency so the core engine does not
/// transitively depend on it.
pub struct PdfFile {
    inner: Option<Inner>,
}

struct Inner {
    reader: mupdf::Document,
    writer: lopdf::Document,
    /// lopdf page object per 0-based index.
    pages: Vec<ObjectId>,
    transforms: Vec<PageTransform>,
}

impl std::fmt::Debug for PdfFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfFile")
            .field("pages", &self.inner.as_ref().map(|i| i.pages.len()))
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

impl PdfFile {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| DocumentError::Open("invalid path encoding".into()))?;

        let reader =
            mupdf::Document::open(path_str).map_err(|e| DocumentError::Open(e.to_string()))?;
        let writer = lopdf::Document::load(path).map_err(|e| DocumentError::Open(e.to_string()))?;

        let pages: Vec<ObjectId> = writer.get_pages().into_values().collect();
        let reader_pages = reader
            .page_count()
            .map_err(|e| DocumentError::Open(e.to_string()))?;
        if usize::try_from(reader_pages).ok() != Some(pages.len()) {
            return Err(DocumentError::Open(format!(
                "page count mismatch: mupdf sees {}, lopdf sees {}",
                reader_pages,
                pages.len()
            )));
        }

        let transforms = (0..reader_pages)
            .map(|n| page_transform(&reader, n))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(path = %path.display(), pages = pages.len(), "document opened");
        Ok(Self {
            inner: Some(Inner {
                reader,
                writer,
                pages,
                transforms,
            }),
        })
    }

    fn inner(&self) -> Result<&Inner, DocumentError> {
        self.inner.as_ref().ok_or(DocumentError::Closed)
    }

    fn inner_mut(&mut self) -> Result<&mut Inner, DocumentError> {
        self.inner.as_mut().ok_or(DocumentError::Closed)
    }
}

/// The inverse of the matrix MuPDF applies when it lays out page `n`, so
/// glyph quads map back exactly, including `/Rotate`, CropBox and `/UserUnit`.
fn page_transform(reader: &mupdf::Document, n: i32) -> Result<PageTransform, DocumentError> {
    let page = reader
        .load_page(n)
        .and_then(mupdf::pdf::PdfPage::try_from)
        .map_err(|e| DocumentError::Open(e.to_string()))?;
    let ctm = page
        .ctm()
        .map_err(|e| DocumentError::Open(e.to_string()))?;
    PageTransform::from_page_matrix(Matrix::from(&ctm))
        .ok_or_else(|| DocumentError::Open(format!("page {} has a singular transform", n + 1)))
}

impl Inner {
    fn check_index(&self, index: usize) -> Result<(), DocumentError> {
        if index < self.pages.len() {
            Ok(())
        } else {
            Err(DocumentError::PageOutOfRange {
                index,
                count: self.pages.len(),
            })
        }
    }
}

impl PdfDocument for PdfFile {
    fn page_count(&self) -> Result<usize, DocumentError> {
        Ok(self.inner()?.pages.len())
    }

    fn page_text(&self, index: usize) -> Result<PageText, DocumentError> {
        let inner = self.inner()?;
        inner.check_index(index)?;
        let page_no =
            i32::try_from(index).map_err(|e| DocumentError::Extraction(e.to_string()))?;
        let page = inner
            .reader
            .load_page(page_no)
            .map_err(|e| DocumentError::Extraction(e.to_string()))?;
        layout::page_text(&page, index)
    }

    fn add_highlight(&mut self, index: usize, highlight: &Highlight) -> Result<(), DocumentError> {
        let inner = self.inner_mut()?;
        inner.check_index(index)?;
        let transform = inner.transforms[index];
        let quads: Vec<_> = highlight.quads.iter().map(|q| transform.quad(q)).collect();
        annot::write_highlight(&mut inner.writer, inner.pages[index], &quads, highlight)
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        let inner = self.inner_mut()?;
        let mut buffer = Vec::new();
        inner
            .writer
            .save_to(&mut buffer)
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        std::fs::write(path, buffer)?;
        Ok(())
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("document closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}
