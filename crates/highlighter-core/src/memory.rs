//! In-memory document backend for tests and dry runs.

use std::path::Path;

use crate::backend::{DocumentError, Highlight, PdfDocument};
use crate::layout::PageText;

/// A [`PdfDocument`] over synthetic page layouts.
///
/// Highlights are kept per page; [`save`](PdfDocument::save) writes a JSON
/// summary of them so persistence failures behave like real file I/O.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    pages: Vec<PageText>,
    annotations: Vec<Vec<Highlight>>,
    closed: bool,
    saves: usize,
}

impl MemoryDocument {
    pub fn new(pages: Vec<PageText>) -> Self {
        let annotations = vec![Vec::new(); pages.len()];
        Self {
            pages,
            annotations,
            closed: false,
            saves: 0,
        }
    }

    /// One page per entry; each entry is a list of paragraphs.
    pub fn from_pages(pages: &[&[&str]]) -> Self {
        Self::new(
            pages
                .iter()
                .enumerate()
                .map(|(i, paras)| PageText::synthetic(i, paras))
                .collect(),
        )
    }

    /// Highlights attached to page `index` so far.
    pub fn annotations(&self, index: usize) -> &[Highlight] {
        self.annotations
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_annotations(&self) -> usize {
        self.annotations.iter().map(Vec::len).sum()
    }

    /// How many times `save()` succeeded.
    pub fn save_count(&self) -> usize {
        self.saves
    }

    fn ensure_open(&self) -> Result<(), DocumentError> {
        if self.closed {
            Err(DocumentError::Closed)
        } else {
            Ok(())
        }
    }

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

impl PdfDocument for MemoryDocument {
    fn page_count(&self) -> Result<usize, DocumentError> {
        self.ensure_open()?;
        Ok(self.pages.len())
    }

    fn page_text(&self, index: usize) -> Result<PageText, DocumentError> {
        self.ensure_open()?;
        self.check_index(index)?;
        Ok(self.pages[index].clone())
    }

    fn add_highlight(&mut self, index: usize, highlight: &Highlight) -> Result<(), DocumentError> {
        self.ensure_open()?;
        self.check_index(index)?;
        self.annotations[index].push(highlight.clone());
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), DocumentError> {
        self.ensure_open()?;
        let pages: Vec<serde_json::Value> = self
            .annotations
            .iter()
            .enumerate()
            .map(|(i, hs)| {
                serde_json::json!({
                    "page": i,
                    "highlights": hs
                        .iter()
                        .map(|h| serde_json::json!({
                            "name": h.name,
                            "color": h.color.components(),
                            "quads": h.quads.len(),
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let body = serde_json::to_vec_pretty(&pages)
            .map_err(|e| DocumentError::Write(e.to_string()))?;
        std::fs::write(path, body)?;
        self.saves += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Color;

    fn highlight(name: &str) -> Highlight {
        Highlight {
            quads: vec![],
            color: Color::YELLOW,
            opacity: 1.0,
            name: name.into(),
            contents: None,
            author: None,
        }
    }

    #[test]
    fn closed_document_rejects_every_operation() {
        let mut doc = MemoryDocument::from_pages(&[&["text"]]);
        doc.close();
        assert!(doc.is_closed());
        assert!(matches!(doc.page_count(), Err(DocumentError::Closed)));
        assert!(matches!(doc.page_text(0), Err(DocumentError::Closed)));
        assert!(matches!(
            doc.add_highlight(0, &highlight("a")),
            Err(DocumentError::Closed)
        ));
    }

    #[test]
    fn out_of_range_page() {
        let mut doc = MemoryDocument::from_pages(&[&["text"]]);
        let err = doc.add_highlight(4, &highlight("a")).unwrap_err();
        assert!(matches!(
            err,
            DocumentError::PageOutOfRange { index: 4, count: 1 }
        ));
    }

    #[test]
    fn save_writes_summary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut doc = MemoryDocument::from_pages(&[&["text"], &["more"]]);
        doc.add_highlight(1, &highlight("hl-p1-0")).unwrap();
        doc.save(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written[1]["highlights"][0]["name"], "hl-p1-0");
        assert_eq!(doc.save_count(), 1);
    }
}
