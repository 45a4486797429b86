use crate::backend::{DocumentError, Highlight, PdfDocument};
use crate::geometry::Color;
use crate::groups::{Category, ColorGroup};
use crate::locate::Occurrence;

/// Visual settings shared by every highlight in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStyle {
    /// Fill opacity, clamped into `0.0..=1.0`.
    pub opacity: f32,
    /// Put the matched term in the annotation's popup text.
    pub include_contents: bool,
    pub author: Option<String>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            include_contents: true,
            author: Some("highlighter".to_string()),
        }
    }
}

/// What was written for one occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub page: usize,
    pub category: Category,
    pub term: String,
    pub color: Color,
    pub name: String,
}

/// Turns located occurrences into highlight annotations.
#[derive(Debug, Clone, Default)]
pub struct AnnotationApplier {
    style: AnnotationStyle,
}

impl AnnotationApplier {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    /// Write one highlight per occurrence, group by group in the given order,
    /// so later groups are drawn over earlier ones.
    ///
    /// Each highlight is complete (geometry, color, appearance) before the
    /// next one is created. The returned records are in creation order;
    /// their count is the number of annotations added to the page.
    pub fn apply_page<D: PdfDocument + ?Sized>(
        &self,
        doc: &mut D,
        page: usize,
        groups: &[(ColorGroup, Vec<Occurrence>)],
    ) -> Result<Vec<AnnotationRecord>, DocumentError> {
        if doc.is_closed() {
            return Err(DocumentError::Closed);
        }

        let mut records = Vec::new();
        for (group, occurrences) in groups {
            for occ in occurrences {
                let name = format!("hl-p{}-{}", page, records.len());
                let highlight = Highlight {
                    quads: occ.quads.clone(),
                    color: group.color,
                    opacity: self.style.opacity.clamp(0.0, 1.0),
                    name: name.clone(),
                    contents: self.style.include_contents.then(|| occ.term.clone()),
                    author: self.style.author.clone(),
                };
                doc.add_highlight(page, &highlight)?;
                records.push(AnnotationRecord {
                    page,
                    category: group.category,
                    term: occ.term.clone(),
                    color: group.color,
                    name,
                });
            }
        }

        if !records.is_empty() {
            tracing::debug!(page, annotations = records.len(), "page annotated");
        }
        Ok(records)
    }
}
