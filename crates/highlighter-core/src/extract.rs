use crate::backend::{DocumentError, PdfDocument};

/// Pages sampled for phrase discovery when nothing else is configured.
pub const DEFAULT_SAMPLE_PAGES: usize = 6;

/// Concatenate the text of the first `max_pages` pages in reading order.
///
/// Read-only. A document shorter than `max_pages` contributes every page it
/// has; pages without extractable text contribute an empty string.
pub fn extract_sample<D: PdfDocument + ?Sized>(
    doc: &D,
    max_pages: usize,
) -> Result<String, DocumentError> {
    let pages = doc.page_count()?.min(max_pages);
    let mut text = String::new();
    for index in 0..pages {
        let page = doc.page_text(index)?;
        text.push_str(&page.plain_text());
    }
    tracing::debug!(pages, chars = text.chars().count(), "extracted text sample");
    Ok(text)
}
