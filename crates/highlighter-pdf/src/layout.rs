use mupdf::{Page, TextPageFlags};

use highlighter_core::{DocumentError, Glyph, PageText, Point, Quad, Rect, TextBlock, TextLine};

/// Positioned text of one page from MuPDF's structured-text device.
///
/// Uses the same block/line iteration as a plain text dump, so the reading
/// order matches what phrase discovery saw. Pages without text (scanned
/// images) produce a `PageText` with no blocks.
pub fn page_text(page: &Page, index: usize) -> Result<PageText, DocumentError> {
    let bounds = page
        .bounds()
        .map_err(|e| DocumentError::Extraction(e.to_string()))?;
    let text_page = page
        .to_text_page(TextPageFlags::empty())
        .map_err(|e| DocumentError::Extraction(e.to_string()))?;

    let mut blocks = Vec::new();
    for block in text_page.blocks() {
        let lines: Vec<TextLine> = block
            .lines()
            .map(|line| TextLine {
                glyphs: line
                    .chars()
                    .map(|c| Glyph {
                        ch: c.char().unwrap_or('\u{FFFD}'),
                        quad: convert_quad(c.quad()),
                    })
                    .collect(),
            })
            .filter(|line| !line.glyphs.is_empty())
            .collect();
        if !lines.is_empty() {
            blocks.push(TextBlock { lines });
        }
    }

    tracing::debug!(page = index, blocks = blocks.len(), "page text extracted");
    Ok(PageText {
        index,
        bounds: Rect::new(bounds.x0, bounds.y0, bounds.x1, bounds.y1),
        blocks,
    })
}

fn convert_quad(q: mupdf::Quad) -> Quad {
    Quad {
        ul: Point::new(q.ul.x, q.ul.y),
        ur: Point::new(q.ur.x, q.ur.y),
        ll: Point::new(q.ll.x, q.ll.y),
        lr: Point::new(q.lr.x, q.lr.y),
    }
}
