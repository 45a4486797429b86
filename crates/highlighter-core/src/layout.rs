//! Positioned page text, as produced by a document backend.
//!
//! A [`PageText`] mirrors the structured-text model of the PDF renderer:
//! blocks in reading order, lines within a block, glyphs within a line, each
//! glyph carrying its quad in page space.

use crate::geometry::{Point, Quad, Rect};

/// Letter-size page, used by synthetic layouts.
pub const DEFAULT_PAGE_BOUNDS: Rect = Rect::new(0.0, 0.0, 612.0, 792.0);

const SYNTH_MARGIN: f32 = 72.0;
const SYNTH_ADVANCE: f32 = 6.0;
const SYNTH_LINE_HEIGHT: f32 = 12.0;
const SYNTH_ASCENT: f32 = 9.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub quad: Quad,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLine {
    pub glyphs: Vec<Glyph>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.glyphs.iter().all(|g| g.ch.is_whitespace())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

/// Extractable text of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 0-based page index.
    pub index: usize,
    pub bounds: Rect,
    pub blocks: Vec<TextBlock>,
}

impl PageText {
    /// A page with no extractable text (e.g. a scanned image).
    pub fn empty(index: usize, bounds: Rect) -> Self {
        Self {
            index,
            bounds,
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks
            .iter()
            .all(|b| b.lines.iter().all(TextLine::is_blank))
    }

    /// Plain text in reading order: one `\n` per line, blank line between blocks.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            for line in &block.lines {
                out.push_str(&line.text());
                out.push('\n');
            }
        }
        out
    }

    /// Lay out `paragraphs` with a fixed-pitch font: one block per paragraph,
    /// one line per `\n`-separated segment.
    ///
    /// Used by the in-memory document and by tests; real pages come from the
    /// PDF backend.
    pub fn synthetic(index: usize, paragraphs: &[&str]) -> Self {
        let mut blocks = Vec::with_capacity(paragraphs.len());
        let mut baseline = SYNTH_MARGIN + SYNTH_ASCENT;

        for para in paragraphs {
            let mut lines = Vec::new();
            for segment in para.split('\n') {
                let glyphs = segment
                    .chars()
                    .enumerate()
                    .map(|(col, ch)| {
                        let x0 = SYNTH_MARGIN + col as f32 * SYNTH_ADVANCE;
                        let x1 = x0 + SYNTH_ADVANCE;
                        let top = baseline - SYNTH_ASCENT;
                        let bottom = baseline + (SYNTH_LINE_HEIGHT - SYNTH_ASCENT);
                        Glyph {
                            ch,
                            quad: Quad {
                                ul: Point::new(x0, top),
                                ur: Point::new(x1, top),
                                ll: Point::new(x0, bottom),
                                lr: Point::new(x1, bottom),
                            },
                        }
                    })
                    .collect();
                lines.push(TextLine { glyphs });
                baseline += SYNTH_LINE_HEIGHT;
            }
            blocks.push(TextBlock { lines });
            // paragraph gap
            baseline += SYNTH_LINE_HEIGHT;
        }

        Self {
            index,
            bounds: DEFAULT_PAGE_BOUNDS,
            blocks,
        }
    }
}
