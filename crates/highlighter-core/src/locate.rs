//! Locating term occurrences in positioned page text.
//!
//! Each text block is flattened into a folded character stream that keeps a
//! back-reference from every character to the glyph it came from. Line
//! breaks become a single space, except at a hyphenated break where the
//! hyphen becomes *optional*: the matcher may consume it (`self-attention`)
//! or skip it (`trans-` / `former` → `transformer`).
//!
//! Word boundaries look through a break hyphen, so under the word-boundary
//! policy `self-` / `attention` reads as one word, and `attention` alone does
//! not hit there, while the same compound on one line does.
//!
//! Hits never cross block boundaries. Hits for one term never overlap; hits
//! for different terms are reported independently, even when they overlap.

use serde::{Deserialize, Serialize};

use crate::geometry::{Color, Quad, Rect};
use crate::groups::{Category, ColorGroup};
use crate::layout::{Glyph, PageText};
use crate::text_utils::{fold_char, fold_text, is_line_break_hyphen, normalize_whitespace};

/// How a term must sit in the surrounding text to count as a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Plain substring: `model` also hits inside `modeling`.
    #[default]
    Substring,
    /// The hit must not touch a letter or digit on either side.
    WordBoundary,
}

/// One located hit of a term on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub page: usize,
    pub term: String,
    pub category: Category,
    pub color: Color,
    /// One quad per line fragment; a hit across a hyphenated break has two.
    pub quads: Vec<Quad>,
}

impl Occurrence {
    /// Enclosing rect of all fragments.
    pub fn bounds(&self) -> Rect {
        let mut rects = self.quads.iter().map(Quad::bounds);
        let first = rects.next().unwrap_or_default();
        rects.fold(first, |acc, r| acc.union(&r))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GlyphRef {
    line: usize,
    glyph: usize,
}

#[derive(Debug, Clone, Copy)]
struct StreamChar {
    ch: char,
    glyph: Option<GlyphRef>,
    /// A hyphen at a line break; the matcher may skip it.
    optional: bool,
}

#[derive(Debug, Default)]
struct BlockStream {
    chars: Vec<StreamChar>,
}

impl BlockStream {
    fn push_glyph(&mut self, glyph: &Glyph, at: GlyphRef) {
        if glyph.ch.is_whitespace() {
            self.push_space();
            return;
        }
        let mut folded = Vec::with_capacity(1);
        fold_char(glyph.ch, &mut folded);
        self.chars.extend(folded.into_iter().map(|ch| StreamChar {
            ch,
            glyph: Some(at),
            optional: false,
        }));
    }

    fn push_space(&mut self) {
        match self.chars.last() {
            None => {}
            Some(last) if last.ch == ' ' => {}
            Some(_) => self.chars.push(StreamChar {
                ch: ' ',
                glyph: None,
                optional: false,
            }),
        }
    }

    fn push_break_hyphen(&mut self, at: GlyphRef) {
        self.chars.push(StreamChar {
            ch: '-',
            glyph: Some(at),
            optional: true,
        });
    }

    /// End index (exclusive) of a match of `needle` starting at `start`.
    fn match_at(&self, start: usize, needle: &[char]) -> Option<usize> {
        let mut i = start;
        let mut j = 0;
        while j < needle.len() {
            let sc = self.chars.get(i)?;
            if sc.ch == needle[j] {
                i += 1;
                j += 1;
            } else if sc.optional {
                i += 1;
            } else {
                return None;
            }
        }
        Some(i)
    }

    fn is_boundary_before(&self, start: usize) -> bool {
        self.chars[..start]
            .iter()
            .rev()
            .find(|c| !c.optional)
            .is_none_or(|c| !c.ch.is_alphanumeric())
    }

    fn is_boundary_after(&self, end: usize) -> bool {
        self.chars[end..]
            .iter()
            .find(|c| !c.optional)
            .is_none_or(|c| !c.ch.is_alphanumeric())
    }
}

/// Search-ready form of one page, built once and reused for every term.
#[derive(Debug)]
pub struct PageIndex<'a> {
    page: &'a PageText,
    blocks: Vec<BlockStream>,
}

impl<'a> PageIndex<'a> {
    pub fn build(page: &'a PageText) -> Self {
        let blocks = page
            .blocks
            .iter()
            .map(|block| {
                let mut stream = BlockStream::default();
                let mut skip_leading_ws = false;

                for (li, line) in block.lines.iter().enumerate() {
                    let glyphs = &line.glyphs;
                    let next_first = block.lines.get(li + 1).and_then(|l| {
                        l.glyphs
                            .iter()
                            .find(|g| !g.ch.is_whitespace())
                            .map(|g| g.ch)
                    });
                    let hyphen_at = glyphs
                        .iter()
                        .rposition(|g| !g.ch.is_whitespace())
                        .filter(|&k| {
                            k > 0
                                && is_line_break_hyphen(glyphs[k].ch)
                                && glyphs[k - 1].ch.is_alphabetic()
                                && next_first.is_some_and(char::is_alphabetic)
                        });
                    let end = hyphen_at.unwrap_or(glyphs.len());

                    for (gi, glyph) in glyphs[..end].iter().enumerate() {
                        if skip_leading_ws && glyph.ch.is_whitespace() {
                            continue;
                        }
                        skip_leading_ws = false;
                        stream.push_glyph(glyph, GlyphRef { line: li, glyph: gi });
                    }

                    match hyphen_at {
                        Some(k) => {
                            stream.push_break_hyphen(GlyphRef { line: li, glyph: k });
                            skip_leading_ws = true;
                        }
                        None => stream.push_space(),
                    }
                }
                stream
            })
            .collect();

        Self { page, blocks }
    }
}

/// Finds where terms appear on a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseLocator {
    policy: MatchPolicy,
}

impl PhraseLocator {
    pub fn new(policy: MatchPolicy) -> Self {
        Self { policy }
    }

    /// Regions where `term` appears, in reading order. Each entry holds one
    /// quad per line fragment of the hit. Absent terms yield an empty list.
    pub fn find(&self, index: &PageIndex<'_>, term: &str) -> Vec<Vec<Quad>> {
        let needle = fold_text(&normalize_whitespace(term));
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for (bi, stream) in index.blocks.iter().enumerate() {
            let mut i = 0;
            while i < stream.chars.len() {
                let candidate = !stream.chars[i].optional && stream.chars[i].ch == needle[0];
                let end = if candidate {
                    stream.match_at(i, &needle)
                } else {
                    None
                };

                match end {
                    Some(end) if self.accepts(stream, i, end) => {
                        let quads = fragment_quads(index.page, bi, &stream.chars[i..end]);
                        if !quads.is_empty() {
                            hits.push(quads);
                        }
                        i = end;
                    }
                    _ => i += 1,
                }
            }
        }
        hits
    }

    /// Convenience wrapper: index `page` and search a single term.
    pub fn locate(&self, page: &PageText, term: &str) -> Vec<Vec<Quad>> {
        self.find(&PageIndex::build(page), term)
    }

    /// All occurrences of every term in `group`, term by term in group order.
    pub fn locate_group(&self, index: &PageIndex<'_>, group: &ColorGroup) -> Vec<Occurrence> {
        let mut occurrences = Vec::new();
        for term in &group.terms {
            let hits = self.find(index, term);
            if !hits.is_empty() {
                tracing::debug!(page = index.page.index, term = %term, hits = hits.len(), "term located");
            }
            occurrences.extend(hits.into_iter().map(|quads| Occurrence {
                page: index.page.index,
                term: term.clone(),
                category: group.category,
                color: group.color,
                quads,
            }));
        }
        occurrences
    }

    fn accepts(&self, stream: &BlockStream, start: usize, end: usize) -> bool {
        match self.policy {
            MatchPolicy::Substring => true,
            MatchPolicy::WordBoundary => {
                stream.is_boundary_before(start) && stream.is_boundary_after(end)
            }
        }
    }
}

/// One quad per line touched by `matched`, spanning its first to last glyph.
fn fragment_quads(page: &PageText, block: usize, matched: &[StreamChar]) -> Vec<Quad> {
    let lines = &page.blocks[block].lines;
    let mut quads = Vec::new();
    let mut span: Option<(GlyphRef, GlyphRef)> = None;

    let flush = |span: (GlyphRef, GlyphRef), quads: &mut Vec<Quad>| {
        let first = &lines[span.0.line].glyphs[span.0.glyph].quad;
        let last = &lines[span.1.line].glyphs[span.1.glyph].quad;
        let quad = Quad {
            ul: first.ul,
            ll: first.ll,
            ur: last.ur,
            lr: last.lr,
        };
        if !quad.is_degenerate() {
            quads.push(quad);
        }
    };

    // break hyphens are left unmarked whether or not the term consumed them
    for at in matched.iter().filter(|c| !c.optional).filter_map(|c| c.glyph) {
        span = match span {
            Some((start, _)) if start.line == at.line => Some((start, at)),
            Some(done) => {
                flush(done, &mut quads);
                Some((at, at))
            }
            None => Some((at, at)),
        };
    }
    if let Some(done) = span {
        flush(done, &mut quads);
    }
    quads
}
