//! Page-space geometry shared by the locator and the document backends.
//!
//! Coordinates follow the backend's page space: origin at the top-left of the
//! visible page box, y growing downward.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle. `x0 <= x1` and `y0 <= y1` for a normalized rect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// True when the rect encloses no area (or is inverted / NaN).
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Smallest rect containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn to_quad(&self) -> Quad {
        Quad {
            ul: Point::new(self.x0, self.y0),
            ur: Point::new(self.x1, self.y0),
            ll: Point::new(self.x0, self.y1),
            lr: Point::new(self.x1, self.y1),
        }
    }
}

/// Four-corner region, as produced for a glyph or a matched line fragment.
///
/// Corners are named from the reader's point of view, so rotated text keeps
/// `ul`/`ur` along the top edge of the glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    pub ul: Point,
    pub ur: Point,
    pub ll: Point,
    pub lr: Point,
}

impl Quad {
    pub fn corners(&self) -> [Point; 4] {
        [self.ul, self.ur, self.ll, self.lr]
    }

    /// Axis-aligned bounding rect of the four corners.
    pub fn bounds(&self) -> Rect {
        let [first, rest @ ..] = self.corners();
        let init = Rect::new(first.x, first.y, first.x, first.y);
        rest.iter().fold(init, |r, p| Rect {
            x0: r.x0.min(p.x),
            y0: r.y0.min(p.y),
            x1: r.x1.max(p.x),
            y1: r.y1.max(p.y),
        })
    }

    pub fn is_degenerate(&self) -> bool {
        self.bounds().is_degenerate()
    }
}

/// Normalized RGB color. Each channel is clamped into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
}

impl Color {
    pub const YELLOW: Color = Color::from_const(1.0, 1.0, 0.0);
    pub const GREEN: Color = Color::from_const(0.0, 1.0, 0.0);
    pub const SKY: Color = Color::from_const(0.0, 0.7, 1.0);
    pub const ORANGE: Color = Color::from_const(1.0, 0.5, 0.0);
    pub const MAGENTA: Color = Color::from_const(1.0, 0.0, 1.0);

    const fn from_const(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
        }
    }

    pub fn components(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// `#rrggbb`, used for terminal summaries and logs.
    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.components().map(|c| (c * 255.0).round() as u8);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

fn clamp_channel(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Color::rgb(r, g, b)
    }
}

impl From<Color> for [f32; 3] {
    fn from(c: Color) -> Self {
        c.components()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}
