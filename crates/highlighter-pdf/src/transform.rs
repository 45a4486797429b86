//! Mapping between MuPDF page space and PDF user space.
//!
//! MuPDF reports positions with the origin at the top-left of the visible
//! (cropped, rotated, UserUnit-scaled) page and y growing downward.
//! Annotations live in the unrotated user space of the page dictionary,
//! y growing upward. The page's own transform matrix from MuPDF maps user
//! space to page space; inverting it maps glyph quads back.

use highlighter_core::{Point, Quad};

/// Affine transform `[a b c d e f]`: `x' = a·x + c·y + e`, `y' = b·x + d·y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn invert(&self) -> Option<Matrix> {
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Matrix {
            a,
            b,
            c,
            d,
            e: -(self.e * a + self.f * c),
            f: -(self.e * b + self.f * d),
        })
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn apply_quad(&self, q: &Quad) -> Quad {
        Quad {
            ul: self.apply(q.ul),
            ur: self.apply(q.ur),
            ll: self.apply(q.ll),
            lr: self.apply(q.lr),
        }
    }
}

impl From<&mupdf::Matrix> for Matrix {
    fn from(m: &mupdf::Matrix) -> Self {
        Matrix::new(m.a, m.b, m.c, m.d, m.e, m.f)
    }
}

/// Page-space → user-space mapping for one page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    to_user: Matrix,
}

impl PageTransform {
    /// Build from the user → page matrix MuPDF used when laying out the
    /// page's text. A singular matrix yields `None`.
    pub fn from_page_matrix(to_page: Matrix) -> Option<Self> {
        to_page.invert().map(|to_user| Self { to_user })
    }

    pub fn point(&self, p: Point) -> Point {
        self.to_user.apply(p)
    }

    /// Map each corner; the corners keep their roles relative to the text.
    pub fn quad(&self, q: &Quad) -> Quad {
        self.to_user.apply_quad(q)
    }
}
