//! Color groups: which terms get which highlight color.
//!
//! Groups are applied in the order returned by [`build_color_groups`]; when
//! two groups mark overlapping text, the later group is drawn on top.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::Color;
use crate::text_utils::{normalize_whitespace, term_key};

/// Semantic category of a color group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// AI-suggested phrases plus the headline terms.
    Primary,
    Architecture,
    Evaluation,
    Training,
    Comparison,
    /// The only group in single-color mode.
    Combined,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Primary => "primary",
            Category::Architecture => "architecture",
            Category::Evaluation => "evaluation",
            Category::Training => "training",
            Category::Comparison => "comparison",
            Category::Combined => "combined",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether categories get their own colors or everything shares one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Multi,
    Single,
}

/// A set of terms sharing one highlight color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorGroup {
    pub category: Category,
    pub color: Color,
    pub terms: Vec<String>,
}

/// Static term list and color for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub color: Color,
    pub terms: Vec<String>,
}

impl CategorySpec {
    fn new(color: Color, terms: &[&str]) -> Self {
        Self {
            color,
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Immutable category → terms → color configuration.
///
/// Built once (defaults, optionally overridden from the config file) and
/// passed to [`build_color_groups`]; nothing mutates it during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightProfile {
    pub primary: CategorySpec,
    pub architecture: CategorySpec,
    pub evaluation: CategorySpec,
    pub training: CategorySpec,
    pub comparison: CategorySpec,
    /// Static terms and color used in single-color mode.
    pub combined: CategorySpec,
    /// How many AI phrases join the primary group in multi-color mode.
    pub primary_phrase_cap: usize,
}

impl Default for HighlightProfile {
    fn default() -> Self {
        Self {
            primary: CategorySpec::new(
                Color::YELLOW,
                &["transformer", "attention", "self-attention", "multi-head"],
            ),
            architecture: CategorySpec::new(
                Color::GREEN,
                &[
                    "model",
                    "architecture",
                    "layer",
                    "embedding",
                    "encoder",
                    "decoder",
                    "MLP",
                ],
            ),
            evaluation: CategorySpec::new(
                Color::SKY,
                &[
                    "dataset",
                    "benchmark",
                    "accuracy",
                    "performance",
                    "results",
                    "evaluation",
                ],
            ),
            training: CategorySpec::new(
                Color::ORANGE,
                &[
                    "training",
                    "pre-training",
                    "fine-tuning",
                    "optimization",
                    "learning",
                ],
            ),
            comparison: CategorySpec::new(
                Color::MAGENTA,
                &[
                    "comparison",
                    "baseline",
                    "state-of-the-art",
                    "improvement",
                    "efficiency",
                ],
            ),
            combined: CategorySpec::new(
                Color::YELLOW,
                &["model", "architecture", "performance", "results"],
            ),
            primary_phrase_cap: 8,
        }
    }
}

impl HighlightProfile {
    pub fn spec(&self, category: Category) -> &CategorySpec {
        match category {
            Category::Primary => &self.primary,
            Category::Architecture => &self.architecture,
            Category::Evaluation => &self.evaluation,
            Category::Training => &self.training,
            Category::Comparison => &self.comparison,
            Category::Combined => &self.combined,
        }
    }

    pub fn spec_mut(&mut self, category: Category) -> &mut CategorySpec {
        match category {
            Category::Primary => &mut self.primary,
            Category::Architecture => &mut self.architecture,
            Category::Evaluation => &mut self.evaluation,
            Category::Training => &mut self.training,
            Category::Comparison => &mut self.comparison,
            Category::Combined => &mut self.combined,
        }
    }
}

/// Categories applied in multi-color mode, in draw order.
pub const MULTI_COLOR_ORDER: [Category; 5] = [
    Category::Primary,
    Category::Architecture,
    Category::Evaluation,
    Category::Training,
    Category::Comparison,
];

/// Merge AI phrases with the profile's static lists into ordered color groups.
///
/// Multi-color: the first `primary_phrase_cap` phrases followed by the primary
/// static terms, then one group per remaining category with its static terms
/// only. Single-color: every phrase followed by the combined static terms.
///
/// Within a group, terms are whitespace-normalized, blanks are dropped, and
/// case-insensitive repeats keep only their first spelling. The same term may
/// still appear in several groups.
pub fn build_color_groups(
    phrases: &[String],
    profile: &HighlightProfile,
    mode: ColorMode,
) -> Vec<ColorGroup> {
    match mode {
        ColorMode::Multi => MULTI_COLOR_ORDER
            .iter()
            .map(|&category| {
                let spec = profile.spec(category);
                let ai: &[String] = if category == Category::Primary {
                    &phrases[..phrases.len().min(profile.primary_phrase_cap)]
                } else {
                    &[]
                };
                group(category, spec.color, ai.iter().chain(spec.terms.iter()))
            })
            .collect(),
        ColorMode::Single => {
            let spec = profile.spec(Category::Combined);
            vec![group(
                Category::Combined,
                spec.color,
                phrases.iter().chain(spec.terms.iter()),
            )]
        }
    }
}

fn group<'a>(
    category: Category,
    color: Color,
    terms: impl Iterator<Item = &'a String>,
) -> ColorGroup {
    let mut seen = HashSet::new();
    let terms = terms
        .map(|t| normalize_whitespace(t))
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(term_key(t)))
        .collect();
    ColorGroup {
        category,
        color,
        terms,
    }
}
