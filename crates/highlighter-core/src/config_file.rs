use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::geometry::Color;
use crate::groups::{Category, HighlightProfile};
use crate::locate::MatchPolicy;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub phrases: Option<PhrasesConfig>,
    pub matching: Option<MatchingConfig>,
    pub highlight: Option<HighlightConfig>,
    pub categories: Option<CategoriesConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhrasesConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub json_mode: Option<bool>,
    pub sample_pages: Option<usize>,
    pub sample_chars: Option<usize>,
    pub min_phrases: Option<usize>,
    pub max_phrases: Option<usize>,
    pub primary_phrase_cap: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub policy: Option<MatchPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HighlightConfig {
    /// `"multi"` or `"single"`.
    pub mode: Option<String>,
    pub opacity: Option<f32>,
    pub include_contents: Option<bool>,
    pub author: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoriesConfig {
    pub primary: Option<CategoryOverride>,
    pub architecture: Option<CategoryOverride>,
    pub evaluation: Option<CategoryOverride>,
    pub training: Option<CategoryOverride>,
    pub comparison: Option<CategoryOverride>,
    pub combined: Option<CategoryOverride>,
}

/// Replaces a category's color and/or static term list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryOverride {
    pub color: Option<Color>,
    pub terms: Option<Vec<String>>,
}

impl CategoriesConfig {
    fn entries(&self) -> [(Category, Option<&CategoryOverride>); 6] {
        [
            (Category::Primary, self.primary.as_ref()),
            (Category::Architecture, self.architecture.as_ref()),
            (Category::Evaluation, self.evaluation.as_ref()),
            (Category::Training, self.training.as_ref()),
            (Category::Comparison, self.comparison.as_ref()),
            (Category::Combined, self.combined.as_ref()),
        ]
    }

    /// Apply every override onto `profile`.
    pub fn apply_to(&self, profile: &mut HighlightProfile) {
        for (category, ov) in self.entries() {
            let Some(ov) = ov else { continue };
            let spec = profile.spec_mut(category);
            if let Some(color) = ov.color {
                spec.color = color;
            }
            if let Some(terms) = &ov.terms {
                spec.terms = terms.clone();
            }
        }
    }
}

/// Platform config directory path: `<config_dir>/highlighter/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("highlighter").join("config.toml"))
}

/// Load config by cascading CWD `.highlighter.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".highlighter.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        phrases: Some(merge_phrases(
            base.phrases.unwrap_or_default(),
            overlay.phrases.unwrap_or_default(),
        )),
        matching: Some(MatchingConfig {
            policy: overlay
                .matching
                .and_then(|m| m.policy)
                .or_else(|| base.matching.and_then(|m| m.policy)),
        }),
        highlight: Some(merge_highlight(
            base.highlight.unwrap_or_default(),
            overlay.highlight.unwrap_or_default(),
        )),
        categories: Some(merge_categories(
            base.categories.unwrap_or_default(),
            overlay.categories.unwrap_or_default(),
        )),
    }
}

fn merge_phrases(base: PhrasesConfig, overlay: PhrasesConfig) -> PhrasesConfig {
    PhrasesConfig {
        endpoint: overlay.endpoint.or(base.endpoint),
        model: overlay.model.or(base.model),
        max_tokens: overlay.max_tokens.or(base.max_tokens),
        temperature: overlay.temperature.or(base.temperature),
        timeout_secs: overlay.timeout_secs.or(base.timeout_secs),
        json_mode: overlay.json_mode.or(base.json_mode),
        sample_pages: overlay.sample_pages.or(base.sample_pages),
        sample_chars: overlay.sample_chars.or(base.sample_chars),
        min_phrases: overlay.min_phrases.or(base.min_phrases),
        max_phrases: overlay.max_phrases.or(base.max_phrases),
        primary_phrase_cap: overlay.primary_phrase_cap.or(base.primary_phrase_cap),
    }
}

fn merge_highlight(base: HighlightConfig, overlay: HighlightConfig) -> HighlightConfig {
    HighlightConfig {
        mode: overlay.mode.or(base.mode),
        opacity: overlay.opacity.or(base.opacity),
        include_contents: overlay.include_contents.or(base.include_contents),
        author: overlay.author.or(base.author),
    }
}

/// Category overrides merge per field, so an overlay may recolor a category
/// while keeping the base file's term list.
fn merge_categories(base: CategoriesConfig, overlay: CategoriesConfig) -> CategoriesConfig {
    fn pick(base: Option<CategoryOverride>, overlay: Option<CategoryOverride>) -> Option<CategoryOverride> {
        match (base, overlay) {
            (None, None) => None,
            (Some(b), None) => Some(b),
            (None, Some(o)) => Some(o),
            (Some(b), Some(o)) => Some(CategoryOverride {
                color: o.color.or(b.color),
                terms: o.terms.or(b.terms),
            }),
        }
    }

    CategoriesConfig {
        primary: pick(base.primary, overlay.primary),
        architecture: pick(base.architecture, overlay.architecture),
        evaluation: pick(base.evaluation, overlay.evaluation),
        training: pick(base.training, overlay.training),
        comparison: pick(base.comparison, overlay.comparison),
        combined: pick(base.combined, overlay.combined),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_example() {
        let toml_str = r#"
[phrases]
model = "gpt-4o-mini"
sample_pages = 3

[matching]
policy = "word-boundary"

[highlight]
mode = "single"
opacity = 0.4

[categories.architecture]
color = [0.2, 0.8, 0.2]
terms = ["encoder", "decoder"]
"#;
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.phrases.as_ref().unwrap().model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(
            parsed.matching.as_ref().unwrap().policy,
            Some(MatchPolicy::WordBoundary)
        );
        let arch = parsed.categories.unwrap().architecture.unwrap();
        assert_eq!(arch.terms.unwrap(), vec!["encoder", "decoder"]);
        assert_eq!(arch.color.unwrap(), Color::rgb(0.2, 0.8, 0.2));
    }

    #[test]
    fn absent_sections_deserialize_as_none() {
        let parsed: ConfigFile = toml::from_str("[phrases]\nmodel = \"x\"\n").unwrap();
        assert!(parsed.matching.is_none());
        assert!(parsed.phrases.unwrap().sample_pages.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base = ConfigFile {
            phrases: Some(PhrasesConfig {
                model: Some("base-model".into()),
                sample_pages: Some(4),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            phrases: Some(PhrasesConfig {
                model: Some("overlay-model".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay).phrases.unwrap();
        assert_eq!(merged.model.as_deref(), Some("overlay-model"));
        assert_eq!(merged.sample_pages, Some(4));
    }

    #[test]
    fn merge_category_fields_independently() {
        let base = ConfigFile {
            categories: Some(CategoriesConfig {
                training: Some(CategoryOverride {
                    color: None,
                    terms: Some(vec!["sgd".into()]),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            categories: Some(CategoriesConfig {
                training: Some(CategoryOverride {
                    color: Some(Color::GREEN),
                    terms: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let training = merge(base, overlay).categories.unwrap().training.unwrap();
        assert_eq!(training.color, Some(Color::GREEN));
        assert_eq!(training.terms.unwrap(), vec!["sgd"]);
    }

    #[test]
    fn overrides_apply_to_profile() {
        let cats = CategoriesConfig {
            comparison: Some(CategoryOverride {
                color: Some(Color::YELLOW),
                terms: Some(vec!["ablation".into()]),
            }),
            ..Default::default()
        };
        let mut profile = HighlightProfile::default();
        cats.apply_to(&mut profile);
        assert_eq!(profile.comparison.color, Color::YELLOW);
        assert_eq!(profile.comparison.terms, vec!["ablation"]);
        // untouched categories keep their defaults
        assert_eq!(profile.training, HighlightProfile::default().training);
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_from_path(Path::new("/nonexistent/highlighter.toml")).is_none());
    }

    #[test]
    fn garbage_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(load_from_path(&path).is_none());
    }
}
