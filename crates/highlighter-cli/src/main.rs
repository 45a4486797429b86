use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use highlighter_core::config_file::{self, ConfigFile};
use highlighter_core::phrases::{OpenAiConfig, OpenAiPhraseSource};
use highlighter_core::{
    API_KEY_ENV, HighlightOptions, MatchPolicy, PageIndex, PdfDocument, PhraseLocator,
    ProgressEvent, highlight_document, resolve_api_key,
};
use highlighter_pdf::PdfFile;

mod output;

use output::ColorMode;

/// AI-assisted PDF highlighter - mark key phrases and category terms in color
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Highlight a PDF and write the annotated copy
    Highlight {
        /// Path to the input PDF
        input: PathBuf,

        /// Path for the highlighted PDF
        output: PathBuf,

        /// Use one color for every term instead of per-category colors
        #[arg(long)]
        single_color: bool,

        /// Only match whole words ("model" will not hit "modeling")
        #[arg(long)]
        word_boundary: bool,

        /// Chat model used for phrase extraction
        #[arg(long)]
        model: Option<String>,

        /// Base URL of an OpenAI-compatible API
        #[arg(long)]
        endpoint: Option<String>,

        /// Number of leading pages sampled for phrase extraction
        #[arg(long)]
        sample_pages: Option<usize>,

        /// Highlight opacity between 0 and 1
        #[arg(long)]
        opacity: Option<f32>,

        /// API key (defaults to the OPENAI_API_KEY environment variable)
        #[arg(long)]
        api_key: Option<String>,

        /// Read configuration from this file instead of the default locations
        #[arg(long)]
        config: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Dry run: print where terms occur without calling the API or writing
    Locate {
        /// Path to the input PDF
        input: PathBuf,

        /// Terms to search for
        #[arg(required = true)]
        terms: Vec<String>,

        /// Only match whole words
        #[arg(long)]
        word_boundary: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Highlight {
            input,
            output,
            single_color,
            word_boundary,
            model,
            endpoint,
            sample_pages,
            opacity,
            api_key,
            config,
            no_color,
        } => {
            let flags = HighlightFlags {
                single_color,
                word_boundary,
                model,
                endpoint,
                sample_pages,
                opacity,
            };
            highlight(
                &input,
                &output,
                flags,
                api_key,
                config.as_deref(),
                ColorMode(!no_color),
            )
            .await
        }
        Command::Locate {
            input,
            terms,
            word_boundary,
            no_color,
        } => locate(&input, &terms, word_boundary, ColorMode(!no_color)),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "highlighter=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Command-line overrides, applied on top of the config file.
struct HighlightFlags {
    single_color: bool,
    word_boundary: bool,
    model: Option<String>,
    endpoint: Option<String>,
    sample_pages: Option<usize>,
    opacity: Option<f32>,
}

fn load_config_file(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match explicit {
        Some(path) => config_file::load_from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Could not read config file {}", path.display())),
        None => Ok(config_file::load_config()),
    }
}

/// Resolve phrase-source settings: CLI flags > env vars > config file > defaults.
fn openai_config(file: &ConfigFile, flags: &HighlightFlags) -> OpenAiConfig {
    let mut config = OpenAiConfig::default();
    if let Some(p) = &file.phrases {
        if let Some(v) = &p.endpoint {
            config.endpoint = v.clone();
        }
        if let Some(v) = &p.model {
            config.model = v.clone();
        }
        if let Some(v) = p.max_tokens {
            config.max_tokens = v;
        }
        if let Some(v) = p.temperature {
            config.temperature = v;
        }
        if let Some(v) = p.timeout_secs {
            config.timeout = Duration::from_secs(v);
        }
        if let Some(v) = p.json_mode {
            config.json_mode = v;
        }
    }
    if let Some(v) = flags
        .endpoint
        .clone()
        .or_else(|| std::env::var("OPENAI_BASE_URL").ok())
    {
        config.endpoint = v;
    }
    if let Some(v) = flags
        .model
        .clone()
        .or_else(|| std::env::var("OPENAI_MODEL").ok())
    {
        config.model = v;
    }
    config
}

fn highlight_options(file: &ConfigFile, flags: &HighlightFlags) -> HighlightOptions {
    let mut options = HighlightOptions::from_config(file);
    if flags.single_color {
        options.mode = highlighter_core::ColorMode::Single;
    }
    if flags.word_boundary {
        options.policy = MatchPolicy::WordBoundary;
    }
    if let Some(v) = flags.sample_pages {
        options.sample_pages = v;
    }
    if let Some(v) = flags.opacity {
        options.style.opacity = v;
    }
    options
}

async fn highlight(
    input: &Path,
    output_path: &Path,
    flags: HighlightFlags,
    api_key: Option<String>,
    config_path: Option<&Path>,
    color: ColorMode,
) -> anyhow::Result<()> {
    // Missing credential is fatal before any document I/O
    let api_key = resolve_api_key(api_key, std::env::var(API_KEY_ENV).ok())?;

    let file = load_config_file(config_path)?;
    let options = highlight_options(&file, &flags);
    let source = OpenAiPhraseSource::new(api_key, openai_config(&file, &flags));

    if !input.exists() {
        anyhow::bail!("File not found: {}", input.display());
    }
    let doc = PdfFile::open(input)?;
    let total_pages = doc.page_count()?;

    let mut stdout = std::io::stdout();
    output::print_run_header(&mut stdout, input, total_pages, &options, color)?;

    let bar = page_bar(total_pages as u64);
    let report = highlight_document(doc, output_path, &source, &options, |event| {
        match event {
            ProgressEvent::PhrasesReceived { count } => {
                bar.set_message(format!("{} phrases", count));
            }
            ProgressEvent::PageDone { index, .. } => bar.set_position(index as u64 + 1),
            ProgressEvent::Saved { .. } => bar.finish_and_clear(),
            _ => {}
        }
    })
    .await;
    if !bar.is_finished() {
        bar.abandon();
    }
    let report = report?;

    output::print_summary(&mut stdout, &report, output_path, color)?;
    stdout.flush()?;
    Ok(())
}

fn page_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} pages {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn locate(
    input: &Path,
    terms: &[String],
    word_boundary: bool,
    color: ColorMode,
) -> anyhow::Result<()> {
    if !input.exists() {
        anyhow::bail!("File not found: {}", input.display());
    }
    let mut doc = PdfFile::open(input)?;
    let policy = if word_boundary {
        MatchPolicy::WordBoundary
    } else {
        MatchPolicy::Substring
    };
    let locator = PhraseLocator::new(policy);

    let mut stdout = std::io::stdout();
    let mut found = vec![0usize; terms.len()];
    for index in 0..doc.page_count()? {
        let page = doc.page_text(index)?;
        let page_index = PageIndex::build(&page);
        for (t, term) in terms.iter().enumerate() {
            for quads in locator.find(&page_index, term) {
                output::print_location(&mut stdout, index, term, &quads, color)?;
                found[t] += 1;
            }
        }
    }
    doc.close();

    output::print_locate_summary(&mut stdout, terms, &found, color)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use highlighter_core::config_file::{HighlightConfig, PhrasesConfig};

    fn no_flags() -> HighlightFlags {
        HighlightFlags {
            single_color: false,
            word_boundary: false,
            model: None,
            endpoint: None,
            sample_pages: None,
            opacity: None,
        }
    }

    #[test]
    fn flags_override_config_file() {
        let file = ConfigFile {
            phrases: Some(PhrasesConfig {
                model: Some("from-file".into()),
                sample_pages: Some(3),
                timeout_secs: Some(5),
                ..Default::default()
            }),
            highlight: Some(HighlightConfig {
                opacity: Some(0.3),
                ..Default::default()
            }),
            ..Default::default()
        };
        let flags = HighlightFlags {
            model: Some("from-flag".into()),
            sample_pages: Some(2),
            single_color: true,
            ..no_flags()
        };

        let openai = openai_config(&file, &flags);
        assert_eq!(openai.model, "from-flag");
        assert_eq!(openai.timeout, Duration::from_secs(5));

        let options = highlight_options(&file, &flags);
        assert_eq!(options.sample_pages, 2);
        assert_eq!(options.style.opacity, 0.3);
        assert_eq!(options.mode, highlighter_core::ColorMode::Single);
        assert_eq!(options.policy, MatchPolicy::Substring);
    }

    #[test]
    fn cli_parses_highlight_command() {
        let cli = Cli::try_parse_from([
            "highlighter",
            "highlight",
            "in.pdf",
            "out.pdf",
            "--word-boundary",
            "--opacity",
            "0.5",
        ])
        .unwrap();
        match cli.command {
            Command::Highlight {
                input,
                word_boundary,
                opacity,
                ..
            } => {
                assert_eq!(input, PathBuf::from("in.pdf"));
                assert!(word_boundary);
                assert_eq!(opacity, Some(0.5));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn locate_requires_terms() {
        assert!(Cli::try_parse_from(["highlighter", "locate", "in.pdf"]).is_err());
    }
}
