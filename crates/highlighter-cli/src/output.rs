use std::io::Write;
use std::path::Path;

use highlighter_core::{Color, HighlightOptions, HighlightReport, Quad};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn swatch(color: Color, mode: ColorMode) -> String {
    if mode.enabled() {
        let [r, g, b] = color.components().map(|c| (c * 255.0).round() as u8);
        "■".truecolor(r, g, b).to_string()
    } else {
        color.to_hex()
    }
}

/// Print what is about to happen.
pub fn print_run_header(
    w: &mut dyn Write,
    input: &Path,
    pages: usize,
    options: &HighlightOptions,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| input.display().to_string());
    if color.enabled() {
        writeln!(w, "Highlighting {} ({} pages)", name.bold(), pages)?;
    } else {
        writeln!(w, "Highlighting {} ({} pages)", name, pages)?;
    }
    writeln!(
        w,
        "Sampling {} pages for phrase extraction, {:?} matching, {:?} colors",
        options.sample_pages.min(pages),
        options.policy,
        options.mode
    )?;
    Ok(())
}

/// Print the per-group breakdown after a successful run.
pub fn print_summary(
    w: &mut dyn Write,
    report: &HighlightReport,
    output: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if report.phrases.is_empty() {
        let msg = "No AI phrases received; highlighted static terms only.";
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    } else {
        writeln!(w, "AI phrases: {}", report.phrases.join(", "))?;
    }

    for group in &report.groups {
        let count = report.count_for(group.category);
        writeln!(
            w,
            "  {} {:<13} {:>5} highlights ({} terms)",
            swatch(group.color, color),
            group.category.as_str(),
            count,
            group.terms.len()
        )?;
    }

    let pages_marked = report.per_page.iter().filter(|&&n| n > 0).count();
    let total = format!(
        "{} highlights on {} of {} pages",
        report.total_annotations(),
        pages_marked,
        report.per_page.len()
    );
    if color.enabled() {
        writeln!(w, "\n{}", total.bold())?;
        writeln!(w, "Saved to {}", output.display().green())?;
    } else {
        writeln!(w, "\n{}", total)?;
        writeln!(w, "Saved to {}", output.display())?;
    }
    Ok(())
}

/// One line per hit in `locate` mode.
pub fn print_location(
    w: &mut dyn Write,
    page: usize,
    term: &str,
    quads: &[Quad],
    color: ColorMode,
) -> std::io::Result<()> {
    let rects: Vec<String> = quads
        .iter()
        .map(|q| {
            let r = q.bounds();
            format!("[{:.1}, {:.1}, {:.1}, {:.1}]", r.x0, r.y0, r.x1, r.y1)
        })
        .collect();
    let page_label = format!("page {:>3}", page + 1);
    if color.enabled() {
        writeln!(w, "{}  {}  {}", page_label.dimmed(), term.cyan(), rects.join(" "))
    } else {
        writeln!(w, "{}  {}  {}", page_label, term, rects.join(" "))
    }
}

pub fn print_locate_summary(
    w: &mut dyn Write,
    terms: &[String],
    found: &[usize],
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    for (term, &n) in terms.iter().zip(found) {
        if n == 0 && color.enabled() {
            writeln!(w, "{}: {}", term, "not found".red())?;
        } else if n == 0 {
            writeln!(w, "{}: not found", term)?;
        } else {
            writeln!(w, "{}: {} occurrences", term, n)?;
        }
    }
    Ok(())
}
