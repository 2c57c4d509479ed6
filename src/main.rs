//! mdforge – command-line Markdown report → PDF converter.
//!
//! Usage:
//!   mdforge render <report.md> [report.pdf] [--backend weasyprint] [--diagrams embed]
//!   mdforge diagrams <report.md> [--output report-SVG.md] [--svg-dir svg-diagrams]
//!   mdforge check [--backend wkhtmltopdf]
//!
//! `render` exits 0 whenever an artifact was written, including the HTML
//! fallback; only unreadable input or unwritable output is an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use report_forge::backend::native::layout_html;
use report_forge::config::{BackendKind, DiagramMode, RenderConfig, StyleSheet};
use report_forge::diagrams::{check_well_formed, write_substituted, DiagramRegistry, MarkerMap};
use report_forge::preflight;
use report_forge::{DocumentRenderer, RenderOutcome};

/// Render Markdown reports to PDF, with an HTML fallback.
#[derive(Parser, Debug)]
#[command(name = "mdforge", version, arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a Markdown file to PDF (or HTML if conversion fails).
    Render(RenderArgs),

    /// Replace known Mermaid blocks with SVG assets and export the assets.
    Diagrams {
        /// Markdown file to process.
        input: PathBuf,

        /// Where to write the substituted Markdown (default: <stem>-SVG.md).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for the exported .svg files (default: svg-diagrams next
        /// to the input).
        #[arg(long)]
        svg_dir: Option<PathBuf>,
    },

    /// Report whether the conversion backends can run.
    Check {
        /// Check only this backend.
        #[arg(long, value_enum)]
        backend: Option<BackendArg>,
    },
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output PDF path (default: input with a .pdf extension).
    output: Option<PathBuf>,

    /// HTML → PDF converter.
    #[arg(long, value_enum, env = "MDFORGE_BACKEND")]
    backend: Option<BackendArg>,

    /// Embedded stylesheet.
    #[arg(long, value_enum)]
    style: Option<StyleArg>,

    /// Mermaid block handling.
    #[arg(long, value_enum)]
    diagrams: Option<DiagramArg>,

    /// Do not keep an HTML copy next to a successful PDF.
    #[arg(long)]
    no_html: bool,

    /// Document title (default: first `#` heading, then the file name).
    #[arg(short, long)]
    title: Option<String>,

    /// JSON render configuration; command-line flags take precedence.
    #[arg(short, long, env = "MDFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Also dump the native page layout as JSON to this path.
    #[arg(long)]
    layout_json: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Native,
    Wkhtmltopdf,
    Weasyprint,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Native => BackendKind::Native,
            BackendArg::Wkhtmltopdf => BackendKind::Wkhtmltopdf,
            BackendArg::Weasyprint => BackendKind::Weasyprint,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum StyleArg {
    Print,
    Screen,
}

impl From<StyleArg> for StyleSheet {
    fn from(v: StyleArg) -> Self {
        match v {
            StyleArg::Print => StyleSheet::Print,
            StyleArg::Screen => StyleSheet::Screen,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DiagramArg {
    Keep,
    Placeholder,
    Embed,
}

impl From<DiagramArg> for DiagramMode {
    fn from(v: DiagramArg) -> Self {
        match v {
            DiagramArg::Keep => DiagramMode::Keep,
            DiagramArg::Placeholder => DiagramMode::Placeholder,
            DiagramArg::Embed => DiagramMode::Embed,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Render(args) => render(args),
        Commands::Diagrams {
            input,
            output,
            svg_dir,
        } => diagrams(&input, output.as_deref(), svg_dir),
        Commands::Check { backend } => check(backend),
    }
}

fn render(args: RenderArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::from_file(path)?,
        None => RenderConfig::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend.into();
    }
    if let Some(style) = args.style {
        config.style = style.into();
    }
    if let Some(mode) = args.diagrams {
        config.diagrams.mode = mode.into();
    }
    if args.no_html {
        config.keep_html = false;
    }
    if args.title.is_some() {
        config.title = args.title.clone();
    }

    let renderer = DocumentRenderer::new(config);
    eprintln!(
        "Converting '{}' with {}...",
        args.input.display(),
        renderer.backend_name()
    );

    let outcome = renderer
        .render_file(&args.input, args.output.as_deref())
        .with_context(|| format!("rendering '{}'", args.input.display()))?;

    match &outcome {
        RenderOutcome::Pdf {
            path,
            size,
            html_copy,
        } => {
            eprintln!("PDF successfully created: '{}' ({size} bytes)", path.display());
            if let Some(html) = html_copy {
                eprintln!("HTML version saved: '{}'", html.display());
            }
        }
        RenderOutcome::HtmlFallback { path, reason } => {
            eprintln!("Error creating PDF: {reason}");
            eprintln!("HTML file created instead: '{}'", path.display());
            eprintln!("You can open this in a browser and use 'Print to PDF'.");
        }
    }

    if let Some(json_path) = &args.layout_json {
        write_layout_json(&renderer, &args.input, json_path)?;
    }
    Ok(())
}

fn write_layout_json(renderer: &DocumentRenderer, input: &Path, json_path: &Path) -> Result<()> {
    let markdown = fs::read_to_string(input)
        .with_context(|| format!("reading '{}'", input.display()))?;
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let rendered = renderer.render_html(&markdown, stem)?;
    let layout = layout_html(&rendered.html, &renderer.config().page);
    fs::write(json_path, layout.to_json())
        .with_context(|| format!("writing '{}'", json_path.display()))?;
    eprintln!(
        "Layout written: '{}' ({} page{})",
        json_path.display(),
        layout.pages.len(),
        if layout.pages.len() == 1 { "" } else { "s" }
    );
    Ok(())
}

fn diagrams(input: &Path, output: Option<&Path>, svg_dir: Option<PathBuf>) -> Result<()> {
    let registry = DiagramRegistry::builtin();
    let markers = MarkerMap::builtin();

    let (written, result) = write_substituted(input, output, &markers, &registry)
        .with_context(|| format!("substituting diagrams in '{}'", input.display()))?;
    for (id, count) in &result.replaced {
        eprintln!("  replaced {count}x with {id}");
    }
    if result.replaced.is_empty() {
        eprintln!("No Mermaid blocks matched a known diagram.");
    }
    eprintln!("Created {}", written.display());

    let dir = svg_dir.unwrap_or_else(|| {
        input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("svg-diagrams")
    });
    let files = registry.write_assets(&dir)?;
    for asset in registry.iter() {
        match check_well_formed(asset.id, asset.svg) {
            Ok(()) => eprintln!("  ok  {}.svg", asset.id),
            Err(e) => eprintln!("  BAD {e}"),
        }
    }
    eprintln!("Wrote {} SVG file(s) to '{}'", files.len(), dir.display());
    Ok(())
}

fn check(backend: Option<BackendArg>) -> Result<()> {
    let reports = match backend {
        Some(b) => {
            let kind = BackendKind::from(b);
            vec![preflight::PreflightReport {
                backend: kind,
                result: preflight::check_backend(kind),
            }]
        }
        None => preflight::check_all(),
    };

    for report in &reports {
        match &report.result {
            Ok(()) => eprintln!("{:<12} available", report.backend.as_str()),
            Err(e) => eprintln!("{:<12} {e}", report.backend.as_str()),
        }
    }
    if backend.is_some() && reports.iter().any(|r| !r.is_ready()) {
        process::exit(1);
    }
    Ok(())
}
