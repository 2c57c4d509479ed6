//! Integration tests for the report-forge pipeline.
//!
//! These tests validate:
//! - A minimal document renders to a real PDF with the native backend
//! - A failing backend leaves an HTML fallback and still returns `Ok`
//! - Re-running overwrites the output with identical bytes
//! - Malformed raw HTML in the Markdown does not drop later content
//! - The builtin diagram assets are exported unchanged and well formed
//! - Marker substitution leaves documents without diagrams untouched

use std::fs;
use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use report_forge::backend::native::layout::FontFace;
use report_forge::backend::native::layout_html;
use report_forge::config::{DiagramConfig, PageSetup};
use report_forge::diagrams::{check_well_formed, substitute, write_substituted};
use report_forge::{
    DiagramMode, DiagramRegistry, DocumentRenderer, ForgeError, MarkerMap, PdfBackend,
    RenderConfig, RenderOutcome, Result,
};
use sha2::{Digest, Sha256};

// =====================================================================
// Helpers
// =====================================================================

/// Always fails to convert, as a missing or crashing converter would.
struct FailingBackend;

impl PdfBackend for FailingBackend {
    fn name(&self) -> &str {
        "failing"
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn convert(&self, _html: &str, _page: &PageSetup) -> Result<Vec<u8>> {
        Err(ForgeError::Conversion {
            backend: "failing".into(),
            detail: "exit status: 1".into(),
        })
    }
}

/// Deterministic stand-in: a PDF header followed by the HTML bytes.
struct EchoBackend;

impl PdfBackend for EchoBackend {
    fn name(&self) -> &str {
        "echo"
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn convert(&self, html: &str, _page: &PageSetup) -> Result<Vec<u8>> {
        let mut out = b"%PDF-1.4\n%echo\n".to_vec();
        out.extend_from_slice(html.as_bytes());
        Ok(out)
    }
}

fn write_source(dir: &Path, name: &str, markdown: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, markdown).unwrap();
    path
}

fn sha256(path: &Path) -> Vec<u8> {
    Sha256::digest(fs::read(path).unwrap()).to_vec()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

// =====================================================================
// Rendering
// =====================================================================

#[test]
fn native_backend_renders_minimal_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "min.md", "# Title\n\nHello **world**\n");

    let outcome = DocumentRenderer::new(RenderConfig::default())
        .render_file(&src, None)
        .unwrap();

    let RenderOutcome::Pdf { path, size, html_copy } = outcome else {
        panic!("expected a PDF, got {outcome:?}");
    };
    assert_eq!(path, dir.path().join("min.pdf"));
    let bytes = fs::read(&path).unwrap();
    assert_eq!(bytes.len(), size);
    assert_valid_pdf(&bytes);

    let html = fs::read_to_string(html_copy.unwrap()).unwrap();
    assert!(html.contains(r#"<h1 id="title">Title</h1>"#));
    assert!(html.contains("<strong>world</strong>"));
}

#[test]
fn no_html_flag_skips_the_copy() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "doc.md", "text\n");
    let config = RenderConfig {
        keep_html: false,
        ..RenderConfig::default()
    };

    let outcome = DocumentRenderer::new(config)
        .with_backend(Box::new(EchoBackend))
        .render_file(&src, None)
        .unwrap();

    assert!(matches!(outcome, RenderOutcome::Pdf { html_copy: None, .. }));
    assert!(!dir.path().join("doc.html").exists());
}

#[test]
fn html_destination_is_not_overwritten_by_the_copy() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "doc.md", "# Doc\n\ntext\n");
    let dest = dir.path().join("doc.html");

    let outcome = DocumentRenderer::new(RenderConfig::default())
        .with_backend(Box::new(EchoBackend))
        .render_file(&src, Some(&dest))
        .unwrap();

    let RenderOutcome::Pdf { path, size, html_copy } = outcome else {
        panic!("expected a PDF, got {outcome:?}");
    };
    assert_eq!(path, dest);
    assert_eq!(html_copy, None);
    let bytes = fs::read(&dest).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(bytes.len(), size);
}

#[test]
fn failing_backend_writes_html_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "report.md", "# Report\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
    let dest = dir.path().join("out").join("report.pdf");

    let outcome = DocumentRenderer::new(RenderConfig::default())
        .with_backend(Box::new(FailingBackend))
        .render_file(&src, Some(&dest))
        .unwrap();

    let RenderOutcome::HtmlFallback { path, reason } = outcome else {
        panic!("expected fallback");
    };
    assert_eq!(path, dir.path().join("out").join("report.html"));
    assert!(reason.contains("exit status: 1"));
    assert!(!dest.exists());

    let html = fs::read_to_string(&path).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Report</title>"));
    assert!(html.contains("<table>"));
}

#[test]
fn rerun_overwrites_with_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "same.md", "# Same\n\n[TOC]\n\n## A\n\ntext\n");
    let renderer = DocumentRenderer::new(RenderConfig::default()).with_backend(Box::new(EchoBackend));

    let first = renderer.render_file(&src, None).unwrap();
    let first_hash = sha256(first.path());
    let first_html = sha256(&dir.path().join("same.html"));

    let second = renderer.render_file(&src, None).unwrap();
    assert_eq!(first.path(), second.path());
    assert_eq!(first_hash, sha256(second.path()));
    assert_eq!(first_html, sha256(&dir.path().join("same.html")));
}

#[test]
fn rerun_replaces_stale_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(dir.path(), "doc.md", "short\n");
    let dest = dir.path().join("doc.pdf");
    fs::write(&dest, vec![b'x'; 100_000]).unwrap();

    DocumentRenderer::new(RenderConfig::default())
        .with_backend(Box::new(EchoBackend))
        .render_file(&src, Some(&dest))
        .unwrap();

    let bytes = fs::read(&dest).unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.len() < 100_000);
}

#[test]
fn missing_source_returns_error_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let err = DocumentRenderer::new(RenderConfig::default())
        .render_file(&dir.path().join("nope.md"), None)
        .unwrap_err();
    assert!(matches!(err, ForgeError::SourceRead { .. }));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn embedded_diagrams_reach_the_native_layout_as_captions() {
    let markdown = "# Costs\n\n```mermaid\ngraph TB\n    subgraph \"Annual Cost Comparison (USD)\"\n    end\n```\n";
    let config = RenderConfig {
        diagrams: DiagramConfig {
            mode: DiagramMode::Embed,
            ..DiagramConfig::default()
        },
        ..RenderConfig::default()
    };
    let renderer = DocumentRenderer::new(config);
    let rendered = renderer.render_html(markdown, "costs").unwrap();
    assert!(rendered.html.contains("<svg"));

    let layout = layout_html(&rendered.html, &PageSetup::default());
    assert!(layout.runs().any(|r| r.text.starts_with("[diagram")));
}

#[test]
fn data_uri_image_is_placed_on_the_page() {
    let mut png = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(40, 20))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    let src = format!("data:image/png;base64,{}", BASE64_STD.encode(&png));
    let html = format!(r#"<html><body><p><img src="{src}" alt="chart"></p></body></html>"#);

    let layout = layout_html(&html, &PageSetup::default());
    let img = layout
        .pages
        .iter()
        .flat_map(|p| p.boxes.iter())
        .find_map(|b| b.image.as_ref())
        .expect("image box");
    assert!((img.width - 30.0).abs() < 0.01);
    assert!((img.height - 15.0).abs() < 0.01);

    let bytes = report_forge::backend::NativeBackend
        .convert(&html, &PageSetup::default())
        .unwrap();
    assert_valid_pdf(&bytes);
}

#[test]
fn long_report_spans_several_pages() {
    let mut markdown = String::from("# Long\n\n");
    for i in 0..60 {
        markdown.push_str(&format!(
            "## Section {i}\n\nSome prose about section {i}, long enough to wrap across the \
             content width of an A4 page at eleven points.\n\n- first\n- second\n\n"
        ));
    }
    let rendered = DocumentRenderer::new(RenderConfig::default())
        .render_html(&markdown, "long")
        .unwrap();
    let layout = layout_html(&rendered.html, &PageSetup::default());
    assert!(layout.pages.len() > 3, "got {} pages", layout.pages.len());
}

#[test]
fn stray_close_tag_in_markdown_keeps_later_content() {
    let rendered = DocumentRenderer::new(RenderConfig::default())
        .render_html(
            "Intro paragraph\n\n</div>\n\nAfter paragraph\n\n## Later heading\n",
            "stray",
        )
        .unwrap();
    let layout = layout_html(&rendered.html, &PageSetup::default());
    let text: Vec<&str> = layout.runs().map(|r| r.text.as_str()).collect();
    assert!(text.iter().any(|t| t.contains("After paragraph")), "got {text:?}");
    assert!(text.iter().any(|t| t.contains("Later heading")), "got {text:?}");
}

#[test]
fn unclosed_inline_html_leaves_next_heading_separate() {
    let rendered = DocumentRenderer::new(RenderConfig::default())
        .render_html("Para <span>open\n\n## Next\n\nMore text\n", "span")
        .unwrap();
    let layout = layout_html(&rendered.html, &PageSetup::default());
    let heading = layout
        .runs()
        .find(|r| r.text == "Next")
        .expect("heading laid out on its own");
    assert!(layout.runs().all(|r| !r.text.contains("openNext")));
    assert!(layout.runs().any(|r| r.text.contains("More text")));
    assert_eq!(heading.face, FontFace::Bold);
}

// =====================================================================
// Diagrams
// =====================================================================

#[test]
fn write_assets_exports_every_diagram_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("svg-diagrams");
    let registry = DiagramRegistry::builtin();

    let files = registry.write_assets(&out).unwrap();
    assert_eq!(files.len(), 13);
    for asset in registry.iter() {
        let path = out.join(format!("{}.svg", asset.id));
        assert_eq!(fs::read_to_string(&path).unwrap(), asset.svg);
        check_well_formed(asset.id, asset.svg).unwrap();
    }
}

#[test]
fn substitution_without_markers_is_identity() {
    let markdown = "# Plain\n\n```mermaid\nflowchart LR\n  X --> Y\n```\n\nDone.\n";
    let out = substitute(markdown, &MarkerMap::builtin(), &DiagramRegistry::builtin()).unwrap();
    assert_eq!(out.text, markdown);
    assert_eq!(out.total(), 0);
}

#[test]
fn write_substituted_creates_svg_markdown() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(
        dir.path(),
        "AI-Report.md",
        "## Timeline\n\n```mermaid\ngantt\n    title Delivery\n```\n",
    );

    let (path, result) = write_substituted(
        &src,
        None,
        &MarkerMap::builtin(),
        &DiagramRegistry::builtin(),
    )
    .unwrap();

    assert_eq!(path, dir.path().join("AI-Report-SVG.md"));
    assert_eq!(result.replaced, vec![("diagram5_timeline".to_string(), 1)]);
    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("<div class=\"diagram\">"));
    assert!(!written.contains("```mermaid"));
}
