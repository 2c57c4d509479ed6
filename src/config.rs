//! Render configuration – page geometry, backend choice, stylesheet, and
//! diagram handling. Loadable from a JSON file; every field has a default so
//! a partial file (or none at all) is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, Result};

/// Placeholder written in place of Mermaid blocks that cannot be rendered.
pub const DEFAULT_DIAGRAM_PLACEHOLDER: &str = "[Diagram - See HTML version]";

/// Which HTML → PDF converter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process block-flow renderer on top of printpdf.
    #[default]
    Native,
    /// The `wkhtmltopdf` executable.
    Wkhtmltopdf,
    /// The `weasyprint` executable.
    Weasyprint,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Native => "native",
            BackendKind::Wkhtmltopdf => "wkhtmltopdf",
            BackendKind::Weasyprint => "weasyprint",
        }
    }
}

/// Which embedded stylesheet wraps the rendered HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleSheet {
    /// Paged-media stylesheet with an `@page` rule and pt-based typography.
    #[default]
    Print,
    /// Centered 900px column, sized for on-screen reading.
    Screen,
}

/// What to do with fenced ```` ```mermaid ```` blocks before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramMode {
    /// Leave them as code blocks.
    Keep,
    /// Replace each one with the placeholder text.
    #[default]
    Placeholder,
    /// Substitute known diagrams with their SVG asset, placeholder the rest.
    Embed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramConfig {
    pub mode: DiagramMode,
    pub placeholder: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            mode: DiagramMode::default(),
            placeholder: DEFAULT_DIAGRAM_PLACEHOLDER.to_string(),
        }
    }
}

/// Paper size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperSize {
    #[default]
    A4,
    Letter,
}

impl PaperSize {
    /// Portrait (width, height) in points.
    pub fn dimensions_pt(self) -> (f32, f32) {
        match self {
            PaperSize::A4 => (595.28, 841.89),
            PaperSize::Letter => (612.0, 792.0),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PaperSize::A4 => "A4",
            PaperSize::Letter => "Letter",
        }
    }
}

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Page geometry shared by every backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub size: PaperSize,
    pub orientation: PageOrientation,
    /// Uniform page margin in points (default: 2cm ≈ 56.7pt).
    pub margin_pt: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PaperSize::A4,
            orientation: PageOrientation::Portrait,
            margin_pt: 56.69,
        }
    }
}

impl PageSetup {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        let (w, h) = self.size.dimensions_pt();
        match self.orientation {
            PageOrientation::Portrait => w,
            PageOrientation::Landscape => h,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        let (w, h) = self.size.dimensions_pt();
        match self.orientation {
            PageOrientation::Portrait => h,
            PageOrientation::Landscape => w,
        }
    }

    /// Margin formatted as a CSS/wkhtmltopdf length (`"56.69pt"`).
    pub fn margin_css(&self) -> String {
        format!("{}pt", self.margin_pt)
    }
}

/// Configuration for one render run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Document title; falls back to the first `# heading`, then the file stem.
    pub title: Option<String>,
    pub backend: BackendKind,
    pub style: StyleSheet,
    /// Also write the HTML next to a successfully produced PDF.
    pub keep_html: bool,
    pub page: PageSetup,
    pub diagrams: DiagramConfig,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: None,
            backend: BackendKind::default(),
            style: StyleSheet::default(),
            keep_html: true,
            page: PageSetup::default(),
            diagrams: DiagramConfig::default(),
        }
    }
}

impl RenderConfig {
    /// Load a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ForgeError::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        Self::from_json(&text).map_err(|detail| ForgeError::Config {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Default PDF destination: the source path with its extension set to `pdf`.
pub fn default_output_path(source: &Path) -> PathBuf {
    source.with_extension("pdf")
}

/// Sibling HTML path for a destination (same stem, `html` extension).
pub fn html_sibling(dest: &Path) -> PathBuf {
    dest.with_extension("html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = RenderConfig::from_json(r#"{ "backend": "weasyprint" }"#).unwrap();
        assert_eq!(cfg.backend, BackendKind::Weasyprint);
        assert!(cfg.keep_html);
        assert_eq!(cfg.diagrams.placeholder, DEFAULT_DIAGRAM_PLACEHOLDER);
        assert_eq!(cfg.page.size, PaperSize::A4);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(RenderConfig::from_json(r#"{ "backend": "prince" }"#).is_err());
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let page = PageSetup {
            orientation: PageOrientation::Landscape,
            ..PageSetup::default()
        };
        assert!(page.effective_width() > page.effective_height());
    }

    #[test]
    fn sibling_paths() {
        let src = Path::new("/tmp/report/AI-Report.md");
        let pdf = default_output_path(src);
        assert_eq!(pdf, Path::new("/tmp/report/AI-Report.pdf"));
        assert_eq!(html_sibling(&pdf), Path::new("/tmp/report/AI-Report.html"));
    }

    #[test]
    fn json_roundtrip() {
        let cfg = RenderConfig {
            title: Some("Report".into()),
            style: StyleSheet::Screen,
            ..RenderConfig::default()
        };
        let back = RenderConfig::from_json(&cfg.to_json()).unwrap();
        assert_eq!(cfg, back);
    }
}
