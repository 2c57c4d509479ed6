//! Document renderer – Markdown file in, PDF (or HTML fallback) out.
//!
//! The run is linear: preflight the backend, read the source, transform it
//! into a styled HTML document, convert, write. A backend that is missing or
//! fails never aborts the run; the HTML document is written next to the
//! destination instead so it can be printed from a browser.

use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{backend_for, PdfBackend};
use crate::config::{default_output_path, html_sibling, DiagramMode, RenderConfig};
use crate::diagrams::{substitute, DiagramRegistry, MarkerMap};
use crate::error::{ForgeError, Result};
use crate::markdown::{markdown_to_html, strip_mermaid_blocks};
use crate::preflight;
use crate::template::wrap_document;

/// A complete, self-styled HTML document produced from one Markdown source.
#[derive(Debug, Clone)]
pub struct RenderedHtml {
    pub title: String,
    pub html: String,
    /// Mermaid blocks replaced by an SVG asset or the placeholder.
    pub diagrams_replaced: usize,
}

/// What a render run left on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The PDF was written; `html_copy` is the sibling HTML when kept.
    Pdf {
        path: PathBuf,
        size: usize,
        html_copy: Option<PathBuf>,
    },
    /// Conversion was not possible; the HTML was written instead.
    HtmlFallback { path: PathBuf, reason: String },
}

impl RenderOutcome {
    /// Path of the primary artifact.
    pub fn path(&self) -> &Path {
        match self {
            RenderOutcome::Pdf { path, .. } | RenderOutcome::HtmlFallback { path, .. } => path,
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, RenderOutcome::Pdf { .. })
    }
}

/// Renders Markdown documents with one configuration and one backend.
pub struct DocumentRenderer {
    config: RenderConfig,
    backend: Box<dyn PdfBackend>,
    markers: MarkerMap,
    registry: DiagramRegistry,
}

impl DocumentRenderer {
    /// A renderer using the backend named in `config`.
    pub fn new(config: RenderConfig) -> Self {
        let backend = backend_for(config.backend);
        Self {
            config,
            backend,
            markers: MarkerMap::builtin(),
            registry: DiagramRegistry::builtin(),
        }
    }

    /// Replace the backend, e.g. with a custom converter.
    pub fn with_backend(mut self, backend: Box<dyn PdfBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Replace the markers used in [`DiagramMode::Embed`].
    pub fn with_markers(mut self, markers: MarkerMap) -> Self {
        self.markers = markers;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Apply the configured diagram handling to a Markdown source.
    fn prepare_markdown(&self, markdown: &str) -> Result<(String, usize)> {
        let placeholder = &self.config.diagrams.placeholder;
        match self.config.diagrams.mode {
            DiagramMode::Keep => Ok((markdown.to_string(), 0)),
            DiagramMode::Placeholder => Ok(strip_mermaid_blocks(markdown, placeholder)),
            DiagramMode::Embed => {
                let embedded = substitute(markdown, &self.markers, &self.registry)?;
                let (text, stripped) = strip_mermaid_blocks(&embedded.text, placeholder);
                Ok((text, embedded.total() + stripped))
            }
        }
    }

    /// Markdown text → complete HTML document.
    ///
    /// The title is the configured one, else the first level-1 heading, else
    /// `fallback_title` (normally the input file stem).
    pub fn render_html(&self, markdown: &str, fallback_title: &str) -> Result<RenderedHtml> {
        let (prepared, diagrams_replaced) = self.prepare_markdown(markdown)?;
        if diagrams_replaced > 0 {
            log::debug!("renderer: {diagrams_replaced} mermaid block(s) replaced");
        }

        let body = markdown_to_html(&prepared);
        let title = self
            .config
            .title
            .clone()
            .or(body.title)
            .unwrap_or_else(|| fallback_title.to_string());
        let html = wrap_document(&title, &body.html, self.config.style, &self.config.page);

        Ok(RenderedHtml {
            title,
            html,
            diagrams_replaced,
        })
    }

    /// Render `source` to `dest` (default: `source` with a `.pdf` extension).
    ///
    /// Returns `Err` only when the source cannot be read or an output cannot
    /// be written. Backend problems produce [`RenderOutcome::HtmlFallback`].
    pub fn render_file(&self, source: &Path, dest: Option<&Path>) -> Result<RenderOutcome> {
        let dest = dest
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(source));

        let ready = preflight::check(self.backend.as_ref());

        let markdown = fs::read_to_string(source).map_err(|e| ForgeError::SourceRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("document");
        let rendered = self.render_html(&markdown, stem)?;
        ensure_parent(&dest)?;

        let converted = ready.and_then(|()| self.backend.convert(&rendered.html, &self.config.page));
        match converted {
            Ok(bytes) => {
                fs::write(&dest, &bytes).map_err(|e| ForgeError::write(&dest, e))?;
                log::info!("wrote {} ({} bytes)", dest.display(), bytes.len());

                let sibling = html_sibling(&dest);
                let html_copy = if !self.config.keep_html {
                    None
                } else if sibling == dest {
                    log::warn!(
                        "not keeping an HTML copy: it would overwrite the PDF at {}",
                        dest.display()
                    );
                    None
                } else {
                    fs::write(&sibling, &rendered.html)
                        .map_err(|e| ForgeError::write(&sibling, e))?;
                    log::info!("wrote {}", sibling.display());
                    Some(sibling)
                };
                Ok(RenderOutcome::Pdf {
                    path: dest,
                    size: bytes.len(),
                    html_copy,
                })
            }
            Err(e) => {
                log::error!("PDF conversion failed: {e}");
                let path = html_sibling(&dest);
                fs::write(&path, &rendered.html).map_err(|e| ForgeError::write(&path, e))?;
                log::info!(
                    "wrote HTML fallback {}; open it in a browser and use \"Print to PDF\"",
                    path.display()
                );
                Ok(RenderOutcome::HtmlFallback {
                    path,
                    reason: e.to_string(),
                })
            }
        }
    }
}

fn ensure_parent(dest: &Path) -> Result<()> {
    match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| ForgeError::write(parent, e))
        }
        _ => Ok(()),
    }
}

/// Render `source` with `config` and its configured backend.
pub fn render_file(source: &Path, dest: Option<&Path>, config: RenderConfig) -> Result<RenderOutcome> {
    DocumentRenderer::new(config).render_file(source, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiagramConfig, PageSetup};

    struct Unavailable;

    impl PdfBackend for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn check(&self) -> Result<()> {
            Err(ForgeError::BackendUnavailable {
                backend: "unavailable".into(),
                hint: "not installed".into(),
            })
        }

        fn convert(&self, _html: &str, _page: &PageSetup) -> Result<Vec<u8>> {
            panic!("convert must not run after a failed preflight");
        }
    }

    const WITH_DIAGRAM: &str =
        "# Report\n\n```mermaid\ngantt\n    title Plan\n```\n\n```mermaid\nflowchart LR\n  A --> B\n```\n";

    fn renderer(mode: DiagramMode) -> DocumentRenderer {
        DocumentRenderer::new(RenderConfig {
            diagrams: DiagramConfig {
                mode,
                ..DiagramConfig::default()
            },
            ..RenderConfig::default()
        })
    }

    #[test]
    fn title_prefers_config_then_heading_then_stem() {
        let r = renderer(DiagramMode::Keep);
        assert_eq!(r.render_html("# Heading\n", "stem").unwrap().title, "Heading");
        assert_eq!(r.render_html("no heading", "stem").unwrap().title, "stem");

        let r = DocumentRenderer::new(RenderConfig {
            title: Some("Configured".into()),
            ..RenderConfig::default()
        });
        assert_eq!(r.render_html("# Heading\n", "stem").unwrap().title, "Configured");
    }

    #[test]
    fn keep_mode_leaves_code_blocks() {
        let out = renderer(DiagramMode::Keep).render_html(WITH_DIAGRAM, "x").unwrap();
        assert!(out.html.contains("language-mermaid"));
        assert_eq!(out.diagrams_replaced, 0);
    }

    #[test]
    fn placeholder_mode_replaces_every_block() {
        let out = renderer(DiagramMode::Placeholder).render_html(WITH_DIAGRAM, "x").unwrap();
        assert!(!out.html.contains("language-mermaid"));
        assert_eq!(out.html.matches("[Diagram - See HTML version]").count(), 2);
        assert_eq!(out.diagrams_replaced, 2);
    }

    #[test]
    fn embed_mode_inlines_known_diagrams() {
        let out = renderer(DiagramMode::Embed).render_html(WITH_DIAGRAM, "x").unwrap();
        assert!(out.html.contains("<div class=\"diagram\">"));
        assert!(out.html.contains("<svg"));
        assert_eq!(out.html.matches("[Diagram - See HTML version]").count(), 1);
        assert_eq!(out.diagrams_replaced, 2);
    }

    #[test]
    fn unavailable_backend_falls_back_to_html() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("doc.md");
        fs::write(&src, "# Doc\n\nbody\n").unwrap();

        let outcome = DocumentRenderer::new(RenderConfig::default())
            .with_backend(Box::new(Unavailable))
            .render_file(&src, None)
            .unwrap();

        let RenderOutcome::HtmlFallback { path, reason } = outcome else {
            panic!("expected fallback");
        };
        assert_eq!(path, dir.path().join("doc.html"));
        assert!(reason.contains("not installed"));
        assert!(!dir.path().join("doc.pdf").exists());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = renderer(DiagramMode::Keep)
            .render_file(&dir.path().join("absent.md"), None)
            .unwrap_err();
        assert!(matches!(err, ForgeError::SourceRead { .. }));
    }

    #[test]
    fn outcome_path() {
        let o = RenderOutcome::HtmlFallback {
            path: PathBuf::from("a.html"),
            reason: String::new(),
        };
        assert_eq!(o.path(), Path::new("a.html"));
        assert!(!o.is_pdf());
    }
}
