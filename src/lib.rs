//! # report-forge – Markdown report → PDF
//!
//! Converts a Markdown report into a styled PDF, falling back to a
//! self-contained HTML file when no PDF backend can run. The stages are:
//!
//! 1. **Diagrams** – Mermaid blocks are kept, replaced by a placeholder, or
//!    swapped for static SVG assets ([`diagrams`])
//! 2. **Markdown** – Markdown → HTML fragment with heading anchors and a
//!    table of contents ([`markdown`])
//! 3. **Template** – fragment → complete styled document ([`template`])
//! 4. **Convert** – HTML → PDF bytes through a [`backend::PdfBackend`]
//! 5. **Write** – PDF or HTML fallback on disk ([`renderer`])
//!
//! ```no_run
//! use std::path::Path;
//! use report_forge::{render_file, RenderConfig, RenderOutcome};
//!
//! let outcome = render_file(Path::new("report.md"), None, RenderConfig::default())?;
//! if let RenderOutcome::HtmlFallback { path, .. } = &outcome {
//!     eprintln!("open {} in a browser and print to PDF", path.display());
//! }
//! # Ok::<(), report_forge::ForgeError>(())
//! ```

pub mod backend;
pub mod config;
pub mod diagrams;
pub mod error;
pub mod markdown;
pub mod preflight;
pub mod renderer;
pub mod template;

pub use backend::{backend_for, PdfBackend};
pub use config::{BackendKind, DiagramMode, PageSetup, RenderConfig, StyleSheet};
pub use diagrams::{DiagramAsset, DiagramRegistry, MarkerMap};
pub use error::{ForgeError, Result};
pub use renderer::{render_file, DocumentRenderer, RenderOutcome, RenderedHtml};
