//! In-process backend: parse the rendered HTML, flow it onto pages, and paint
//! the pages with `printpdf`.
//!
//! Stages:
//!
//! 1. **Parse** – HTML string → DOM tree ([`dom`])
//! 2. **Flow** – DOM → positioned, paginated boxes ([`flow`], [`text`])
//! 3. **Render** – boxes → PDF bytes ([`render`])
//!
//! The output between stages 2 and 3 is a [`LayoutConfig`], which can be
//! dumped as JSON for inspection.

pub mod dom;
pub mod flow;
pub mod layout;
pub mod render;
pub mod text;

use crate::config::PageSetup;
use crate::error::{ForgeError, Result};

use self::dom::{body_children, parse_html, DomNode, Tag};
pub use self::layout::LayoutConfig;

use super::PdfBackend;

const NAME: &str = "native";

/// HTML string → paginated layout.
///
/// The PDF title comes from the document's `<title>` element.
pub fn layout_html(html: &str, page: &PageSetup) -> LayoutConfig {
    let nodes = parse_html(html);
    let title = find_title(&nodes).unwrap_or_else(|| "document".to_string());
    let body = body_children(&nodes);
    let layout = flow::layout_document(&body, &title, page);
    log::debug!(
        "native: laid out {} top-level nodes onto {} page(s)",
        body.len(),
        layout.pages.len()
    );
    layout
}

fn find_title(nodes: &[DomNode]) -> Option<String> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Title {
                let title = e.text_content().trim().to_string();
                return (!title.is_empty()).then_some(title);
            }
            if let Some(found) = find_title(&e.children) {
                return Some(found);
            }
        }
    }
    None
}

/// Built-in renderer. Always available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl PdfBackend for NativeBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn convert(&self, html: &str, page: &PageSetup) -> Result<Vec<u8>> {
        let layout = layout_html(html, page);
        let bytes = render::render_pdf(&layout).map_err(|e| ForgeError::conversion(NAME, e))?;
        if bytes.is_empty() {
            return Err(ForgeError::conversion(NAME, "renderer produced no bytes"));
        }
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>Quarterly Report</title>\n<style>\nbody { font-size: 11pt; }\n</style>\n</head>\n<body>\n<h1 id=\"title\">Title</h1>\n<p>Hello <strong>world</strong></p>\n</body>\n</html>\n";

    #[test]
    fn title_comes_from_title_element() {
        let layout = layout_html(DOC, &PageSetup::default());
        assert_eq!(layout.title, "Quarterly Report");
    }

    #[test]
    fn head_content_is_not_drawn() {
        let layout = layout_html(DOC, &PageSetup::default());
        assert!(!layout.runs().any(|r| r.text.contains("font-size")));
        assert!(layout.runs().any(|r| r.text == "world"));
    }

    #[test]
    fn convert_produces_pdf_bytes() {
        let bytes = NativeBackend.convert(DOC, &PageSetup::default()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn layout_json_round_trips() {
        let layout = layout_html(DOC, &PageSetup::default());
        let back = LayoutConfig::from_json(&layout.to_json()).unwrap();
        assert_eq!(back.pages.len(), layout.pages.len());
    }
}
