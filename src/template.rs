//! Static document template and the two embedded stylesheets.

use crate::config::{PageSetup, StyleSheet};

/// Paged-media stylesheet. The `@page` rule is prepended by
/// [`wrap_document`] from the configured [`PageSetup`].
const PRINT_CSS: &str = r#"
body {
    font-family: 'Helvetica Neue', Arial, sans-serif;
    line-height: 1.6;
    color: #1f2937;
    font-size: 11pt;
}
h1 {
    font-size: 24pt;
    color: #111827;
    text-align: center;
    margin: 40px 0 20px 0;
    page-break-after: avoid;
}
h2 {
    font-size: 18pt;
    color: #1f2937;
    margin-top: 30px;
    margin-bottom: 15px;
    border-bottom: 2px solid #e5e7eb;
    padding-bottom: 8px;
    page-break-after: avoid;
}
h3 {
    font-size: 14pt;
    color: #374151;
    margin-top: 20px;
    margin-bottom: 10px;
    page-break-after: avoid;
}
h4 {
    font-size: 12pt;
    color: #4b5563;
    margin-top: 15px;
    margin-bottom: 8px;
}
p {
    margin: 10px 0;
    text-align: justify;
}
table {
    border-collapse: collapse;
    width: 100%;
    margin: 20px 0;
    font-size: 10pt;
    page-break-inside: avoid;
}
th, td {
    border: 1px solid #d1d5db;
    padding: 8px 12px;
    text-align: left;
}
th {
    background-color: #f3f4f6;
    font-weight: bold;
    color: #111827;
}
tr:nth-child(even) {
    background-color: #f9fafb;
}
code {
    background-color: #f3f4f6;
    padding: 2px 4px;
    border-radius: 3px;
    font-family: 'Courier New', monospace;
    font-size: 9pt;
}
pre {
    background-color: #f3f4f6;
    padding: 12px;
    border-radius: 6px;
    overflow-x: auto;
    font-size: 9pt;
    line-height: 1.4;
    page-break-inside: avoid;
}
blockquote {
    border-left: 4px solid #3b82f6;
    margin: 20px 0;
    padding-left: 16px;
    color: #4b5563;
    font-style: italic;
}
ul, ol {
    margin: 10px 0;
    padding-left: 30px;
}
li {
    margin: 5px 0;
}
strong {
    color: #111827;
    font-weight: bold;
}
em {
    font-style: italic;
}
hr {
    border: none;
    border-top: 1px solid #e5e7eb;
    margin: 30px 0;
}
div[align="center"], div.diagram {
    text-align: center;
    margin: 20px 0;
}
.toc ul {
    list-style: none;
}
.page-break {
    page-break-after: always;
}
.no-break {
    page-break-inside: avoid;
}
"#;

/// Screen stylesheet: a centered column for reading in a browser.
const SCREEN_CSS: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    line-height: 1.6;
    color: #1f2937;
    max-width: 900px;
    margin: 0 auto;
    padding: 20px;
}
h1, h2, h3 {
    color: #111827;
    margin-top: 24px;
}
h1 { font-size: 2.5em; text-align: center; }
h2 { font-size: 1.8em; border-bottom: 2px solid #e5e7eb; padding-bottom: 8px; }
h3 { font-size: 1.4em; }
table {
    border-collapse: collapse;
    width: 100%;
    margin: 20px 0;
}
th, td {
    border: 1px solid #e5e7eb;
    padding: 12px;
    text-align: left;
}
th {
    background-color: #f9fafb;
    font-weight: bold;
}
tr:nth-child(even) {
    background-color: #f9fafb;
}
code {
    background-color: #f3f4f6;
    padding: 2px 4px;
    border-radius: 3px;
    font-family: 'Courier New', monospace;
}
pre {
    background-color: #f3f4f6;
    padding: 16px;
    border-radius: 8px;
    overflow-x: auto;
}
blockquote {
    border-left: 4px solid #3b82f6;
    margin-left: 0;
    padding-left: 16px;
    color: #4b5563;
}
.mermaid, div.diagram {
    text-align: center;
    margin: 20px 0;
}
strong {
    color: #111827;
}
div[align="center"] {
    text-align: center;
    margin: 20px 0;
}
"#;

/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The stylesheet text for `style`, with the page rule for print output.
pub fn stylesheet(style: StyleSheet, page: &PageSetup) -> String {
    match style {
        StyleSheet::Print => {
            let orientation = match page.orientation {
                crate::config::PageOrientation::Portrait => "portrait",
                crate::config::PageOrientation::Landscape => "landscape",
            };
            format!(
                "@page {{\n    size: {} {};\n    margin: {};\n}}{}",
                page.size.name(),
                orientation,
                page.margin_css(),
                PRINT_CSS
            )
        }
        StyleSheet::Screen => SCREEN_CSS.to_string(),
    }
}

/// Wrap an HTML body fragment in a complete, self-styled document.
pub fn wrap_document(title: &str, body: &str, style: StyleSheet, page: &PageSetup) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        title = escape_html(title),
        css = stylesheet(style, page),
        body = body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_has_charset_title_and_body() {
        let doc = wrap_document(
            "Costs & Savings",
            "<p>Hi</p>",
            StyleSheet::Print,
            &PageSetup::default(),
        );
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"UTF-8\">"));
        assert!(doc.contains("<title>Costs &amp; Savings</title>"));
        assert!(doc.contains("<body>\n<p>Hi</p>\n</body>"));
    }

    #[test]
    fn print_style_carries_page_rule() {
        let css = stylesheet(StyleSheet::Print, &PageSetup::default());
        assert!(css.starts_with("@page {"));
        assert!(css.contains("size: A4 portrait;"));
        assert!(css.contains("page-break-inside: avoid;"));
    }

    #[test]
    fn screen_style_has_no_page_rule() {
        let css = stylesheet(StyleSheet::Screen, &PageSetup::default());
        assert!(!css.contains("@page"));
        assert!(css.contains("max-width: 900px;"));
    }

    #[test]
    fn escape() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }
}
