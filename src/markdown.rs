//! Markdown stage – Mermaid block handling and Markdown → HTML conversion.
//!
//! Conversion is delegated to `pulldown-cmark` with a fixed extension set
//! (tables, footnotes, strikethrough, task lists, smart punctuation, heading
//! attributes). On top of the raw event stream this module:
//!
//! 1. gives every heading a slug `id` so the document can be linked into,
//! 2. expands a paragraph that reads exactly `[TOC]` into a nested list of
//!    links to those headings,
//! 3. reports the first level-1 heading as the document title.

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::{NoExpand, Regex};

use crate::template::escape_html;

/// A fenced ```` ```mermaid ```` block; group 1 is the diagram source.
pub(crate) static MERMAID_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```mermaid[^\n]*\n(.*?)```").unwrap());

/// A heading found in the document, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingEntry {
    /// 1 for `#`, 6 for `######`.
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Result of converting a Markdown source to an HTML fragment.
#[derive(Debug, Clone)]
pub struct MarkdownOutput {
    /// HTML body fragment (no `<html>`/`<head>` wrapper).
    pub html: String,
    /// Text of the first level-1 heading, if any.
    pub title: Option<String>,
    pub headings: Vec<HeadingEntry>,
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Replace every fenced Mermaid block with `placeholder`.
///
/// Returns the new text and how many blocks were replaced.
pub fn strip_mermaid_blocks(markdown: &str, placeholder: &str) -> (String, usize) {
    let count = MERMAID_BLOCK.find_iter(markdown).count();
    if count == 0 {
        return (markdown.to_string(), 0);
    }
    let replaced = MERMAID_BLOCK
        .replace_all(markdown, NoExpand(placeholder))
        .into_owned();
    (replaced, count)
}

/// Convert Markdown to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> MarkdownOutput {
    let mut events: Vec<Event> = Parser::new_ext(markdown, options()).collect();
    let headings = assign_heading_ids(&mut events);
    let events = expand_toc(events, &headings);

    let mut html_out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_out, events.into_iter());

    let title = headings
        .iter()
        .find(|h| h.level == 1)
        .map(|h| h.text.clone());

    log::debug!(
        "markdown: {} bytes in, {} bytes html, {} headings",
        markdown.len(),
        html_out.len(),
        headings.len()
    );

    MarkdownOutput {
        html: html_out,
        title,
        headings,
    }
}

fn level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Fill in missing heading ids and return every heading in order.
/// Explicit `{#id}` attributes are kept as written.
fn assign_heading_ids(events: &mut [Event]) -> Vec<HeadingEntry> {
    let mut headings = Vec::new();
    let mut used: Vec<String> = Vec::new();

    let mut i = 0;
    while i < events.len() {
        let (level, explicit) = match &events[i] {
            Event::Start(Tag::Heading { level, id, .. }) => {
                (level_number(*level), id.as_ref().map(|s| s.to_string()))
            }
            _ => {
                i += 1;
                continue;
            }
        };

        let mut text = String::new();
        let mut j = i + 1;
        while j < events.len() {
            match &events[j] {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
            j += 1;
        }
        let text = text.trim().to_string();

        let id = match explicit {
            Some(id) => id,
            None => {
                let id = unique_slug(&slugify(&text), &used);
                if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[i] {
                    *slot = Some(CowStr::from(id.clone()));
                }
                id
            }
        };
        used.push(id.clone());
        headings.push(HeadingEntry { level, text, id });
        i = j;
    }
    headings
}

/// Lowercase, keep alphanumerics and `_`, fold whitespace/hyphen runs into `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("section");
    }
    slug
}

fn unique_slug(base: &str, used: &[String]) -> String {
    if !used.iter().any(|u| u == base) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !used.iter().any(|u| *u == candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Replace each paragraph whose text is exactly `[TOC]` with the generated
/// table of contents. pulldown-cmark splits brackets into separate text
/// events, so the paragraph's text runs are joined before comparing.
fn expand_toc<'a>(events: Vec<Event<'a>>, headings: &[HeadingEntry]) -> Vec<Event<'a>> {
    let mut out = Vec::with_capacity(events.len());
    let mut i = 0;
    while i < events.len() {
        if matches!(events[i], Event::Start(Tag::Paragraph)) {
            let mut text = String::new();
            let mut only_text = true;
            let mut j = i + 1;
            while j < events.len() {
                match &events[j] {
                    Event::End(TagEnd::Paragraph) => break,
                    Event::Text(t) => text.push_str(t),
                    _ => only_text = false,
                }
                j += 1;
            }
            if only_text && j < events.len() && text.trim() == "[TOC]" {
                out.push(Event::Html(CowStr::from(toc_html(headings))));
                i = j + 1;
                continue;
            }
        }
        out.push(events[i].clone());
        i += 1;
    }
    out
}

/// Build the nested `<ul>` table of contents.
fn toc_html(headings: &[HeadingEntry]) -> String {
    let mut out = String::from("<div class=\"toc\">\n");
    // Levels with an open <ul>; the last <li> of each is still open.
    let mut stack: Vec<u8> = Vec::new();

    for h in headings {
        match stack.last().copied() {
            None => {
                out.push_str("<ul>\n");
                stack.push(h.level);
            }
            Some(top) if h.level > top => {
                out.push_str("\n<ul>\n");
                stack.push(h.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                while stack.len() > 1 && stack.last().copied().unwrap_or(0) > h.level {
                    stack.pop();
                    out.push_str("</ul>\n");
                    if stack.last().copied().unwrap_or(0) >= h.level {
                        out.push_str("</li>\n");
                    }
                }
                if stack.last().copied().unwrap_or(0) < h.level {
                    out.push_str("<ul>\n");
                    stack.push(h.level);
                }
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&h.id),
            escape_html(&h.text)
        ));
    }
    while stack.pop().is_some() {
        out.push_str("</li>\n</ul>\n");
    }
    out.push_str("</div>\n");
    out
}
