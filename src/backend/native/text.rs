//! Inline text – flattening inline HTML into styled words, measuring them
//! against the builtin PDF fonts, and word-wrapping them into lines.
//!
//! No font files are loaded; widths come from per-character heuristics close
//! to Helvetica's metrics (Courier is exactly 0.6 em per glyph).

use super::dom::{DomNode, Tag};
use super::layout::{FontFace, TextRun};

/// Link colour (#2563eb).
pub const LINK_COLOR: [f32; 3] = [0.145, 0.388, 0.922];

/// Style applied to a run of inline text.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineStyle {
    pub face: FontFace,
    pub color: [f32; 3],
    pub underline: bool,
    pub strike: bool,
}

impl InlineStyle {
    pub fn plain(color: [f32; 3]) -> Self {
        Self {
            face: FontFace::Regular,
            color,
            underline: false,
            strike: false,
        }
    }
}

/// Flattened inline content.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Word(String, InlineStyle),
    Space,
    Break,
    Image { src: String, alt: String },
}

/// A wrapped line: runs positioned from x = 0, plus the total width.
#[derive(Debug, Clone, Default)]
pub struct WrappedLine {
    pub runs: Vec<TextRun>,
    pub width: f32,
}

/// Approximate advance width of `c` in em.
fn char_width_em(c: char) -> f32 {
    match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '!' | '\'' | '|' => 0.25,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.333,
        'm' | 'M' | 'W' => 0.833,
        'w' | '%' => 0.722,
        c if c.is_ascii_digit() => 0.556,
        c if c.is_ascii_uppercase() => 0.667,
        c if c.is_ascii_lowercase() => 0.54,
        _ => 0.6,
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, face: FontFace, size: f32) -> f32 {
    if face.is_mono() {
        return text.chars().count() as f32 * 0.6 * size;
    }
    let em: f32 = text.chars().map(char_width_em).sum();
    let bold = if face.is_bold() { 1.05 } else { 1.0 };
    em * size * bold
}

/// Split plain text into words and single collapsed spaces.
pub fn push_text(text: &str, style: &InlineStyle, out: &mut Vec<Piece>) {
    let mut word = String::new();
    for c in text.chars() {
        // Non-breaking spaces stay inside the word.
        if c.is_whitespace() && c != '\u{00A0}' {
            if !word.is_empty() {
                out.push(Piece::Word(std::mem::take(&mut word), style.clone()));
            }
            if matches!(out.last(), Some(Piece::Word(..)) | Some(Piece::Image { .. })) {
                out.push(Piece::Space);
            }
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        out.push(Piece::Word(word, style.clone()));
    }
}

/// Flatten inline nodes into pieces, inheriting `style`.
pub fn collect_inline(nodes: &[DomNode], style: &InlineStyle, out: &mut Vec<Piece>) {
    for node in nodes {
        let e = match node {
            DomNode::Text(t) => {
                push_text(t, style, out);
                continue;
            }
            DomNode::Element(e) => e,
        };
        match &e.tag {
            Tag::Head | Tag::Title | Tag::Style | Tag::Script | Tag::Meta | Tag::Link => {}
            Tag::Br => out.push(Piece::Break),
            Tag::Strong => {
                let s = InlineStyle {
                    face: style.face.with_bold(),
                    ..style.clone()
                };
                collect_inline(&e.children, &s, out);
            }
            Tag::Em => {
                let s = InlineStyle {
                    face: style.face.with_italic(),
                    ..style.clone()
                };
                collect_inline(&e.children, &s, out);
            }
            Tag::Code => {
                let s = InlineStyle {
                    face: style.face.with_mono(),
                    ..style.clone()
                };
                collect_inline(&e.children, &s, out);
            }
            Tag::Del => {
                let s = InlineStyle {
                    strike: true,
                    ..style.clone()
                };
                collect_inline(&e.children, &s, out);
            }
            Tag::A => {
                let s = InlineStyle {
                    color: LINK_COLOR,
                    underline: true,
                    ..style.clone()
                };
                collect_inline(&e.children, &s, out);
            }
            Tag::Input => {
                let mark = if e.attributes.contains_key("checked") {
                    "[x]"
                } else {
                    "[ ]"
                };
                out.push(Piece::Word(mark.to_string(), style.clone()));
                out.push(Piece::Space);
            }
            Tag::Img => out.push(Piece::Image {
                src: e.attr("src").unwrap_or_default().to_string(),
                alt: e.attr("alt").unwrap_or_default().to_string(),
            }),
            Tag::Svg => push_text("[diagram]", style, out),
            tag if tag.is_inline() => collect_inline(&e.children, style, out),
            _ => {
                // Block content inside an inline context (e.g. a table cell).
                collect_inline(&e.children, style, out);
                out.push(Piece::Break);
            }
        }
    }
}

fn same_style(run: &TextRun, style: &InlineStyle) -> bool {
    run.face == style.face
        && run.color == style.color
        && run.underline == style.underline
        && run.strike == style.strike
}

fn append(line: &mut WrappedLine, text: &str, style: &InlineStyle, width: f32, lead: f32) {
    let x = line.width + lead;
    if let Some(last) = line.runs.last_mut().filter(|l| same_style(l, style)) {
        if lead > 0.0 {
            last.text.push(' ');
        }
        last.text.push_str(text);
        last.width = x + width - last.x_offset;
    } else {
        if lead > 0.0 {
            if let Some(prev) = line.runs.last_mut() {
                prev.text.push(' ');
                prev.width += lead;
            }
        }
        line.runs.push(TextRun {
            text: text.to_string(),
            x_offset: x,
            width,
            face: style.face,
            color: style.color,
            underline: style.underline,
            strike: style.strike,
        });
    }
    line.width = x + width;
}

/// Word-wrap `pieces` to fit within `max_width` points.
///
/// Adjacent words with no space between them (e.g. `**bold**!`) move as one
/// unit. A unit wider than the line is placed on its own line and overflows.
pub fn wrap_pieces(pieces: &[Piece], size: f32, max_width: f32) -> Vec<WrappedLine> {
    let space_w = text_width(" ", FontFace::Regular, size);
    let mut lines = Vec::new();
    let mut cur = WrappedLine::default();
    let mut pending_space = false;

    let mut i = 0;
    while i < pieces.len() {
        match &pieces[i] {
            Piece::Space => {
                pending_space = !cur.runs.is_empty();
                i += 1;
            }
            Piece::Break => {
                lines.push(std::mem::take(&mut cur));
                pending_space = false;
                i += 1;
            }
            Piece::Image { .. } => i += 1,
            Piece::Word(..) => {
                let start = i;
                while i < pieces.len() && matches!(pieces[i], Piece::Word(..)) {
                    i += 1;
                }
                let unit = &pieces[start..i];
                let unit_w: f32 = unit
                    .iter()
                    .map(|p| match p {
                        Piece::Word(t, s) => text_width(t, s.face, size),
                        _ => 0.0,
                    })
                    .sum();

                let mut lead = if pending_space { space_w } else { 0.0 };
                if !cur.runs.is_empty() && cur.width + lead + unit_w > max_width {
                    lines.push(std::mem::take(&mut cur));
                    lead = 0.0;
                }
                for (k, p) in unit.iter().enumerate() {
                    if let Piece::Word(text, style) = p {
                        let w = text_width(text, style.face, size);
                        append(&mut cur, text, style, w, if k == 0 { lead } else { 0.0 });
                    }
                }
                pending_space = false;
            }
        }
    }
    if !cur.runs.is_empty() {
        lines.push(cur);
    }
    // Trailing breaks leave empty lines at the end; drop them.
    while lines.last().is_some_and(|l| l.runs.is_empty()) {
        lines.pop();
    }
    lines
}

/// True when `pieces` contains at least one word.
pub fn has_words(pieces: &[Piece]) -> bool {
    pieces.iter().any(|p| matches!(p, Piece::Word(..)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::native::dom::parse_html;

    const BLACK: [f32; 3] = [0.0, 0.0, 0.0];

    fn pieces(html: &str) -> Vec<Piece> {
        let mut out = Vec::new();
        collect_inline(&parse_html(html), &InlineStyle::plain(BLACK), &mut out);
        out
    }

    #[test]
    fn courier_width_is_exact() {
        let w = text_width("abcde", FontFace::Mono, 10.0);
        assert!((w - 30.0).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider() {
        let regular = text_width("Hello", FontFace::Regular, 12.0);
        let bold = text_width("Hello", FontFace::Bold, 12.0);
        assert!(bold > regular);
    }

    #[test]
    fn whitespace_collapses() {
        let p = pieces("a   b\n\nc");
        let words: Vec<&Piece> = p.iter().filter(|p| matches!(p, Piece::Word(..))).collect();
        assert_eq!(words.len(), 3);
        assert_eq!(p.iter().filter(|p| **p == Piece::Space).count(), 2);
    }

    #[test]
    fn strong_switches_face() {
        let p = pieces("Hello <strong>world</strong>");
        assert!(matches!(&p[2], Piece::Word(w, s) if w == "world" && s.face == FontFace::Bold));
    }

    #[test]
    fn wrap_splits_long_text() {
        let p = pieces("Hello world foo bar baz qux");
        let lines = wrap_pieces(&p, 16.0, 60.0);
        assert!(lines.len() >= 2, "expected wrapping, got {}", lines.len());
        for line in &lines {
            assert!(!line.runs.is_empty());
        }
    }

    #[test]
    fn same_style_words_merge_into_one_run() {
        let p = pieces("one two three");
        let lines = wrap_pieces(&p, 11.0, 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].runs.len(), 1);
        assert_eq!(lines[0].runs[0].text, "one two three");
    }

    #[test]
    fn glued_words_stay_together() {
        let p = pieces("<strong>bold</strong>!");
        let lines = wrap_pieces(&p, 11.0, 500.0);
        assert_eq!(lines[0].runs.len(), 2);
        assert_eq!(lines[0].runs[1].text, "!");
        let first = &lines[0].runs[0];
        assert!((lines[0].runs[1].x_offset - (first.x_offset + first.width)).abs() < 0.01);
    }

    #[test]
    fn br_forces_new_line() {
        let p = pieces("a<br />b");
        assert_eq!(wrap_pieces(&p, 11.0, 500.0).len(), 2);
    }

    #[test]
    fn checkbox_renders_as_marker() {
        let p = pieces(r#"<input disabled="" type="checkbox" checked=""/> done"#);
        assert!(matches!(&p[0], Piece::Word(w, _) if w == "[x]"));
    }
}
