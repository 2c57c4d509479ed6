//! Block flow – walks the DOM top to bottom, stacks blocks vertically, and
//! breaks onto a new page whenever the next line, table row, or image would
//! cross the bottom margin.
//!
//! Handles:
//! - headings kept with the following two body lines
//! - paragraphs split line by line across pages
//! - code blocks split across pages, each fragment with its own background
//! - tables paginated by row, with rows taller than a page split by line
//! - list markers hung in the left margin of the first item line

use crate::config::PageSetup;

use super::dom::{DomNode, ElementNode, Tag};
use super::layout::*;
use super::render::image_dimensions;
use super::text::{collect_inline, has_words, push_text, text_width, wrap_pieces, InlineStyle, Piece, WrappedLine};

const BODY_SIZE: f32 = 11.0;
const BODY_LINE_FACTOR: f32 = 1.6;
const PARA_GAP: f32 = 6.0;
const LIST_INDENT: f32 = 20.0;
const QUOTE_INDENT: f32 = 16.0;

/// Convert a `0xRRGGBB` literal to normalised RGB.
pub fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

struct Palette {
    text: [f32; 3],
    heading: [f32; 3],
    subheading: [f32; 3],
    muted: [f32; 3],
    code_bg: [f32; 3],
    stripe: [f32; 3],
    rule: [f32; 3],
    cell_border: [f32; 3],
    quote_bar: [f32; 3],
}

impl Palette {
    fn print() -> Self {
        Self {
            text: rgb(0x1f2937),
            heading: rgb(0x111827),
            subheading: rgb(0x374151),
            muted: rgb(0x4b5563),
            code_bg: rgb(0xf3f4f6),
            stripe: rgb(0xf9fafb),
            rule: rgb(0xe5e7eb),
            cell_border: rgb(0xd1d5db),
            quote_bar: rgb(0x3b82f6),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
    Right,
}

/// Where and how the current block is laid out.
#[derive(Debug, Clone)]
struct Ctx {
    x: f32,
    width: f32,
    style: InlineStyle,
    size: f32,
    line_factor: f32,
    align: Align,
}

impl Ctx {
    fn line_height(&self) -> f32 {
        self.size * self.line_factor
    }

    fn indented(&self, by: f32) -> Self {
        Self {
            x: self.x + by,
            width: (self.width - by).max(self.size * 4.0),
            ..self.clone()
        }
    }
}

/// Lay out a document body onto pages of the configured size.
pub fn layout_document(nodes: &[DomNode], title: &str, page: &PageSetup) -> LayoutConfig {
    let mut flow = Flow::new(title, page);
    let ctx = Ctx {
        x: flow.left,
        width: flow.content_width,
        style: InlineStyle::plain(flow.palette.text),
        size: BODY_SIZE,
        line_factor: BODY_LINE_FACTOR,
        align: Align::Left,
    };
    flow.blocks(nodes, &ctx);
    flow.finish()
}

struct Flow {
    layout: LayoutConfig,
    /// Boxes of the page being filled.
    boxes: Vec<LayoutBox>,
    palette: Palette,
    left: f32,
    content_width: f32,
    top: f32,
    bottom: f32,
    /// Cursor: y of the next block on the current page.
    y: f32,
    /// List marker waiting for the first line of the current item.
    marker: Option<String>,
}

impl Flow {
    fn new(title: &str, page: &PageSetup) -> Self {
        let w = page.effective_width();
        let h = page.effective_height();
        // Keep at least a third of each dimension for content.
        let margin = page.margin_pt.clamp(0.0, w.min(h) / 3.0);
        Self {
            layout: LayoutConfig::new(title, w, h),
            boxes: Vec::new(),
            palette: Palette::print(),
            left: margin,
            content_width: w - 2.0 * margin,
            top: margin,
            bottom: h - margin,
            y: margin,
            marker: None,
        }
    }

    fn new_page(&mut self) {
        let page_index = self.layout.pages.len();
        self.layout.pages.push(PageLayout {
            page_index,
            boxes: std::mem::take(&mut self.boxes),
        });
        self.y = self.top;
    }

    fn at_page_top(&self) -> bool {
        self.y <= self.top + 0.01
    }

    /// Start a new page unless `height` still fits below the cursor.
    fn ensure(&mut self, height: f32) {
        if self.y + height > self.bottom && !self.at_page_top() {
            self.new_page();
        }
    }

    /// Vertical gap; swallowed at the top of a page.
    fn space(&mut self, gap: f32) {
        if !self.at_page_top() {
            self.y = (self.y + gap).min(self.bottom);
        }
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.boxes.is_empty() || self.layout.pages.is_empty() {
            self.new_page();
        }
        self.layout
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    /// Lay out a sequence of nodes; runs of inline nodes become paragraphs.
    fn blocks(&mut self, nodes: &[DomNode], ctx: &Ctx) {
        let mut inline: Vec<&DomNode> = Vec::new();
        for node in nodes {
            let is_inline = match node {
                DomNode::Text(_) => true,
                DomNode::Element(e) => e.tag.is_inline() || e.tag == Tag::Img,
            };
            if is_inline {
                inline.push(node);
                continue;
            }
            self.flush_inline(&inline, ctx);
            inline.clear();
            if let DomNode::Element(e) = node {
                self.block(e, ctx);
            }
        }
        self.flush_inline(&inline, ctx);
    }

    fn flush_inline(&mut self, nodes: &[&DomNode], ctx: &Ctx) {
        if nodes.is_empty() {
            return;
        }
        let mut pieces = Vec::new();
        for node in nodes {
            collect_inline(std::slice::from_ref(*node), &ctx.style, &mut pieces);
        }
        self.inline_content(pieces, ctx);
    }

    fn block(&mut self, e: &ElementNode, ctx: &Ctx) {
        match &e.tag {
            Tag::Head | Tag::Title | Tag::Style | Tag::Script | Tag::Meta | Tag::Link => {}
            Tag::P => {
                self.space(PARA_GAP);
                let mut pieces = Vec::new();
                collect_inline(&e.children, &ctx.style, &mut pieces);
                self.inline_content(pieces, ctx);
                self.space(PARA_GAP);
            }
            Tag::H(level) => self.heading(e, *level, ctx),
            Tag::Ul | Tag::Ol => self.list(e, ctx),
            Tag::Blockquote => self.blockquote(e, ctx),
            Tag::Pre => self.code_block(e, ctx),
            Tag::Table => self.table(e, ctx),
            Tag::Hr => self.rule(ctx),
            Tag::Svg => self.diagram_caption(e, ctx),
            Tag::Div if is_centered(e) => {
                let centered = Ctx {
                    align: Align::Center,
                    ..ctx.clone()
                };
                self.blocks(&e.children, &centered);
            }
            _ => self.blocks(&e.children, ctx),
        }
    }

    // ── Text ──────────────────────────────────────────────────────────────

    /// Inline pieces, with images pulled out as their own blocks.
    fn inline_content(&mut self, pieces: Vec<Piece>, ctx: &Ctx) {
        let mut text = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Image { src, alt } => {
                    self.text(std::mem::take(&mut text), ctx);
                    self.image(&src, &alt, ctx);
                }
                other => text.push(other),
            }
        }
        self.text(text, ctx);
    }

    fn text(&mut self, pieces: Vec<Piece>, ctx: &Ctx) {
        if !has_words(&pieces) {
            return;
        }
        let lines = wrap_pieces(&pieces, ctx.size, ctx.width);
        self.emit_lines(lines, ctx);
    }

    fn emit_lines(&mut self, mut lines: Vec<WrappedLine>, ctx: &Ctx) {
        let lh = ctx.line_height();
        align_lines(&mut lines, ctx.width, ctx.align);

        if let Some(marker) = self.marker.take() {
            if let Some(first) = lines.first_mut() {
                let w = text_width(&marker, FontFace::Regular, ctx.size);
                first.runs.insert(
                    0,
                    TextRun {
                        text: marker,
                        x_offset: -(w + 6.0),
                        width: w,
                        face: FontFace::Regular,
                        color: ctx.style.color,
                        underline: false,
                        strike: false,
                    },
                );
            }
        }

        let mut idx = 0;
        while idx < lines.len() {
            let fit = ((self.bottom - self.y) / lh).floor().max(0.0) as usize;
            let n = if fit == 0 {
                if !self.at_page_top() {
                    self.new_page();
                    continue;
                }
                1
            } else {
                fit.min(lines.len() - idx)
            };

            let chunk: Vec<TextLine> = lines[idx..idx + n]
                .iter()
                .enumerate()
                .map(|(i, l)| TextLine {
                    y_offset: i as f32 * lh,
                    runs: l.runs.clone(),
                })
                .collect();
            let mut b = LayoutBox::new(ctx.x, self.y, ctx.width, n as f32 * lh);
            b.text = Some(TextContent {
                lines: chunk,
                font_size: ctx.size,
                line_height: lh,
            });
            self.boxes.push(b);
            self.y += n as f32 * lh;
            idx += n;
        }
    }

    fn heading(&mut self, e: &ElementNode, level: u8, ctx: &Ctx) {
        let (size, before, after, color) = match level {
            1 => (24.0, 20.0, 12.0, self.palette.heading),
            2 => (18.0, 16.0, 8.0, self.palette.text),
            3 => (14.0, 12.0, 6.0, self.palette.subheading),
            4 => (12.0, 10.0, 5.0, self.palette.muted),
            _ => (11.0, 8.0, 4.0, self.palette.muted),
        };
        let hctx = Ctx {
            size,
            line_factor: 1.3,
            style: InlineStyle {
                face: ctx.style.face.with_bold(),
                color,
                ..ctx.style.clone()
            },
            align: if level == 1 { Align::Center } else { ctx.align },
            ..ctx.clone()
        };

        let mut pieces = Vec::new();
        collect_inline(&e.children, &hctx.style, &mut pieces);
        let lines = wrap_pieces(&pieces, size, hctx.width);
        if lines.is_empty() {
            return;
        }

        self.space(before);
        let rule = if level == 2 { 5.5 } else { 0.0 };
        let keep_with_next = 2.0 * BODY_SIZE * BODY_LINE_FACTOR;
        self.ensure(lines.len() as f32 * hctx.line_height() + rule + keep_with_next);
        self.emit_lines(lines, &hctx);

        if level == 2 {
            self.y += 4.0;
            self.boxes
                .push(LayoutBox::filled(ctx.x, self.y, ctx.width, 1.5, self.palette.rule));
            self.y += 1.5;
        }
        self.space(after);
    }

    fn diagram_caption(&mut self, svg: &ElementNode, ctx: &Ctx) {
        let label = first_svg_text(svg).unwrap_or_default();
        log::warn!("native backend: SVG diagram {label:?} drawn as a caption only");
        let caption = if label.is_empty() {
            "[diagram]".to_string()
        } else {
            format!("[diagram: {label}]")
        };
        let cctx = Ctx {
            align: Align::Center,
            style: InlineStyle {
                face: FontFace::Italic,
                color: self.palette.muted,
                ..ctx.style.clone()
            },
            ..ctx.clone()
        };
        let mut pieces = Vec::new();
        push_text(&caption, &cctx.style, &mut pieces);
        self.space(PARA_GAP);
        self.text(pieces, &cctx);
        self.space(PARA_GAP);
    }

    // ── Lists & quotes ────────────────────────────────────────────────────

    fn list(&mut self, e: &ElementNode, ctx: &Ctx) {
        let ordered = e.tag == Tag::Ol;
        let mut number: i64 = e
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);
        let ictx = Ctx {
            align: Align::Left,
            ..ctx.indented(LIST_INDENT)
        };

        self.space(4.0);
        for child in &e.children {
            let DomNode::Element(li) = child else {
                continue;
            };
            if li.tag != Tag::Li {
                self.block(li, &ictx);
                continue;
            }
            let task = li
                .children
                .iter()
                .any(|c| matches!(c, DomNode::Element(i) if i.tag == Tag::Input));
            self.marker = if task {
                None
            } else if ordered {
                Some(format!("{number}."))
            } else {
                Some("\u{2022}".to_string())
            };
            number += 1;

            self.space(2.5);
            self.blocks(&li.children, &ictx);
            self.marker = None;
            self.space(2.5);
        }
        self.space(4.0);
    }

    fn blockquote(&mut self, e: &ElementNode, ctx: &Ctx) {
        self.space(8.0);
        let start_page = self.layout.pages.len();
        let start_y = self.y;

        let qctx = Ctx {
            style: InlineStyle {
                face: ctx.style.face.with_italic(),
                color: self.palette.muted,
                ..ctx.style.clone()
            },
            ..ctx.indented(QUOTE_INDENT)
        };
        self.blocks(&e.children, &qctx);

        // One bar segment per page the quote touched.
        let end_page = self.layout.pages.len();
        for page in start_page..=end_page {
            let top = if page == start_page { start_y } else { self.top };
            let bottom = if page == end_page { self.y } else { self.bottom };
            if bottom <= top {
                continue;
            }
            let bar = LayoutBox::filled(ctx.x + 2.0, top, 3.0, bottom - top, self.palette.quote_bar);
            if page == end_page {
                self.boxes.push(bar);
            } else if let Some(p) = self.layout.pages.get_mut(page) {
                p.boxes.push(bar);
            }
        }
        self.space(8.0);
    }

    // ── Code ──────────────────────────────────────────────────────────────

    fn code_block(&mut self, e: &ElementNode, ctx: &Ctx) {
        let size = 9.0;
        let lh = size * 1.4;
        let pad = 8.0;
        let color = self.palette.text;

        let source = e.text_content();
        let source = source.strip_suffix('\n').unwrap_or(&source);
        let cols = (((ctx.width - 2.0 * pad) / (size * 0.6)).floor() as usize).max(1);
        let mut lines: Vec<String> = Vec::new();
        for raw in source.split('\n') {
            let chars: Vec<char> = raw.replace('\t', "    ").chars().collect();
            if chars.is_empty() {
                lines.push(String::new());
            }
            for chunk in chars.chunks(cols) {
                lines.push(chunk.iter().collect());
            }
        }

        self.marker = None;
        self.space(8.0);
        let mut idx = 0;
        while idx < lines.len() {
            let fit = ((self.bottom - self.y - 2.0 * pad) / lh).floor().max(0.0) as usize;
            let n = if fit == 0 {
                if !self.at_page_top() {
                    self.new_page();
                    continue;
                }
                1
            } else {
                fit.min(lines.len() - idx)
            };

            let text_lines = lines[idx..idx + n]
                .iter()
                .enumerate()
                .map(|(i, l)| TextLine {
                    y_offset: pad + i as f32 * lh,
                    runs: if l.is_empty() {
                        Vec::new()
                    } else {
                        vec![TextRun {
                            text: l.clone(),
                            x_offset: pad,
                            width: text_width(l, FontFace::Mono, size),
                            face: FontFace::Mono,
                            color,
                            underline: false,
                            strike: false,
                        }]
                    },
                })
                .collect();

            let height = n as f32 * lh + 2.0 * pad;
            let mut b = LayoutBox::filled(ctx.x, self.y, ctx.width, height, self.palette.code_bg);
            b.text = Some(TextContent {
                lines: text_lines,
                font_size: size,
                line_height: lh,
            });
            self.boxes.push(b);
            self.y += height;
            idx += n;
        }
        self.space(8.0);
    }

    // ── Tables ────────────────────────────────────────────────────────────

    fn table(&mut self, e: &ElementNode, ctx: &Ctx) {
        let mut rows = Vec::new();
        collect_rows(&e.children, &mut rows);
        let ncols = rows.iter().map(|r| cells(r).len()).max().unwrap_or(0);
        if ncols == 0 {
            return;
        }

        let size = 10.0;
        let lh = size * 1.4;
        let pad = 5.0;
        let col_w = ctx.width / ncols as f32;
        let border = BorderStyle {
            width: 0.75,
            color: self.palette.cell_border,
        };

        self.marker = None;
        self.space(10.0);
        let mut body_row = 0usize;
        for row in rows {
            let row_cells = cells(row);
            let header = row_cells.iter().all(|c| c.tag == Tag::Th);

            let laid: Vec<Vec<WrappedLine>> = row_cells
                .iter()
                .map(|cell| {
                    let style = if cell.tag == Tag::Th {
                        InlineStyle {
                            face: FontFace::Bold,
                            ..InlineStyle::plain(self.palette.heading)
                        }
                    } else {
                        InlineStyle::plain(self.palette.text)
                    };
                    let mut pieces = Vec::new();
                    collect_inline(&cell.children, &style, &mut pieces);
                    let mut lines = wrap_pieces(&pieces, size, col_w - 2.0 * pad);
                    align_lines(&mut lines, col_w - 2.0 * pad, cell_align(cell));
                    lines
                })
                .collect();

            let max_lines = laid.iter().map(Vec::len).max().unwrap_or(0).max(1);
            let row_h = max_lines as f32 * lh + 2.0 * pad;
            if row_h > self.bottom - self.top {
                log::warn!("native backend: table row of {max_lines} lines is taller than a page, splitting it");
            }
            self.ensure(row_h);

            let background = if header {
                Some(self.palette.code_bg)
            } else {
                body_row += 1;
                (body_row % 2 == 0).then_some(self.palette.stripe)
            };

            // A row taller than the space left is cut into fragments by
            // line, each drawn as a full row of bordered cells.
            let mut first = 0;
            while first < max_lines {
                let fit = ((self.bottom - self.y - 2.0 * pad) / lh).floor().max(0.0) as usize;
                let n = if fit == 0 {
                    if !self.at_page_top() {
                        self.new_page();
                        continue;
                    }
                    1
                } else {
                    fit.min(max_lines - first)
                };
                let frag_h = n as f32 * lh + 2.0 * pad;

                for col in 0..ncols {
                    let mut b = LayoutBox::new(ctx.x + col as f32 * col_w, self.y, col_w, frag_h);
                    b.background_color = background;
                    b.border = Some(border.clone());
                    let lines: Vec<TextLine> = laid
                        .get(col)
                        .map(|l| l.iter().skip(first).take(n).collect::<Vec<_>>())
                        .unwrap_or_default()
                        .into_iter()
                        .enumerate()
                        .map(|(i, l)| TextLine {
                            y_offset: pad + i as f32 * lh,
                            runs: l
                                .runs
                                .iter()
                                .cloned()
                                .map(|mut r| {
                                    r.x_offset += pad;
                                    r
                                })
                                .collect(),
                        })
                        .collect();
                    if !lines.is_empty() {
                        b.text = Some(TextContent {
                            lines,
                            font_size: size,
                            line_height: lh,
                        });
                    }
                    self.boxes.push(b);
                }
                self.y += frag_h;
                first += n;
            }
        }
        self.space(10.0);
    }

    // ── Rules & images ────────────────────────────────────────────────────

    fn rule(&mut self, ctx: &Ctx) {
        self.space(10.0);
        self.ensure(1.0);
        self.boxes
            .push(LayoutBox::filled(ctx.x, self.y, ctx.width, 0.75, self.palette.rule));
        self.y += 0.75;
        self.space(10.0);
    }

    fn image(&mut self, src: &str, alt: &str, ctx: &Ctx) {
        let dims = image_dimensions(src).filter(|&(w, h)| w > 0 && h > 0);
        let Some((px_w, px_h)) = dims else {
            let preview: String = src.chars().take(60).collect();
            log::warn!("native backend: skipping image {preview:?} (only base64 PNG/JPEG data URIs are embedded)");
            let label = if alt.is_empty() {
                "[image]".to_string()
            } else {
                format!("[image: {alt}]")
            };
            let style = InlineStyle {
                face: FontFace::Italic,
                color: self.palette.muted,
                ..ctx.style.clone()
            };
            let mut pieces = Vec::new();
            push_text(&label, &style, &mut pieces);
            self.text(pieces, ctx);
            return;
        };

        // 1px = 0.75pt at 96 dpi
        let mut w = px_w as f32 * 0.75;
        let mut h = px_h as f32 * 0.75;
        if w > ctx.width {
            h *= ctx.width / w;
            w = ctx.width;
        }
        let max_h = self.bottom - self.top;
        if h > max_h {
            w *= max_h / h;
            h = max_h;
        }

        self.space(PARA_GAP);
        self.ensure(h);
        let x = match ctx.align {
            Align::Left => ctx.x,
            Align::Center => ctx.x + (ctx.width - w) / 2.0,
            Align::Right => ctx.x + ctx.width - w,
        };
        let mut b = LayoutBox::new(x, self.y, w, h);
        b.image = Some(ImageContent {
            src: src.to_string(),
            width: w,
            height: h,
        });
        self.boxes.push(b);
        self.y += h;
        self.space(PARA_GAP);
    }
}

fn align_lines(lines: &mut [WrappedLine], width: f32, align: Align) {
    if align == Align::Left {
        return;
    }
    for line in lines {
        let slack = (width - line.width).max(0.0);
        let shift = match align {
            Align::Center => slack / 2.0,
            _ => slack,
        };
        for run in &mut line.runs {
            run.x_offset += shift;
        }
    }
}

fn is_centered(e: &ElementNode) -> bool {
    e.attr("align").is_some_and(|a| a.eq_ignore_ascii_case("center"))
        || e
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == "diagram"))
}

fn cell_align(cell: &ElementNode) -> Align {
    let style = cell.attr("style").unwrap_or_default().replace(' ', "");
    if style.contains("text-align:center") {
        Align::Center
    } else if style.contains("text-align:right") {
        Align::Right
    } else {
        Align::Left
    }
}

fn collect_rows<'a>(nodes: &'a [DomNode], rows: &mut Vec<&'a ElementNode>) {
    for node in nodes {
        if let DomNode::Element(e) = node {
            match e.tag {
                Tag::Tr => rows.push(e),
                Tag::Thead | Tag::Tbody => collect_rows(&e.children, rows),
                _ => {}
            }
        }
    }
}

fn cells(row: &ElementNode) -> Vec<&ElementNode> {
    row.children
        .iter()
        .filter_map(|n| match n {
            DomNode::Element(e) if matches!(e.tag, Tag::Td | Tag::Th) => Some(e),
            _ => None,
        })
        .collect()
}

/// Text of the first `<text>` element inside an SVG, used as its caption.
fn first_svg_text(e: &ElementNode) -> Option<String> {
    for child in &e.children {
        if let DomNode::Element(c) = child {
            if matches!(&c.tag, Tag::Unknown(name) if name.eq_ignore_ascii_case("text")) {
                let text = c.text_content().trim().to_string();
                if !text.is_empty() {
                    return Some(text);
                }
            }
            if let Some(found) = first_svg_text(c) {
                return Some(found);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::native::dom::parse_html;

    fn layout(html: &str) -> LayoutConfig {
        layout_document(&parse_html(html), "test", &PageSetup::default())
    }

    fn all_text(cfg: &LayoutConfig) -> String {
        cfg.runs().map(|r| r.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_document_has_one_page() {
        assert_eq!(layout("").pages.len(), 1);
    }

    #[test]
    fn short_paragraph_fits_one_page() {
        let cfg = layout("<p>Short</p>");
        assert_eq!(cfg.pages.len(), 1);
        assert_eq!(all_text(&cfg), "Short");
    }

    #[test]
    fn many_paragraphs_create_multiple_pages() {
        let html: String = (0..120)
            .map(|i| format!("<p>Paragraph {i} with enough text to take up some vertical space.</p>"))
            .collect();
        let cfg = layout(&html);
        assert!(cfg.pages.len() > 1, "expected multiple pages, got {}", cfg.pages.len());
        for (i, page) in cfg.pages.iter().enumerate() {
            assert_eq!(page.page_index, i);
        }
    }

    #[test]
    fn boxes_stay_within_margins() {
        let html: String = (0..80)
            .map(|i| format!("<h2>Section {i}</h2><p>Body text for section {i}.</p>"))
            .collect();
        let cfg = layout(&html);
        let page = PageSetup::default();
        let bottom = page.effective_height() - page.margin_pt;
        for p in &cfg.pages {
            for b in &p.boxes {
                assert!(b.y >= page.margin_pt - 0.01, "box above top margin: {}", b.y);
                assert!(b.y + b.height <= bottom + 0.01, "box below bottom margin: {}", b.y + b.height);
            }
        }
    }

    #[test]
    fn h1_is_centered_and_bold() {
        let cfg = layout("<h1>Title</h1>");
        let run = cfg.runs().next().unwrap();
        assert_eq!(run.face, FontFace::Bold);
        assert!(run.x_offset > 0.0);
    }

    #[test]
    fn list_items_get_markers() {
        let cfg = layout("<ol><li>First</li><li>Second</li></ol><ul><li>Dot</li></ul>");
        let markers: Vec<&str> = cfg
            .runs()
            .filter(|r| r.x_offset < 0.0)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(markers, ["1.", "2.", "\u{2022}"]);
    }

    #[test]
    fn ordered_list_honours_start() {
        let cfg = layout(r#"<ol start="3"><li>c</li></ol>"#);
        assert!(cfg.runs().any(|r| r.text == "3."));
    }

    #[test]
    fn table_cells_have_borders_and_header_background() {
        let html = "<table><thead><tr><th>Name</th><th>Cost</th></tr></thead>\
                    <tbody><tr><td>US</td><td>$125,000</td></tr><tr><td>AI</td><td>$36,500</td></tr></tbody></table>";
        let cfg = layout(html);
        let boxes = &cfg.pages[0].boxes;
        let cells: Vec<&LayoutBox> = boxes.iter().filter(|b| b.border.is_some()).collect();
        assert_eq!(cells.len(), 6);
        assert!(cells[0].background_color.is_some());
        assert!(cells[2].background_color.is_none());
        assert!(cells[4].background_color.is_some());
        assert!(all_text(&cfg).contains("$36,500"));
    }

    #[test]
    fn tall_table_row_splits_across_pages() {
        let words: Vec<String> = (0..2000).map(|i| format!("word{i}")).collect();
        let cfg = layout(&format!(
            "<table><tbody><tr><td>{}</td></tr></tbody></table><p>Done</p>",
            words.join(" ")
        ));
        assert!(cfg.pages.len() > 1, "got {} pages", cfg.pages.len());

        let page = PageSetup::default();
        let bottom = page.effective_height() - page.margin_pt;
        for p in &cfg.pages {
            for b in &p.boxes {
                assert!(b.y >= page.margin_pt - 0.01, "box above top margin: {}", b.y);
                assert!(b.y + b.height <= bottom + 0.01, "box below bottom margin: {}", b.y + b.height);
            }
        }
        let fragments = cfg
            .pages
            .iter()
            .flat_map(|p| p.boxes.iter())
            .filter(|b| b.border.is_some())
            .count();
        assert!(fragments >= cfg.pages.len() - 1);
        let text = all_text(&cfg);
        assert!(text.contains("word0"));
        assert!(text.contains("word1999"));
        assert!(text.contains("Done"));
    }

    #[test]
    fn stray_close_tag_keeps_following_content() {
        let cfg = layout("<p>Intro paragraph</p>\n</div>\n<p>After paragraph</p>\n<h2 id=\"later\">Later heading</h2>");
        let text = all_text(&cfg);
        assert!(text.contains("After paragraph"), "got {text:?}");
        assert!(text.contains("Later heading"), "got {text:?}");
    }

    #[test]
    fn unclosed_inline_does_not_absorb_next_heading() {
        let cfg = layout("<p>Para <span>open</p>\n<h2 id=\"next\">Next</h2>\n<p>More text</p>");
        let heading = cfg.runs().find(|r| r.text == "Next").expect("heading run");
        assert_eq!(heading.face, FontFace::Bold);
        assert!(!all_text(&cfg).contains("openNext"));
    }

    #[test]
    fn code_block_is_monospaced_with_background() {
        let cfg = layout("<pre><code class=\"language-rust\">fn main() {\n    println!(\"hi\");\n}\n</code></pre>");
        let b = &cfg.pages[0].boxes[0];
        assert!(b.background_color.is_some());
        let text = b.text.as_ref().unwrap();
        assert_eq!(text.lines.len(), 3);
        assert_eq!(text.lines[1].runs[0].text, "    println!(\"hi\");");
        assert_eq!(text.lines[1].runs[0].face, FontFace::Mono);
    }

    #[test]
    fn long_code_block_splits_across_pages() {
        let code: String = (0..200).map(|i| format!("line {i}\n")).collect();
        let cfg = layout(&format!("<pre><code>{code}</code></pre>"));
        assert!(cfg.pages.len() >= 2);
        let total: usize = cfg
            .pages
            .iter()
            .flat_map(|p| p.boxes.iter())
            .filter_map(|b| b.text.as_ref())
            .map(|t| t.lines.len())
            .sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn svg_becomes_caption() {
        let cfg = layout(r#"<div class="diagram"><svg><rect/><text x="1">Annual Cost</text></svg></div>"#);
        assert!(all_text(&cfg).contains("[diagram: Annual Cost]"));
    }

    #[test]
    fn non_data_uri_image_falls_back_to_alt_text() {
        let cfg = layout(r#"<p><img src="chart.png" alt="Chart" /></p>"#);
        assert!(all_text(&cfg).contains("[image: Chart]"));
    }

    #[test]
    fn blockquote_draws_a_bar() {
        let cfg = layout("<blockquote><p>Quoted</p></blockquote>");
        let bar = cfg.pages[0]
            .boxes
            .iter()
            .find(|b| b.text.is_none() && b.width == 3.0);
        assert!(bar.is_some());
        let run = cfg.runs().next().unwrap();
        assert_eq!(run.face, FontFace::Italic);
    }

    #[test]
    fn rgb_parses_hex() {
        assert_eq!(rgb(0xff0000), [1.0, 0.0, 0.0]);
    }
}
