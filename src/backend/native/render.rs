//! PDF painter – turns a [`LayoutConfig`] into PDF bytes with `printpdf`
//! (v0.8 ops-based API) and the 14 builtin fonts.

use std::collections::{BTreeSet, HashMap};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use super::layout::{FontFace, LayoutBox, LayoutConfig, TextContent, TextRun};

const PT_TO_MM: f32 = 0.352_778;

/// A registered XObject and the pixel size of its source image.
struct ImageResource {
    xobj_id: XObjectId,
    px_width: u32,
    px_height: u32,
}

/// Render a layout into PDF bytes.
///
/// Images whose `src` is not a base64 data URI, or whose bytes cannot be
/// decoded, are skipped with a warning.
pub fn render_pdf(config: &LayoutConfig) -> Result<Vec<u8>, String> {
    if config.page_width_pt <= 0.0 || config.page_height_pt <= 0.0 {
        return Err(format!(
            "invalid page size {}x{}pt",
            config.page_width_pt, config.page_height_pt
        ));
    }
    let page_w = Mm(config.page_width_pt * PT_TO_MM);
    let page_h = Mm(config.page_height_pt * PT_TO_MM);

    let mut doc = PdfDocument::new(&config.title);

    // Sorted so XObject ids are assigned in a stable order.
    let srcs: BTreeSet<&str> = config
        .pages
        .iter()
        .flat_map(|p| p.boxes.iter())
        .filter_map(|b| b.image.as_ref())
        .map(|i| i.src.as_str())
        .collect();

    let mut images: HashMap<&str, ImageResource> = HashMap::new();
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    for src in srcs {
        let bytes = match parse_data_uri(src) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("skipping image: {e}");
                continue;
            }
        };
        let decoded = match ::image::load_from_memory(&bytes) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("skipping image: decode error: {e}");
                continue;
            }
        };
        let raw = match RawImage::decode_from_bytes(&bytes, &mut warnings) {
            Ok(r) => r,
            Err(e) => {
                log::warn!("skipping image: PDF encode error: {e}");
                continue;
            }
        };
        images.insert(
            src,
            ImageResource {
                xobj_id: doc.add_image(&raw),
                px_width: decoded.width(),
                px_height: decoded.height(),
            },
        );
    }

    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page| {
            let mut ops = Vec::new();
            for lbox in &page.boxes {
                paint_box(&mut ops, lbox, config.page_height_pt, &images);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    // Fixed dates so re-rendering the same layout changes only the random
    // document and instance ids printpdf writes.
    if let Ok(epoch) = OffsetDateTime::from_unix_timestamp(0) {
        doc.metadata.info.creation_date = epoch;
        doc.metadata.info.modification_date = epoch;
        doc.metadata.info.metadata_date = epoch;
    }
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Pixel dimensions of a base64 data-URI image, if it decodes.
pub(crate) fn image_dimensions(src: &str) -> Option<(u32, u32)> {
    let bytes = parse_data_uri(src).ok()?;
    let img = ::image::load_from_memory(&bytes).ok()?;
    Some((img.width(), img.height()))
}

fn builtin_font(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Regular => BuiltinFont::Helvetica,
        FontFace::Bold => BuiltinFont::HelveticaBold,
        FontFace::Italic => BuiltinFont::HelveticaOblique,
        FontFace::BoldItalic => BuiltinFont::HelveticaBoldOblique,
        FontFace::Mono => BuiltinFont::Courier,
        FontFace::MonoBold => BuiltinFont::CourierBold,
    }
}

fn color(c: [f32; 3]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

/// Corners of a rectangle, counter-clockwise from bottom-left (PDF space).
fn corners(x: f32, bottom: f32, w: f32, h: f32) -> Vec<LinePoint> {
    vec![
        point(x, bottom),
        point(x + w, bottom),
        point(x + w, bottom + h),
        point(x, bottom + h),
    ]
}

fn stroke(ops: &mut Vec<Op>, c: [f32; 3], width: f32, points: Vec<LinePoint>, is_closed: bool) {
    ops.push(Op::SetOutlineColor { col: color(c) });
    ops.push(Op::SetOutlineThickness { pt: Pt(width) });
    ops.push(Op::DrawLine {
        line: Line { points, is_closed },
    });
}

fn paint_box(
    ops: &mut Vec<Op>,
    lbox: &LayoutBox,
    page_height: f32,
    images: &HashMap<&str, ImageResource>,
) {
    // Layout origin is top-left; PDF origin is bottom-left.
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;

    if let Some(bg) = lbox.background_color {
        ops.push(Op::SetFillColor { col: color(bg) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: corners(lbox.x, bottom, lbox.width, lbox.height),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    if let Some(border) = &lbox.border {
        stroke(
            ops,
            border.color,
            border.width,
            corners(lbox.x, bottom, lbox.width, lbox.height),
            true,
        );
    }

    if let Some(text) = &lbox.text {
        // Baseline sits roughly 0.8em below the top of the line box.
        let leading = (text.line_height - text.font_size).max(0.0) / 2.0;
        for line in &text.lines {
            let baseline = top - line.y_offset - leading - text.font_size * 0.8;
            for run in &line.runs {
                paint_run(ops, run, lbox.x, baseline, text);
            }
        }
    }

    if let Some(img) = &lbox.image {
        if let Some(res) = images.get(img.src.as_str()) {
            // At 72 dpi printpdf maps one pixel to one point.
            let scale_x = img.width / res.px_width.max(1) as f32;
            let scale_y = img.height / res.px_height.max(1) as f32;
            ops.push(Op::UseXobject {
                id: res.xobj_id.clone(),
                transform: XObjectTransform {
                    translate_x: Some(Pt(lbox.x)),
                    translate_y: Some(Pt(top - img.height)),
                    dpi: Some(72.0),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    rotate: None,
                },
            });
        }
    }
}

fn paint_run(ops: &mut Vec<Op>, run: &TextRun, box_x: f32, baseline: f32, text: &TextContent) {
    if run.text.is_empty() {
        return;
    }
    let font = builtin_font(run.face);
    let x = box_x + run.x_offset;

    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(x),
            y: Pt(baseline),
        },
    });
    ops.push(Op::SetFontSizeBuiltinFont {
        size: Pt(text.font_size),
        font,
    });
    ops.push(Op::SetLineHeight {
        lh: Pt(text.line_height),
    });
    ops.push(Op::SetFillColor { col: color(run.color) });
    ops.push(Op::WriteTextBuiltinFont {
        items: vec![TextItem::Text(to_winlatin(&run.text))],
        font,
    });
    ops.push(Op::EndTextSection);

    if run.underline {
        let y = baseline - text.font_size * 0.12;
        stroke(ops, run.color, 0.5, vec![point(x, y), point(x + run.width, y)], false);
    }
    if run.strike {
        let y = baseline + text.font_size * 0.3;
        stroke(ops, run.color, 0.6, vec![point(x, y), point(x + run.width, y)], false);
    }
}

/// Re-encode UTF-8 text as WinAnsi (Windows-1252) bytes, which is what the
/// builtin fonts expect. Characters outside the code page become `?`.
///
/// The result is only valid UTF-8 when the input is ASCII. It must go
/// straight into a [`TextItem::Text`] for a builtin font and nowhere else.
fn to_winlatin(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\u{00A0}' => 0x20,
            '\u{2192}' => b'>',
            '\u{2713}' | '\u{2705}' => b'v',
            '\u{274C}' | '\u{2717}' => b'x',
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: the String is never read as UTF-8. printpdf 0.8.2 serialises
    // `Op::WriteTextBuiltinFont` through `encode_text_items_to_pdf`, which
    // calls `lopdf::Document::encode_text(SimpleEncoding(b"WinAnsiEncoding"))`.
    // lopdf 0.35 has no table for that name and returns `text.as_bytes()`
    // unchanged, so these bytes reach the content stream as written. The
    // only other use is `needs_hex_encoding`, which reads those bytes.
    // Re-check this path when bumping either crate.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

/// Decode a `data:<mime>;base64,<data>` URI.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("image src must be a base64 data URI, got {preview:?}")
    })?;
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| "invalid data URI: missing `,` after the header".to_string())?;
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(data.trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}
