//! Layout config – the intermediate representation between the flow pass and
//! PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page; it can be dumped as JSON for inspection.

use serde::{Deserialize, Serialize};

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 3]>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 3],
}

/// The builtin PDF fonts the renderer can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFace {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
    MonoBold,
}

impl FontFace {
    pub fn with_bold(self) -> Self {
        match self {
            FontFace::Regular => FontFace::Bold,
            FontFace::Italic => FontFace::BoldItalic,
            FontFace::Mono => FontFace::MonoBold,
            other => other,
        }
    }

    pub fn with_italic(self) -> Self {
        match self {
            FontFace::Regular => FontFace::Italic,
            FontFace::Bold => FontFace::BoldItalic,
            other => other,
        }
    }

    pub fn with_mono(self) -> Self {
        match self {
            FontFace::Bold | FontFace::BoldItalic | FontFace::MonoBold => FontFace::MonoBold,
            _ => FontFace::Mono,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldItalic | FontFace::MonoBold)
    }

    pub fn is_mono(self) -> bool {
        matches!(self, FontFace::Mono | FontFace::MonoBold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_size: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextLine {
    /// Y offset from the top of the box.
    pub y_offset: f32,
    pub runs: Vec<TextRun>,
}

/// A span of text drawn with one face and colour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    /// X offset within the box; negative for list markers hung in the margin.
    pub x_offset: f32,
    pub width: f32,
    pub face: FontFace,
    pub color: [f32; 3],
    pub underline: bool,
    pub strike: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageContent {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(title: &str, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.to_string(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    /// Every text run on every page, in drawing order.
    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.pages
            .iter()
            .flat_map(|p| p.boxes.iter())
            .filter_map(|b| b.text.as_ref())
            .flat_map(|t| t.lines.iter())
            .flat_map(|l| l.runs.iter())
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
        }
    }

    pub fn filled(x: f32, y: f32, width: f32, height: f32, color: [f32; 3]) -> Self {
        Self {
            background_color: Some(color),
            ..Self::new(x, y, width, height)
        }
    }
}
