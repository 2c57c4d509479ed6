//! HTML parser – converts the renderer's HTML into a simple DOM tree.
//!
//! The input is always the document produced by the Markdown stage, so only
//! the subset `pulldown-cmark` emits (plus raw HTML a report may carry, such
//! as `<div align="center">` or an embedded `<svg>`) needs to be understood.

use std::collections::HashMap;

/// The tag name of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Title,
    Style,
    Script,
    Meta,
    Link,
    Div,
    Section,
    P,
    /// `<h1>` … `<h6>`.
    H(u8),
    Ul,
    Ol,
    Li,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
    Pre,
    Code,
    Blockquote,
    Hr,
    Br,
    Strong,
    Em,
    Del,
    A,
    Img,
    Input,
    Sup,
    Span,
    Svg,
    /// Catch-all for unknown tags – they are kept but treated as containers.
    Unknown(String),
}

impl Tag {
    pub fn from_name(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "title" => Tag::Title,
            "style" => Tag::Style,
            "script" => Tag::Script,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            "div" | "article" | "main" | "header" | "footer" | "center" | "figure" => Tag::Div,
            "section" => Tag::Section,
            "p" => Tag::P,
            "h1" => Tag::H(1),
            "h2" => Tag::H(2),
            "h3" => Tag::H(3),
            "h4" => Tag::H(4),
            "h5" => Tag::H(5),
            "h6" => Tag::H(6),
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "th" => Tag::Th,
            "td" => Tag::Td,
            "pre" => Tag::Pre,
            "code" => Tag::Code,
            "blockquote" => Tag::Blockquote,
            "hr" => Tag::Hr,
            "br" => Tag::Br,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "del" | "s" => Tag::Del,
            "a" => Tag::A,
            "img" => Tag::Img,
            "input" => Tag::Input,
            "sup" => Tag::Sup,
            "span" => Tag::Span,
            "svg" => Tag::Svg,
            _ => Tag::Unknown(s.to_string()),
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            Tag::Meta | Tag::Link | Tag::Hr | Tag::Br | Tag::Img | Tag::Input
        )
    }

    /// Elements whose content is raw text up to the matching close tag.
    fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Script | Tag::Title)
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Tag::Strong
                | Tag::Em
                | Tag::Del
                | Tag::Code
                | Tag::A
                | Tag::Br
                | Tag::Input
                | Tag::Sup
                | Tag::Span
        )
    }
}

/// A node in our DOM tree.
#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

/// An element node carrying tag, attributes, and children.
#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    /// All descendant text, concatenated.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[DomNode], out: &mut String) {
    for node in nodes {
        match node {
            DomNode::Text(t) => out.push_str(t),
            DomNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Parse an HTML string into a list of DOM nodes.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Lowercased names of the elements currently being parsed, outermost first.
    open: Vec<String>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            open: Vec::new(),
        }
    }

    /// Parse siblings until EOF or a close tag that belongs to an open
    /// element. The close tag is left for that element to consume; close
    /// tags matching nothing open are dropped.
    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace_between_tags();
            if self.eof() {
                break;
            }
            match self.peek_close_name() {
                Some(name) if self.open.contains(&name) => break,
                Some(name) => {
                    log::debug!("ignoring stray </{name}>");
                    self.skip_past(">");
                    continue;
                }
                None => {}
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            // Doctype / processing instruction
            self.skip_past(">");
            return None;
        }
        let next_is_tag = self
            .input
            .get(self.pos + 1..)
            .and_then(|s| s.chars().next())
            .is_some_and(|c| c.is_ascii_alphabetic());
        if self.starts_with("<") && next_is_tag {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        if self.starts_with("<") {
            self.pos += 1;
        }
        while !self.eof() && !self.starts_with("<") {
            self.pos += self.current_len();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.pos += 1; // '<'
        let tag_name = self.parse_name();
        let name = tag_name.to_ascii_lowercase();
        let tag = Tag::from_name(&tag_name);
        let mut elem = ElementNode::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Unparseable byte inside the tag; drop it.
                self.pos += self.current_len();
                continue;
            }
            elem.attributes.insert(key.to_ascii_lowercase(), value);
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        if elem.tag.is_raw_text() {
            let close = format!("</{name}");
            let start = self.pos;
            let end = self.input[start..]
                .to_ascii_lowercase()
                .find(&close)
                .map(|i| start + i)
                .unwrap_or(self.input.len());
            elem.children
                .push(DomNode::Text(decode_entities(&self.input[start..end])));
            self.pos = end;
        } else {
            self.open.push(name.clone());
            elem.children = self.parse_nodes();
            self.open.pop();
        }

        // Only our own close tag is consumed; an ancestor's stays for it.
        if self.peek_close_name().as_deref() == Some(name.as_str()) {
            self.pos += 2;
            self.parse_name();
            self.skip_past(">");
        }

        DomNode::Element(elem)
    }

    fn peek_close_name(&self) -> Option<String> {
        if !self.starts_with("</") {
            return None;
        }
        let rest = &self.input[self.pos + 2..];
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        (end > 0).then(|| rest[..end].to_ascii_lowercase())
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = self.parse_attr_value();
        (key, value)
    }

    fn parse_attr_value(&mut self) -> String {
        for quote in ["\"", "'"] {
            if self.starts_with(quote) {
                self.pos += 1;
                let start = self.pos;
                let end = self.input[start..]
                    .find(quote)
                    .map(|i| start + i)
                    .unwrap_or(self.input.len());
                self.pos = (end + 1).min(self.input.len());
                return decode_entities(&self.input[start..end]);
            }
        }
        let start = self.pos;
        while !self.eof() {
            let c = self.current_char();
            if c.is_whitespace() || c == '>' {
                break;
            }
            self.pos += c.len_utf8();
        }
        decode_entities(&self.input[start..self.pos])
    }

    fn skip_whitespace(&mut self) {
        while !self.eof() && self.current_char().is_whitespace() {
            self.pos += self.current_len();
        }
    }

    /// Skip runs of pure whitespace between elements when they span a line
    /// break. Whitespace before text, and single-line gaps such as the space
    /// in `<b>a</b> <i>b</i>`, are kept.
    fn skip_whitespace_between_tags(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        let multiline = self.input[saved..self.pos].contains('\n');
        let between_tags = self.eof() || self.starts_with("<");
        if !(between_tags && (multiline || saved == 0 || self.eof())) {
            self.pos = saved;
        }
    }

    fn skip_past(&mut self, pat: &str) {
        match self.input[self.pos..].find(pat) {
            Some(i) => self.pos += i + pat.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.pos..].chars().next().unwrap_or('\0')
    }

    fn current_len(&self) -> usize {
        self.input[self.pos..]
            .chars()
            .next()
            .map(char::len_utf8)
            .unwrap_or(1)
    }
}

/// Decode named and numeric character references in one pass.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let name = &tail[1..semi];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{00A0}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Body {
                return e.children.clone();
            }
            if e.tag == Tag::Html {
                let inner = body_children(&e.children);
                if !inner.is_empty() {
                    return inner;
                }
            }
        }
    }
    nodes
        .iter()
        .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
        .cloned()
        .collect()
}
