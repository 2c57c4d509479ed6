//! Static diagram assets.
//!
//! The report's Mermaid diagrams cannot be executed by any of the PDF
//! backends, so each one has a hand-authored SVG equivalent compiled into the
//! binary. [`DiagramRegistry`] maps asset ids to SVG text; [`substitute`]
//! swaps Mermaid blocks for those assets, and [`DiagramRegistry::write_assets`]
//! exports every asset to its own `.svg` file.

mod substitute;

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ForgeError, Result};

pub use substitute::{substitute, write_substituted, MarkerMap, Substitution};

/// A named, statically authored SVG document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagramAsset {
    pub id: &'static str,
    pub svg: &'static str,
}

macro_rules! asset {
    ($id:literal) => {
        DiagramAsset {
            id: $id,
            svg: include_str!(concat!("../../assets/diagrams/", $id, ".svg")),
        }
    };
}

/// The report's diagrams, in the order they appear in the document.
const BUILTIN: &[DiagramAsset] = &[
    asset!("diagram1_key_findings"),
    asset!("diagram2_annual_cost"),
    asset!("diagram3_startup_savings"),
    asset!("diagram4_monthly_cost"),
    asset!("diagram5_timeline"),
    asset!("diagram6_india_salaries"),
    asset!("diagram7_cost_10_stories"),
    asset!("diagram8_enterprise_cost"),
    asset!("diagram9_doc_quality"),
    asset!("diagram10_availability"),
    asset!("diagram11_quality_time"),
    asset!("diagram12_5year_tco"),
    asset!("diagram13_evolution"),
];

/// Ordered mapping from asset id to SVG text.
#[derive(Debug, Clone)]
pub struct DiagramRegistry {
    assets: Vec<DiagramAsset>,
}

impl DiagramRegistry {
    pub fn new(assets: Vec<DiagramAsset>) -> Self {
        Self { assets }
    }

    /// The thirteen diagrams of the ROI report.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    pub fn get(&self, id: &str) -> Option<&DiagramAsset> {
        self.assets.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagramAsset> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Write every asset to `<dir>/<id>.svg`, creating `dir` if needed.
    /// Existing files are overwritten. Returns the written paths in order.
    pub fn write_assets(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| ForgeError::write(dir, e))?;
        let mut written = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let path = dir.join(format!("{}.svg", asset.id));
            fs::write(&path, asset.svg).map_err(|e| ForgeError::write(&path, e))?;
            log::info!("wrote diagram {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

impl Default for DiagramRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

static XML_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static XML_PROLOG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<\?.*?\?>").unwrap());
static XML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9:_.-]*)(?:[^>"']|"[^"]*"|'[^']*')*?(/?)>"#).unwrap()
});

/// Check that `svg` is one self-contained `<svg>` element whose tags are
/// balanced and properly nested.
pub fn check_well_formed(id: &str, svg: &str) -> Result<()> {
    let malformed = |detail: String| ForgeError::MalformedSvg {
        id: id.to_string(),
        detail,
    };

    let stripped = XML_COMMENT.replace_all(svg, "");
    let stripped = XML_PROLOG.replace_all(&stripped, "");
    let body = stripped.trim();

    if !body.starts_with("<svg") {
        return Err(malformed("document does not start with <svg>".into()));
    }

    let mut stack: Vec<&str> = Vec::new();
    let mut roots = 0usize;
    let mut last_end = 0usize;

    for caps in XML_TAG.captures_iter(body) {
        let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
        let between = &body[last_end..whole.0];
        if stack.is_empty() && !between.trim().is_empty() {
            return Err(malformed(format!("text outside root: {:?}", between.trim())));
        }
        last_end = whole.1;

        let closing = !caps[1].is_empty();
        let self_closing = !caps[3].is_empty();
        let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        if closing {
            match stack.pop() {
                Some(open) if open == name => {}
                Some(open) => {
                    return Err(malformed(format!("</{name}> closes <{open}>")));
                }
                None => return Err(malformed(format!("unmatched </{name}>"))),
            }
        } else {
            if stack.is_empty() {
                roots += 1;
                if roots > 1 {
                    return Err(malformed("more than one root element".into()));
                }
            }
            if !self_closing {
                stack.push(name);
            }
        }
    }

    if !body[last_end..].trim().is_empty() {
        return Err(malformed("trailing text after root".into()));
    }
    if let Some(open) = stack.last() {
        return Err(malformed(format!("<{open}> is never closed")));
    }
    Ok(())
}
