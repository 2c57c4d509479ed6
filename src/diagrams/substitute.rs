//! Marker-driven replacement of Mermaid blocks with SVG assets.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Captures;

use super::DiagramRegistry;
use crate::error::{ForgeError, Result};
use crate::markdown::MERMAID_BLOCK;

/// Ordered `(marker, asset-id)` pairs. A Mermaid block is replaced by the
/// asset of the first pair whose marker occurs in the block's source.
#[derive(Debug, Clone, Default)]
pub struct MarkerMap {
    pairs: Vec<(String, String)>,
}

impl MarkerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, marker: impl Into<String>, asset_id: impl Into<String>) -> Self {
        self.pairs.push((marker.into(), asset_id.into()));
        self
    }

    /// Markers identifying the ROI report's diagrams.
    pub fn builtin() -> Self {
        Self::new()
            .with("graph LR\n    A[AI Developer]", "diagram1_key_findings")
            .with("subgraph \"Annual Cost Comparison (USD)\"", "diagram2_annual_cost")
            .with(
                "pie title \"Startup Cost Savings with AI Developer\"",
                "diagram3_startup_savings",
            )
            .with("subgraph \"Monthly Cost for 40 hours\"", "diagram4_monthly_cost")
            .with("gantt", "diagram5_timeline")
            .with(
                "subgraph \"Annual Salaries in India (USD)\"",
                "diagram6_india_salaries",
            )
            .with("subgraph \"Cost for 10 User Stories\"", "diagram7_cost_10_stories")
            .with(
                "pie title \"Cost Distribution: Enterprise Development\"",
                "diagram8_enterprise_cost",
            )
            .with(
                "subgraph \"Documentation Quality Score (out of 10)\"",
                "diagram9_doc_quality",
            )
            .with("subgraph \"Annual Availability (Hours)\"", "diagram10_availability")
            .with("subgraph \"Code Quality Over Time\"", "diagram11_quality_time")
            .with("subgraph \"5-Year TCO Comparison\"", "diagram12_5year_tco")
            .with("subgraph \"Software Development Evolution\"", "diagram13_evolution")
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn resolve(&self, block_source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(marker, _)| block_source.contains(marker.as_str()))
            .map(|(_, id)| id.as_str())
    }

    /// Every asset id must exist in `registry`.
    pub fn validate(&self, registry: &DiagramRegistry) -> Result<()> {
        for (_, id) in &self.pairs {
            if registry.get(id).is_none() {
                return Err(ForgeError::UnknownDiagram(id.clone()));
            }
        }
        Ok(())
    }
}

/// Output of [`substitute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// `(asset-id, times replaced)` for every asset used at least once, in
    /// first-use order.
    pub replaced: Vec<(String, usize)>,
}

impl Substitution {
    pub fn total(&self) -> usize {
        self.replaced.iter().map(|(_, n)| n).sum()
    }
}

/// Blank lines would end a CommonMark HTML block early, so they are dropped
/// from the embedded copy.
fn embed(svg: &str) -> String {
    let body: Vec<&str> = svg
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect();
    format!("<div class=\"diagram\">\n{}\n</div>", body.join("\n"))
}

/// Replace each Mermaid block that carries a declared marker with its asset.
/// Blocks without a marker are left untouched.
pub fn substitute(
    markdown: &str,
    markers: &MarkerMap,
    registry: &DiagramRegistry,
) -> Result<Substitution> {
    markers.validate(registry)?;

    let mut replaced: Vec<(String, usize)> = Vec::new();
    let text = MERMAID_BLOCK
        .replace_all(markdown, |caps: &Captures| {
            let source = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let asset = markers.resolve(source).and_then(|id| registry.get(id));
            match asset {
                Some(asset) => {
                    match replaced.iter_mut().find(|(id, _)| id == asset.id) {
                        Some((_, n)) => *n += 1,
                        None => replaced.push((asset.id.to_string(), 1)),
                    }
                    embed(asset.svg)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    log::debug!(
        "diagrams: {} block(s) substituted",
        replaced.iter().map(|(_, n)| n).sum::<usize>()
    );
    Ok(Substitution { text, replaced })
}

/// `report.md` → `report-SVG.md` in the same directory.
fn default_substituted_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    source.with_file_name(format!("{stem}-SVG.md"))
}

/// Read `source`, substitute diagrams, and write the result to `dest`
/// (default: `<stem>-SVG.md` next to the source).
pub fn write_substituted(
    source: &Path,
    dest: Option<&Path>,
    markers: &MarkerMap,
    registry: &DiagramRegistry,
) -> Result<(PathBuf, Substitution)> {
    let markdown = fs::read_to_string(source).map_err(|e| ForgeError::SourceRead {
        path: source.to_path_buf(),
        source: e,
    })?;
    let result = substitute(&markdown, markers, registry)?;
    let dest = dest
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_substituted_path(source));
    fs::write(&dest, &result.text).map_err(|e| ForgeError::write(&dest, e))?;
    log::info!("wrote {}", dest.display());
    Ok((dest, result))
}
