//! Summary report and JSON export of a [`Resolution`].

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{info, instrument};

use agentmap_shared::{AgentMapError, ResourceCategory, Result};

use crate::pipeline::{Resolution, ResolutionResult};

/// Bots grouped by the kind of storage they can reach.
///
/// A bot appears in every group it qualifies for, except
/// `without_sources`, which holds checked bots with no resources at all,
/// and `not_checked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Checked and unchecked bots together.
    pub total_bots: usize,
    pub with_onedrive: Vec<String>,
    pub with_sharepoint: Vec<String>,
    /// Dataverse or uncategorized resources.
    pub with_other_sources: Vec<String>,
    pub without_sources: Vec<String>,
    pub not_checked: Vec<String>,
}

impl Summary {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        let mut summary = Summary {
            total_bots: resolution.results.len() + resolution.not_checked.len(),
            not_checked: resolution
                .not_checked
                .iter()
                .map(|u| u.bot_id.clone())
                .collect(),
            ..Summary::default()
        };

        for (bot_id, result) in &resolution.results {
            if !result.has_resources() {
                summary.without_sources.push(bot_id.clone());
                continue;
            }
            if result.resources_in(ResourceCategory::OneDrive).next().is_some() {
                summary.with_onedrive.push(bot_id.clone());
            }
            if result.resources_in(ResourceCategory::SharePoint).next().is_some() {
                summary.with_sharepoint.push(bot_id.clone());
            }
            if result.resources.iter().any(|r| {
                matches!(
                    r.descriptor.category,
                    ResourceCategory::Dataverse | ResourceCategory::Unknown
                )
            }) {
                summary.with_other_sources.push(bot_id.clone());
            }
        }

        summary
    }
}

const RULE_WIDTH: usize = 100;

/// Render the text report: counts, relationship chains, diagnostics.
pub fn render_summary(resolution: &Resolution) -> String {
    let summary = Summary::from_resolution(resolution);
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}\nSUMMARY\n{rule}");
    let _ = writeln!(out, "Total bots analyzed: {}", summary.total_bots);
    let _ = writeln!(out, "  Bots with OneDrive access:   {}", summary.with_onedrive.len());
    let _ = writeln!(out, "  Bots with SharePoint access: {}", summary.with_sharepoint.len());
    let _ = writeln!(out, "  Bots with other sources:     {}", summary.with_other_sources.len());
    let _ = writeln!(out, "  Bots without sources:        {}", summary.without_sources.len());
    let _ = writeln!(out, "  Bots not checked:            {}", summary.not_checked.len());

    let mut mapped: Vec<&ResolutionResult> = resolution
        .results
        .values()
        .filter(|r| !r.references.is_empty())
        .collect();
    mapped.sort_by(|a, b| a.display_name().cmp(b.display_name()).then(a.bot_id.cmp(&b.bot_id)));

    if !mapped.is_empty() {
        let _ = writeln!(out, "\n{rule}\nRELATIONSHIP CHAINS\n{rule}");
        for result in mapped {
            render_chain(&mut out, result);
        }
    }

    if !resolution.not_checked.is_empty() {
        let _ = writeln!(out, "\n{rule}\nNOT CHECKED\n{rule}");
        for unchecked in &resolution.not_checked {
            let _ = writeln!(
                out,
                "  {} ({}): {}",
                unchecked.bot_name.as_deref().unwrap_or("Unnamed Bot"),
                unchecked.bot_id,
                unchecked.error
            );
        }
    }

    if !resolution.diagnostics.is_empty() {
        let _ = writeln!(out, "\n{rule}\nDIAGNOSTICS\n{rule}");
        for diagnostic in &resolution.diagnostics {
            let _ = writeln!(out, "  {diagnostic}");
        }
    }

    out
}

fn render_chain(out: &mut String, result: &ResolutionResult) {
    let _ = writeln!(out, "\n+- BOT: {} ({})", result.display_name(), result.bot_id);

    for reference in &result.references {
        let _ = writeln!(
            out,
            "|  +- COMPONENT: {} (type {}) via {}: {}",
            reference.component_name.as_deref().unwrap_or("N/A"),
            reference
                .component_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "?".into()),
            reference.match_kind,
            reference.match_value,
        );
        let _ = writeln!(
            out,
            "|  |  +- KNOWLEDGE SOURCE: {} ({})",
            reference.knowledge_source_name, reference.knowledge_source_id
        );
    }

    if result.resources.is_empty() {
        let _ = writeln!(out, "|  (no resources)");
    }
    for resource in &result.resources {
        let _ = writeln!(
            out,
            "|  +- [{}] {}\n|       URL: {}\n|       Knowledge source: {}",
            resource.descriptor.category,
            resource.descriptor.name,
            resource.descriptor.url,
            resource.knowledge_source_name,
        );
    }
}

/// Write the full resolution as pretty JSON, unchecked bots included.
#[instrument(skip(resolution))]
pub fn export_json(resolution: &Resolution, path: &Path) -> Result<()> {
    #[derive(Serialize)]
    struct Export<'a> {
        summary: Summary,
        #[serde(flatten)]
        resolution: &'a Resolution,
    }

    let export = Export {
        summary: Summary::from_resolution(resolution),
        resolution,
    };

    let json = serde_json::to_string_pretty(&export)
        .map_err(|e| AgentMapError::parse(format!("failed to serialize results: {e}")))?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| AgentMapError::io(dir, e))?;
    }
    std::fs::write(path, json).map_err(|e| AgentMapError::io(path, e))?;

    info!(
        bots = resolution.results.len(),
        not_checked = resolution.not_checked.len(),
        "results exported"
    );
    Ok(())
}
