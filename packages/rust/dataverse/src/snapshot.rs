//! The three raw collections the resolution engine consumes, plus JSON
//! snapshot load/save for offline runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use agentmap_shared::{AgentMapError, Bot, ComponentsByBot, KnowledgeSource, Result};

/// A bot whose components could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub bot_id: String,
    pub error: String,
}

/// Materialized inputs for one resolution run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inputs {
    pub bots: Vec<Bot>,
    #[serde(default)]
    pub components_by_bot: ComponentsByBot,
    #[serde(default)]
    pub knowledge_sources: Vec<KnowledgeSource>,
    /// Bots that were not checked because their component fetch failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fetch_failures: Vec<FetchFailure>,
}

impl Inputs {
    /// Bots whose components were fetched successfully.
    ///
    /// Failed bots are left out so they are reported as "not checked"
    /// rather than "checked, found nothing".
    pub fn checked_bots(&self) -> Vec<Bot> {
        self.bots
            .iter()
            .filter(|bot| !self.fetch_failures.iter().any(|f| f.bot_id == bot.id))
            .cloned()
            .collect()
    }
}

/// Read a snapshot written by [`save_snapshot`] (or hand-assembled).
pub fn load_snapshot(path: &Path) -> Result<Inputs> {
    let content = std::fs::read_to_string(path).map_err(|e| AgentMapError::io(path, e))?;
    let inputs: Inputs = serde_json::from_str(&content)
        .map_err(|e| AgentMapError::parse(format!("failed to parse {}: {e}", path.display())))?;

    info!(
        path = %path.display(),
        bots = inputs.bots.len(),
        sources = inputs.knowledge_sources.len(),
        "snapshot loaded"
    );
    Ok(inputs)
}

/// Write inputs as pretty JSON.
pub fn save_snapshot(inputs: &Inputs, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(inputs)
        .map_err(|e| AgentMapError::parse(format!("failed to serialize snapshot: {e}")))?;
    std::fs::write(path, json).map_err(|e| AgentMapError::io(path, e))
}
