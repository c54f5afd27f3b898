//! Dual-keyed lookup over the knowledge-source catalog.
//!
//! Components reference knowledge sources either by GUID (older bots) or by
//! name (newer bots, e.g. `skillConfiguration: <name>`), so the catalog is
//! indexed both ways. The index is built once per run and never mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use agentmap_shared::KnowledgeSource;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::extractor::GRAPH_SEARCH_KIND;

/// Immutable lookup of knowledge sources by identifier and by name.
///
/// Every indexed source has a non-empty `id` and `name`. Names are not
/// unique in the catalog, so `by_name` keeps every source carrying a name
/// in catalog order.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSourceIndex {
    by_id: BTreeMap<String, Arc<KnowledgeSource>>,
    by_name: BTreeMap<String, Vec<Arc<KnowledgeSource>>>,
    diagnostics: Vec<Diagnostic>,
}

impl KnowledgeSourceIndex {
    /// Build the index from the catalog, in the order received.
    ///
    /// Entries missing an identifier or a name are skipped with a
    /// [`DiagnosticKind::MalformedCatalogEntry`]. A repeated identifier
    /// replaces the earlier entry and is also reported.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn build(sources: &[KnowledgeSource]) -> Self {
        let mut index = Self::default();

        for (position, source) in sources.iter().enumerate() {
            let id = non_blank(source.id.as_deref());
            let name = non_blank(source.name.as_deref());

            let (Some(id), Some(name)) = (id, name) else {
                let entity = id
                    .map(String::from)
                    .unwrap_or_else(|| format!("catalog entry #{position}"));
                let missing = if id.is_none() { "identifier" } else { "name" };
                warn!(entity = %entity, missing, "skipping knowledge source");
                index.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MalformedCatalogEntry,
                    Some(entity),
                    format!("knowledge source has no {missing}; skipped"),
                ));
                continue;
            };

            let shared = Arc::new(source.clone());

            if let Some(previous) = index.by_id.insert(id.to_string(), Arc::clone(&shared)) {
                index.forget_name(&previous);
                warn!(id, "duplicate knowledge source identifier, keeping later entry");
                index.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MalformedCatalogEntry,
                    Some(id.to_string()),
                    "duplicate identifier; later catalog entry replaces earlier one",
                ));
            }

            index
                .by_name
                .entry(name.to_string())
                .or_default()
                .push(shared);
        }

        debug!(
            ids = index.by_id.len(),
            names = index.by_name.len(),
            skipped = index.diagnostics.len(),
            "knowledge source index built"
        );

        index
    }

    /// Look up a source by identifier.
    pub fn get_by_id(&self, id: &str) -> Option<&Arc<KnowledgeSource>> {
        self.by_id.get(id)
    }

    /// All sources carrying `name`; empty when none do.
    pub fn get_by_name(&self, name: &str) -> &[Arc<KnowledgeSource>] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifier keys in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = (&str, &Arc<KnowledgeSource>)> {
        self.by_id.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Name keys in sorted order, each with its candidate sources.
    pub fn names(&self) -> impl Iterator<Item = (&str, &[Arc<KnowledgeSource>])> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Names carried by more than one source.
    pub fn ambiguous_names(&self) -> impl Iterator<Item = &str> {
        self.by_name
            .iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(name, _)| name.as_str())
    }

    /// Number of indexed sources.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Diagnostics recorded while building.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn forget_name(&mut self, previous: &Arc<KnowledgeSource>) {
        let Some(name) = previous.name.as_deref() else {
            return;
        };
        if let Some(list) = self.by_name.get_mut(name) {
            list.retain(|s| !Arc::ptr_eq(s, previous));
            if list.is_empty() {
                self.by_name.remove(name);
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Catalog stats
// ---------------------------------------------------------------------------

/// Shape of the catalog, for logging before resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    pub total: usize,
    /// Graph-search sources with at least one drive item.
    pub drive_backed: usize,
}

impl CatalogStats {
    pub fn other(&self) -> usize {
        self.total - self.drive_backed
    }
}

/// Count OneDrive/SharePoint-backed sources in the raw catalog.
pub fn catalog_stats(sources: &[KnowledgeSource]) -> CatalogStats {
    let drive_backed = sources
        .iter()
        .filter(|source| {
            crate::extractor::parse_config(source)
                .ok()
                .flatten()
                .is_some_and(|doc| {
                    doc.get("$kind").and_then(|k| k.as_str()) == Some(GRAPH_SEARCH_KIND)
                        && doc
                            .get("driveItems")
                            .and_then(|items| items.as_array())
                            .is_some_and(|items| !items.is_empty())
                })
        })
        .count();

    CatalogStats {
        total: sources.len(),
        drive_backed,
    }
}
