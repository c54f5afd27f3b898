//! Resolution pipeline: bots → components → knowledge sources → resources.
//!
//! Pure aggregation over already-fetched inputs. The index is read-only and
//! every bot is resolved independently, so results depend only on the
//! inputs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use agentmap_shared::{
    Bot, BotComponent, ComponentsByBot, KnowledgeSource, ResourceCategory, ResourceDescriptor,
};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::extractor;
use crate::index::KnowledgeSourceIndex;
use crate::scanner::{self, MatchKind};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A component's reference to a knowledge source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    pub knowledge_source_id: String,
    pub knowledge_source_name: String,
    pub match_kind: MatchKind,
    /// The name or identifier found in the payload.
    pub match_value: String,
    pub component_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<i32>,
}

/// A resource reachable from a bot, with the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResource {
    pub knowledge_source_id: String,
    pub knowledge_source_name: String,
    #[serde(flatten)]
    pub descriptor: ResourceDescriptor,
}

/// Everything resolved for one bot.
///
/// An empty result means the bot was checked and nothing was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub bot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    /// Components scanned for this bot.
    pub components_scanned: usize,
    pub references: Vec<SourceReference>,
    /// Deduplicated on (knowledge source id, URL).
    pub resources: Vec<ResolvedResource>,
}

impl ResolutionResult {
    fn empty(bot: &Bot, components_scanned: usize) -> Self {
        Self {
            bot_id: bot.id.clone(),
            bot_name: bot.name.clone(),
            created_on: bot.created_on,
            components_scanned,
            references: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Display name, or a placeholder for unnamed bots.
    pub fn display_name(&self) -> &str {
        self.bot_name.as_deref().unwrap_or("Unnamed Bot")
    }

    /// Resources of one category.
    pub fn resources_in(
        &self,
        category: ResourceCategory,
    ) -> impl Iterator<Item = &ResolvedResource> {
        self.resources
            .iter()
            .filter(move |r| r.descriptor.category == category)
    }

    pub fn has_resources(&self) -> bool {
        !self.resources.is_empty()
    }
}

/// A bot that was never resolved, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncheckedBot {
    pub bot_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    pub error: String,
}

/// Output of a full resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// One entry per input bot, keyed by bot identifier.
    pub results: BTreeMap<String, ResolutionResult>,
    /// Per-entity problems encountered along the way.
    pub diagnostics: Vec<Diagnostic>,
    /// Bots whose inputs could not be read, so "not checked" rather than
    /// "found nothing".
    #[serde(default)]
    pub not_checked: Vec<UncheckedBot>,
}

impl Resolution {
    /// Record `bot` as not checked. Any result for it is dropped.
    pub fn mark_not_checked(&mut self, bot: &Bot, error: impl Into<String>) {
        self.results.remove(&bot.id);
        self.not_checked.retain(|u| u.bot_id != bot.id);
        self.not_checked.push(UncheckedBot {
            bot_id: bot.id.clone(),
            bot_name: bot.name.clone(),
            error: error.into(),
        });
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Resolve every bot against the index.
///
/// Bots missing from `components_by_bot` are treated as having no
/// components. Each matched knowledge source is extracted once per call.
#[instrument(skip_all, fields(bots = bots.len(), sources = index.len()))]
pub fn resolve_all(
    bots: &[Bot],
    components_by_bot: &ComponentsByBot,
    index: &KnowledgeSourceIndex,
) -> Resolution {
    let mut resolver = Resolver::new(index, index.diagnostics().to_vec());
    let mut results = BTreeMap::new();

    for bot in bots {
        let components = components_by_bot
            .get(&bot.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let result = resolver.resolve_bot(bot, components);
        results.insert(bot.id.clone(), result);
    }

    let with_resources = results.values().filter(|r| r.has_resources()).count();
    info!(
        bots = results.len(),
        with_resources,
        diagnostics = resolver.diagnostics.len(),
        "resolution complete"
    );

    Resolution {
        results,
        diagnostics: resolver.diagnostics,
        not_checked: Vec::new(),
    }
}

/// Resolve a single bot. Returns the result and the diagnostics it raised.
///
/// Independent of every other bot, so callers may run it concurrently
/// against a shared index.
pub fn resolve_bot(
    bot: &Bot,
    components: &[BotComponent],
    index: &KnowledgeSourceIndex,
) -> (ResolutionResult, Vec<Diagnostic>) {
    let mut resolver = Resolver::new(index, Vec::new());
    let result = resolver.resolve_bot(bot, components);
    (result, resolver.diagnostics)
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Per-call state: extraction memo and collected diagnostics.
struct Resolver<'a> {
    index: &'a KnowledgeSourceIndex,
    /// Names shared by more than one indexed source.
    ambiguous: HashSet<&'a str>,
    /// Descriptors per knowledge source id, filled on first use.
    extracted: HashMap<String, Vec<ResourceDescriptor>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Resolver<'a> {
    fn new(index: &'a KnowledgeSourceIndex, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            index,
            ambiguous: index.ambiguous_names().collect(),
            extracted: HashMap::new(),
            diagnostics,
        }
    }

    #[instrument(skip_all, fields(bot_id = %bot.id))]
    fn resolve_bot(&mut self, bot: &Bot, components: &[BotComponent]) -> ResolutionResult {
        let mut result = ResolutionResult::empty(bot, components.len());

        let mut seen_refs: HashSet<(String, MatchKind, String)> = HashSet::new();
        let mut reported_ambiguous: HashSet<&str> = HashSet::new();
        let mut matched: Vec<&'a Arc<KnowledgeSource>> = Vec::new();
        let mut matched_ids: HashSet<&str> = HashSet::new();

        for component in components {
            for m in scanner::resolve(component, self.index) {
                let source_id = m.source.id_or_na();

                debug!(
                    component = component.display_name(),
                    kind = %m.kind,
                    value = m.matched,
                    source_id,
                    "knowledge source reference"
                );

                if m.kind == MatchKind::ByName
                    && self.ambiguous.contains(m.matched)
                    && reported_ambiguous.insert(m.matched)
                {
                    warn!(name = m.matched, bot_id = %bot.id, "ambiguous knowledge source name");
                    self.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::AmbiguousName,
                        Some(bot.id.clone()),
                        format!(
                            "name '{}' matches {} knowledge sources; all are reported",
                            m.matched,
                            self.index.get_by_name(m.matched).len()
                        ),
                    ));
                }

                if seen_refs.insert((source_id.to_string(), m.kind, component.id.clone())) {
                    result.references.push(SourceReference {
                        knowledge_source_id: source_id.to_string(),
                        knowledge_source_name: m.source.name_or_na().to_string(),
                        match_kind: m.kind,
                        match_value: m.matched.to_string(),
                        component_id: component.id.clone(),
                        component_name: component.name.clone(),
                        component_type: component.component_type,
                    });
                }

                if matched_ids.insert(source_id) {
                    matched.push(m.source);
                }
            }
        }

        let mut seen_resources: HashSet<(String, String)> = HashSet::new();
        for source in matched {
            let source_id = source.id_or_na();
            for descriptor in self.descriptors_for(source) {
                if seen_resources.insert((source_id.to_string(), descriptor.url.clone())) {
                    result.resources.push(ResolvedResource {
                        knowledge_source_id: source_id.to_string(),
                        knowledge_source_name: source.name_or_na().to_string(),
                        descriptor,
                    });
                }
            }
        }

        debug!(
            references = result.references.len(),
            resources = result.resources.len(),
            "bot resolved"
        );

        result
    }

    /// Extract once per source; a malformed config is reported once and
    /// resolves to no resources.
    fn descriptors_for(&mut self, source: &KnowledgeSource) -> Vec<ResourceDescriptor> {
        let id = source.id_or_na();
        if let Some(cached) = self.extracted.get(id) {
            return cached.clone();
        }

        let descriptors = match extractor::extract(source) {
            Ok(descriptors) => descriptors,
            Err(e) => {
                warn!(source_id = id, error = %e, "could not parse knowledge config");
                self.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::MalformedConfig,
                    Some(id.to_string()),
                    e.to_string(),
                ));
                Vec::new()
            }
        };

        self.extracted.insert(id.to_string(), descriptors.clone());
        descriptors
    }
}
