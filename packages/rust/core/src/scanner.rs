//! Reference scanner: finds knowledge-source references in component payloads.
//!
//! Payload schemas vary by component type (flow-style text such as
//! `skillConfiguration: <name>`, or JSON strings such as
//! `"knowledgeSourceId":"<id>"`), so matching is plain substring containment
//! against the index keys. This is a heuristic; it is not parsed
//! structurally.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use agentmap_shared::{BotComponent, KnowledgeSource};

use crate::index::KnowledgeSourceIndex;

/// How a reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatchKind {
    /// The source's name occurs in the payload.
    ByName,
    /// The source's identifier occurs in the payload.
    ById,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ByName => f.write_str("NAME"),
            Self::ById => f.write_str("GUID"),
        }
    }
}

/// One reference from a component to an indexed knowledge source.
#[derive(Debug, Clone)]
pub struct ReferenceMatch<'a> {
    pub source: &'a Arc<KnowledgeSource>,
    pub kind: MatchKind,
    /// The index key found in the payload.
    pub matched: &'a str,
}

/// Scan one component for references to indexed knowledge sources.
///
/// Reports every identifier match, then every name match (one per source
/// carrying that name), each in sorted key order. Nothing is deduplicated
/// or ranked. An empty or missing payload yields no matches.
pub fn resolve<'a>(
    component: &BotComponent,
    index: &'a KnowledgeSourceIndex,
) -> Vec<ReferenceMatch<'a>> {
    let payloads: Vec<&str> = [component.data.as_deref(), component.content.as_deref()]
        .into_iter()
        .flatten()
        .filter(|p| !p.is_empty())
        .collect();

    if payloads.is_empty() {
        return Vec::new();
    }

    let occurs = |key: &str| payloads.iter().any(|p| p.contains(key));

    let mut matches = Vec::new();

    for (id, source) in index.ids() {
        if occurs(id) {
            matches.push(ReferenceMatch {
                source,
                kind: MatchKind::ById,
                matched: id,
            });
        }
    }

    for (name, sources) in index.names() {
        if occurs(name) {
            matches.extend(sources.iter().map(|source| ReferenceMatch {
                source,
                kind: MatchKind::ByName,
                matched: name,
            }));
        }
    }

    matches
}
