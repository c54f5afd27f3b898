//! Per-entity diagnostics recorded during a resolution pass.
//!
//! Nothing in the engine aborts on bad input. Malformed records are skipped
//! or resolved to "no resources", and the reason is reported here.

use serde::{Deserialize, Serialize};

/// What went wrong with a single entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Catalog entry missing an identifier or name, or a duplicate identifier.
    MalformedCatalogEntry,
    /// `knowledgeconfig` is not valid JSON.
    MalformedConfig,
    /// A referenced name is carried by more than one knowledge source.
    AmbiguousName,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::MalformedCatalogEntry => "malformed catalog entry",
            Self::MalformedConfig => "malformed config",
            Self::AmbiguousName => "ambiguous name",
        };
        f.write_str(s)
    }
}

/// A diagnostic attached to one entity (catalog entry, source, or bot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Identifier of the affected entity, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, entity: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            entity,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "[{}] {entity}: {}", self.kind, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
