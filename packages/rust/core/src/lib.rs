//! Reference-resolution engine for AgentMap.
//!
//! Maps bots to the OneDrive/SharePoint locations they can search:
//! the knowledge-source catalog is indexed by id and name ([`index`]),
//! component payloads are scanned for references ([`scanner`]), matched
//! sources' configs are turned into resources ([`extractor`]), and
//! [`pipeline`] aggregates everything per bot. No I/O happens here apart
//! from the JSON export in [`report`].

pub mod diagnostics;
pub mod extractor;
pub mod index;
pub mod pipeline;
pub mod report;
pub mod scanner;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use index::{CatalogStats, KnowledgeSourceIndex, catalog_stats};
pub use pipeline::{
    Resolution, ResolutionResult, ResolvedResource, SourceReference, UncheckedBot, resolve_all,
    resolve_bot,
};
pub use report::{Summary, export_json, render_summary};
pub use scanner::{MatchKind, ReferenceMatch};
