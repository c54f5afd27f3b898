//! Core domain types mirroring the Dataverse entities AgentMap reads.
//!
//! Field names on the wire follow the Dataverse attribute logical names
//! (`botid`, `botcomponentid`, `dvtablesearchid`, ...).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Components fetched per bot, keyed by bot identifier.
pub type ComponentsByBot = BTreeMap<String, Vec<BotComponent>>;

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

/// A Copilot Studio bot (`bots` entity set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    /// Bot identifier (GUID).
    #[serde(rename = "botid")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// When the bot was created.
    #[serde(rename = "createdon", default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    /// When the bot was last modified.
    #[serde(rename = "modifiedon", default, skip_serializing_if = "Option::is_none")]
    pub modified_on: Option<DateTime<Utc>>,
}

impl Bot {
    /// Display name, or a placeholder for unnamed bots.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed Bot")
    }
}

// ---------------------------------------------------------------------------
// BotComponent
// ---------------------------------------------------------------------------

/// A bot component (`botcomponents` entity set).
///
/// `data` and `content` are free-form payloads (YAML-ish text or JSON
/// strings) whose schema depends on the component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotComponent {
    /// Component identifier (GUID).
    #[serde(rename = "botcomponentid")]
    pub id: String,
    /// Numeric component type code.
    #[serde(rename = "componenttype", default)]
    pub component_type: Option<i32>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Primary payload.
    #[serde(default)]
    pub data: Option<String>,
    /// Secondary payload, scanned together with `data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Owning bot.
    #[serde(rename = "_parentbotid_value", default, skip_serializing_if = "Option::is_none")]
    pub parent_bot_id: Option<String>,
}

impl BotComponent {
    /// Display name, or `N/A`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }
}

// ---------------------------------------------------------------------------
// KnowledgeSource
// ---------------------------------------------------------------------------

/// A knowledge source record (`dvtablesearchs` entity set).
///
/// `id` and `name` are optional on the wire; entries missing either are
/// skipped during indexing rather than rejected at deserialization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    /// Knowledge source identifier (GUID).
    #[serde(rename = "dvtablesearchid", default)]
    pub id: Option<String>,
    /// Knowledge source name, referenced by newer bots.
    #[serde(default)]
    pub name: Option<String>,
    /// Embedded configuration document. Usually a JSON string; some
    /// endpoints return the object inline.
    #[serde(rename = "knowledgeconfig", default)]
    pub knowledge_config: Option<serde_json::Value>,
}

impl KnowledgeSource {
    /// Identifier, or `N/A`.
    pub fn id_or_na(&self) -> &str {
        self.id.as_deref().unwrap_or("N/A")
    }

    /// Name, or `N/A`.
    pub fn name_or_na(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }
}

// ---------------------------------------------------------------------------
// ResourceDescriptor
// ---------------------------------------------------------------------------

/// Storage category of a resolved resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceCategory {
    OneDrive,
    SharePoint,
    /// SQL-federated Dataverse table search.
    Dataverse,
    Unknown,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::OneDrive => "OneDrive",
            Self::SharePoint => "SharePoint",
            Self::Dataverse => "Dataverse",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// A categorized location extracted from a knowledge source's config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Storage category.
    pub category: ResourceCategory,
    /// Display name of the drive item (or database).
    pub name: String,
    /// Web URL (`server/database` for Dataverse resources).
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bot_deserializes_from_dataverse_row() {
        let row = serde_json::json!({
            "botid": "b-1",
            "name": "HR Helper",
            "createdon": "2024-05-01T10:00:00Z",
            "schemaname": "cr123_hrHelper"
        });
        let bot: Bot = serde_json::from_value(row).expect("deserialize bot");
        assert_eq!(bot.id, "b-1");
        assert_eq!(bot.display_name(), "HR Helper");
        assert!(bot.created_on.is_some());
        assert!(bot.modified_on.is_none());
    }

    #[test]
    fn component_tolerates_missing_payload() {
        let row = serde_json::json!({
            "botcomponentid": "c-1",
            "componenttype": 9,
            "name": "Topic",
            "data": null
        });
        let component: BotComponent = serde_json::from_value(row).expect("deserialize");
        assert_eq!(component.component_type, Some(9));
        assert!(component.data.is_none());
        assert!(component.content.is_none());
    }

    #[test]
    fn knowledge_source_accepts_string_or_object_config() {
        let as_string: KnowledgeSource = serde_json::from_value(serde_json::json!({
            "dvtablesearchid": "ks-1",
            "name": "Docs",
            "knowledgeconfig": "{\"$kind\":\"Other\"}"
        }))
        .expect("string config");
        assert!(matches!(
            as_string.knowledge_config,
            Some(serde_json::Value::String(_))
        ));

        let as_object: KnowledgeSource = serde_json::from_value(serde_json::json!({
            "dvtablesearchid": "ks-2",
            "knowledgeconfig": { "$kind": "Other" }
        }))
        .expect("object config");
        assert!(as_object.knowledge_config.as_ref().is_some_and(|v| v.is_object()));
        assert_eq!(as_object.name_or_na(), "N/A");
    }

    #[test]
    fn category_display() {
        assert_eq!(ResourceCategory::OneDrive.to_string(), "OneDrive");
        assert_eq!(ResourceCategory::Unknown.to_string(), "Unknown");
    }
}
