//! Configuration extractor: knowledge source → categorized resources.
//!
//! A knowledge source's `knowledgeconfig` is a JSON document discriminated by
//! `$kind`. Graph-search configurations list OneDrive/SharePoint drive items;
//! SQL-federated configurations point at a Dataverse database. Any other kind
//! is tolerated and yields no resources.

use serde_json::Value;

use agentmap_shared::{
    AgentMapError, KnowledgeSource, ResourceCategory, ResourceDescriptor, Result,
};

/// Discriminator of OneDrive/SharePoint-backed configurations.
pub const GRAPH_SEARCH_KIND: &str = "IngestionBasedGraphSearchConfiguration";

/// Discriminator of Dataverse SQL-federated configurations.
pub const SQL_FEDERATED_KIND: &str = "SqlFederatedTableSearchConfiguration";

/// Placeholder for absent display fields.
const NOT_AVAILABLE: &str = "N/A";

/// Extract resource descriptors from one knowledge source.
///
/// Returns [`AgentMapError::MalformedConfig`] only when the config is not
/// valid JSON. Missing configs and unrecognized kinds give an empty list.
pub fn extract(source: &KnowledgeSource) -> Result<Vec<ResourceDescriptor>> {
    let Some(doc) = parse_config(source)? else {
        return Ok(Vec::new());
    };

    let descriptors = match doc.get("$kind").and_then(Value::as_str) {
        Some(GRAPH_SEARCH_KIND) => drive_items(&doc),
        Some(SQL_FEDERATED_KIND) => vec![sql_federated(&doc)],
        _ => Vec::new(),
    };

    Ok(descriptors)
}

/// Categorize a storage URL.
///
/// Personal sites (`-my.sharepoint.com` hosts or `/personal/` paths) are
/// OneDrive; other `sharepoint.com` URLs are SharePoint. Custom tenant
/// domains fall through to `Unknown`.
pub fn categorize(url: &str) -> ResourceCategory {
    let url = url.to_lowercase();
    if url.contains("-my.sharepoint.com") || url.contains("/personal/") {
        ResourceCategory::OneDrive
    } else if url.contains("sharepoint.com") {
        ResourceCategory::SharePoint
    } else {
        ResourceCategory::Unknown
    }
}

/// Decode `knowledgeconfig` into a JSON value.
///
/// `Ok(None)` when the source has no config.
pub(crate) fn parse_config(source: &KnowledgeSource) -> Result<Option<Value>> {
    match &source.knowledge_config {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(text)
            .map(Some)
            .map_err(|e| AgentMapError::malformed_config(source.id_or_na(), e.to_string())),
        Some(doc @ Value::Object(_)) => Ok(Some(doc.clone())),
        Some(other) => Err(AgentMapError::malformed_config(
            source.id_or_na(),
            format!("expected a JSON document, found {other}"),
        )),
    }
}

fn drive_items(doc: &Value) -> Vec<ResourceDescriptor> {
    let Some(items) = doc.get("driveItems").and_then(Value::as_array) else {
        return Vec::new();
    };

    // Each field is read on its own: a mistyped displayName must not cost
    // the item its URL.
    items
        .iter()
        .filter_map(|item| {
            let url = string_field(item, "webUrl").filter(|u| !u.trim().is_empty())?;
            Some(ResourceDescriptor {
                category: categorize(url),
                name: string_field(item, "displayName")
                    .unwrap_or(NOT_AVAILABLE)
                    .to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

fn sql_federated(doc: &Value) -> ResourceDescriptor {
    let server = string_field(doc, "sqlServerName").unwrap_or(NOT_AVAILABLE);
    let database = string_field(doc, "sqlDbName").unwrap_or(NOT_AVAILABLE);

    ResourceDescriptor {
        category: ResourceCategory::Dataverse,
        url: format!("{server}/{database}"),
        name: database.to_string(),
    }
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(config: Option<Value>) -> KnowledgeSource {
        KnowledgeSource {
            id: Some("ks-1".into()),
            name: Some("Docs".into()),
            knowledge_config: config,
        }
    }

    fn text(doc: &str) -> Option<Value> {
        Some(Value::String(doc.into()))
    }

    #[test]
    fn onedrive_drive_item() {
        let ks = source_with(text(
            r#"{"$kind":"IngestionBasedGraphSearchConfiguration","driveItems":[{"displayName":"README Files","webUrl":"https://contoso-my.sharepoint.com/personal/user/Documents/README"}]}"#,
        ));

        let descriptors = extract(&ks).expect("extract");
        assert_eq!(
            descriptors,
            vec![ResourceDescriptor {
                category: ResourceCategory::OneDrive,
                name: "README Files".into(),
                url: "https://contoso-my.sharepoint.com/personal/user/Documents/README".into(),
            }]
        );
    }

    #[test]
    fn items_without_url_are_skipped() {
        let ks = source_with(Some(serde_json::json!({
            "$kind": GRAPH_SEARCH_KIND,
            "driveItems": [
                { "displayName": "No URL" },
                { "displayName": "Blank", "webUrl": "" },
                { "webUrl": "https://contoso.sharepoint.com/sites/hr/Shared%20Documents" },
                "not an object"
            ]
        })));

        let descriptors = extract(&ks).expect("extract");
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].category, ResourceCategory::SharePoint);
        assert_eq!(descriptors[0].name, "N/A");
    }

    #[test]
    fn mistyped_display_name_keeps_item() {
        let ks = source_with(Some(serde_json::json!({
            "$kind": GRAPH_SEARCH_KIND,
            "driveItems": [
                { "displayName": 2024, "webUrl": "https://contoso.sharepoint.com/sites/a" },
                { "displayName": "ok", "webUrl": "https://contoso.sharepoint.com/sites/b" },
                { "displayName": "Numeric URL", "webUrl": 7 }
            ]
        })));

        let descriptors = extract(&ks).expect("extract");
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "N/A");
        assert_eq!(descriptors[0].url, "https://contoso.sharepoint.com/sites/a");
        assert_eq!(descriptors[1].name, "ok");
    }

    #[test]
    fn sql_federated_with_mistyped_server_keeps_database() {
        let ks = source_with(Some(serde_json::json!({
            "$kind": SQL_FEDERATED_KIND,
            "sqlServerName": false,
            "sqlDbName": "org_db"
        })));

        let descriptors = extract(&ks).expect("extract");
        assert_eq!(descriptors[0].url, "N/A/org_db");
        assert_eq!(descriptors[0].name, "org_db");
    }

    #[test]
    fn invalid_json_is_malformed_config() {
        let err = extract(&source_with(text("not json"))).unwrap_err();
        assert!(matches!(
            err,
            AgentMapError::MalformedConfig { ref source_id, .. } if source_id == "ks-1"
        ));
    }

    #[test]
    fn non_document_value_is_malformed_config() {
        let err = extract(&source_with(Some(serde_json::json!(42)))).unwrap_err();
        assert!(matches!(err, AgentMapError::MalformedConfig { .. }));
    }

    #[test]
    fn unknown_kind_and_missing_config_yield_nothing() {
        let unknown = source_with(text(r#"{"$kind":"FutureSearchConfiguration","items":[1]}"#));
        assert!(extract(&unknown).expect("unknown kind").is_empty());

        let no_kind = source_with(Some(serde_json::json!({
            "driveItems": [{ "webUrl": "https://contoso.sharepoint.com" }]
        })));
        assert!(extract(&no_kind).expect("no kind").is_empty());

        assert!(extract(&source_with(None)).expect("none").is_empty());
        assert!(extract(&source_with(text("  "))).expect("blank").is_empty());
    }

    #[test]
    fn sql_federated_yields_dataverse_resource() {
        let ks = source_with(text(
            r#"{"$kind":"SqlFederatedTableSearchConfiguration","sqlServerName":"org.crm.dynamics.com","sqlDbName":"org_db"}"#,
        ));

        let descriptors = extract(&ks).expect("extract");
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].category, ResourceCategory::Dataverse);
        assert_eq!(descriptors[0].name, "org_db");
        assert_eq!(descriptors[0].url, "org.crm.dynamics.com/org_db");
    }

    #[test]
    fn categorization_rules() {
        assert_eq!(
            categorize("https://contoso-my.sharepoint.com/Documents"),
            ResourceCategory::OneDrive
        );
        assert_eq!(
            categorize("https://files.contoso.com/personal/jdoe/notes"),
            ResourceCategory::OneDrive
        );
        assert_eq!(
            categorize("https://Contoso.SharePoint.com/sites/Finance"),
            ResourceCategory::SharePoint
        );
        assert_eq!(
            categorize("https://docs.contoso.com/sites/finance"),
            ResourceCategory::Unknown
        );
        assert_eq!(categorize(""), ResourceCategory::Unknown);
    }
}
