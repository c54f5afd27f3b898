//! Minimal Dataverse Web API client for the three entity sets AgentMap reads.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use agentmap_shared::{AgentMapError, Bot, BotComponent, DataverseConfig, KnowledgeSource, Result};

/// User-Agent string for Dataverse requests.
const USER_AGENT: &str = concat!("AgentMap/", env!("CARGO_PKG_VERSION"));

/// Upper bound on followed `@odata.nextLink` pages per collection.
const MAX_PAGES: usize = 1000;

/// Columns needed from `dvtablesearchs`.
const KNOWLEDGE_SOURCE_SELECT: &str = "dvtablesearchid,knowledgeconfig,name";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection settings for [`DataverseClient`].
#[derive(Debug, Clone)]
pub struct DataverseOptions {
    /// Environment root, e.g. `https://yourorg.crm.dynamics.com/`.
    pub base_url: Url,
    /// Web API version segment, e.g. `v9.2`.
    pub api_version: String,
    /// Pre-acquired bearer token.
    pub token: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl DataverseOptions {
    /// Build options from the `[dataverse]` config section and a token.
    pub fn from_config(config: &DataverseConfig, token: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url()?,
            api_version: config.api_version.clone(),
            token: token.into(),
            timeout_secs: config.timeout_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// One page of an OData collection response.
#[derive(Debug, Deserialize)]
struct ODataPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

/// Read-only client for bots, bot components, and knowledge sources.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct DataverseClient {
    http: Client,
    api_root: String,
    token: String,
}

impl DataverseClient {
    pub fn new(options: &DataverseOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(options.timeout_secs))
            .build()
            .map_err(|e| AgentMapError::Network(format!("failed to build HTTP client: {e}")))?;

        let root = options.base_url.as_str().trim_end_matches('/');
        let api_root = format!("{root}/api/data/{}", options.api_version);

        Ok(Self {
            http,
            api_root,
            token: options.token.clone(),
        })
    }

    /// All bots (`GET bots`).
    #[instrument(skip(self))]
    pub async fn get_bots(&self) -> Result<Vec<Bot>> {
        self.get_collection("bots").await
    }

    /// The knowledge-source catalog (`GET dvtablesearchs`).
    #[instrument(skip(self))]
    pub async fn get_knowledge_sources(&self) -> Result<Vec<KnowledgeSource>> {
        self.get_collection(&format!("dvtablesearchs?$select={KNOWLEDGE_SOURCE_SELECT}"))
            .await
    }

    /// Components belonging to one bot.
    #[instrument(skip(self))]
    pub async fn get_bot_components(&self, bot_id: &str) -> Result<Vec<BotComponent>> {
        self.get_collection(&format!(
            "botcomponents?$filter=_parentbotid_value eq {bot_id}"
        ))
        .await
    }

    /// Fetch every page of an entity-set query, following `@odata.nextLink`.
    async fn get_collection<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let mut url = format!("{}/{endpoint}", self.api_root);
        let mut rows = Vec::new();

        for page_no in 1..=MAX_PAGES {
            let page: ODataPage<T> = self.get_json(&url).await?;
            debug!(endpoint, page_no, rows = page.value.len(), "fetched page");
            rows.extend(page.value);

            match page.next_link {
                Some(next) => url = next,
                None => return Ok(rows),
            }
        }

        Err(AgentMapError::validation(format!(
            "{endpoint}: more than {MAX_PAGES} pages, giving up"
        )))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .header("OData-MaxVersion", "4.0")
            .header("OData-Version", "4.0")
            .send()
            .await
            .map_err(|e| AgentMapError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentMapError::Network(format!(
                "{url}: HTTP {status}: {}",
                body.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AgentMapError::Network(format!("{url}: failed to read body: {e}")))?;

        serde_json::from_str(&body)
            .map_err(|e| AgentMapError::parse(format!("{url}: unexpected response shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DataverseClient {
        let options = DataverseOptions {
            base_url: Url::parse(&server.uri()).unwrap(),
            api_version: "v9.2".into(),
            token: "test-token".into(),
            timeout_secs: 5,
        };
        DataverseClient::new(&options).unwrap()
    }

    #[test]
    fn options_from_config() {
        let config = DataverseConfig {
            url: "contoso.crm.dynamics.com/".into(),
            ..DataverseConfig::default()
        };
        let options = DataverseOptions::from_config(&config, "tok").unwrap();
        assert_eq!(options.base_url.as_str(), "https://contoso.crm.dynamics.com/");

        let client = DataverseClient::new(&options).unwrap();
        assert_eq!(client.api_root, "https://contoso.crm.dynamics.com/api/data/v9.2");
    }

    #[tokio::test]
    async fn fetches_bots_with_odata_headers() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/bots"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("OData-Version", "4.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    { "botid": "b-1", "name": "HR Helper", "createdon": "2024-05-01T10:00:00Z" },
                    { "botid": "b-2", "name": null }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let bots = client_for(&server).get_bots().await.unwrap();
        assert_eq!(bots.len(), 2);
        assert_eq!(bots[0].display_name(), "HR Helper");
        assert_eq!(bots[1].display_name(), "Unnamed Bot");
    }

    #[tokio::test]
    async fn follows_next_link() {
        let server = MockServer::start().await;
        let next = format!("{}/api/data/v9.2/dvtablesearchs?$skiptoken=page2", server.uri());

        // More specific mock first so the follow-up request hits it.
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/dvtablesearchs"))
            .and(query_param("$skiptoken", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "dvtablesearchid": "ks-2", "name": "Second" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/dvtablesearchs"))
            .and(query_param("$select", KNOWLEDGE_SOURCE_SELECT))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "dvtablesearchid": "ks-1", "name": "First", "knowledgeconfig": "{}" }],
                "@odata.nextLink": next
            })))
            .mount(&server)
            .await;

        let sources = client_for(&server).get_knowledge_sources().await.unwrap();
        let ids: Vec<_> = sources.iter().map(|s| s.id_or_na()).collect();
        assert_eq!(ids, vec!["ks-1", "ks-2"]);
    }

    #[tokio::test]
    async fn filters_components_by_parent_bot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/botcomponents"))
            .and(query_param("$filter", "_parentbotid_value eq b-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{
                    "botcomponentid": "c-1",
                    "componenttype": 16,
                    "name": "Knowledge",
                    "data": "skillConfiguration: Docs",
                    "_parentbotid_value": "b-1"
                }]
            })))
            .mount(&server)
            .await;

        let components = client_for(&server).get_bot_components("b-1").await.unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].parent_bot_id.as_deref(), Some("b-1"));
    }

    #[tokio::test]
    async fn http_error_is_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/bots"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_bots().await.unwrap_err();
        assert!(matches!(
            err,
            AgentMapError::Network(ref msg) if msg.contains("401") && msg.contains("token expired")
        ));
    }

    #[tokio::test]
    async fn unexpected_body_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/bots"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_bots().await.unwrap_err();
        assert!(matches!(err, AgentMapError::Parse { .. }));
    }
}
