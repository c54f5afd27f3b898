//! Dataverse fetch layer for AgentMap.
//!
//! Reads bots, the knowledge-source catalog (`dvtablesearchs`), and each
//! bot's components over the Dataverse Web API using a caller-supplied
//! bearer token. Token acquisition, retries, and throttling are left to the
//! caller. Results can be saved as a snapshot and replayed offline.

mod client;
mod snapshot;

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use agentmap_shared::{AgentMapError, Result};

pub use client::{DataverseClient, DataverseOptions};
pub use snapshot::{FetchFailure, Inputs, load_snapshot, save_snapshot};

/// Progress callback for fetch status.
pub trait FetchProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each bot's components arrive (or fail).
    fn components_fetched(&self, bot_id: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn components_fetched(&self, _bot_id: &str, _current: usize, _total: usize) {}
}

/// Fetch everything the resolution engine needs.
///
/// Bots and the catalog are fetched together; component fetches run one
/// task per bot, at most `concurrency` at a time. A failed component fetch
/// is recorded in [`Inputs::fetch_failures`] and does not abort the run.
#[instrument(skip_all, fields(concurrency = concurrency))]
pub async fn fetch_inputs(
    client: &DataverseClient,
    concurrency: usize,
    progress: &dyn FetchProgress,
) -> Result<Inputs> {
    progress.phase("Fetching bots and knowledge sources");
    let (bots, knowledge_sources) =
        tokio::try_join!(client.get_bots(), client.get_knowledge_sources())?;

    info!(
        bots = bots.len(),
        sources = knowledge_sources.len(),
        "catalog fetched"
    );

    progress.phase("Fetching bot components");
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for bot in &bots {
        let client = client.clone();
        let semaphore = Arc::clone(&semaphore);
        let bot_id = bot.id.clone();
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let result = client.get_bot_components(&bot_id).await;
            (bot_id, result)
        });
    }

    let mut inputs = Inputs {
        bots,
        knowledge_sources,
        ..Inputs::default()
    };
    let total = inputs.bots.len();
    let mut done = 0;

    while let Some(joined) = tasks.join_next().await {
        let (bot_id, result) = joined
            .map_err(|e| AgentMapError::Network(format!("component fetch task failed: {e}")))?;
        done += 1;
        progress.components_fetched(&bot_id, done, total);

        match result {
            Ok(components) => {
                inputs.components_by_bot.insert(bot_id, components);
            }
            Err(e) => {
                warn!(bot_id = %bot_id, error = %e, "failed to fetch bot components");
                inputs.fetch_failures.push(FetchFailure {
                    bot_id,
                    error: e.to_string(),
                });
            }
        }
    }

    inputs.fetch_failures.sort_by(|a, b| a.bot_id.cmp(&b.bot_id));
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn fetches_all_inputs_and_isolates_failures() {
        let server = MockServer::start().await;

        mount_json(
            &server,
            "/api/data/v9.2/bots",
            serde_json::json!({ "value": [{ "botid": "b-1" }, { "botid": "b-2" }] }),
        )
        .await;
        mount_json(
            &server,
            "/api/data/v9.2/dvtablesearchs",
            serde_json::json!({ "value": [{ "dvtablesearchid": "ks-1", "name": "Docs" }] }),
        )
        .await;

        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/botcomponents"))
            .and(query_param("$filter", "_parentbotid_value eq b-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "botcomponentid": "c-1", "data": "skillConfiguration: Docs" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/data/v9.2/botcomponents"))
            .and(query_param("$filter", "_parentbotid_value eq b-2"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let options = DataverseOptions {
            base_url: Url::parse(&server.uri()).unwrap(),
            api_version: "v9.2".into(),
            token: "test-token".into(),
            timeout_secs: 5,
        };
        let client = DataverseClient::new(&options).unwrap();

        let inputs = fetch_inputs(&client, 2, &SilentProgress).await.unwrap();

        assert_eq!(inputs.bots.len(), 2);
        assert_eq!(inputs.knowledge_sources.len(), 1);
        assert_eq!(inputs.components_by_bot["b-1"].len(), 1);
        assert!(!inputs.components_by_bot.contains_key("b-2"));
        assert_eq!(inputs.fetch_failures.len(), 1);
        assert_eq!(inputs.fetch_failures[0].bot_id, "b-2");
        assert_eq!(inputs.checked_bots().len(), 1);
    }
}
