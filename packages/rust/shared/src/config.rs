//! Application configuration for AgentMap.
//!
//! User config lives at `~/.agentmap/agentmap.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AgentMapError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "agentmap.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".agentmap";

// ---------------------------------------------------------------------------
// Config structs (matching agentmap.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Dataverse connection settings.
    #[serde(default)]
    pub dataverse: DataverseConfig,

    /// Export settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// `[dataverse]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataverseConfig {
    /// Environment URL, e.g. `https://yourorg.crm.dynamics.com`.
    #[serde(default)]
    pub url: String,

    /// Web API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Name of the env var holding a bearer token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent per-bot component fetches.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DataverseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_version: default_api_version(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_api_version() -> String {
    "v9.2".into()
}
fn default_token_env() -> String {
    "DATAVERSE_TOKEN".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_concurrency() -> usize {
    4
}

impl DataverseConfig {
    /// Parse the configured environment URL, adding `https://` when no
    /// scheme is given and dropping any trailing slash.
    pub fn base_url(&self) -> Result<Url> {
        let raw = self.url.trim().trim_end_matches('/');
        if raw.is_empty() {
            return Err(AgentMapError::config("dataverse.url is not set"));
        }

        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        Url::parse(&with_scheme)
            .map_err(|e| AgentMapError::config(format!("invalid dataverse.url '{raw}': {e}")))
    }
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where the JSON export is written.
    #[serde(default = "default_output_path")]
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
        }
    }
}

fn default_output_path() -> String {
    "agent_mapping_results.json".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.agentmap/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AgentMapError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.agentmap/agentmap.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AgentMapError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AgentMapError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    write_default_config(&path)?;
    Ok(path)
}

/// Write a default config to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| AgentMapError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AgentMapError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| AgentMapError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Check that the Dataverse URL parses and the token env var is set.
/// Returns the bearer token.
pub fn validate_dataverse(config: &AppConfig) -> Result<String> {
    config.dataverse.base_url()?;

    let var_name = &config.dataverse.token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(AgentMapError::config(format!(
            "Dataverse bearer token not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("api_version"));
        assert!(toml_str.contains("DATAVERSE_TOKEN"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.dataverse.api_version, "v9.2");
        assert_eq!(parsed.dataverse.concurrency, 4);
        assert_eq!(parsed.output.path, "agent_mapping_results.json");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[dataverse]
url = "contoso.crm.dynamics.com"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.dataverse.timeout_secs, 30);
        assert_eq!(config.dataverse.token_env, "DATAVERSE_TOKEN");
        let url = config.dataverse.base_url().expect("base url");
        assert_eq!(url.as_str(), "https://contoso.crm.dynamics.com/");
    }

    #[test]
    fn base_url_strips_trailing_slash_and_keeps_scheme() {
        let config = DataverseConfig {
            url: "http://localhost:8080/".into(),
            ..DataverseConfig::default()
        };
        let url = config.base_url().expect("base url");
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn missing_url_is_config_error() {
        let err = DataverseConfig::default().base_url().unwrap_err();
        assert!(err.to_string().contains("dataverse.url"));
    }

    #[test]
    fn token_validation() {
        let mut config = AppConfig::default();
        config.dataverse.url = "https://contoso.crm.dynamics.com".into();
        // Use a unique env var name to avoid interfering with other tests
        config.dataverse.token_env = "AGENTMAP_TEST_NONEXISTENT_TOKEN_12345".into();
        let result = validate_dataverse(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("token not found"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("agentmap.toml");
        write_default_config(&path).expect("write default");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.dataverse.api_version, "v9.2");
    }
}
