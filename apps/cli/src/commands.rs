//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use agentmap_core::{KnowledgeSourceIndex, catalog_stats, export_json, render_summary, resolve_all};
use agentmap_dataverse::{
    DataverseClient, DataverseOptions, FetchProgress, Inputs, fetch_inputs, load_snapshot,
    save_snapshot,
};
use agentmap_shared::{
    AppConfig, Bot, config_file_path, init_config, load_config, load_config_from,
    validate_dataverse, write_default_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// AgentMap: find which OneDrive/SharePoint locations each bot can search.
#[derive(Parser)]
#[command(
    name = "agentmap",
    version,
    about = "Map Copilot Studio bots to their OneDrive/SharePoint knowledge sources.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.agentmap/agentmap.toml).
    #[arg(long, global = true, env = "AGENTMAP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Resolve every bot to its knowledge-source resources.
    Map {
        /// Read inputs from a snapshot file instead of Dataverse.
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Where to write the JSON results (defaults to output.path).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the fetched inputs as a snapshot.
        #[arg(long)]
        save_snapshot: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "agentmap=info",
        1 => "agentmap=debug",
        _ => "agentmap=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Map {
            snapshot,
            output,
            save_snapshot,
        } => {
            cmd_map(
                config_path,
                snapshot.as_deref(),
                output.as_deref(),
                save_snapshot.as_deref(),
            )
            .await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(config_path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    })
}

// ---------------------------------------------------------------------------
// map
// ---------------------------------------------------------------------------

async fn cmd_map(
    config_path: Option<&Path>,
    snapshot: Option<&Path>,
    output: Option<&Path>,
    save_to: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(config_path)?;

    let inputs = match snapshot {
        Some(path) => load_snapshot(path)?,
        None => fetch_from_dataverse(&config).await?,
    };

    if let Some(path) = save_to {
        save_snapshot(&inputs, path)?;
        info!(path = %path.display(), "snapshot saved");
    }

    let stats = catalog_stats(&inputs.knowledge_sources);
    info!(
        total = stats.total,
        drive_backed = stats.drive_backed,
        other = stats.other(),
        "knowledge source catalog"
    );

    let index = KnowledgeSourceIndex::build(&inputs.knowledge_sources);
    let mut resolution = resolve_all(&inputs.checked_bots(), &inputs.components_by_bot, &index);
    for failure in &inputs.fetch_failures {
        let bot = inputs
            .bots
            .iter()
            .find(|b| b.id == failure.bot_id)
            .cloned()
            .unwrap_or_else(|| Bot {
                id: failure.bot_id.clone(),
                name: None,
                created_on: None,
                modified_on: None,
            });
        resolution.mark_not_checked(&bot, &failure.error);
    }

    println!("{}", render_summary(&resolution));

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.output.path));
    export_json(&resolution, &output)?;

    println!("  Results written to {}", output.display());
    Ok(())
}

async fn fetch_from_dataverse(config: &AppConfig) -> Result<Inputs> {
    let token = validate_dataverse(config)?;
    let options = DataverseOptions::from_config(&config.dataverse, token)?;
    let client = DataverseClient::new(&options)?;

    info!(url = %options.base_url, "fetching from Dataverse");

    let reporter = CliProgress::new();
    let inputs = fetch_inputs(&client, config.dataverse.concurrency, &reporter).await?;
    reporter.finish();

    Ok(inputs)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl FetchProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn components_fetched(&self, bot_id: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching components [{current}/{total}] {bot_id}"));
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init(config_path: Option<&Path>) -> Result<()> {
    let path = match config_path {
        Some(p) => {
            if p.exists() {
                return Err(eyre!("config file already exists at {}", p.display()));
            }
            write_default_config(p)?;
            p.to_path_buf()
        }
        None => {
            let default_path = config_file_path()?;
            if default_path.exists() {
                return Err(eyre!(
                    "config file already exists at {}",
                    default_path.display()
                ));
            }
            init_config()?
        }
    };

    println!("  Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}
