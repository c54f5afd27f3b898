//! AgentMap CLI: maps Copilot Studio bots to the OneDrive/SharePoint
//! locations their knowledge sources can search.
//!
//! Relationship chain: bot → component → reference (GUID or name) →
//! knowledge source → URL.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
