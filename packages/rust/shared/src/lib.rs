//! Shared types, error model, and configuration for AgentMap.
//!
//! This crate is the foundation depended on by all other AgentMap crates.
//! It provides:
//! - [`AgentMapError`], the unified error type
//! - Domain types ([`Bot`], [`BotComponent`], [`KnowledgeSource`], [`ResourceDescriptor`])
//! - Configuration ([`AppConfig`], [`DataverseConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DataverseConfig, OutputConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, validate_dataverse, write_default_config,
};
pub use error::{AgentMapError, Result};
pub use types::{
    Bot, BotComponent, ComponentsByBot, KnowledgeSource, ResourceCategory, ResourceDescriptor,
};
