//! Shared types, error model, and configuration for the Qanary GERBIL adapter.
//!
//! This crate is the foundation depended on by all other adapter crates.
//! It provides:
//! - [`GerbilError`]: the unified error type
//! - Domain types ([`InvocationDescriptor`], [`ResultRecord`], [`BenchmarkResponse`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PipelineConfig, ServerConfig, StoreConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{GerbilError, Result};
pub use types::{
    BenchmarkQuestion, BenchmarkResponse, DEFAULT_LANGUAGE, InvocationDescriptor, QueryObject,
    QuestionString, ResultRecord, sparql_iri,
};
