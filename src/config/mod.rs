//! Configuration module for Linkcal
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with environment variables layered on top.
//!
//! # Example
//!
//! ```no_run
//! use linkcal::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("linkcal.toml")).unwrap();
//! println!("Model: {}", config.model.name);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BotConfig, CalendarConfig, Config, FetchConfig, HostRuleEntry, ModelConfig, ServerConfig,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, load_from_env,
};
pub use validation::validate;
