//! Configuration file loading for nova-tools
//!
//! This module handles file I/O and merging of configuration from multiple
//! sources. The priority order (highest to lowest):
//!
//! 1. `NOVA_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./nova.toml` or `./.nova.toml`
//! 4. Global: `<config_dir>/nova/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileMetricsConfig, FileToolsConfig, default_metrics_path,
};
pub use loader::ConfigLoader;
