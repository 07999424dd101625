//! Configuration for the Myko client and CLI.
//!
//! A single TOML file (`myko.toml`) with three optional sections:
//! - `[client]`: base URL, timeouts, connection limit
//! - `[retry]`: attempts and backoff
//! - `[auth]`: username, password source, identity provider endpoints

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, CONFIG_FILE, LoadedConfig, load_config, load_config_file, save_config,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
