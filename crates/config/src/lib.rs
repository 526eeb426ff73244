//! Configuration loading and env substitution.
//!
//! Config file: `moqlink.toml`, searched in `./` then `~/.config/moqlink/`.
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        AdminConfig, BrokerSection, HeartbeatConfig, HostConfig, MoqlinkConfig, PluginConfig,
    },
};
