use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MoqlinkConfig};

const CONFIG_FILENAME: &str = "moqlink.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> anyhow::Result<MoqlinkConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. explicit `path` override, when given
/// 2. `./moqlink.toml` (project-local)
/// 3. `~/.config/moqlink/moqlink.toml` (user-global)
///
/// Returns `MoqlinkConfig::default()` if no config file is found.
pub fn discover_and_load(path: Option<&Path>) -> MoqlinkConfig {
    let candidate = path.map(Path::to_path_buf).or_else(find_config_file);
    if let Some(path) = candidate {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    MoqlinkConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }

    // User-global: ~/.config/moqlink/
    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/moqlink/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "moqlink").map(|d| d.config_dir().to_path_buf())
}
