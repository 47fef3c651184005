//! Fleet config path resolution
//!
//! # Resolution Priority
//!
//! 1. `--config` flag or `LUME_FLEET_CONFIG` environment variable
//! 2. `fleet.yml` in the current directory, if present
//! 3. `XDG_CONFIG_HOME/lume-fleet/fleet.yml` (if set)
//! 4. `~/.config/lume-fleet/fleet.yml`
//!
//! When nothing exists the local `fleet.yml` is returned so the load error
//! names the path most users expect.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the fleet config file
pub const CONFIG_FILE: &str = "fleet.yml";

/// Directory name under the user config dir
const APP_DIR: &str = "lume-fleet";

/// Resolve the fleet config path.
pub fn config_path(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand(path);
        log::debug!("Using config from flag/env: {}", path.display());
        return Ok(path);
    }

    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let user_dir = user_config_dir(std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from));
    Ok(discover(&cwd, user_dir.as_deref()))
}

/// Pick the first existing candidate, falling back to `cwd/fleet.yml`.
fn discover(cwd: &Path, user_dir: Option<&Path>) -> PathBuf {
    let local = cwd.join(CONFIG_FILE);
    if local.exists() {
        log::debug!("Using local config: {}", local.display());
        return local;
    }

    if let Some(dir) = user_dir {
        let user = dir.join(CONFIG_FILE);
        if user.exists() {
            log::debug!("Using user config: {}", user.display());
            return user;
        }
    }

    local
}

/// `<XDG_CONFIG_HOME or ~/.config>/lume-fleet`
fn user_config_dir(xdg_config_home: Option<PathBuf>) -> Option<PathBuf> {
    xdg_config_home
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .map(|base| base.join(APP_DIR))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
