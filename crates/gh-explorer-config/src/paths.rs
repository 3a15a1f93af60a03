//! Configuration and data directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/gh-explorer/`, `~/.cache/gh-explorer/`
//! - macOS: `~/Library/Application Support/gh-explorer/`, `~/Library/Caches/gh-explorer/`
//! - Windows: `%APPDATA%\gh-explorer\`, `%LOCALAPPDATA%\gh-explorer\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "gh-explorer";

/// Get the application config directory, creating it if needed
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory {:?}", dir))?;
    Ok(dir)
}

/// Get the application cache directory, creating it if needed
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create cache directory {:?}", dir))?;
    Ok(dir)
}

/// Durable credential token store
pub fn token_store_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("tokens.json"))
}

/// Per-login session values such as the CSRF token
pub fn session_store_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join("session.json"))
}

/// Directory receiving log files
pub fn log_dir() -> Result<PathBuf> {
    cache_dir()
}
