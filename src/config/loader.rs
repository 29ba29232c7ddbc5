//! Configuration loading and discovery for `framelog.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::FramelogConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File name searched for during discovery
pub const CONFIG_FILE: &str = "framelog.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse framelog.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override character size
    pub font_size: Option<u32>,
    /// Override canvas color
    pub background: Option<String>,
    /// Override frame rate
    pub fps: Option<f64>,
    /// Override font file
    pub font: Option<PathBuf>,
}

/// Find framelog.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for framelog.toml
/// 2. Check XDG_CONFIG_HOME/framelog/framelog.toml (or ~/.config/framelog/framelog.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find framelog.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("framelog").join(CONFIG_FILE);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find framelog.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration.
///
/// If a path is provided, loads from that file (which must exist).
/// Otherwise uses [`find_config`], falling back to defaults when nothing
/// is found.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("runs/framelog.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<FramelogConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<FramelogConfig, ConfigError> {
    debug!(config = %path.display(), "loading config");
    let contents = fs::read_to_string(path)?;
    let mut config: FramelogConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    if let (Some(font), Some(root)) = (config.render.font.take(), config_root(path)) {
        config.render.font = Some(resolve_path(root, &font));
    }

    Ok(config)
}

/// Configuration used when no framelog.toml is found.
pub fn default_config() -> FramelogConfig {
    FramelogConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut FramelogConfig, overrides: &CliOverrides) {
    if let Some(font_size) = overrides.font_size {
        config.render.font_size = font_size;
    }

    if let Some(ref background) = overrides.background {
        config.render.background = background.clone();
    }

    if let Some(fps) = overrides.fps {
        config.export.fps = fps;
    }

    if let Some(ref font) = overrides.font {
        config.render.font = Some(font.clone());
    }
}

/// Directory containing a config file.
pub fn config_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the config directory.
///
/// If the path is absolute, returns it unchanged.
pub fn resolve_path(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
