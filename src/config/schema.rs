//! Configuration schema types for `framelog.toml`
//!
//! Defines the structure and validation rules for viewer configuration.

use crate::color::parse_hex_color;
use crate::raster::{MAX_FONT_SIZE, MAX_PADDING};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default log verbosity when `RUST_LOG` is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

/// Frame rasterization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Character size in pixels
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// Canvas color, `#rgb` or `#rrggbb`
    #[serde(default = "default_background")]
    pub background: String,
    /// Horizontal and vertical padding [x, y]
    #[serde(default = "default_padding")]
    pub padding: [u32; 2],
    /// TrueType font file; relative paths resolve against the config file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            background: default_background(),
            padding: default_padding(),
            font: None,
        }
    }
}

fn default_font_size() -> u32 {
    14
}

fn default_background() -> String {
    "#111111".to_string()
}

fn default_padding() -> [u32; 2] {
    [8, 8]
}

/// Animation export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Frames per second for GIF export
    #[serde(default = "default_fps")]
    pub fps: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

fn default_fps() -> f64 {
    2.0
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

/// Complete `framelog.toml` contents; every section is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramelogConfig {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "render.font_size")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "framelog.toml: '{}' {}", self.field, self.message)
    }
}

impl FramelogConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if !(1..=MAX_FONT_SIZE).contains(&self.render.font_size) {
            errors.push(ConfigValidationError {
                field: "render.font_size".to_string(),
                message: format!("must be between 1 and {}", MAX_FONT_SIZE),
            });
        }

        if self.render.padding.iter().any(|p| *p > MAX_PADDING) {
            errors.push(ConfigValidationError {
                field: "render.padding".to_string(),
                message: format!("must not exceed {} pixels", MAX_PADDING),
            });
        }

        if let Err(e) = parse_hex_color(&self.render.background) {
            errors.push(ConfigValidationError {
                field: "render.background".to_string(),
                message: format!("is not a valid color: {}", e),
            });
        }

        if !(self.export.fps.is_finite() && self.export.fps > 0.0) {
            errors.push(ConfigValidationError {
                field: "export.fps".to_string(),
                message: "must be a positive number".to_string(),
            });
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Padding as an `(x, y)` pair
    pub fn padding(&self) -> (u32, u32) {
        (self.render.padding[0], self.render.padding[1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_parse() {
        let config: FramelogConfig = toml::from_str("").unwrap();
        assert_eq!(config, FramelogConfig::default());
        assert_eq!(config.render.font_size, 14);
        assert_eq!(config.render.background, "#111111");
        assert_eq!(config.padding(), (8, 8));
        assert_eq!(config.export.fps, 2.0);
        assert_eq!(config.log.level, LogLevel::Warn);
        assert!(config.is_valid());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r##"
[render]
font_size = 18
background = "#000"
padding = [4, 6]
font = "fonts/Mono.ttf"

[export]
fps = 5.5

[log]
level = "debug"
"##;
        let config: FramelogConfig = toml::from_str(toml).unwrap();

        assert_eq!(config.render.font_size, 18);
        assert_eq!(config.render.background, "#000");
        assert_eq!(config.padding(), (4, 6));
        assert_eq!(config.render.font, Some(PathBuf::from("fonts/Mono.ttf")));
        assert_eq!(config.export.fps, 5.5);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert!(config.is_valid());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let toml = r#"
[render]
font_size = 20
"#;
        let config: FramelogConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.render.font_size, 20);
        assert_eq!(config.render.background, "#111111");
        assert_eq!(config.render.font, None);
    }

    #[test]
    fn test_validation_zero_font_size() {
        let config: FramelogConfig = toml::from_str("[render]\nfont_size = 0\n").unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "render.font_size"));
    }

    #[test]
    fn test_validation_oversized_font_size() {
        let config: FramelogConfig = toml::from_str("[render]\nfont_size = 4294967295\n").unwrap();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "framelog.toml: 'render.font_size' must be between 1 and 512"
        );

        let config: FramelogConfig = toml::from_str("[render]\nfont_size = 512\n").unwrap();
        assert!(config.is_valid());
    }

    #[test]
    fn test_validation_oversized_padding() {
        let config: FramelogConfig =
            toml::from_str("[render]\npadding = [8, 4000000000]\n").unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "render.padding"));
    }

    #[test]
    fn test_validation_bad_background() {
        let config: FramelogConfig =
            toml::from_str("[render]\nbackground = \"dark\"\n").unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "render.background"));
    }

    #[test]
    fn test_validation_non_positive_fps() {
        let config: FramelogConfig = toml::from_str("[export]\nfps = 0.0\n").unwrap();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "export.fps"));
        assert_eq!(
            errors[0].to_string(),
            "framelog.toml: 'export.fps' must be a positive number"
        );
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        let result: Result<FramelogConfig, _> = toml::from_str("[log]\nlevel = \"loud\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_directive() {
        assert_eq!(LogLevel::default().as_str(), "warn");
        assert_eq!(LogLevel::Off.as_str(), "off");
    }
}
