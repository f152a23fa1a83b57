//! Popup Configuration
//!
//! Timing, text and panel settings for the prompt queue, with support for a
//! TOML configuration file at `~/.config/popup-queue/popups.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [timing]
//! idle_notice_secs = 25
//!
//! [text]
//! wrap_width = 720
//! confirmation = "Press Enter to close."
//! body_font = "Arial Bold"
//! body_font_size = 15.0
//!
//! [panel]
//! width = 750
//! height = 200
//! border = 5
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::FontSpec;

/// Notice shown when a prompt has been on screen for a long time without
/// being answered
pub const DEFAULT_IDLE_NOTICE: &str = "A textbox is currently being shown in the centre of your \
     screen. If you can't see it, the overlay failed to initialize with the renderer and the \
     console won't work either - ask for support.";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tracks where the effective configuration came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[timing]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingToml {
    /// Seconds a prompt may sit unanswered before the idle notice fires
    pub idle_notice_secs: Option<u64>,
}

/// `[text]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextToml {
    /// Wrap width in pixels
    pub wrap_width: Option<f64>,
    /// Closing line appended to acknowledgement prompts
    pub confirmation: Option<String>,
    /// Idle notice text
    pub idle_notice: Option<String>,
    /// Body font family
    pub body_font: Option<String>,
    /// Body font size
    pub body_font_size: Option<f32>,
    /// Title font family
    pub title_font: Option<String>,
    /// Title font size
    pub title_font_size: Option<f32>,
}

/// `[panel]` section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelToml {
    /// Panel body width in pixels
    pub width: Option<f32>,
    /// Panel body height in pixels
    pub height: Option<f32>,
    /// Border thickness around the body
    pub border: Option<f32>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopupToml {
    /// Timing section
    pub timing: TimingToml,
    /// Text section
    pub text: TextToml,
    /// Panel section
    pub panel: PanelToml,
}

// =============================================================================
// Effective Configuration
// =============================================================================

/// Geometry of the prompt panel, in host pixels
#[derive(Clone, Debug, PartialEq)]
pub struct PanelGeometry {
    /// Body width
    pub width: f32,
    /// Body height
    pub height: f32,
    /// Border thickness on each side
    pub border: f32,
    /// Title offset from the border's top-left corner
    pub title_offset: (f32, f32),
    /// Vertical offset of the first body line from the body's top edge
    pub body_offset: f32,
    /// Extra spacing added to the measured line height
    pub line_spacing: f32,
}

impl Default for PanelGeometry {
    fn default() -> Self {
        Self {
            width: 750.0,
            height: 200.0,
            border: 5.0,
            title_offset: (5.0, 5.0),
            body_offset: 35.0,
            line_spacing: 2.0,
        }
    }
}

/// Effective popup configuration
#[derive(Clone, Debug)]
pub struct PopupConfig {
    /// How long a prompt may be presented before the idle notice fires
    pub idle_notice_after: Duration,
    /// Idle notice text
    pub idle_notice_text: String,
    /// Closing line appended to acknowledgement prompts
    pub confirmation_text: String,
    /// Wrap width in pixels
    pub wrap_width: f64,
    /// Font used for body lines
    pub body_font: FontSpec,
    /// Font used for the title
    pub title_font: FontSpec,
    /// Panel geometry
    pub panel: PanelGeometry,
    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for PopupConfig {
    fn default() -> Self {
        Self {
            idle_notice_after: Duration::from_secs(25),
            idle_notice_text: DEFAULT_IDLE_NOTICE.to_string(),
            confirmation_text: "Press Enter to close.".to_string(),
            wrap_width: 720.0,
            body_font: FontSpec::new("Arial Bold", 15.0),
            title_font: FontSpec::new("Aharoni Bold", 18.0),
            panel: PanelGeometry::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl PopupConfig {
    /// Where the effective values came from
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check values that would make prompts unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for non-positive widths or
    /// font sizes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wrap_width <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "wrap_width must be positive, got {}",
                self.wrap_width
            )));
        }
        if self.body_font.size <= 0.0 || self.title_font.size <= 0.0 {
            return Err(ConfigError::ValidationError(
                "font sizes must be positive".to_string(),
            ));
        }
        if self.panel.width <= 0.0 || self.panel.height <= 0.0 {
            return Err(ConfigError::ValidationError(
                "panel dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/popup-queue/popups.toml` when a config
/// directory is known.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("popup-queue").join("popups.toml"))
}

/// Load configuration from the default path, environment and defaults
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed,
/// or if the resulting values are invalid.
pub fn load_config() -> Result<PopupConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// A missing file is not an error; defaults and environment are used.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// resulting values are invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<PopupConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// [`load_config_from_path`] with environment lookups going through `env`
fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<PopupConfig, ConfigError> {
    let mut config = PopupConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: PopupToml = toml::from_str(&content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(path = %config_path.display(), "Loaded popup configuration from file");
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Popup config file not found, using defaults"
            );
        }
    }

    apply_env_config_from(&mut config, env);
    config.validate()?;
    Ok(config)
}

fn apply_toml_config(config: &mut PopupConfig, toml: &PopupToml) {
    if let Some(secs) = toml.timing.idle_notice_secs {
        config.idle_notice_after = Duration::from_secs(secs);
    }

    if let Some(width) = toml.text.wrap_width {
        config.wrap_width = width;
    }
    if let Some(ref text) = toml.text.confirmation {
        config.confirmation_text.clone_from(text);
    }
    if let Some(ref text) = toml.text.idle_notice {
        config.idle_notice_text.clone_from(text);
    }
    if let Some(ref family) = toml.text.body_font {
        config.body_font.family.clone_from(family);
    }
    if let Some(size) = toml.text.body_font_size {
        config.body_font.size = size;
    }
    if let Some(ref family) = toml.text.title_font {
        config.title_font.family.clone_from(family);
    }
    if let Some(size) = toml.text.title_font_size {
        config.title_font.size = size;
    }

    if let Some(width) = toml.panel.width {
        config.panel.width = width;
    }
    if let Some(height) = toml.panel.height {
        config.panel.height = height;
    }
    if let Some(border) = toml.panel.border {
        config.panel.border = border;
    }
}

/// Apply overrides found through `lookup`; unparsable numbers are ignored
fn apply_env_config_from(config: &mut PopupConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(secs) = lookup("POPUP_IDLE_NOTICE_SECS") {
        match secs.parse::<u64>() {
            Ok(secs) => {
                config.idle_notice_after = Duration::from_secs(secs);
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(value = %secs, error = %e, "Ignoring POPUP_IDLE_NOTICE_SECS"),
        }
    }
    if let Some(width) = lookup("POPUP_WRAP_WIDTH") {
        match width.parse::<f64>() {
            Ok(width) => {
                config.wrap_width = width;
                config.source = ConfigSource::Env;
            }
            Err(e) => tracing::warn!(value = %width, error = %e, "Ignoring POPUP_WRAP_WIDTH"),
        }
    }
    if let Some(text) = lookup("POPUP_CONFIRMATION_TEXT") {
        config.confirmation_text = text;
        config.source = ConfigSource::Env;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PopupConfig::default();
        assert_eq!(config.idle_notice_after, Duration::from_secs(25));
        assert_eq!(config.confirmation_text, "Press Enter to close.");
        assert_eq!(config.wrap_width, 720.0);
        assert_eq!(config.body_font, FontSpec::new("Arial Bold", 15.0));
        assert_eq!(config.title_font, FontSpec::new("Aharoni Bold", 18.0));
        assert_eq!(config.panel.width, 750.0);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_with_env(Some(dir.path().join("absent.toml")), no_env).unwrap();
        assert!(config.config_file_path.is_none());
        assert_eq!(config.panel, PanelGeometry::default());
    }

    #[test]
    fn test_file_values_applied() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[timing]
idle_notice_secs = 40

[text]
body_font = "Consolas"
body_font_size = 12.0

[panel]
width = 600.0
height = 180.0
"#
        )
        .unwrap();

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.idle_notice_after, Duration::from_secs(40));
        assert_eq!(config.body_font, FontSpec::new("Consolas", 12.0));
        assert_eq!(config.panel.width, 600.0);
        assert_eq!(config.panel.height, 180.0);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing\nidle_notice_secs = ").unwrap();

        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_validation_rejects_zero_width() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[text]\nwrap_width = 0.0").unwrap();

        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = load_config_with_env(
            None,
            env_from(&[
                ("POPUP_IDLE_NOTICE_SECS", "5"),
                ("POPUP_WRAP_WIDTH", "400"),
                ("POPUP_CONFIRMATION_TEXT", "Press Enter."),
            ]),
        )
        .unwrap();
        assert_eq!(config.idle_notice_after, Duration::from_secs(5));
        assert_eq!(config.wrap_width, 400.0);
        assert_eq!(config.confirmation_text, "Press Enter.");
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_env_beats_file_beats_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nidle_notice_secs = 40\n\n[text]\nwrap_width = 500.0").unwrap();

        let config = load_config_with_env(
            Some(file.path().to_path_buf()),
            env_from(&[("POPUP_IDLE_NOTICE_SECS", "10")]),
        )
        .unwrap();
        assert_eq!(config.idle_notice_after, Duration::from_secs(10));
        assert_eq!(config.wrap_width, 500.0);
        assert_eq!(config.confirmation_text, "Press Enter to close.");
        assert_eq!(config.source(), ConfigSource::Env);
    }

    #[test]
    fn test_invalid_env_numbers_fall_back() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nidle_notice_secs = 40").unwrap();

        let config = load_config_with_env(
            Some(file.path().to_path_buf()),
            env_from(&[
                ("POPUP_IDLE_NOTICE_SECS", "soon"),
                ("POPUP_WRAP_WIDTH", "wide"),
            ]),
        )
        .unwrap();
        assert_eq!(config.idle_notice_after, Duration::from_secs(40));
        assert_eq!(config.wrap_width, 720.0);
        assert_eq!(config.source(), ConfigSource::File);
    }

    #[test]
    fn test_panel_border_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[panel]\nwidth = 750\nheight = 200\nborder = 8").unwrap();

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();
        assert_eq!(config.panel.border, 8.0);
    }
}
