//! qrstudio runtime configuration handling

use crate::compositor::LogoOptions;
use crate::error::{Error, Result};
use crate::qr::{ErrorCorrection, RenderOptions};
use crate::template::{self, is_hex_color};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration structure persisted to disk or environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QrstudioConfig {
    /// Raster size, quiet zone and error correction
    pub render: RenderOptions,
    /// Regeneration and export behavior
    pub generation: GenerationOptions,
    /// Logo overlay geometry
    pub logo: LogoOptions,
    /// Logging configuration
    pub logging: LoggingOptions,
}

impl QrstudioConfig {
    /// Load configuration from an explicit path or fall back to discovered defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit_path {
            Self::from_file(path)?
        } else if let Some(path) = Self::discover_file()? {
            tracing::info!("Using configuration file: {}", path.display());
            Self::from_file(&path)?
        } else {
            tracing::debug!("No qrstudio.toml / qrstudio.yaml found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Attempt to locate a configuration file in common locations.
    fn discover_file() -> Result<Option<PathBuf>> {
        let cwd =
            env::current_dir().map_err(|e| Error::Config(format!("Failed to read cwd: {e}")))?;
        for candidate in ["qrstudio.toml", "qrstudio.yaml", "qrstudio.yml"] {
            let path = cwd.join(candidate);
            if path.exists() {
                return Ok(Some(path));
            }
        }

        if let Some(xdg_config) = env::var_os("XDG_CONFIG_HOME") {
            let base = PathBuf::from(xdg_config).join("qrstudio");
            for candidate in ["config.toml", "config.yaml"] {
                let path = base.join(candidate);
                if path.exists() {
                    return Ok(Some(path));
                }
            }
        }

        Ok(None)
    }

    /// Read configuration from a concrete file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_ascii_lowercase()
            .as_str()
        {
            "toml" => toml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse TOML {}: {e}", path.display()))
            }),
            "yaml" | "yml" => serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!("Failed to parse YAML {}: {e}", path.display()))
            }),
            other => Err(Error::Config(format!(
                "Unsupported config format '{}', expected toml/yaml",
                other
            ))),
        }
    }

    /// Apply environment variable overrides after file/default loading.
    fn apply_env_overrides(&mut self) {
        apply_render_env_overrides(&mut self.render);
        self.generation.apply_env_overrides();
        self.logging.apply_env_overrides();
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.render.size == 0 {
            return Err(Error::Config("render.size must be greater than 0".to_string()));
        }
        if !(self.logo.scale > 0.0 && self.logo.scale <= 0.5) {
            return Err(Error::Config(format!(
                "logo.scale must be in (0, 0.5], got {}",
                self.logo.scale
            )));
        }
        if !is_hex_color(&self.logo.plate_color) {
            return Err(Error::Config(format!(
                "logo.plate_color '{}' is not a #hex color",
                self.logo.plate_color
            )));
        }
        template::lookup(&self.generation.template).map_err(|_| {
            Error::Config(format!(
                "Unknown template '{}'",
                self.generation.template
            ))
        })?;
        Ok(())
    }
}

fn apply_render_env_overrides(render: &mut RenderOptions) {
    if let Ok(size) = env::var("QRSTUDIO_SIZE") {
        if let Ok(parsed) = size.parse::<u32>() {
            render.size = parsed;
        }
    }
    if let Ok(margin) = env::var("QRSTUDIO_MARGIN") {
        if let Ok(parsed) = margin.parse::<u32>() {
            render.margin = parsed;
        }
    }
    if let Ok(level) = env::var("QRSTUDIO_EC_LEVEL") {
        match level.parse::<ErrorCorrection>() {
            Ok(parsed) => render.error_correction = parsed,
            Err(err) => tracing::warn!("Ignoring QRSTUDIO_EC_LEVEL: {err}"),
        }
    }
}

/// Regeneration and export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Quiet period after the last edit before regenerating
    pub debounce_ms: u64,
    /// Template selected at startup
    pub template: String,
    /// Directory exported PNGs are written to
    pub output_dir: PathBuf,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            template: template::DEFAULT_TEMPLATE_ID.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl GenerationOptions {
    /// Quiet period as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(ms) = env::var("QRSTUDIO_DEBOUNCE_MS") {
            if let Ok(parsed) = ms.parse::<u64>() {
                self.debounce_ms = parsed;
            }
        }
        if let Ok(template) = env::var("QRSTUDIO_TEMPLATE") {
            self.template = template;
        }
        if let Ok(dir) = env::var("QRSTUDIO_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
    }
}

/// Structured logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingOptions {
    /// Default log level (overridable via `QRSTUDIO_LOG_LEVEL`)
    pub level: String,
    /// Optional log file path for teeing structured logs
    pub file: Option<PathBuf>,
    /// Force ANSI colors in terminal logging
    pub color: bool,
    /// Optional log rotation strategy applied to `file`
    pub rotation: Option<LogRotation>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            color: true,
            rotation: None,
        }
    }
}

impl LoggingOptions {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("QRSTUDIO_LOG_LEVEL") {
            self.level = level;
        }
        if let Ok(file) = env::var("QRSTUDIO_LOG_FILE") {
            self.file = Some(PathBuf::from(file));
        }
        if let Ok(color) = env::var("QRSTUDIO_LOG_COLOR") {
            match color.to_ascii_lowercase().as_str() {
                "0" | "false" | "off" => self.color = false,
                "1" | "true" | "on" => self.color = true,
                _ => {}
            }
        }
        if let Ok(rotation) = env::var("QRSTUDIO_LOG_ROTATION") {
            if let Some(parsed) = LogRotation::from_str(&rotation) {
                self.rotation = Some(parsed);
            }
        }
    }
}

/// Supported log rotation policies for file sinks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate log files once per hour
    Hourly,
    /// Rotate log files once per day
    Daily,
}

impl LogRotation {
    fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}
