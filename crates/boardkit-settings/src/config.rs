//! Configuration and settings management for BoardKit
//!
//! Provides configuration file handling and validation. JSON and TOML files
//! are supported; the format is chosen from the file extension.
//!
//! Configuration is organized into logical sections:
//! - Rebuild scheduling (tick, debounce, minimum pause)
//! - Tool defaults (trace width, via size, wire mode, ...)
//! - View behaviour (hit tolerance, status message timeout)
//! - Logging

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, SettingsError, SettingsResult};

/// Routing mode used when drawing traces between two points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMode {
    /// Horizontal first, then vertical
    #[default]
    #[serde(rename = "hv")]
    HorizontalVertical,
    /// Vertical first, then horizontal
    #[serde(rename = "vh")]
    VerticalHorizontal,
    /// Straight segment followed by a 45° segment
    Deg9045,
    /// 45° segment followed by a straight segment
    Deg4590,
    /// A single direct segment
    Straight,
}

impl WireMode {
    pub const ALL: [WireMode; 5] = [
        WireMode::HorizontalVertical,
        WireMode::VerticalHorizontal,
        WireMode::Deg9045,
        WireMode::Deg4590,
        WireMode::Straight,
    ];

    /// The mode that follows this one when cycling.
    pub fn next(self) -> WireMode {
        match self {
            WireMode::HorizontalVertical => WireMode::VerticalHorizontal,
            WireMode::VerticalHorizontal => WireMode::Deg9045,
            WireMode::Deg9045 => WireMode::Deg4590,
            WireMode::Deg4590 => WireMode::Straight,
            WireMode::Straight => WireMode::HorizontalVertical,
        }
    }
}

impl std::fmt::Display for WireMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HorizontalVertical => write!(f, "Horizontal-Vertical"),
            Self::VerticalHorizontal => write!(f, "Vertical-Horizontal"),
            Self::Deg9045 => write!(f, "90°-45°"),
            Self::Deg4590 => write!(f, "45°-90°"),
            Self::Straight => write!(f, "Straight"),
        }
    }
}

/// Background rebuild scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    /// How often the host should call the coordinator tick, in milliseconds
    pub tick_interval_ms: u64,
    /// Quiet time after the last edit before a rebuild fires
    pub debounce_ms: u64,
    /// Minimum time between the end of one run and the start of the next
    pub min_pause_ms: u64,
    /// Run a quick rule check automatically while someone observes the results
    pub auto_quick_check: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            debounce_ms: 300,
            min_pause_ms: 1000,
            auto_quick_check: true,
        }
    }
}

/// Initial parameters of the editing tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolDefaults {
    pub wire_mode: WireMode,
    pub trace_width: f64,
    pub via_size: f64,
    pub via_drill: f64,
    pub polygon_width: f64,
    pub polygon_filled: bool,
    pub text_height: f64,
    pub text_stroke_width: f64,
    pub text: String,
    pub hole_diameter: f64,
    pub plane_min_width: f64,
    pub plane_clearance: f64,
    pub plane_keep_orphans: bool,
    /// Maximum number of undo steps kept
    pub undo_limit: usize,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self {
            wire_mode: WireMode::HorizontalVertical,
            trace_width: 0.5,
            via_size: 0.7,
            via_drill: 0.3,
            polygon_width: 0.2,
            polygon_filled: false,
            text_height: 1.0,
            text_stroke_width: 0.2,
            text: "{{BOARD}}".to_string(),
            hole_diameter: 1.0,
            plane_min_width: 0.2,
            plane_clearance: 0.3,
            plane_keep_orphans: false,
            undo_limit: 200,
        }
    }
}

/// View layer behaviour that affects tool logic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    /// Hit test radius in device independent pixels
    pub hit_tolerance_px: f64,
    /// Auto-clear timeout of transient status messages
    pub status_timeout_ms: u64,
    /// Width change per line width step, in millimetres
    pub line_width_step: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            hit_tolerance_px: 5.0,
            status_timeout_ms: 4000,
            line_width_step: 0.05,
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scheduler: SchedulerSettings,
    pub tools: ToolDefaults,
    pub view: ViewSettings,
    pub logging: LoggingSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform configuration directory for BoardKit
    pub fn config_dir() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("boardkit"))
            .ok_or_else(|| {
                SettingsError::Config(ConfigError::UnsupportedPlatform(
                    std::env::consts::OS.to_string(),
                ))
            })
    }

    /// Default location of the configuration file
    pub fn default_path() -> SettingsResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load config from file, falling back to defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> SettingsResult<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("No configuration at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e))
                })?;
            }
        }

        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let s = &self.scheduler;
        if s.tick_interval_ms == 0 {
            return Err(SettingsError::invalid("scheduler.tick_interval_ms", "must be > 0"));
        }
        if s.debounce_ms == 0 {
            return Err(SettingsError::invalid("scheduler.debounce_ms", "must be > 0"));
        }
        if s.min_pause_ms < s.debounce_ms {
            return Err(SettingsError::invalid(
                "scheduler.min_pause_ms",
                "must not be shorter than the debounce interval",
            ));
        }

        let t = &self.tools;
        positive("tools.trace_width", t.trace_width)?;
        positive("tools.via_size", t.via_size)?;
        positive("tools.via_drill", t.via_drill)?;
        if t.via_drill >= t.via_size {
            return Err(SettingsError::Config(ConfigError::ValueOutOfRange {
                key: "tools.via_drill".to_string(),
                value: t.via_drill.to_string(),
            }));
        }
        non_negative("tools.polygon_width", t.polygon_width)?;
        positive("tools.text_height", t.text_height)?;
        positive("tools.text_stroke_width", t.text_stroke_width)?;
        positive("tools.hole_diameter", t.hole_diameter)?;
        non_negative("tools.plane_min_width", t.plane_min_width)?;
        non_negative("tools.plane_clearance", t.plane_clearance)?;
        if t.undo_limit == 0 {
            return Err(SettingsError::invalid("tools.undo_limit", "must be > 0"));
        }

        positive("view.hit_tolerance_px", self.view.hit_tolerance_px)?;
        positive("view.line_width_step", self.view.line_width_step)?;

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(SettingsError::invalid(
                "logging.level",
                format!("expected one of {}", LOG_LEVELS.join(", ")),
            ));
        }

        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Format> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("toml") => Ok(Format::Toml),
            other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("").to_string()).into()),
        }
    }
}

fn positive(key: &str, value: f64) -> SettingsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(key, "must be > 0"))
    }
}

fn non_negative(key: &str, value: f64) -> SettingsResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(key, "must be >= 0"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_wire_mode_cycle_visits_all() {
        let mut mode = WireMode::default();
        let mut seen = Vec::new();
        for _ in 0..WireMode::ALL.len() {
            seen.push(mode);
            mode = mode.next();
        }
        assert_eq!(mode, WireMode::HorizontalVertical);
        assert_eq!(seen, WireMode::ALL.to_vec());
    }

    #[test]
    fn test_validation_rejects_drill_larger_than_via() {
        let mut config = Config::default();
        config.tools.via_drill = 0.8;
        assert!(matches!(
            config.validate(),
            Err(SettingsError::Config(ConfigError::ValueOutOfRange { .. }))
        ));
    }

    #[test]
    fn test_validation_rejects_short_pause() {
        let mut config = Config::default();
        config.scheduler.min_pause_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[scheduler]\ndebounce_ms = 50\n").expect("parse");
        assert_eq!(config.scheduler.debounce_ms, 50);
        assert_eq!(config.scheduler.min_pause_ms, 1000);
        assert_eq!(config.tools.wire_mode, WireMode::HorizontalVertical);
    }

    #[test]
    fn test_wire_mode_serde_names() {
        let json = serde_json::to_string(&WireMode::HorizontalVertical).expect("serialize");
        assert_eq!(json, "\"hv\"");
        let mode: WireMode = serde_json::from_str("\"deg4590\"").expect("parse");
        assert_eq!(mode, WireMode::Deg4590);
    }
}
