//! Shared timeline/viewport configuration types.
//!
//! The CLI and any embedding UI read `agentline.toml` using these types.
//! Timeline settings map onto the reconciliation options; viewport settings
//! tune the virtualized list shell.

use agentline_core::classify::{
    DEFAULT_CLEARIFY_TOOL, DEFAULT_DELEGATION_TOOL, DEFAULT_RETRY_MARKERS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "agentline.toml";

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration (persisted as `agentline.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub timeline: TimelineSettings,
    #[serde(default)]
    pub viewport: ViewportSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineSettings {
    #[serde(default)]
    pub include_deltas: DeltaMode,
    /// Upper bound on the text a merged delta run keeps (most recent chars).
    #[serde(default = "default_max_delta_chars")]
    pub max_delta_chars: usize,
    #[serde(default = "default_delegation_tool")]
    pub delegation_tool: String,
    #[serde(default = "default_clearify_tool")]
    pub clearify_tool: String,
    #[serde(default = "default_retry_markers")]
    pub retry_markers: Vec<String>,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            include_deltas: DeltaMode::Auto,
            max_delta_chars: default_max_delta_chars(),
            delegation_tool: default_delegation_tool(),
            clearify_tool: default_clearify_tool(),
            retry_markers: default_retry_markers(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeltaMode {
    /// Show streaming deltas only while a task is running.
    #[default]
    Auto,
    #[serde(alias = "on", alias = "true")]
    Always,
    #[serde(alias = "off", alias = "false")]
    Never,
    /// Unknown/invalid values are normalized by compatibility fallbacks.
    #[serde(other)]
    Unknown,
}

impl DeltaMode {
    pub fn resolve(&self, is_running: bool) -> bool {
        match self {
            Self::Auto | Self::Unknown => is_running,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportSettings {
    /// Distance from the bottom (px) within which the list counts as pinned.
    #[serde(default = "default_pin_threshold_px")]
    pub pin_threshold_px: f64,
    #[serde(default = "default_overscan")]
    pub overscan: usize,
    #[serde(default = "default_estimated_item_height")]
    pub estimated_item_height: f64,
    #[serde(default = "default_announce_clear_ms")]
    pub announce_clear_ms: u64,
    /// How long a programmatic scroll suppresses pin-state updates.
    #[serde(default = "default_auto_scroll_guard_ms")]
    pub auto_scroll_guard_ms: u64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            pin_threshold_px: default_pin_threshold_px(),
            overscan: default_overscan(),
            estimated_item_height: default_estimated_item_height(),
            announce_clear_ms: default_announce_clear_ms(),
            auto_scroll_guard_ms: default_auto_scroll_guard_ms(),
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_max_delta_chars() -> usize {
    10_000
}
fn default_delegation_tool() -> String {
    DEFAULT_DELEGATION_TOOL.to_string()
}
fn default_clearify_tool() -> String {
    DEFAULT_CLEARIFY_TOOL.to_string()
}
fn default_pin_threshold_px() -> f64 {
    48.0
}
fn default_overscan() -> usize {
    6
}
fn default_estimated_item_height() -> f64 {
    96.0
}
fn default_announce_clear_ms() -> u64 {
    2_000
}
fn default_auto_scroll_guard_ms() -> u64 {
    400
}

pub fn default_retry_markers() -> Vec<String> {
    DEFAULT_RETRY_MARKERS
        .iter()
        .map(|marker| (*marker).to_string())
        .collect()
}

/// Apply compatibility fallbacks after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut ConsoleConfig) -> bool {
    let mut changed = false;
    let timeline = &mut config.timeline;

    if timeline.include_deltas == DeltaMode::Unknown {
        timeline.include_deltas = DeltaMode::Auto;
        changed = true;
    }
    if timeline.max_delta_chars == 0 {
        timeline.max_delta_chars = default_max_delta_chars();
        changed = true;
    }
    if timeline.delegation_tool.trim().is_empty() {
        timeline.delegation_tool = default_delegation_tool();
        changed = true;
    }
    if timeline.clearify_tool.trim().is_empty() {
        timeline.clearify_tool = default_clearify_tool();
        changed = true;
    }

    let viewport = &mut config.viewport;
    if !viewport.pin_threshold_px.is_finite() || viewport.pin_threshold_px < 0.0 {
        viewport.pin_threshold_px = default_pin_threshold_px();
        changed = true;
    }
    if !viewport.estimated_item_height.is_finite() || viewport.estimated_item_height <= 0.0 {
        viewport.estimated_item_height = default_estimated_item_height();
        changed = true;
    }

    changed
}

/// Default location: `$HOME/.config/agentline/agentline.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"))?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("agentline")
            .join(CONFIG_FILE_NAME),
    )
}

/// Load config from `path`, applying compatibility fallbacks.
/// A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ConsoleConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ConsoleConfig::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let mut config: ConsoleConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    apply_compat_fallbacks(&mut config);
    Ok(config)
}

pub fn save_config(path: &Path, config: &ConsoleConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_stable() {
        let cfg = ConsoleConfig::default();
        assert_eq!(cfg.timeline.include_deltas, DeltaMode::Auto);
        assert_eq!(cfg.timeline.max_delta_chars, 10_000);
        assert_eq!(cfg.timeline.delegation_tool, "subagent");
        assert_eq!(cfg.timeline.clearify_tool, "clearify");
        assert_eq!(cfg.viewport.pin_threshold_px, 48.0);
        assert_eq!(cfg.viewport.announce_clear_ms, 2_000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: ConsoleConfig = toml::from_str(
            r#"
[timeline]
max_delta_chars = 256

[viewport]
overscan = 2
"#,
        )
        .expect("parse toml");

        assert_eq!(cfg.timeline.max_delta_chars, 256);
        assert_eq!(cfg.timeline.clearify_tool, "clearify");
        assert_eq!(cfg.viewport.overscan, 2);
        assert_eq!(cfg.viewport.estimated_item_height, 96.0);
    }

    #[test]
    fn delta_mode_aliases_are_accepted() {
        let cfg: ConsoleConfig = toml::from_str(
            r#"
[timeline]
include_deltas = "off"
"#,
        )
        .expect("parse toml");
        assert_eq!(cfg.timeline.include_deltas, DeltaMode::Never);
        assert!(!cfg.timeline.include_deltas.resolve(true));
        assert!(DeltaMode::Auto.resolve(true));
        assert!(!DeltaMode::Auto.resolve(false));
    }

    #[test]
    fn apply_compat_fallbacks_repairs_invalid_values() {
        let mut cfg: ConsoleConfig = toml::from_str(
            r#"
[timeline]
include_deltas = "sometimes"
max_delta_chars = 0
clearify_tool = "  "

[viewport]
estimated_item_height = -1.0
"#,
        )
        .expect("parse toml");

        assert!(apply_compat_fallbacks(&mut cfg));
        assert_eq!(cfg.timeline.include_deltas, DeltaMode::Auto);
        assert_eq!(cfg.timeline.max_delta_chars, 10_000);
        assert_eq!(cfg.timeline.clearify_tool, "clearify");
        assert_eq!(cfg.viewport.estimated_item_height, 96.0);
    }

    #[test]
    fn apply_compat_fallbacks_is_noop_for_defaults() {
        let mut cfg = ConsoleConfig::default();
        assert!(!apply_compat_fallbacks(&mut cfg));
    }

    #[test]
    fn missing_file_loads_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let loaded = load_config(&path).expect("missing file is fine");
        assert_eq!(loaded.timeline.max_delta_chars, 10_000);

        let mut cfg = ConsoleConfig::default();
        cfg.timeline.include_deltas = DeltaMode::Always;
        cfg.viewport.overscan = 12;
        save_config(&path, &cfg).expect("save");

        let reloaded = load_config(&path).expect("load");
        assert_eq!(reloaded.timeline.include_deltas, DeltaMode::Always);
        assert_eq!(reloaded.viewport.overscan, 12);
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[timeline\n").expect("write");

        let err = load_config(&path).expect_err("should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }
}
