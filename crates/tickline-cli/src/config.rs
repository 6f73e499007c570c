use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tickline_core::DEFAULT_TIMEBASE;
use tickline_services::PlayerConfig;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub log_filter: String,
    pub editor: EditorConfig,
    pub player: PlayerSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct EditorConfig {
    pub timebase: u32,
    /// Grid as a note value: 4 = quarter, 16 = sixteenth; 0 disables snapping
    pub quantize: u32,
    pub max_bpm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct PlayerSection {
    pub lookahead_ms: f64,
    pub interval_ms: u64,
    pub metronome: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_filter: "tickline=debug".to_string(),
            editor: EditorConfig::default(),
            player: PlayerSection::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            timebase: DEFAULT_TIMEBASE,
            quantize: 16,
            max_bpm: 300.0,
        }
    }
}

impl Default for PlayerSection {
    fn default() -> Self {
        let defaults = PlayerConfig::default();
        Self {
            lookahead_ms: defaults.lookahead_ms,
            interval_ms: defaults.interval_ms,
            metronome: defaults.metronome,
        }
    }
}

impl From<&PlayerSection> for PlayerConfig {
    fn from(section: &PlayerSection) -> Self {
        Self {
            lookahead_ms: section.lookahead_ms,
            interval_ms: section.interval_ms,
            metronome: section.metronome,
        }
    }
}

pub(crate) fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tickline")
        .join("config.toml")
}

pub(crate) fn load_config() -> AppConfig {
    let path = config_path();
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|s| parse_config(&s))
        .unwrap_or_default()
}

fn parse_config(source: &str) -> Option<AppConfig> {
    toml::from_str(source).ok()
}
