use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::player::AudioMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub controls: ControlsConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlsConfig {
    #[serde(default = "default_fade_in_ms")]
    pub fade_in_ms: u64,

    #[serde(default = "default_fade_out_ms")]
    pub fade_out_ms: u64,

    /// Fade used when the user taps to hide the controls
    #[serde(default = "default_quick_fade_out_ms")]
    pub quick_fade_out_ms: u64,

    #[serde(default = "default_hide_controls_timer_ms")]
    pub hide_controls_timer_ms: u64,

    #[serde(default)]
    pub show_controls_on_load: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackConfig {
    /// Buffering shorter than this never shows the spinner
    #[serde(default = "default_buffering_show_delay_ms")]
    pub buffering_show_delay_ms: u64,

    #[serde(default = "default_offline_message")]
    pub offline_message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "default_true")]
    pub plays_in_silent_mode: bool,

    #[serde(default = "default_true")]
    pub duck_others: bool,

    #[serde(default)]
    pub stays_active_in_background: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("playback-surface").join("config.toml"))
    }
}

impl ControlsConfig {
    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn fade_out(&self) -> Duration {
        Duration::from_millis(self.fade_out_ms)
    }

    pub fn quick_fade_out(&self) -> Duration {
        Duration::from_millis(self.quick_fade_out_ms)
    }

    pub fn hide_controls_after(&self) -> Duration {
        Duration::from_millis(self.hide_controls_timer_ms)
    }
}

impl PlaybackConfig {
    pub fn buffering_show_delay(&self) -> Duration {
        Duration::from_millis(self.buffering_show_delay_ms)
    }
}

impl AudioConfig {
    pub fn audio_mode(&self) -> AudioMode {
        AudioMode {
            plays_in_silent_mode: self.plays_in_silent_mode,
            duck_others: self.duck_others,
            stays_active_in_background: self.stays_active_in_background,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            fade_in_ms: default_fade_in_ms(),
            fade_out_ms: default_fade_out_ms(),
            quick_fade_out_ms: default_quick_fade_out_ms(),
            hide_controls_timer_ms: default_hide_controls_timer_ms(),
            show_controls_on_load: false,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffering_show_delay_ms: default_buffering_show_delay_ms(),
            offline_message: default_offline_message(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            plays_in_silent_mode: default_true(),
            duck_others: default_true(),
            stays_active_in_background: false,
        }
    }
}

// Default value functions
fn default_fade_in_ms() -> u64 { 200 }
fn default_fade_out_ms() -> u64 { 1000 }
fn default_quick_fade_out_ms() -> u64 { 200 }
fn default_hide_controls_timer_ms() -> u64 { 4000 }
fn default_buffering_show_delay_ms() -> u64 { 200 }
fn default_true() -> bool { true }
fn default_offline_message() -> String {
    "You are probably offline. Please make sure you are connected to the Internet to watch this video".to_string()
}
