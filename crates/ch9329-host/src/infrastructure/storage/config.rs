//! TOML-based configuration persistence for the host binary.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Ch9329Host\config.toml`
//! - Linux:    `~/.config/ch9329-host/config.toml`
//! - macOS:    `~/Library/Application Support/Ch9329Host/config.toml`
//!
//! Example:
//!
//! ```toml
//! [serial]
//! port = "COM5"
//! baud_rate = 57600
//! frame_gap_ms = 1
//!
//! [timing]
//! tap_delay_ms = 5
//! media_release_delay_ms = 10
//!
//! [keep_awake]
//! mode = "while_inactive"
//! period_secs = 60
//! key_vk = 0x91
//!
//! [host]
//! log_level = "info"
//! ```
//!
//! Every field has a default, so a missing file, a missing section, or a
//! missing key all fall back to the factory settings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ch9329_core::{EncoderTiming, KeyMapper};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::keep_awake::{KeepAwakeMode, KeepAwakeSettings, DEFAULT_KEY_VK};
use crate::infrastructure::serial::{SerialSettings, DEFAULT_BAUD_RATE};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but makes no sense.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub keep_awake: KeepAwakeConfig,
    #[serde(default)]
    pub host: HostConfig,
}

/// Serial link to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    /// Port name, e.g. `"COM5"` or `"/dev/ttyUSB0"`.  Required unless the
    /// binary runs with `--dry-run`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Pause after each frame so the adapter can consume it.
    #[serde(default = "default_frame_gap_ms")]
    pub frame_gap_ms: u64,
}

/// Delays inside two-frame operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_tap_delay_ms")]
    pub tap_delay_ms: u64,
    #[serde(default = "default_media_release_delay_ms")]
    pub media_release_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeepAwakeConfig {
    #[serde(default)]
    pub mode: KeepAwakeMode,
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
    /// Windows VK code of the key to tap.
    #[serde(default = "default_key_vk")]
    pub key_vk: u8,
}

/// General host behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}
fn default_frame_gap_ms() -> u64 {
    1
}
fn default_tap_delay_ms() -> u64 {
    5
}
fn default_media_release_delay_ms() -> u64 {
    10
}
fn default_period_secs() -> u64 {
    60
}
fn default_key_vk() -> u8 {
    DEFAULT_KEY_VK
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            frame_gap_ms: default_frame_gap_ms(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tap_delay_ms: default_tap_delay_ms(),
            media_release_delay_ms: default_media_release_delay_ms(),
        }
    }
}

impl Default for KeepAwakeConfig {
    fn default() -> Self {
        Self {
            mode: KeepAwakeMode::default(),
            period_secs: default_period_secs(),
            key_vk: default_key_vk(),
        }
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl AppConfig {
    /// Rejects values that would make the host misbehave at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                field: "serial.baud_rate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.keep_awake.period_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "keep_awake.period_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if KeyMapper::windows_vk_to_hid(self.keep_awake.key_vk).is_none() {
            return Err(ConfigError::Invalid {
                field: "keep_awake.key_vk",
                reason: format!("VK 0x{:02X} has no HID usage", self.keep_awake.key_vk),
            });
        }
        Ok(())
    }

    /// Serial settings for the configured port, or `None` if no port is set.
    pub fn serial_settings(&self) -> Option<SerialSettings> {
        let port = self.serial.port.as_deref()?;
        Some(SerialSettings {
            baud_rate: self.serial.baud_rate,
            frame_gap: Duration::from_millis(self.serial.frame_gap_ms),
            ..SerialSettings::new(port)
        })
    }

    pub fn encoder_timing(&self) -> EncoderTiming {
        EncoderTiming {
            tap_delay: Duration::from_millis(self.timing.tap_delay_ms),
            media_release_delay: Duration::from_millis(self.timing.media_release_delay_ms),
        }
    }

    pub fn keep_awake_settings(&self) -> KeepAwakeSettings {
        KeepAwakeSettings {
            period: Duration::from_secs(self.keep_awake.period_secs),
            key_vk: self.keep_awake.key_vk,
            ..KeepAwakeSettings::new(self.keep_awake.mode)
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform path.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if a value fails validation.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Ch9329Host"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ch9329-host"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Ch9329Host")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.serial.port, None);
        assert_eq!(cfg.serial.baud_rate, 57_600);
        assert_eq!(cfg.serial.frame_gap_ms, 1);
        assert_eq!(cfg.timing.tap_delay_ms, 5);
        assert_eq!(cfg.timing.media_release_delay_ms, 10);
        assert_eq!(cfg.keep_awake.mode, KeepAwakeMode::Off);
        assert_eq!(cfg.keep_awake.period_secs, 60);
        assert_eq!(cfg.keep_awake.key_vk, 0x91);
        assert_eq!(cfg.host.log_level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_given_keys() {
        // Arrange
        let toml_str = r#"
[serial]
port = "/dev/ttyUSB0"

[keep_awake]
mode = "always"
key_vk = 0x7C
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cfg.serial.baud_rate, 57_600);
        assert_eq!(cfg.keep_awake.mode, KeepAwakeMode::Always);
        assert_eq!(cfg.keep_awake.key_vk, 0x7C);
        assert_eq!(cfg.keep_awake.period_secs, 60);
    }

    #[test]
    fn test_unset_port_is_omitted_from_toml() {
        let toml_str = toml::to_string_pretty(&AppConfig::default()).expect("serialize");

        assert!(!toml_str.contains("port ="), "None port must be omitted");
    }

    #[test]
    fn test_conversions_carry_configured_values() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.serial.port = Some("COM5".to_string());
        cfg.serial.baud_rate = 9600;
        cfg.serial.frame_gap_ms = 3;
        cfg.timing.tap_delay_ms = 20;
        cfg.keep_awake.mode = KeepAwakeMode::WhileInactive;
        cfg.keep_awake.period_secs = 30;

        // Act
        let serial = cfg.serial_settings().expect("port is set");
        let timing = cfg.encoder_timing();
        let keep_awake = cfg.keep_awake_settings();

        // Assert
        assert_eq!(serial.port, "COM5");
        assert_eq!(serial.baud_rate, 9600);
        assert_eq!(serial.frame_gap, Duration::from_millis(3));
        assert_eq!(timing.tap_delay, Duration::from_millis(20));
        assert_eq!(timing.media_release_delay, Duration::from_millis(10));
        assert_eq!(keep_awake.mode, KeepAwakeMode::WhileInactive);
        assert_eq!(keep_awake.period, Duration::from_secs(30));
        assert_eq!(keep_awake.key_vk, 0x91);
    }

    #[test]
    fn test_serial_settings_absent_without_port() {
        assert!(AppConfig::default().serial_settings().is_none());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let mut cfg = AppConfig::default();
        cfg.serial.baud_rate = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "serial.baud_rate", .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.keep_awake.period_secs = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "keep_awake.period_secs", .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.keep_awake.key_vk = 0x07;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "keep_awake.key_vk", .. })
        ));
    }

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();

        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_round_trip_creates_directories() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.serial.port = Some("/dev/ttyACM0".to_string());
        cfg.host.log_level = "debug".to_string();

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
