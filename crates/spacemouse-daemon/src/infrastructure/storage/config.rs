//! TOML-based configuration persistence.
//!
//! Reads and writes [`AppConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\SpaceMouseTool\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/spacemousetool/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/SpaceMouseTool/config.toml`
//!
//! Example:
//!
//! ```toml
//! [daemon]
//! log_level = "debug"
//! socket_path = "/run/spnav.sock"
//!
//! [controller]
//! trans_scale = 0.02
//! constrained_orbit = true
//! ```
//!
//! Every field has a serde default, so a missing file, a missing section or a
//! missing key all fall back to the built-in values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

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
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// Device daemon settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// `tracing` log level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// spacenavd socket.  When absent, `SPNAV_SOCKET` and then
    /// `/var/run/spnav.sock` are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_path: Option<PathBuf>,
    /// Upper bound on one blocking socket read, which also bounds how long
    /// `stop` can wait for the spacenavd worker.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Name registered with the 3DconnexionClient framework.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

/// Camera controller tuning.  Scales convert raw device units per event into
/// camera units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default = "default_rot_scale_free")]
    pub rot_scale_free: f64,
    #[serde(default = "default_rot_scale_constrained")]
    pub rot_scale_constrained: f64,
    #[serde(default = "default_trans_scale")]
    pub trans_scale: f64,
    #[serde(default = "default_zoom_scale")]
    pub zoom_scale: f64,
    #[serde(default = "default_zoom_min")]
    pub zoom_min: f64,
    #[serde(default = "default_zoom_max")]
    pub zoom_max: f64,
    /// Fraction of the viewport kept free around a fitted selection.
    #[serde(default = "default_fit_border_percentage")]
    pub fit_border_percentage: f64,
    /// Start in constrained orbit mode instead of free rotation.
    #[serde(default)]
    pub constrained_orbit: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_client_name() -> String {
    "SpaceMouseTool".to_string()
}
fn default_rot_scale_free() -> f64 {
    0.0001
}
fn default_rot_scale_constrained() -> f64 {
    0.00004
}
fn default_trans_scale() -> f64 {
    0.015
}
fn default_zoom_scale() -> f64 {
    0.00001
}
fn default_zoom_min() -> f64 {
    -0.495
}
fn default_zoom_max() -> f64 {
    1.0
}
fn default_fit_border_percentage() -> f64 {
    0.1
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            socket_path: None,
            read_timeout_ms: default_read_timeout_ms(),
            client_name: default_client_name(),
        }
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            rot_scale_free: default_rot_scale_free(),
            rot_scale_constrained: default_rot_scale_constrained(),
            trans_scale: default_trans_scale(),
            zoom_scale: default_zoom_scale(),
            zoom_min: default_zoom_min(),
            zoom_max: default_zoom_max(),
            fit_border_percentage: default_fit_border_percentage(),
            constrained_orbit: false,
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
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the platform config file.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &config_file_path()?)
}

/// Persists `config` to `path`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
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

/// Resolves the platform config directory including the application folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("SpaceMouseTool"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("SpaceMouseTool")
        })
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("spacemousetool"))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("spacemouse-config-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_daemon_config_defaults() {
        let cfg = DaemonConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.read_timeout_ms, 100);
        assert!(cfg.socket_path.is_none());
        assert_eq!(cfg.client_name, "SpaceMouseTool");
    }

    #[test]
    fn test_controller_config_defaults() {
        let cfg = ControllerConfig::default();
        assert_eq!(cfg.rot_scale_free, 0.0001);
        assert_eq!(cfg.rot_scale_constrained, 0.00004);
        assert_eq!(cfg.trans_scale, 0.015);
        assert_eq!(cfg.zoom_scale, 0.00001);
        assert_eq!(cfg.zoom_min, -0.495);
        assert_eq!(cfg.zoom_max, 1.0);
        assert_eq!(cfg.fit_border_percentage, 0.1);
        assert!(!cfg.constrained_orbit);
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("parse");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_given_keys() {
        // Arrange
        let text = r#"
            [daemon]
            socket_path = "/tmp/custom.sock"

            [controller]
            trans_scale = 0.5
            constrained_orbit = true
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).expect("parse");

        // Assert
        assert_eq!(cfg.daemon.socket_path, Some(PathBuf::from("/tmp/custom.sock")));
        assert_eq!(cfg.daemon.read_timeout_ms, 100);
        assert_eq!(cfg.controller.trans_scale, 0.5);
        assert!(cfg.controller.constrained_orbit);
        assert_eq!(cfg.controller.zoom_max, 1.0);
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[daemon\nlog_level = ").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    // ── File round-trip ───────────────────────────────────────────────────────

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = temp_config_path("missing");
        let cfg = load_config_from(&path).expect("load");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let path = temp_config_path("roundtrip");
        let mut cfg = AppConfig::default();
        cfg.daemon.log_level = "debug".to_string();
        cfg.daemon.socket_path = Some(PathBuf::from("/run/spnav.sock"));
        cfg.controller.zoom_min = -0.25;

        // Act
        save_config_to(&cfg, &path).expect("save");
        let restored = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(cfg, restored);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_config_file_is_named_config_toml() {
        if let Ok(path) = config_file_path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }
}
