//! Reads and writes `~/.devconf/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Persisted shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub log_format: LogFormat,

    /// Topic the outbound state is dispatched on.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// File that receives every dispatched state document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_dump_path: Option<PathBuf>,

    /// Document value of the state entered at startup (1 idle, 2 running).
    #[serde(default = "default_initial_process_state")]
    pub initial_process_state: u32,
}

fn default_topic() -> String {
    "edge_app".to_string()
}

fn default_initial_process_state() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            topic: default_topic(),
            state_dump_path: None,
            initial_process_state: default_initial_process_state(),
        }
    }
}

/// Return the path to `~/.devconf/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".devconf").join("config.toml")
}

/// Load the config from disk and apply environment overrides.  Returns
/// `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    let mut cfg = load_from(&config_path())?;
    if let Some(cfg) = cfg.as_mut() {
        apply_env_overrides(cfg);
    }
    Ok(cfg)
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    Ok(Some(cfg))
}

/// Apply `DEVCONF_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `DEVCONF_TOPIC` | `topic` |
/// | `DEVCONF_LOG_FORMAT` | `log_format` (`compact` or `json`) |
/// | `DEVCONF_STATE_DUMP` | `state_dump_path` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("DEVCONF_TOPIC") {
        cfg.topic = v;
    }
    if let Ok(v) = std::env::var("DEVCONF_LOG_FORMAT") {
        match v.as_str() {
            "json" => cfg.log_format = LogFormat::Json,
            "compact" => cfg.log_format = LogFormat::Compact,
            _ => {}
        }
    }
    if let Ok(v) = std::env::var("DEVCONF_STATE_DUMP") {
        cfg.state_dump_path = Some(PathBuf::from(v));
    }
}

/// Save the config to disk, creating `~/.devconf/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        save_to(&Config::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("meta").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("meta")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn roundtrip_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = Config {
            log_format: LogFormat::Json,
            topic: "state".to_string(),
            state_dump_path: Some(PathBuf::from("/tmp/state.json")),
            initial_process_state: 2,
        };
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.log_format, LogFormat::Json);
        assert_eq!(loaded.topic, "state");
        assert_eq!(loaded.initial_process_state, 2);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg: Config = toml::from_str("").expect("parse");
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.topic, "edge_app");
        assert_eq!(cfg.initial_process_state, 1);
    }

    #[test]
    fn config_path_points_to_devconf_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".devconf"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn env_overrides() {
        // SAFETY: no other test reads these variables.
        unsafe {
            std::env::set_var("DEVCONF_TOPIC", "custom");
            std::env::set_var("DEVCONF_LOG_FORMAT", "json");
            std::env::set_var("DEVCONF_STATE_DUMP", "/tmp/out.json");
        }
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.topic, "custom");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.state_dump_path, Some(PathBuf::from("/tmp/out.json")));

        unsafe { std::env::set_var("DEVCONF_LOG_FORMAT", "fancy") };
        let mut cfg = Config::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.log_format, LogFormat::Compact);

        unsafe {
            std::env::remove_var("DEVCONF_TOPIC");
            std::env::remove_var("DEVCONF_LOG_FORMAT");
            std::env::remove_var("DEVCONF_STATE_DUMP");
        }
    }
}
