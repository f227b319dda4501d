use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Top-level configuration, loaded from `~/.voicenote.toml`
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Note store settings
    pub store: StoreConfig,
    /// Speech capture settings
    pub speech: SpeechConfig,
    /// Autosave settings
    pub autosave: AutosaveConfig,
    /// Logging settings
    pub telemetry: TelemetryConfig,
}

/// Note store settings
#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file (`~` expanded)
    pub path: String,
}

/// Speech capture settings
#[derive(Debug, Deserialize, Clone)]
pub struct SpeechConfig {
    /// Platform identity fed to the device-class heuristic; empty means use
    /// the host OS name
    #[serde(default)]
    pub platform_identity: String,
    /// Default recognition language (BCP-47 tag)
    pub language: String,
    /// Milliseconds to wait before auto-restarting an engine that ended on
    /// its own
    pub restart_delay_ms: u64,
}

/// Autosave settings
#[derive(Debug, Deserialize, Clone)]
pub struct AutosaveConfig {
    /// Debounce window in milliseconds
    pub debounce_ms: u64,
}

/// Logging settings
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Write logs to a file instead of stdout
    pub enabled: bool,
    /// Log file path when enabled (`~` expanded)
    pub log_path: String,
}

impl Config {
    /// Load config from `~/.voicenote.toml`, creating it with defaults on
    /// first run
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, written, or parsed.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        let contents = fs::read_to_string(&config_path).context("failed to read config file")?;

        let config: Self = toml::from_str(&contents).context("failed to parse config TOML")?;

        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".voicenote.toml"))
    }

    fn create_default(path: &PathBuf) -> Result<()> {
        let default_config = r#"[store]
path = "~/.voicenote/notes.db"

[speech]
# Leave empty to detect from the host OS; set to a user-agent-style string
# to force mobile (segmented) or desktop (continuous) capture.
platform_identity = ""
language = "en-US"
restart_delay_ms = 250

[autosave]
debounce_ms = 1000

[telemetry]
enabled = false
log_path = "~/.voicenote/voicenote.log"
"#;
        fs::write(path, default_config).context("failed to write default config")?;
        Ok(())
    }

    /// Expand `~` in paths to the home directory
    ///
    /// # Errors
    /// Returns an error if `HOME` is unset.
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_path_with_tilde() {
        let home = std::env::var("HOME").unwrap();
        let result = Config::expand_path("~/notes/notes.db").unwrap();
        assert_eq!(result, PathBuf::from(home).join("notes/notes.db"));
    }

    #[test]
    fn test_expand_path_absolute_unchanged() {
        let result = Config::expand_path("/var/lib/voicenote.db").unwrap();
        assert_eq!(result, PathBuf::from("/var/lib/voicenote.db"));
    }

    #[test]
    fn test_default_config_parses() {
        let default_config = r#"[store]
path = "~/.voicenote/notes.db"

[speech]
platform_identity = ""
language = "en-US"
restart_delay_ms = 250

[autosave]
debounce_ms = 1000

[telemetry]
enabled = false
log_path = "~/.voicenote/voicenote.log"
"#;
        let config: Config = toml::from_str(default_config).unwrap();
        assert_eq!(config.speech.language, "en-US");
        assert_eq!(config.autosave.debounce_ms, 1000);
        assert!(!config.telemetry.enabled);
    }
}
