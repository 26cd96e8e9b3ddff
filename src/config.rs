//! Configuration file parser for ~/.config/rreader/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged as warnings since they are usually
//! typos.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `translation.api_key`.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("HOME environment variable not set")]
    NoHome,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Theme variant name ("dark" or "light").
    pub theme: String,

    /// Seconds between automatic refreshes. 0 = manual refresh only.
    pub refresh_interval_secs: u64,

    /// Per-attempt timeout for one feed request.
    pub fetch_timeout_secs: u64,

    /// Upper bound on feeds fetched at the same time.
    pub max_concurrent_fetches: usize,

    /// Feeds file location; defaults to `~/.rreader/feeds.json`.
    pub feeds_file: Option<PathBuf>,

    /// Custom keybinding overrides. Keys are action names, values are key strings.
    pub keybindings: HashMap<String, String>,

    pub translation: TranslationConfig,
}

/// `[translation]` section.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    /// Language name passed to the model, e.g. "Korean".
    pub target_language: String,
    pub model: String,
    /// Gemini API key (alternative to GEMINI_API_KEY env var).
    /// Env var takes precedence over config file.
    pub api_key: Option<String>,
    /// Override for the API endpoint (HTTPS required except localhost).
    pub base_url: Option<String>,
    pub max_in_flight: usize,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            refresh_interval_secs: 120,
            fetch_timeout_secs: 10,
            max_concurrent_fetches: 8,
            feeds_file: None,
            keybindings: HashMap::new(),
            translation: TranslationConfig::default(),
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_language: "Korean".to_string(),
            model: crate::translate::DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            max_in_flight: 2,
            timeout_secs: 5,
        }
    }
}

/// Mask api_key in Debug output to prevent secret leakage.
impl std::fmt::Debug for TranslationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationConfig")
            .field("enabled", &self.enabled)
            .field("target_language", &self.target_language)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("max_in_flight", &self.max_in_flight)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl TranslationConfig {
    /// API key from `GEMINI_API_KEY`, falling back to the config file.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        Self::pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.clone())
    }

    fn pick_api_key(env: Option<String>, file: Option<String>) -> Option<SecretString> {
        env.filter(|k| !k.trim().is_empty())
            .or_else(|| file.filter(|k| !k.trim().is_empty()))
            .map(SecretString::from)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "theme",
        "refresh_interval_secs",
        "fetch_timeout_secs",
        "max_concurrent_fetches",
        "feeds_file",
        "keybindings",
        "translation",
    ];

    const KNOWN_TRANSLATION_KEYS: &'static [&'static str] = &[
        "enabled",
        "target_language",
        "model",
        "api_key",
        "base_url",
        "max_in_flight",
        "timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        for key in Self::unknown_keys(&content) {
            tracing::warn!(key = %key, "Unknown key in config file, ignoring");
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            theme = %config.theme,
            refresh_interval_secs = config.refresh_interval_secs,
            translation = config.translation.enabled,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Top-level and `[translation]` keys that no field consumes.
    fn unknown_keys(content: &str) -> Vec<String> {
        let Ok(raw) = content.parse::<toml::Table>() else {
            return Vec::new();
        };
        let mut unknown: Vec<String> = raw
            .keys()
            .filter(|k| !Self::KNOWN_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        if let Some(toml::Value::Table(section)) = raw.get("translation") {
            unknown.extend(
                section
                    .keys()
                    .filter(|k| !Self::KNOWN_TRANSLATION_KEYS.contains(&k.as_str()))
                    .map(|k| format!("translation.{}", k)),
            );
        }
        unknown
    }

    /// `None` when automatic refresh is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    /// Feeds file from the config, else `~/.rreader/feeds.json`.
    pub fn feeds_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.feeds_file {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("feeds.json")),
        }
    }
}

fn home_dir() -> Result<PathBuf, ConfigError> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoHome)
}

/// `~/.config/rreader/config.toml`
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(home_dir()?.join(".config").join("rreader").join("config.toml"))
}

/// `~/.rreader/`: feeds file and log.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    Ok(home_dir()?.join(".rreader"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("rreader_config_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme, "dark");
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(120)));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_concurrent_fetches, 8);
        assert!(config.translation.enabled);
        assert_eq!(config.translation.target_language, "Korean");
        assert_eq!(config.translation.model, "gemini-2.5-flash-lite");
        assert_eq!(config.translation.max_in_flight, 2);
        assert_eq!(config.translation.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/rreader_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.theme, "dark");
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.refresh_interval_secs, 120);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let (dir, path) = write_config(
            "full",
            r#"
theme = "light"
refresh_interval_secs = 0
fetch_timeout_secs = 3
max_concurrent_fetches = 4
feeds_file = "/srv/feeds.json"

[keybindings]
quit = "Ctrl+q"
refresh = "F5"

[translation]
enabled = false
target_language = "Japanese"
api_key = "from-file"
max_in_flight = 1
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.theme, "light");
        assert_eq!(config.refresh_interval(), None);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_concurrent_fetches, 4);
        assert_eq!(
            config.feeds_path().unwrap(),
            PathBuf::from("/srv/feeds.json")
        );
        assert_eq!(
            config.keybindings.get("refresh").map(String::as_str),
            Some("F5")
        );
        assert!(!config.translation.enabled);
        assert_eq!(config.translation.target_language, "Japanese");
        assert_eq!(config.translation.max_in_flight, 1);
        // Unset keys inside the section keep their defaults.
        assert_eq!(config.translation.timeout_secs, 5);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let (dir, path) = write_config("wrongtype", "refresh_interval_secs = \"soon\"\n");
        assert!(Config::load(&path).is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_detected_but_accepted() {
        let content = r#"
theme = "dark"
refresh_interval_minutes = 5

[translation]
langauge = "Korean"
"#;
        let mut unknown = Config::unknown_keys(content);
        unknown.sort();
        assert_eq!(
            unknown,
            vec![
                "refresh_interval_minutes".to_string(),
                "translation.langauge".to_string()
            ]
        );

        let (dir, path) = write_config("unknown", content);
        assert!(Config::load(&path).is_ok());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"#".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_api_key() {
        let mut config = Config::default();
        config.translation.api_key = Some("super-secret-key-12345".to_string());

        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let key = TranslationConfig::pick_api_key(Some("env".into()), Some("file".into()));
        assert_eq!(key.map(|k| k.expose_secret().to_string()), Some("env".into()));

        let key = TranslationConfig::pick_api_key(Some("  ".into()), Some("file".into()));
        assert_eq!(key.map(|k| k.expose_secret().to_string()), Some("file".into()));

        assert!(TranslationConfig::pick_api_key(None, None).is_none());
    }
}
