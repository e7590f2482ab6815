use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILE_NAME, DATA_DIR, DB_FILE_NAME, DB_PATH_ENV, DEFAULT_ASSISTANT_ARGS,
    DEFAULT_ASSISTANT_PROGRAM, DEFAULT_TIMEZONE,
};
use crate::error::ConfigError;
use crate::time::Clock;

/// Configuration loaded from a JSON file. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TutuConfig {
    /// Database file; falls back to `TUTU_DB`, then `~/a/base/tutu.sqlite`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,

    /// IANA name of the reference zone for stored timestamps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    pub assistant: AssistantConfig,

    /// Text file appended to every context handed to the assistant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_appendix: Option<PathBuf>,
}

/// External assistant invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantConfig {
    pub program: String,
    pub args: Vec<String>,

    /// Batch runs kill a child that exceeds this and record a failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_ASSISTANT_PROGRAM.to_string(),
            args: DEFAULT_ASSISTANT_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

impl AssistantConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl TutuConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }
        data_dir()
            .map(|dir| dir.join(DB_FILE_NAME))
            .ok_or(ConfigError::NoHomeDirectory)
    }

    pub fn clock(&self) -> Result<Clock, ConfigError> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        let zone: Tz = name
            .parse()
            .map_err(|_| ConfigError::UnknownTimezone(name.to_string()))?;
        Ok(Clock::new(zone))
    }

    /// Contents of the context appendix; a missing or unreadable file yields `None`.
    pub fn appendix(&self) -> Option<String> {
        let path = self.context_appendix.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!("Skipping context appendix {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn data_dir() -> Option<PathBuf> {
    let mut dir = dirs::home_dir()?;
    dir.extend(DATA_DIR);
    Some(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config_minimal() {
        let config = TutuConfig::from_json("{}").unwrap();
        assert!(config.database_path.is_none());
        assert_eq!(config.assistant.program, "claude");
        assert_eq!(config.assistant.args, ["--dangerously-skip-permissions"]);
        assert!(config.assistant.timeout().is_none());
        assert_eq!(config.clock().unwrap(), Clock::default());
    }

    #[test]
    fn test_parse_config_full() {
        let json = r#"{
            "databasePath": "/tmp/t/tutu.sqlite",
            "timezone": "Europe/Berlin",
            "assistant": { "program": "/usr/local/bin/agent", "args": [], "timeoutSecs": 600 },
            "contextAppendix": "/tmp/t/README.md"
        }"#;
        let config = TutuConfig::from_json(json).unwrap();
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/tmp/t/tutu.sqlite")
        );
        assert_eq!(config.clock().unwrap().zone(), chrono_tz::Europe::Berlin);
        assert_eq!(config.assistant.program, "/usr/local/bin/agent");
        assert!(config.assistant.args.is_empty());
        assert_eq!(config.assistant.timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_unknown_timezone() {
        let config = TutuConfig::from_json(r#"{"timezone": "Mars/Olympus"}"#).unwrap();
        assert!(matches!(
            config.clock(),
            Err(ConfigError::UnknownTimezone(name)) if name == "Mars/Olympus"
        ));
    }

    #[test]
    fn test_load_from_file_and_appendix() {
        let dir = tempdir().unwrap();
        let appendix = dir.path().join("README.md");
        std::fs::write(&appendix, "# Notes").unwrap();
        let config_path = dir.path().join("tutu.json");
        std::fs::write(
            &config_path,
            format!(r#"{{"contextAppendix": {:?}}}"#, appendix.display().to_string()),
        )
        .unwrap();

        let config = TutuConfig::load_or_default(Some(&config_path)).unwrap();
        assert_eq!(config.appendix().as_deref(), Some("# Notes"));

        let missing = TutuConfig {
            context_appendix: Some(dir.path().join("absent.md")),
            ..Default::default()
        };
        assert!(missing.appendix().is_none());
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let dir = tempdir().unwrap();
        let err = TutuConfig::load_or_default(Some(&dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
