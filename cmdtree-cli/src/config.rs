//! Shell configuration file.
//!
//! ```json
//! {
//!   "dispatcher": { "suggestion_timeout_ms": 250 },
//!   "log": { "level": "debug", "format": "compact" }
//! }
//! ```

use anyhow::Context;
use cmdtree::{DispatcherConfig, TracingConfig, TracingFormat};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub dispatcher: DispatcherConfig,
    pub log: TracingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            // Registration is logged at info; keep the shell quiet unless asked.
            log: TracingConfig {
                level: Some("warn".to_owned()),
                format: TracingFormat::Compact,
                ..Default::default()
            },
        }
    }
}

impl CliConfig {
    /// Read `path`, or fall back to defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = CliConfig::load(None).unwrap();
        assert_eq!(config, CliConfig::default());
        assert_eq!(config.log.level.as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "dispatcher": {{ "suggestion_timeout_ms": 250 }} }}"#).unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.dispatcher.suggestion_timeout_ms, Some(250));
        assert!(config.dispatcher.catch_parser_panics);
        assert_eq!(config.log, CliConfig::default().log);
    }

    #[test]
    fn test_load_log_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "log": {{ "level": "trace", "format": "json" }} }}"#).unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.log.level.as_deref(), Some("trace"));
        assert_eq!(config.log.format, TracingFormat::Json);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let error = CliConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{error:#}").contains("absent.json"));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let error = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(error.to_string().starts_with("invalid config file"));
    }
}
