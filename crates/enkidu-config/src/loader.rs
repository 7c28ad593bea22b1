//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = path {
            let expanded = PathBuf::from(Self::expand_path(&path.to_string_lossy()));
            return Self::load(&expanded);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Config::default()),
        }
    }

    /// `<config dir>/enkidu/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("enkidu").join("config.toml"))
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/.config`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.dispatcher.thread_name, "enkidu-dispatcher");
        assert_eq!(config.signals.shutdown, vec!["INT", "TERM"]);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [dispatcher]
            thread_name = "sidekick"
            start_poll_interval_ms = 5

            [signals]
            shutdown = ["TERM"]
            status = ["USR1", "USR2"]

            [logging]
            level = "debug"
            json = true
            dir = "/var/log/enkidu"
            sink_filter = "log.audit.#"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.dispatcher.thread_name, "sidekick");
        assert_eq!(config.dispatcher.start_poll_interval_ms, 5);
        assert_eq!(config.signals.shutdown, vec!["TERM"]);
        assert_eq!(config.signals.status, vec!["USR1", "USR2"]);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/enkidu")));
        assert_eq!(config.logging.sink_filter, "log.audit.#");
    }

    #[test]
    fn test_load_partial_section() {
        let content = r#"
            [signals]
            status = []
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.signals.shutdown, vec!["INT", "TERM"]);
        assert!(config.signals.status.is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"warn\"").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_or_default_with_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[dispatcher]").unwrap();
        writeln!(file, "thread_name = \"from-file\"").unwrap();

        let config = ConfigLoader::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.dispatcher.thread_name, "from-file");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));

        let result = ConfigLoader::load_or_default(Some(Path::new("/nonexistent/enkidu.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test sets a unique test-only env var
        unsafe {
            std::env::set_var("ENKIDU_TEST_LOG_DIR", "/tmp/enkidu-logs");
        }
        let content = "[logging]\ndir = \"${ENKIDU_TEST_LOG_DIR}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.logging.dir, Some(PathBuf::from("/tmp/enkidu-logs")));
        unsafe {
            std::env::remove_var("ENKIDU_TEST_LOG_DIR");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${ENKIDU_NONEXISTENT_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(v)) if v == "ENKIDU_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(ConfigLoader::expand_path("/usr/local/bin"), "/usr/local/bin");
        let expanded = ConfigLoader::expand_path("~/enkidu");
        assert!(!expanded.starts_with('~'));
        assert!(expanded.ends_with("/enkidu"));
    }

    #[test]
    fn test_default_path() {
        if let Some(path) = ConfigLoader::default_path() {
            assert!(path.ends_with("enkidu/config.toml"));
        }
    }
}
