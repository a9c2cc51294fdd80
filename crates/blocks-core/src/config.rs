//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/blocks/config.toml)
//! 3. Environment variables (BLOCKS_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable prefix
const ENV_PREFIX: &str = "BLOCKS";

/// What happens to the descendants of a deleted page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Only the block itself is removed; descendants stay behind as orphans
    #[default]
    Shallow,
    /// The whole subtree is removed
    Recursive,
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::Shallow => write!(f, "shallow"),
            DeletePolicy::Recursive => write!(f, "recursive"),
        }
    }
}

impl FromStr for DeletePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Ok(DeletePolicy::Shallow),
            "recursive" => Ok(DeletePolicy::Recursive),
            _ => anyhow::bail!(
                "Invalid delete policy '{}'. Use 'shallow' or 'recursive'.",
                s
            ),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// How deletes treat descendants
    #[serde(default)]
    pub delete_policy: DeletePolicy,

    /// Validate every candidate mapping before publishing it
    #[serde(default)]
    pub strict_validation: bool,

    /// Log level for the `blocks_*` targets
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delete_policy: DeletePolicy::default(),
            strict_validation: false,
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (BLOCKS_DELETE_POLICY, BLOCKS_STRICT_VALIDATION, ...)
    /// 2. Config file (~/.config/blocks/config.toml or BLOCKS_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(cli_path: Option<&PathBuf>) -> Result<Self> {
        match cli_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load only what the file says, without environment overrides
    ///
    /// Use this before [`save_to_path`](Self::save_to_path) so that values
    /// coming from the environment are not written back to disk.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // BLOCKS_DELETE_POLICY
        if let Ok(val) = std::env::var(format!("{}_DELETE_POLICY", ENV_PREFIX)) {
            match val.parse() {
                Ok(policy) => self.delete_policy = policy,
                Err(e) => warn!("Ignoring {}_DELETE_POLICY: {}", ENV_PREFIX, e),
            }
        }

        // BLOCKS_STRICT_VALIDATION
        if let Ok(val) = std::env::var(format!("{}_STRICT_VALIDATION", ENV_PREFIX)) {
            self.strict_validation = val.eq_ignore_ascii_case("true") || val == "1";
        }

        // BLOCKS_LOG_LEVEL
        if let Ok(val) = std::env::var(format!("{}_LOG_LEVEL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.log_level = val;
            }
        }

        // BLOCKS_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with BLOCKS_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blocks")
            .join("config.toml")
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    const ENV_VARS: &[&str] = &[
        "BLOCKS_DELETE_POLICY",
        "BLOCKS_STRICT_VALIDATION",
        "BLOCKS_LOG_LEVEL",
        "BLOCKS_LOG_FILE",
        "BLOCKS_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.delete_policy, DeletePolicy::Shallow);
        assert!(!config.strict_validation);
        assert_eq!(config.log_level, "warn");
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_delete_policy_parse() {
        assert_eq!("shallow".parse::<DeletePolicy>().unwrap(), DeletePolicy::Shallow);
        assert_eq!(
            "Recursive".parse::<DeletePolicy>().unwrap(),
            DeletePolicy::Recursive
        );
        assert!("purge".parse::<DeletePolicy>().is_err());
        assert_eq!(DeletePolicy::Recursive.to_string(), "recursive");
    }

    #[test]
    fn test_env_override_delete_policy() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("BLOCKS_DELETE_POLICY", "recursive");
        config.apply_env_overrides();
        assert_eq!(config.delete_policy, DeletePolicy::Recursive);

        // Invalid values are ignored
        env::set_var("BLOCKS_DELETE_POLICY", "sometimes");
        config.apply_env_overrides();
        assert_eq!(config.delete_policy, DeletePolicy::Recursive);
    }

    #[test]
    fn test_env_override_strict_validation() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("BLOCKS_STRICT_VALIDATION", "true");
        config.apply_env_overrides();
        assert!(config.strict_validation);

        env::set_var("BLOCKS_STRICT_VALIDATION", "0");
        config.apply_env_overrides();
        assert!(!config.strict_validation);

        env::set_var("BLOCKS_STRICT_VALIDATION", "1");
        config.apply_env_overrides();
        assert!(config.strict_validation);
    }

    #[test]
    fn test_env_override_log_settings() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("BLOCKS_LOG_LEVEL", "debug");
        env::set_var("BLOCKS_LOG_FILE", "/tmp/blocks.log");
        config.apply_env_overrides();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/blocks.log")));

        // Empty string clears the log file
        env::set_var("BLOCKS_LOG_FILE", "");
        config.apply_env_overrides();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            delete_policy = "recursive"
            strict_validation = true
            log_level = "info"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Recursive);
        assert!(config.strict_validation);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_str_partial_uses_defaults() {
        let _guard = EnvGuard::new(ENV_VARS);

        let config = Config::load_from_str("strict_validation = true").unwrap();
        assert!(config.strict_validation);
        assert_eq!(config.delete_policy, DeletePolicy::Shallow);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_load_from_str_invalid_policy() {
        let _guard = EnvGuard::new(ENV_VARS);
        assert!(Config::load_from_str(r#"delete_policy = "sometimes""#).is_err());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let config = Config {
            delete_policy: DeletePolicy::Recursive,
            strict_validation: true,
            log_level: "debug".to_string(),
            log_file: Some(temp_dir.path().join("blocks.log")),
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_with_cli_override(Some(&path)).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_file_ignores_env_overrides() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"info\"\n").unwrap();

        env::set_var("BLOCKS_DELETE_POLICY", "recursive");
        env::set_var("BLOCKS_LOG_LEVEL", "trace");

        let on_disk = Config::load_file(&path).unwrap();
        assert_eq!(on_disk.delete_policy, DeletePolicy::Shallow);
        assert_eq!(on_disk.log_level, "info");

        let effective = Config::load_from_path(&path).unwrap();
        assert_eq!(effective.delete_policy, DeletePolicy::Recursive);
        assert_eq!(effective.log_level, "trace");
    }

    #[test]
    fn test_config_file_path_env_override() {
        let _guard = EnvGuard::new(ENV_VARS);

        env::set_var("BLOCKS_CONFIG", "/custom/blocks.toml");
        assert_eq!(
            Config::config_file_path(),
            PathBuf::from("/custom/blocks.toml")
        );

        env::remove_var("BLOCKS_CONFIG");
        assert!(Config::config_file_path().ends_with("blocks/config.toml"));
    }
}
