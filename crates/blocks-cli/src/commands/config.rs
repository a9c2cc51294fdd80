//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use blocks_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "delete_policy": config.delete_policy,
                    "strict_validation": config.strict_validation,
                    "log_level": config.log_level,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.delete_policy);
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  delete_policy:     {}", config.delete_policy);
            println!("  strict_validation: {}", config.strict_validation);
            println!("  log_level:         {}", config.log_level);
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    // Edit the file as written; environment overrides must not leak into it
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    let mut config = Config::load_file(&save_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

/// Update one key on `config`
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "delete_policy" => {
            config.delete_policy = value.parse()?;
        }
        "strict_validation" => {
            config.strict_validation = value
                .parse()
                .context("Invalid value for strict_validation. Use 'true' or 'false'.")?;
        }
        "log_level" => {
            if !matches!(
                value.to_ascii_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error" | "off"
            ) {
                bail!(
                    "Invalid log level '{}'. Use trace, debug, info, warn, error or off.",
                    value
                );
            }
            config.log_level = value.to_ascii_lowercase();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: delete_policy, strict_validation, log_level, log_file",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blocks_core::DeletePolicy;
    use std::env;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Serializes tests that read or write BLOCKS_* variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::default();
        apply(&mut config, "delete_policy", "recursive").unwrap();
        apply(&mut config, "strict_validation", "true").unwrap();
        apply(&mut config, "log_level", "DEBUG").unwrap();
        apply(&mut config, "log_file", "/tmp/blocks.log").unwrap();

        assert_eq!(config.delete_policy, DeletePolicy::Recursive);
        assert!(config.strict_validation);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/blocks.log")));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply(&mut config, "delete_policy", "sometimes").is_err());
        assert!(apply(&mut config, "strict_validation", "maybe").is_err());
        assert!(apply(&mut config, "log_level", "loud").is_err());
        assert!(apply(&mut config, "colour", "blue").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_writes_to_cli_path() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "delete_policy".to_string(),
            "recursive".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();

        let saved = Config::load_file(&path).unwrap();
        assert_eq!(saved.delete_policy, DeletePolicy::Recursive);
    }

    #[test]
    fn test_set_does_not_persist_env_overrides() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        env::set_var("BLOCKS_STRICT_VALIDATION", "true");
        env::set_var("BLOCKS_LOG_LEVEL", "trace");
        let result = set(
            "delete_policy".to_string(),
            "recursive".to_string(),
            Some(&path),
            &output,
        );
        env::remove_var("BLOCKS_STRICT_VALIDATION");
        env::remove_var("BLOCKS_LOG_LEVEL");
        result.unwrap();

        let saved = Config::load_file(&path).unwrap();
        assert_eq!(saved.delete_policy, DeletePolicy::Recursive);
        assert!(!saved.strict_validation);
        assert_eq!(saved.log_level, Config::default().log_level);
    }
}
