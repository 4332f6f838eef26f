//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::DepotConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "depot.toml";

/// Loads `<project_dir>/depot.toml`, falling back to defaults if the file
/// does not exist.
pub fn load_config(project_dir: &Path) -> Result<DepotConfig, ConfigError> {
    let config_path = project_dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(DepotConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates the configuration file at `path`. The file must exist.
pub fn load_config_file(path: &Path) -> Result<DepotConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `depot.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<DepotConfig, ConfigError> {
    let config: DepotConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &DepotConfig) -> Result<(), ConfigError> {
    if config.store.dir.trim().is_empty() {
        return Err(ConfigError::ValidationError("store.dir is empty".to_string()));
    }
    if config.store.staging.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "store.staging is empty".to_string(),
        ));
    }
    if Path::new(&config.store.staging).is_absolute() {
        return Err(ConfigError::ValidationError(
            "store.staging must be relative to store.dir".to_string(),
        ));
    }
    if config.log.filter.iter().any(|d| d.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "log.filter contains an empty directive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.store.dir, ".depot");
        assert_eq!(config.log.directives(), "warn");
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[store]
dir = "build/depot"
staging = "next"

[classpath]
roots = ["out/production", "out/test"]

[log]
filter = ["info", "depot_cache=debug"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.store.dir, "build/depot");
        assert_eq!(config.store.staging, "next");
        assert_eq!(config.classpath.roots.len(), 2);
        assert_eq!(config.log.directives(), "info,depot_cache=debug");
    }

    #[test]
    fn single_string_root() {
        let config = load_config_from_str("[classpath]\nroots = \"out\"\n").unwrap();
        assert_eq!(config.classpath.roots, vec!["out"]);
    }

    #[test]
    fn empty_store_dir_rejected() {
        let err = load_config_from_str("[store]\ndir = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn absolute_staging_rejected() {
        let err = load_config_from_str("[store]\nstaging = \"/tmp/stage\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = load_config_from_str("[store\ndir = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn wrong_type_is_parse_error() {
        let err = load_config_from_str("[log]\nfilter = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.store.dir, ".depot");
    }

    #[test]
    fn load_from_project_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[store]\ndir = \"cache\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.store_path(dir.path()), dir.path().join("cache"));
    }

    #[test]
    fn explicit_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
