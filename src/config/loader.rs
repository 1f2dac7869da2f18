//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::AgentConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: AgentConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Resolve the effective configuration for a run.
///
/// Reads `path` when given, otherwise starts from defaults; environment
/// overrides are applied last and the result is re-validated.
pub fn resolve_config(path: Option<&Path>) -> Result<AgentConfig, ConfigError> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => AgentConfig::default(),
    };
    config.apply_env_overrides();
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[submission]\nmax_attempts = 5\n\n[storage]\nlocal_ipfs_url = \"http://10.0.0.2:5001\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.submission.max_attempts, 5);
        assert_eq!(config.storage.local_ipfs_url, "http://10.0.0.2:5001");
    }

    #[test]
    fn test_load_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[submission]\nmax_attempts = 0").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("submission.max_attempts"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[blockchain\nrpc_url = ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Parse(_))));
    }
}
