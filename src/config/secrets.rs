//! Credentials loaded from the environment.
//!
//! # Security
//! - Secrets are read ONLY from environment variables (or a `.env` file)
//! - `Debug` output masks every value
//! - Nothing in this module logs a secret

use std::fmt;

pub const PRIVATE_KEY_ENV_VAR: &str = "PRIVATE_KEY";
pub const OPENAI_API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const GITHUB_TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";
pub const PINATA_API_KEY_ENV_VAR: &str = "PINATA_API_KEY";
pub const PINATA_API_SECRET_ENV_VAR: &str = "PINATA_API_SECRET";
pub const WEB3_STORAGE_TOKEN_ENV_VAR: &str = "WEB3_STORAGE_TOKEN";

/// All credentials the agent may use. Missing values are `None`.
#[derive(Clone, Default)]
pub struct Secrets {
    pub private_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub github_token: Option<String>,
    pub pinata_api_key: Option<String>,
    pub pinata_api_secret: Option<String>,
    pub web3_storage_token: Option<String>,
}

impl Secrets {
    /// Read secrets from the process environment, honouring a `.env` file.
    pub fn from_env() -> Self {
        // A missing .env is normal.
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary lookup. Blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            private_key: get(PRIVATE_KEY_ENV_VAR),
            openai_api_key: get(OPENAI_API_KEY_ENV_VAR),
            github_token: get(GITHUB_TOKEN_ENV_VAR),
            pinata_api_key: get(PINATA_API_KEY_ENV_VAR),
            pinata_api_secret: get(PINATA_API_SECRET_ENV_VAR),
            web3_storage_token: get(WEB3_STORAGE_TOKEN_ENV_VAR),
        }
    }

    /// Names of required variables that are not set.
    ///
    /// `PRIVATE_KEY` is always required; `OPENAI_API_KEY` only when the
    /// hosted model is in use.
    pub fn missing_required(&self, use_local_model: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.private_key.is_none() {
            missing.push(PRIVATE_KEY_ENV_VAR);
        }
        if !use_local_model && self.openai_api_key.is_none() {
            missing.push(OPENAI_API_KEY_ENV_VAR);
        }
        missing
    }

    /// Pinata credentials, when both halves are present.
    pub fn pinata(&self) -> Option<(&str, &str)> {
        match (&self.pinata_api_key, &self.pinata_api_secret) {
            (Some(key), Some(secret)) => Some((key.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

fn mask(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("private_key", &mask(&self.private_key))
            .field("openai_api_key", &mask(&self.openai_api_key))
            .field("github_token", &mask(&self.github_token))
            .field("pinata_api_key", &mask(&self.pinata_api_key))
            .field("pinata_api_secret", &mask(&self.pinata_api_secret))
            .field("web3_storage_token", &mask(&self.web3_storage_token))
            .finish()
    }
}

/// 64 hex characters, with or without a `0x` prefix.
pub fn is_valid_private_key(key: &str) -> bool {
    let key = key.trim();
    let hex_part = key.strip_prefix("0x").unwrap_or(key);
    hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}

/// Format check for service API keys.
pub fn is_valid_api_key(service: &str, key: &str) -> bool {
    let key = key.trim();
    match service.to_ascii_lowercase().as_str() {
        "openai" => key.starts_with("sk-") && key.len() > 10,
        "github" => (key.starts_with("ghp_") || key.starts_with("github_pat_")) && key.len() > 10,
        "pinata" => key.len() > 10,
        _ => key.len() > 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn secrets_from(pairs: &[(&str, &str)]) -> Secrets {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Secrets::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_missing_required() {
        let secrets = secrets_from(&[]);
        assert_eq!(
            secrets.missing_required(false),
            vec![PRIVATE_KEY_ENV_VAR, OPENAI_API_KEY_ENV_VAR]
        );
        assert_eq!(secrets.missing_required(true), vec![PRIVATE_KEY_ENV_VAR]);
    }

    #[test]
    fn test_blank_values_are_absent() {
        let secrets = secrets_from(&[(PINATA_API_KEY_ENV_VAR, "key"), (PINATA_API_SECRET_ENV_VAR, "  ")]);
        assert!(secrets.pinata().is_none());

        let secrets = secrets_from(&[(PINATA_API_KEY_ENV_VAR, "key"), (PINATA_API_SECRET_ENV_VAR, "sec")]);
        assert_eq!(secrets.pinata(), Some(("key", "sec")));
    }

    #[test]
    fn test_debug_masks_values() {
        let secrets = secrets_from(&[(PRIVATE_KEY_ENV_VAR, "deadbeefdeadbeef")]);
        let rendered = format!("{:?}", secrets);
        assert!(!rendered.contains("deadbeef"));
        assert!(rendered.contains("<set>"));
        assert!(rendered.contains("<unset>"));
    }

    #[test]
    fn test_private_key_format() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        assert!(is_valid_private_key(key));
        assert!(is_valid_private_key(&format!("0x{}", key)));
        assert!(!is_valid_private_key(&key[1..]));
        assert!(!is_valid_private_key(&key.replace('a', "z")));
    }

    #[test]
    fn test_api_key_format() {
        assert!(is_valid_api_key("openai", "sk-abcdefghijkl"));
        assert!(!is_valid_api_key("openai", "pk-abcdefghijkl"));
        assert!(is_valid_api_key("GitHub", "github_pat_1234567"));
        assert!(is_valid_api_key("github", "ghp_abcdefghij"));
        assert!(!is_valid_api_key("github", "ghp_"));
        assert!(is_valid_api_key("other", "123456"));
    }
}
