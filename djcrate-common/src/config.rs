//! Configuration resolution for the djcrate tools
//!
//! Every setting resolves through the same ladder: command-line argument,
//! then environment variable, then the TOML config file, then a compiled
//! default. API keys skip the CLI tier (keys on the command line leak into
//! shell history) and resolve ENV then TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the collection store path.
pub const STORE_ENV: &str = "DJCRATE_STORE";
/// Environment variable naming the taxonomy file path.
pub const TAXONOMY_ENV: &str = "DJCRATE_TAXONOMY";
/// Environment variable selecting the analysis backend.
pub const BACKEND_ENV: &str = "DJCRATE_BACKEND";
/// Environment variable naming the playlist output directory.
pub const PLAYLIST_DIR_ENV: &str = "DJCRATE_PLAYLIST_DIR";

/// Fallback store path when nothing else is configured (the tools are
/// normally run from the collection root).
pub const DEFAULT_STORE: &str = "music_collection.json";
/// Fallback taxonomy path.
pub const DEFAULT_TAXONOMY: &str = "tag_taxonomy.txt";

/// Optional TOML configuration file (`~/.config/djcrate/config.toml`).
/// Every field is optional; missing fields fall through the ladder.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub store: Option<String>,
    pub taxonomy: Option<String>,
    pub backend: Option<String>,
    pub openai_model: Option<String>,
    pub anthropic_model: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub pacing_secs: Option<u64>,
    pub invalid_tag_penalty: Option<u32>,
    pub playlist_dir: Option<String>,
}

impl TomlConfig {
    /// Parse a specific config file. Unreadable or malformed TOML is a
    /// configuration error (the operator pointed at this file explicitly).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load the platform config file if it exists, defaults otherwise.
    pub fn load_default_location() -> Result<Self> {
        match default_config_path() {
            Some(path) if path.exists() => {
                let config = Self::load(&path)?;
                info!(config = %path.display(), "loaded TOML config");
                Ok(config)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Platform config file path (`<config dir>/djcrate/config.toml`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("djcrate").join("config.toml"))
}

/// Resolve a path setting through the standard ladder:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_path(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
    default: &str,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    if let Some(path) = toml_value {
        return PathBuf::from(path);
    }
    PathBuf::from(default)
}

/// Resolve a free-form string setting through the same ladder as
/// [`resolve_path`].
pub fn resolve_string(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
    default: &str,
) -> String {
    if let Some(value) = cli_arg {
        return value.to_string();
    }
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    if let Some(value) = toml_value {
        return value.to_string();
    }
    default.to_string()
}

/// Resolve an API key from ENV then TOML.
///
/// Warns when both sources define a key (potential misconfiguration) and
/// returns a configuration error naming every way to supply one when
/// neither does.
pub fn resolve_api_key(
    provider: &str,
    env_var_name: &str,
    toml_key: Option<&str>,
    toml_field_name: &str,
) -> Result<String> {
    let env_key = std::env::var(env_var_name).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k)).map(|k| k.to_string());

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML config. Using environment (highest priority).",
            provider
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", provider);
        return Ok(key.trim().to_string());
    }
    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", provider);
        return Ok(key.trim().to_string());
    }

    let config_path = default_config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "~/.config/djcrate/config.toml".to_string());
    Err(Error::Config(format!(
        "{} API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: {} ({} = \"your-key\")",
        provider, env_var_name, config_path, toml_field_name
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn cli_argument_wins_over_environment() {
        std::env::set_var("DJCRATE_TEST_STORE", "/from/env.json");
        let got = resolve_path(
            Some("/from/cli.json"),
            "DJCRATE_TEST_STORE",
            Some("/from/toml.json"),
            "default.json",
        );
        std::env::remove_var("DJCRATE_TEST_STORE");
        assert_eq!(got, PathBuf::from("/from/cli.json"));
    }

    #[test]
    #[serial]
    fn environment_wins_over_toml() {
        std::env::set_var("DJCRATE_TEST_STORE", "/from/env.json");
        let got = resolve_path(None, "DJCRATE_TEST_STORE", Some("/from/toml.json"), "d.json");
        std::env::remove_var("DJCRATE_TEST_STORE");
        assert_eq!(got, PathBuf::from("/from/env.json"));
    }

    #[test]
    #[serial]
    fn toml_wins_over_default() {
        std::env::remove_var("DJCRATE_TEST_STORE");
        let got = resolve_path(None, "DJCRATE_TEST_STORE", Some("/from/toml.json"), "d.json");
        assert_eq!(got, PathBuf::from("/from/toml.json"));
    }

    #[test]
    #[serial]
    fn blank_environment_value_is_ignored() {
        std::env::set_var("DJCRATE_TEST_STORE", "   ");
        let got = resolve_path(None, "DJCRATE_TEST_STORE", None, "default.json");
        std::env::remove_var("DJCRATE_TEST_STORE");
        assert_eq!(got, PathBuf::from("default.json"));
    }

    #[test]
    #[serial]
    fn api_key_resolves_from_environment() {
        std::env::set_var("DJCRATE_TEST_KEY", "sk-test-123");
        let got = resolve_api_key("Test", "DJCRATE_TEST_KEY", None, "test_api_key");
        std::env::remove_var("DJCRATE_TEST_KEY");
        assert_eq!(got.unwrap(), "sk-test-123");
    }

    #[test]
    #[serial]
    fn api_key_falls_back_to_toml() {
        std::env::remove_var("DJCRATE_TEST_KEY");
        let got = resolve_api_key("Test", "DJCRATE_TEST_KEY", Some("sk-toml"), "test_api_key");
        assert_eq!(got.unwrap(), "sk-toml");
    }

    #[test]
    #[serial]
    fn missing_api_key_error_names_both_sources() {
        std::env::remove_var("DJCRATE_TEST_KEY");
        let err = resolve_api_key("Test", "DJCRATE_TEST_KEY", None, "test_api_key").unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("DJCRATE_TEST_KEY"));
                assert!(msg.contains("test_api_key"));
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_key_is_invalid() {
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
        assert!(is_valid_key("sk-real"));
    }

    #[test]
    fn toml_config_parses_known_fields() {
        let parsed: TomlConfig = toml::from_str(
            r#"
            store = "/music/music_collection.json"
            backend = "anthropic"
            invalid_tag_penalty = 10
            "#,
        )
        .unwrap();
        assert_eq!(parsed.store.as_deref(), Some("/music/music_collection.json"));
        assert_eq!(parsed.backend.as_deref(), Some("anthropic"));
        assert_eq!(parsed.invalid_tag_penalty, Some(10));
        assert!(parsed.openai_model.is_none());
    }
}
