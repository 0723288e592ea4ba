//! Shared configuration for the THR CLI and TUI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `thr_core::RegistryConfig`. Both binaries depend
//! on this crate; the CLI adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use thr_core::{RegistryConfig, TlsVerification};

/// Keyring service name; entries are keyed `<profile>/api-key`.
pub const KEYRING_SERVICE: &str = "thr";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no API key found for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("cannot write configuration: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("cannot read configuration: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Schema ──────────────────────────────────────────────────────────

/// Contents of `config.toml`, read by both `thr` and `thr-tui`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named registry profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, else the configured
    /// default, else `"default"`.
    pub fn active_profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(ToOwned::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named registry profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Store project URL (e.g., "https://abc.supabase.co").
    pub url: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Name of an environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// PEM bundle to trust instead of the system roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Accept self-signed certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

// ── File location ───────────────────────────────────────────────────

const CONFIG_FILE: &str = "config.toml";

/// Platform config dir (`~/.config/thr/config.toml` on Linux). Falls back
/// to `$HOME/.config/thr` when no home directory can be determined.
pub fn config_path() -> PathBuf {
    match ProjectDirs::from("com", "thr", "thr") {
        Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
        None => PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
            .join(".config")
            .join("thr")
            .join(CONFIG_FILE),
    }
}

// ── Load / save ─────────────────────────────────────────────────────

pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `THR_*` environment. A missing file yields defaults.
///
/// Nested keys use a double underscore: `THR_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("THR_").split("__"))
        .extract()?)
}

/// Like [`load_config`], but an unreadable file counts as empty.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── API key lookup ──────────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> keyring::Result<keyring::Entry> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
}

/// First hit wins: the profile's `api_key_env` variable, then the OS
/// keyring, then a plaintext `api_key` in the file.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    let from_env = || {
        profile
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
    };
    let from_keyring = || keyring_entry(profile_name).and_then(|e| e.get_password()).ok();
    let from_file = || profile.api_key.clone();

    from_env()
        .or_else(from_keyring)
        .or_else(from_file)
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

pub fn store_api_key(profile_name: &str, api_key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(api_key)?;
    Ok(())
}

/// Parse and check a profile URL.
pub fn parse_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// TLS strategy for a profile.
pub fn profile_tls(profile: &Profile) -> TlsVerification {
    if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `RegistryConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_registry_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<RegistryConfig, ConfigError> {
    let url = parse_url(&profile.url)?;
    let api_key = resolve_api_key(profile, profile_name)?;

    Ok(RegistryConfig {
        url,
        api_key,
        tls: profile_tls(profile),
        timeout: Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "prod"

[defaults]
output = "json"

[profiles.prod]
url = "https://abc.supabase.co"
api_key = "plain-key"
api_key_env = "THR_TEST_KEY_THAT_IS_NEVER_SET"
timeout = 12

[profiles.lab]
url = "https://lab.internal:8443"
insecure = true
"#;

    fn write_sample() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, SAMPLE).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("prod"));
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.color, "auto");
        assert_eq!(config.defaults.timeout, 30);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles["lab"].insecure, Some(true));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_preserves_profiles() {
        let (dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();
        let out = dir.path().join("nested").join("config.toml");
        save_config_to(&config, &out).unwrap();
        assert_eq!(load_config_from(&out).unwrap().profiles, config.profiles);
    }

    #[test]
    fn active_profile_prefers_explicit_choice() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();
        assert_eq!(config.active_profile_name(None), "prod");
        assert_eq!(config.active_profile_name(Some("lab")), "lab");
        assert!(matches!(
            config.profile("ghost"),
            Err(ConfigError::ProfileNotFound { .. })
        ));
    }

    #[test]
    fn plaintext_key_is_last_resort() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();
        let key = resolve_api_key(&config.profiles["prod"], "thr-test-prod").unwrap();
        assert_eq!(key.expose_secret(), "plain-key");
    }

    #[test]
    fn registry_config_from_profile() {
        let (_dir, path) = write_sample();
        let config = load_config_from(&path).unwrap();
        let registry = profile_to_registry_config(&config.profiles["prod"], "thr-test-prod").unwrap();
        assert_eq!(registry.url.as_str(), "https://abc.supabase.co/");
        assert_eq!(registry.timeout, Duration::from_secs(12));
        assert_eq!(registry.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn insecure_profile_skips_verification() {
        let profile = Profile {
            url: "https://lab.internal".into(),
            insecure: Some(true),
            ca_cert: Some("/etc/ca.pem".into()),
            ..Profile::default()
        };
        assert_eq!(profile_tls(&profile), TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(matches!(
            parse_url("not a url"),
            Err(ConfigError::Validation { .. })
        ));
        assert!(matches!(
            parse_url("ftp://example.com"),
            Err(ConfigError::Validation { .. })
        ));
    }
}
