//! CLI configuration — thin wrapper around `thr_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--url, --api-key, etc.).

use std::time::Duration;

use clap::ArgMatches;
use clap::ValueEnum;
use clap::parser::ValueSource;
use secrecy::SecretString;
use tracing::warn;

use thr_core::{RegistryConfig, TlsVerification};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use thr_config::{
    Config, Defaults, Profile, config_path, load_config_or_default, save_config,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Fill `--output`, `--color` and `--timeout` from the config file's
/// `[defaults]` when neither the command line nor the environment set them.
pub fn apply_defaults(global: &mut GlobalOpts, matches: &ArgMatches, defaults: &Defaults) {
    let unset = |id: &str| {
        matches!(
            matches.value_source(id),
            None | Some(ValueSource::DefaultValue)
        )
    };

    if unset("output") {
        match OutputFormat::from_str(&defaults.output, true) {
            Ok(format) => global.output = format,
            Err(_) => warn!(value = %defaults.output, "ignoring unknown default output format"),
        }
    }
    if unset("color") {
        match ColorMode::from_str(&defaults.color, true) {
            Ok(mode) => global.color = mode,
            Err(_) => warn!(value = %defaults.color, "ignoring unknown default color mode"),
        }
    }
    if unset("timeout") {
        global.timeout = defaults.timeout;
    }
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names, for error help text.
pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

/// Build a `RegistryConfig` from the config file, profile, and CLI overrides.
pub fn build_registry_config(global: &GlobalOpts) -> Result<RegistryConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&profile_name) {
        return resolve_profile(profile, &profile_name, global);
    }

    // An explicitly requested profile must exist.
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name,
            available: available_profiles(&cfg),
        });
    }

    // No profile -- build from CLI flags / env vars alone
    let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
        path: config_path().display().to_string(),
    })?;
    let url = thr_config::parse_url(url_str)?;

    let api_key = global
        .api_key
        .clone()
        .map(SecretString::from)
        .ok_or(CliError::NoCredentials {
            profile: profile_name,
        })?;

    Ok(RegistryConfig {
        url,
        api_key,
        tls: if global.insecure {
            TlsVerification::DangerAcceptInvalid
        } else {
            TlsVerification::SystemDefaults
        },
        timeout: Duration::from_secs(global.timeout),
    })
}

/// Translate a `Profile` + global flags into a `RegistryConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<RegistryConfig, CliError> {
    // 1. URL (flag > env > profile)
    let url = thr_config::parse_url(global.url.as_deref().unwrap_or(&profile.url))?;

    // 2. API key (flag > shared chain)
    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => thr_config::resolve_api_key(profile, profile_name)?,
    };

    // 3. TLS verification
    let tls = if global.insecure {
        TlsVerification::DangerAcceptInvalid
    } else {
        thr_config::profile_tls(profile)
    };

    // 4. Timeout (profile wins over the flag default)
    let timeout = Duration::from_secs(profile.timeout.unwrap_or(global.timeout));

    Ok(RegistryConfig {
        url,
        api_key,
        tls,
        timeout,
    })
}
