// ── Runtime registry configuration ──
//
// These types describe *how* to reach the registry store. They carry
// credential data and connection tuning, but never touch disk. The
// CLI/TUI constructs a `RegistryConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Default for hosted stores.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted store with a self-signed cert).
    DangerAcceptInvalid,
}

/// Configuration for connecting to one registry store.
///
/// Built by CLI/TUI, passed to `Registry::connect` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Project URL (e.g., `https://abc.supabase.co`).
    pub url: Url,
    /// API key sent as `apikey` and bearer token.
    pub api_key: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Request timeout.
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub(crate) fn transport(&self) -> thr_api::TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => thr_api::TlsMode::System,
            TlsVerification::CustomCa(path) => thr_api::TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => thr_api::TlsMode::DangerAcceptInvalid,
        };
        thr_api::TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}
