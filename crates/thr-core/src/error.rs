// ── Core error types ──
//
// User-facing errors from thr-core. Consumers never see HTTP status codes
// or JSON parse failures directly; the `From<thr_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to registry at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Registry request timed out")]
    Timeout,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Control not found: {identifier}")]
    ControlNotFound { identifier: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Operation rejected by registry: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Store error code (e.g. `"23503"` for a foreign-key violation).
        code: Option<String>,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<thr_api::Error> for CoreError {
    fn from(err: thr_api::Error) -> Self {
        let conflict = err.is_conflict();
        match err {
            thr_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "Invalid API key".into(),
            },
            thr_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            thr_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            thr_api::Error::ClientBuild(message) => CoreError::Config { message },
            thr_api::Error::Api { message, .. } if conflict => CoreError::Rejected { message },
            thr_api::Error::Api {
                status: 401 | 403,
                message,
                ..
            } => CoreError::AuthenticationFailed { message },
            thr_api::Error::Api {
                status,
                message,
                code,
                ..
            } => CoreError::Api {
                message,
                code,
                status: Some(status),
            },
            thr_api::Error::Deserialization { message, .. } => CoreError::Api {
                message: format!("Unexpected response from registry: {message}"),
                code: None,
                status: None,
            },
        }
    }
}

impl CoreError {
    /// Returns `true` for errors caused by bad input rather than the registry.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed { .. })
    }
}
