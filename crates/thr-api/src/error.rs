use thiserror::Error;

/// Top-level error type for the `thr-api` crate.
///
/// Covers transport, authentication, and store-side failures.
/// `thr-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The store rejected the API key (HTTP 401).
    #[error("Invalid API key")]
    InvalidApiKey,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed (bad CA file, bad header).
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    // ── Store ───────────────────────────────────────────────────────
    /// Structured error from the store, parsed from
    /// `{ code, message, details, hint }`.
    #[error("Store API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
        hint: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for unique-key violations (duplicate control id).
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Api { status: 409, .. } => true,
            Self::Api { code, .. } => code.as_deref() == Some("23505"),
            _ => false,
        }
    }
}
