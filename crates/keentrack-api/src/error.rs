use thiserror::Error;

/// Top-level error type for the `keentrack-api` crate.
///
/// Covers every failure mode of one request against the router:
/// authentication, transport, HTTP status, and response decoding.
/// `keentrack-core` maps these into domain errors for reporting.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Digest handshake failed (second 401 after the challenge retry,
    /// or the router sent a 401 without a usable Digest challenge).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Router responses ────────────────────────────────────────────
    /// Non-2xx, non-401 HTTP status from the router.
    #[error("Router returned HTTP {status}")]
    Status { status: u16 },

    // ── Data ────────────────────────────────────────────────────────
    /// Response packet failed to parse or had an unexpected shape.
    #[error("Decode error: {message}")]
    Decode { message: String },
}

impl Error {
    /// Returns `true` if this error indicates rejected credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying at
    /// the next poll interval.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status } => *status >= 500,
            _ => false,
        }
    }
}
