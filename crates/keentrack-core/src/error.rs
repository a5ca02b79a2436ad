// ── Core error types ──
//
// Cycle-level errors reported by the tracker. These are NOT wire-specific --
// consumers never see reqwest errors or XML parse failures directly.
// The `From<keentrack_api::Error>` impl translates transport-layer errors
// into domain-appropriate variants so the scheduler can report auth
// failures distinctly from transport hiccups.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach router at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ── Cycle errors ─────────────────────────────────────────────────
    #[error("Router returned HTTP {status}")]
    RouterStatus { status: u16 },

    #[error("Response decode failed: {message}")]
    DecodeFailed { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the cycle failed because the router rejected
    /// our credentials (as opposed to a transient fault).
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<keentrack_api::Error> for CoreError {
    fn from(err: keentrack_api::Error) -> Self {
        match err {
            keentrack_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            keentrack_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".into()),
                reason: e.to_string(),
            },
            keentrack_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            keentrack_api::Error::Status { status } => CoreError::RouterStatus { status },
            keentrack_api::Error::Decode { message } => CoreError::DecodeFailed { message },
        }
    }
}
