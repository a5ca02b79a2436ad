// ── Runtime tracker configuration ──
//
// Describes *how* to reach one router. Carries credential data and
// connection tuning, but never touches disk -- the daemon constructs a
// `TrackerConfig` from keentrack-config and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Configuration for tracking devices on a single router.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Router command endpoint (e.g., `http://192.168.1.1/ci`).
    pub url: Url,
    /// Digest auth username.
    pub username: String,
    /// Digest auth password.
    pub password: SecretString,
    /// How often to poll (seconds). 0 = never poll in the background.
    pub poll_interval_secs: u64,
    /// Request timeout.
    pub timeout: Duration,
    /// DHCP pool queried for lease bindings.
    pub dhcp_pool: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            url: "http://192.168.1.1/ci".parse().unwrap(),
            username: "admin".into(),
            password: SecretString::from(String::new()),
            poll_interval_secs: 10,
            timeout: Duration::from_secs(30),
            dhcp_pool: "_WEBADMIN".into(),
        }
    }
}
