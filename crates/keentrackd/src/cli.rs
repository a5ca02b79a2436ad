// CLI surface for the daemon. Flags override the config file; the
// password never has a flag (env var or keyring only).

use std::path::PathBuf;

use clap::Parser;
use secrecy::SecretString;
use thiserror::Error;

use keentrack_core::{CoreError, TrackerConfig};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] keentrack_config::ConfigError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Track wireless clients attached to a Keenetic router.
#[derive(Debug, Parser)]
#[command(name = "keentrackd", version, about)]
pub struct Cli {
    /// Path to the config file (default: platform config dir).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Router command endpoint, e.g. http://192.168.1.1/ci.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Digest auth username.
    #[arg(long, env = "KEENETIC_USERNAME")]
    pub username: Option<String>,

    /// Digest auth password.
    #[arg(long, env = "KEENETIC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Poll interval in seconds.
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// DHCP pool queried for lease bindings.
    #[arg(long, value_name = "POOL")]
    pub pool: Option<String>,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Resolve the effective tracker configuration: config file first,
    /// then flag overrides on top.
    pub fn tracker_config(&self) -> Result<TrackerConfig, DaemonError> {
        let mut file_cfg = match self.config {
            Some(ref path) => keentrack_config::load_config_from(path)?,
            None => keentrack_config::load_config_or_default(),
        };

        if let Some(ref url) = self.url {
            file_cfg.router.url = url.clone();
        }
        if let Some(ref username) = self.username {
            file_cfg.router.username = Some(username.clone());
        }
        if let Some(ref password) = self.password {
            file_cfg.router.password = Some(password.clone());
        }
        if let Some(interval) = self.interval {
            file_cfg.router.interval = interval;
        }
        if let Some(ref pool) = self.pool {
            file_cfg.router.dhcp_pool = pool.clone();
        }

        let mut config = keentrack_config::to_tracker_config(&file_cfg)?;

        // A --password flag wins over the whole resolution chain.
        if let Some(ref password) = self.password {
            config.password = SecretString::from(password.clone());
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
