// Wire-level result types decoded from the router's response packet.
//
// Both records are ephemeral: they live for one poll cycle and are
// consumed by the reconciler in keentrack-core, which owns the durable
// device representation. MACs stay raw strings here; normalization
// happens in the core domain layer.

use serde::{Deserialize, Serialize};

/// A currently-associated radio client from `show associations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub mac: String,
    /// Signal strength in dB.
    pub rssi: i32,
}

/// A DHCP binding record from `show ip dhcp bindings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub mac: String,
    pub ip: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

impl Lease {
    /// Display name for the device: `name` preferred, `hostname` fallback.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().or(self.hostname.as_deref())
    }
}

/// Everything one successful poll cycle learns from the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSnapshot {
    pub stations: Vec<Station>,
    pub leases: Vec<Lease>,
}
