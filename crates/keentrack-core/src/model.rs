// ── Domain model ──
//
// MacAddress is the identity of everything in this crate: stations,
// leases, and tracked devices all key on it. TrackedDevice is the
// durable entity owned by the registry; it is created once per MAC and
// never deleted, only mutated.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format
/// (aa:bb:cc:dd:ee:ff). Hardware addresses are case-insensitive on the
/// wire; normalizing at construction makes lookups trivially correct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated or dash-separated hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_ascii_lowercase().replace('-', ":"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MacAddress {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

// ── TrackedDevice ───────────────────────────────────────────────────

/// A known wireless client, keyed by MAC.
///
/// `name` is set once at creation from the lease record and never
/// changes; `ip`, `rssi`, and `online` are refreshed every poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDevice {
    pub mac: MacAddress,
    pub name: String,
    pub ip: String,
    pub rssi: i32,
    pub online: bool,
}

// ── Events ──────────────────────────────────────────────────────────

/// A mutable device property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Property {
    Ip,
    Rssi,
    Online,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ip => "ip",
            Self::Rssi => "rssi",
            Self::Online => "online",
        })
    }
}

/// The value written to a property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyValue {
    Text(String),
    Dbm(i32),
    Flag(bool),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Dbm(v) => write!(f, "{v}"),
            Self::Flag(v) => write!(f, "{v}"),
        }
    }
}

/// Registry notification, broadcast to subscribers on every mutation.
///
/// `PropertyChanged` fires on every set, whether or not the value
/// differs -- the poll cycle is set-and-notify, not diff-and-notify.
/// `Connected`/`Disconnected` fire only on actual transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added(TrackedDevice),
    Connected(MacAddress),
    Disconnected(MacAddress),
    PropertyChanged {
        mac: MacAddress,
        property: Property,
        value: PropertyValue,
    },
}
