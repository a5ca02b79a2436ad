// keentrack-core: device registry, reconciliation, and poll lifecycle
// between keentrack-api and consumers (daemon, tests).

pub mod config;
pub mod error;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::TrackerConfig;
pub use error::CoreError;
pub use model::{DeviceEvent, MacAddress, Property, PropertyValue, TrackedDevice};
pub use reconcile::{reconcile, ReconcileSummary};
pub use registry::DeviceRegistry;
pub use tracker::Tracker;
