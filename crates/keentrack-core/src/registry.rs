// ── Device registry ──
//
// Owns the durable TrackedDevice map and the notification channel.
// This is the only mutation surface into shared device state: every
// write goes through a set-and-notify method so subscribers observe the
// same sequence of changes the registry applied. Devices are never
// removed -- going absent only drives `online = false`.

use std::collections::HashMap;

use tokio::sync::broadcast;
use tracing::debug;

use keentrack_api::{Lease, Station};

use crate::model::{DeviceEvent, MacAddress, Property, PropertyValue, TrackedDevice};

const EVENT_CHANNEL_SIZE: usize = 256;

/// In-memory registry of every wireless client ever observed.
pub struct DeviceRegistry {
    devices: HashMap<MacAddress, TrackedDevice>,
    events: broadcast::Sender<DeviceEvent>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self::with_sender(events)
    }

    /// Create a registry that publishes on an externally owned channel,
    /// so the owner can hand out subscriptions without locking the
    /// registry itself.
    pub fn with_sender(events: broadcast::Sender<DeviceEvent>) -> Self {
        Self {
            devices: HashMap::new(),
            events,
        }
    }

    /// Subscribe to mutation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn contains(&self, mac: &MacAddress) -> bool {
        self.devices.contains_key(mac)
    }

    pub fn get(&self, mac: &MacAddress) -> Option<&TrackedDevice> {
        self.devices.get(mac)
    }

    /// Snapshot of every known device.
    pub fn devices(&self) -> Vec<TrackedDevice> {
        self.devices.values().cloned().collect()
    }

    /// Every known MAC.
    pub fn macs(&self) -> Vec<MacAddress> {
        self.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a device from its first observation. The display name
    /// comes from the lease (`name`, then `hostname`, then the MAC) and
    /// is fixed for the lifetime of the device.
    pub fn add_device(&mut self, station: &Station, lease: &Lease) -> TrackedDevice {
        let mac = MacAddress::new(&station.mac);
        let device = TrackedDevice {
            mac: mac.clone(),
            name: lease.display_name().unwrap_or(mac.as_str()).to_owned(),
            ip: lease.ip.clone(),
            rssi: station.rssi,
            online: true,
        };
        debug!(mac = %mac, name = %device.name, ip = %device.ip, "adding device");
        self.devices.insert(mac.clone(), device.clone());
        self.emit(DeviceEvent::Added(device.clone()));
        self.emit(DeviceEvent::Connected(mac));
        device
    }

    /// Set the device's IP and notify. No-op for unknown MACs.
    pub fn set_ip(&mut self, mac: &MacAddress, ip: &str) {
        if let Some(device) = self.devices.get_mut(mac) {
            device.ip = ip.to_owned();
            self.emit(DeviceEvent::PropertyChanged {
                mac: mac.clone(),
                property: Property::Ip,
                value: PropertyValue::Text(ip.to_owned()),
            });
        }
    }

    /// Set the device's signal strength and notify. No-op for unknown MACs.
    pub fn set_rssi(&mut self, mac: &MacAddress, rssi: i32) {
        if let Some(device) = self.devices.get_mut(mac) {
            device.rssi = rssi;
            self.emit(DeviceEvent::PropertyChanged {
                mac: mac.clone(),
                property: Property::Rssi,
                value: PropertyValue::Dbm(rssi),
            });
        }
    }

    /// Set the device's online flag and notify. Emits a
    /// `Connected`/`Disconnected` transition event when the flag
    /// actually flips. No-op for unknown MACs.
    pub fn set_online(&mut self, mac: &MacAddress, online: bool) {
        let Some(device) = self.devices.get_mut(mac) else {
            return;
        };
        let was_online = device.online;
        device.online = online;

        self.emit(DeviceEvent::PropertyChanged {
            mac: mac.clone(),
            property: Property::Online,
            value: PropertyValue::Flag(online),
        });
        if online != was_online {
            debug!(mac = %mac, online, "device transitioned");
            self.emit(if online {
                DeviceEvent::Connected(mac.clone())
            } else {
                DeviceEvent::Disconnected(mac.clone())
            });
        }
    }

    fn emit(&self, event: DeviceEvent) {
        // Nobody listening is fine; the registry stays consistent
        // whether or not a subscriber exists.
        let _ = self.events.send(event);
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
