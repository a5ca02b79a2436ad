// ── Reconciliation ──
//
// Turns one poll cycle's station and lease lists into registry
// mutations. Leases are the source of identity: a station with no
// matching lease carries no IP or display name and is skipped. The
// online sweep at the end is unconditional -- every known device gets
// its online flag recomputed every cycle, so devices that vanished from
// the station list go offline without ever being deleted.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use keentrack_api::{Lease, Station};

use crate::model::MacAddress;
use crate::registry::DeviceRegistry;

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<MacAddress>,
    pub updated: Vec<MacAddress>,
    pub online: Vec<MacAddress>,
    pub offline: Vec<MacAddress>,
    /// Stations dropped for lack of a matching lease.
    pub orphaned: usize,
}

/// Reconcile freshly fetched stations and leases against the registry.
///
/// Idempotent: running twice with identical input produces the same
/// final registry state (notifications fire each time).
pub fn reconcile(
    registry: &mut DeviceRegistry,
    stations: &[Station],
    leases: &[Lease],
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();

    // Last write wins on duplicate MACs; duplicates are unexpected but
    // must not derail the cycle.
    let mut lease_by_mac: HashMap<MacAddress, &Lease> = HashMap::new();
    for lease in leases {
        lease_by_mac.insert(MacAddress::new(&lease.mac), lease);
    }

    let mut seen: HashSet<MacAddress> = HashSet::new();

    for station in stations {
        let mac = MacAddress::new(&station.mac);
        let Some(lease) = lease_by_mac.get(&mac) else {
            warn!(mac = %mac, rssi = station.rssi, "station has no matching lease; skipping");
            summary.orphaned += 1;
            continue;
        };

        seen.insert(mac.clone());

        if registry.contains(&mac) {
            registry.set_rssi(&mac, station.rssi);
            registry.set_ip(&mac, &lease.ip);
            summary.updated.push(mac);
        } else {
            registry.add_device(station, lease);
            summary.added.push(mac);
        }
    }

    // Unconditional full sweep: online iff seen this cycle.
    for mac in registry.macs() {
        let online = seen.contains(&mac);
        registry.set_online(&mac, online);
        if online {
            summary.online.push(mac);
        } else {
            summary.offline.push(mac);
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::model::{DeviceEvent, TrackedDevice};

    use super::*;

    fn station(mac: &str, rssi: i32) -> Station {
        Station {
            mac: mac.into(),
            rssi,
        }
    }

    fn lease(mac: &str, ip: &str, name: &str) -> Lease {
        Lease {
            mac: mac.into(),
            ip: ip.into(),
            name: Some(name.into()),
            hostname: None,
        }
    }

    fn mac(raw: &str) -> MacAddress {
        MacAddress::new(raw)
    }

    #[test]
    fn orphan_station_creates_nothing() {
        let mut registry = DeviceRegistry::new();

        let summary = reconcile(&mut registry, &[station("aa:00:00:00:00:01", -50)], &[]);

        assert!(registry.is_empty());
        assert_eq!(summary.orphaned, 1);
        assert!(summary.added.is_empty());
    }

    #[test]
    fn station_with_lease_creates_an_online_device() {
        let mut registry = DeviceRegistry::new();
        let mut events = registry.subscribe();

        let summary = reconcile(
            &mut registry,
            &[station("aa:00:00:00:00:01", -50)],
            &[lease("aa:00:00:00:00:01", "10.0.0.2", "phone")],
        );

        assert_eq!(summary.added, vec![mac("aa:00:00:00:00:01")]);
        assert_eq!(summary.online, vec![mac("aa:00:00:00:00:01")]);
        assert_eq!(
            registry.get(&mac("aa:00:00:00:00:01")),
            Some(&TrackedDevice {
                mac: mac("aa:00:00:00:00:01"),
                name: "phone".into(),
                ip: "10.0.0.2".into(),
                rssi: -50,
                online: true,
            })
        );

        assert!(matches!(events.try_recv(), Ok(DeviceEvent::Added(_))));
        assert!(matches!(events.try_recv(), Ok(DeviceEvent::Connected(_))));
    }

    #[test]
    fn absent_station_goes_offline_but_stays_registered() {
        let mut registry = DeviceRegistry::new();
        reconcile(
            &mut registry,
            &[station("aa:00:00:00:00:01", -50)],
            &[lease("aa:00:00:00:00:01", "10.0.0.2", "phone")],
        );

        // Next cycle: no stations, leases still present.
        let summary = reconcile(
            &mut registry,
            &[],
            &[lease("aa:00:00:00:00:01", "10.0.0.2", "phone")],
        );

        assert_eq!(summary.offline, vec![mac("aa:00:00:00:00:01")]);
        let device = registry.get(&mac("aa:00:00:00:00:01")).unwrap();
        assert!(!device.online);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn returning_station_reconnects() {
        let mut registry = DeviceRegistry::new();
        let stations = [station("aa:00:00:00:00:01", -50)];
        let leases = [lease("aa:00:00:00:00:01", "10.0.0.2", "phone")];

        reconcile(&mut registry, &stations, &leases);
        reconcile(&mut registry, &[], &leases);

        let mut events = registry.subscribe();
        let summary = reconcile(&mut registry, &stations, &leases);

        assert_eq!(summary.updated, vec![mac("aa:00:00:00:00:01")]);
        assert_eq!(summary.online, vec![mac("aa:00:00:00:00:01")]);
        assert!(registry.get(&mac("aa:00:00:00:00:01")).unwrap().online);

        // rssi + ip + online property notifications, then the Connected
        // transition.
        let mut saw_connected = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, DeviceEvent::Connected(_)) {
                saw_connected = true;
            }
        }
        assert!(saw_connected);
    }

    #[test]
    fn update_refreshes_rssi_and_ip() {
        let mut registry = DeviceRegistry::new();
        reconcile(
            &mut registry,
            &[station("aa:00:00:00:00:01", -50)],
            &[lease("aa:00:00:00:00:01", "10.0.0.2", "phone")],
        );

        reconcile(
            &mut registry,
            &[station("aa:00:00:00:00:01", -71)],
            &[lease("aa:00:00:00:00:01", "10.0.0.7", "phone")],
        );

        let device = registry.get(&mac("aa:00:00:00:00:01")).unwrap();
        assert_eq!(device.rssi, -71);
        assert_eq!(device.ip, "10.0.0.7");
        // Name is fixed at creation.
        assert_eq!(device.name, "phone");
    }

    #[test]
    fn reconcile_is_idempotent() {
        let stations = [
            station("aa:00:00:00:00:01", -50),
            station("aa:00:00:00:00:02", -60),
        ];
        let leases = [
            lease("aa:00:00:00:00:01", "10.0.0.2", "phone"),
            lease("aa:00:00:00:00:02", "10.0.0.3", "laptop"),
        ];

        let mut registry = DeviceRegistry::new();
        reconcile(&mut registry, &stations, &leases);
        let first: Vec<_> = sorted_devices(&registry);

        reconcile(&mut registry, &stations, &leases);
        let second: Vec<_> = sorted_devices(&registry);

        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_lease_macs_last_write_wins() {
        let mut registry = DeviceRegistry::new();

        reconcile(
            &mut registry,
            &[station("aa:00:00:00:00:01", -50)],
            &[
                lease("aa:00:00:00:00:01", "10.0.0.2", "stale"),
                lease("aa:00:00:00:00:01", "10.0.0.9", "fresh"),
            ],
        );

        let device = registry.get(&mac("aa:00:00:00:00:01")).unwrap();
        assert_eq!(device.ip, "10.0.0.9");
        assert_eq!(device.name, "fresh");
    }

    #[test]
    fn station_mac_case_differences_still_match_leases() {
        let mut registry = DeviceRegistry::new();

        let summary = reconcile(
            &mut registry,
            &[station("AA:00:00:00:00:01", -50)],
            &[lease("aa:00:00:00:00:01", "10.0.0.2", "phone")],
        );

        assert_eq!(summary.orphaned, 0);
        assert_eq!(summary.added, vec![mac("aa:00:00:00:00:01")]);
    }

    fn sorted_devices(registry: &DeviceRegistry) -> Vec<TrackedDevice> {
        let mut devices = registry.devices();
        devices.sort_by(|a, b| a.mac.as_str().cmp(b.mac.as_str()));
        devices
    }
}
