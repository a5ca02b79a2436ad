// ── Tracker lifecycle ──
//
// Owns the registry, the digest client, and the single background poll
// task. One cycle = encode the command packet, fetch, decode, reconcile.
// Cycle failures are reported and never stop the scheduler; cycles are
// serialized by construction (the task awaits each cycle before the
// next tick is considered).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use keentrack_api::transport::TransportConfig;
use keentrack_api::{decode_packet, encode_packet, DigestClient, ShowCommand};

use crate::config::TrackerConfig;
use crate::error::CoreError;
use crate::model::{DeviceEvent, TrackedDevice};
use crate::reconcile::{reconcile, ReconcileSummary};
use crate::registry::DeviceRegistry;

const EVENT_CHANNEL_SIZE: usize = 256;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<TrackerInner>`. Manages the poll
/// lifecycle: immediate first cycle on [`start()`](Self::start), then
/// one cycle per interval tick until [`stop()`](Self::stop).
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    client: DigestClient,
    registry: Mutex<DeviceRegistry>,
    event_tx: broadcast::Sender<DeviceEvent>,
    last_poll: watch::Sender<Option<DateTime<Utc>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Tracker {
    /// Create a new Tracker from configuration. Does NOT poll -- call
    /// [`start()`](Self::start) to begin the background cycle, or
    /// [`poll_once()`](Self::poll_once) for a single pass.
    pub fn new(config: TrackerConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
        };
        let client = DigestClient::new(
            config.url.clone(),
            config.username.clone(),
            config.password.clone(),
            &transport,
        )?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let registry = DeviceRegistry::with_sender(event_tx.clone());
        let (last_poll, _) = watch::channel(None);

        Ok(Self {
            inner: Arc::new(TrackerInner {
                config,
                client,
                registry: Mutex::new(registry),
                event_tx,
                last_poll,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Access the tracker configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Subscribe to device events.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Observe the time of the last successful poll cycle.
    pub fn last_poll(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.inner.last_poll.subscribe()
    }

    /// Snapshot of every known device.
    pub async fn devices(&self) -> Vec<TrackedDevice> {
        self.inner.registry.lock().await.devices()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background poll task: one cycle immediately, then one
    /// per interval tick. A no-op when `poll_interval_secs` is 0.
    pub async fn start(&self) {
        let interval_secs = self.inner.config.poll_interval_secs;
        if interval_secs == 0 {
            debug!("background polling disabled (interval 0)");
            return;
        }

        let mut handles = self.inner.task_handles.lock().await;
        let tracker = self.clone();
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(poll_task(
            tracker,
            Duration::from_secs(interval_secs),
            cancel,
        )));
        info!(interval_secs, "device tracking started");
    }

    /// Cancel the poll task and wait for it to finish.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("device tracking stopped");
    }

    // ── One cycle ────────────────────────────────────────────────────

    /// Run one fetch + decode + reconcile pass.
    ///
    /// Reconciliation happens strictly after the response is fully
    /// decoded; on any error the registry is left untouched and devices
    /// keep their last known state.
    pub async fn poll_once(&self) -> Result<ReconcileSummary, CoreError> {
        let body = encode_packet(&[
            ShowCommand::associations(),
            ShowCommand::dhcp_bindings(&self.inner.config.dhcp_pool),
        ]);

        let xml = self.inner.client.post_xml(&body).await?;
        let snapshot = decode_packet(&xml)?;

        let mut registry = self.inner.registry.lock().await;
        let summary = reconcile(&mut registry, &snapshot.stations, &snapshot.leases);
        drop(registry);

        let _ = self.inner.last_poll.send(Some(Utc::now()));
        debug!(
            added = summary.added.len(),
            updated = summary.updated.len(),
            online = summary.online.len(),
            offline = summary.offline.len(),
            orphaned = summary.orphaned,
            "poll cycle complete"
        );
        Ok(summary)
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Drive poll cycles until cancelled. The first tick fires immediately;
/// `MissedTickBehavior::Delay` keeps cycles serialized when one runs
/// longer than the interval.
async fn poll_task(tracker: Tracker, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = tracker.poll_once().await {
                    if e.is_auth() {
                        warn!(error = %e, "poll cycle rejected; check router credentials");
                    } else {
                        warn!(error = %e, "poll cycle failed");
                    }
                }
            }
        }
    }
}
