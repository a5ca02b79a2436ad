// End-to-end poll cycle tests against a wiremock router.
//
// The mock router answers the first unauthenticated POST with a Digest
// challenge and authenticated POSTs with a canned response packet, so
// these tests exercise the whole pipeline: encode, digest handshake,
// decode, reconcile, events.

use std::time::Duration;

use secrecy::SecretString;
use wiremock::matchers::{method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

use keentrack_core::{CoreError, DeviceEvent, MacAddress, Tracker, TrackerConfig};

const CHALLENGE: &str =
    "Digest realm=\"KEENETIC\", nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", qop=\"auth\"";

const PHONE_ONLINE: &str = r#"<packet>
  <response id="associations">
    <station><mac>50:ff:20:00:00:01</mac><rssi>-41</rssi></station>
  </response>
  <response id="bindings">
    <lease><mac>50:ff:20:00:00:01</mac><ip>192.168.1.33</ip><name>phone</name></lease>
  </response>
</packet>"#;

const PHONE_ABSENT: &str = r#"<packet>
  <response id="associations"></response>
  <response id="bindings">
    <lease><mac>50:ff:20:00:00:01</mac><ip>192.168.1.33</ip><name>phone</name></lease>
  </response>
</packet>"#;

// ── Helpers ─────────────────────────────────────────────────────────

struct AuthHeaderPresent(bool);

impl Match for AuthHeaderPresent {
    fn matches(&self, request: &Request) -> bool {
        request.headers.contains_key("authorization") == self.0
    }
}

async fn mount_router(server: &MockServer, packet: &str) {
    Mock::given(method("POST"))
        .and(path("/ci"))
        .and(AuthHeaderPresent(false))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", CHALLENGE))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/ci"))
        .and(AuthHeaderPresent(true))
        .respond_with(ResponseTemplate::new(200).set_body_string(packet))
        .mount(server)
        .await;
}

fn tracker_for(server: &MockServer) -> Tracker {
    let config = TrackerConfig {
        url: format!("{}/ci", server.uri()).parse().unwrap(),
        username: "admin".into(),
        password: SecretString::from("hunter2".to_owned()),
        poll_interval_secs: 0,
        timeout: Duration::from_secs(5),
        dhcp_pool: "_WEBADMIN".into(),
    };
    Tracker::new(config).unwrap()
}

fn phone_mac() -> MacAddress {
    MacAddress::new("50:ff:20:00:00:01")
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_full_cycle_discovers_devices() {
    let server = MockServer::start().await;
    mount_router(&server, PHONE_ONLINE).await;

    let tracker = tracker_for(&server);
    let mut events = tracker.events();

    let summary = tracker.poll_once().await.unwrap();

    assert_eq!(summary.added, vec![phone_mac()]);
    assert_eq!(summary.online, vec![phone_mac()]);
    assert_eq!(summary.orphaned, 0);

    let devices = tracker.devices().await;
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "phone");
    assert_eq!(devices[0].ip, "192.168.1.33");
    assert_eq!(devices[0].rssi, -41);
    assert!(devices[0].online);

    assert!(matches!(events.try_recv(), Ok(DeviceEvent::Added(_))));
    assert!(matches!(events.try_recv(), Ok(DeviceEvent::Connected(_))));

    assert!(tracker.last_poll().borrow().is_some());

    // The request body carried both show commands.
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("show associations"));
    assert!(body.contains("show ip dhcp bindings"));
    assert!(body.contains("<pool>_WEBADMIN</pool>"));
}

#[tokio::test]
async fn test_absent_station_marks_device_offline() {
    let server = MockServer::start().await;
    mount_router(&server, PHONE_ONLINE).await;

    let tracker = tracker_for(&server);
    tracker.poll_once().await.unwrap();

    server.reset().await;
    mount_router(&server, PHONE_ABSENT).await;

    let summary = tracker.poll_once().await.unwrap();

    assert_eq!(summary.offline, vec![phone_mac()]);
    let devices = tracker.devices().await;
    assert_eq!(devices.len(), 1, "offline devices are never deleted");
    assert!(!devices[0].online);
}

#[tokio::test]
async fn test_failed_cycle_freezes_last_known_state() {
    let server = MockServer::start().await;
    mount_router(&server, PHONE_ONLINE).await;

    let tracker = tracker_for(&server);
    tracker.poll_once().await.unwrap();
    let before = tracker.devices().await;

    // Router starts erroring: the cycle aborts, devices keep state.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/ci"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = tracker.poll_once().await;
    assert!(
        matches!(result, Err(CoreError::RouterStatus { status: 503 })),
        "got: {result:?}"
    );
    assert_eq!(tracker.devices().await, before);

    // Decode failures freeze state the same way.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/ci"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<reply></reply>"))
        .mount(&server)
        .await;

    let result = tracker.poll_once().await;
    assert!(matches!(result, Err(CoreError::DecodeFailed { .. })));
    assert_eq!(tracker.devices().await, before);

    // No device went offline from a fetch error alone.
    assert!(tracker.devices().await[0].online);
}

#[tokio::test]
async fn test_orphan_station_is_skipped() {
    let server = MockServer::start().await;
    mount_router(
        &server,
        "<packet>\
           <response><station><mac>de:ad:be:ef:00:01</mac><rssi>-50</rssi></station></response>\
           <response></response>\
         </packet>",
    )
    .await;

    let tracker = tracker_for(&server);
    let summary = tracker.poll_once().await.unwrap();

    assert_eq!(summary.orphaned, 1);
    assert!(tracker.devices().await.is_empty());
}

#[tokio::test]
async fn test_background_polling_lifecycle() {
    let server = MockServer::start().await;
    mount_router(&server, PHONE_ONLINE).await;

    let config = TrackerConfig {
        url: format!("{}/ci", server.uri()).parse().unwrap(),
        username: "admin".into(),
        password: SecretString::from("hunter2".to_owned()),
        poll_interval_secs: 60,
        timeout: Duration::from_secs(5),
        dhcp_pool: "_WEBADMIN".into(),
    };
    let tracker = Tracker::new(config).unwrap();
    let mut events = tracker.events();

    tracker.start().await;

    // The first cycle runs immediately, without waiting an interval.
    let added = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("first cycle should fire immediately")
        .unwrap();
    assert!(matches!(added, DeviceEvent::Added(_)));

    tracker.stop().await;
    assert_eq!(tracker.devices().await.len(), 1);
}
