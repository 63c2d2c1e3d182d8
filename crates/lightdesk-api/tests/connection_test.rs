#![allow(clippy::unwrap_used)]
// Connection lifecycle tests against the in-memory connector.
//
// Every test runs on a paused clock: the runtime jumps straight to the
// next timer whenever all tasks are idle, so backoff and keep-alive
// timings are observed exactly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::time::{Instant, sleep};
use url::Url;

use lightdesk_api::testing::{Attempt, MockConnector};
use lightdesk_api::{
    ClientMessage, Connection, ConnectionConfig, ConnectionEvent, ReadyState, SendOutcome,
    ServerMessage, Subscription,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn connection() -> Connection {
    let base = Url::parse("http://desk.test:8080/").unwrap();
    Connection::new(ConnectionConfig::from_base_url(base).unwrap())
}

/// Record every event delivered to a subscriber.
fn record(connection: &Connection) -> (Arc<Mutex<Vec<ConnectionEvent>>>, Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let sub = connection.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (events, sub)
}

/// Gaps between consecutive connect attempts, in milliseconds.
fn gaps_ms(times: &[Instant]) -> Vec<u64> {
    times
        .windows(2)
        .map(|pair| u64::try_from((pair[1] - pair[0]).as_millis()).unwrap())
        .collect()
}

fn assert_close_to(actual: &[u64], expected: &[u64]) {
    assert_eq!(actual.len(), expected.len(), "gaps: {actual:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(*e) <= 5, "gap {a}ms, expected {e}ms (all: {actual:?})");
    }
}

// ── Backoff ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn refused_connects_back_off_to_ceiling() {
    let connector = MockConnector::new();
    let connection = connection();
    connection.start(connector.clone());

    // Attempts at 0, 1, 3, 7, 15, 31, 61 seconds.
    sleep(Duration::from_millis(62_000)).await;

    assert_close_to(
        &gaps_ms(&connector.attempt_times()),
        &[1000, 2000, 4000, 8000, 16000, 30000],
    );
    assert_eq!(connection.ready_state(), ReadyState::Closed);
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn successful_open_resets_backoff() {
    let connector = MockConnector::new();
    connector.script([Attempt::Refuse, Attempt::Refuse, Attempt::Accept]);
    let connection = connection();
    connection.start(connector.clone());

    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(connection.ready_state(), ReadyState::Open);
    let peer = connector.take_peer().unwrap();

    peer.close(1001, "going away");
    sleep(Duration::from_millis(1_200)).await;

    // 1000 and 2000 before the open, then back to 1000 after it.
    let gaps = gaps_ms(&connector.attempt_times());
    assert_close_to(&gaps[..2], &[1000, 2000]);
    assert_eq!(connector.attempt_count(), 4);
    let times = connector.attempt_times();
    let since_open = u64::try_from((times[3] - times[2]).as_millis()).unwrap();
    assert!((1_400..=1_600).contains(&since_open), "reconnected after {since_open}ms");

    connection.close().await;
}

// ── Manual reconnect ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn reconnect_is_noop_while_open() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    connection.start(connector.clone());

    sleep(Duration::from_millis(10)).await;
    let _peer = connector.take_peer().unwrap();
    assert_eq!(connection.ready_state(), ReadyState::Open);
    assert_eq!(connection.socket_generation(), 1);

    assert!(!connection.reconnect());
    sleep(Duration::from_millis(10)).await;

    assert_eq!(connection.socket_generation(), 1);
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(connection.ready_state(), ReadyState::Open);
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_skips_pending_wait_and_resets_delay() {
    let connector = MockConnector::new();
    let connection = connection();
    connection.start(connector.clone());

    // Attempts at 0, 1000, 3000; the next one is due at 7000.
    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(connector.attempt_count(), 3);
    assert_eq!(connection.ready_state(), ReadyState::Closed);

    assert!(connection.reconnect());
    assert_eq!(connection.ready_state(), ReadyState::Connecting);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(connector.attempt_count(), 4);

    // Delay restarted from the initial value.
    sleep(Duration::from_millis(1_000)).await;
    assert_eq!(connector.attempt_count(), 5);
    let gaps = gaps_ms(&connector.attempt_times());
    assert_close_to(&gaps[3..], &[1000]);

    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_is_noop_while_connecting() {
    let connection = connection();
    assert_eq!(connection.ready_state(), ReadyState::Connecting);
    assert!(!connection.reconnect());
}

// ── Sending ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn send_drops_unless_open() {
    let connector = MockConnector::new();
    connector.script([Attempt::Refuse, Attempt::Accept]);
    let connection = connection();

    assert_eq!(connection.send(&ClientMessage::ChannelState), SendOutcome::Dropped);

    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    assert_eq!(connection.ready_state(), ReadyState::Closed);
    assert_eq!(connection.send(&ClientMessage::ChannelState), SendOutcome::Dropped);

    sleep(Duration::from_millis(1_000)).await;
    let mut peer = connector.take_peer().unwrap();
    let update = ClientMessage::UpdateChannel {
        universe: 0,
        id: 5,
        level: 128,
        fade_time: 250,
    };
    assert_eq!(connection.send(&update), SendOutcome::Sent);
    sleep(Duration::from_millis(10)).await;

    // The dropped resync was never queued for the new socket.
    assert_eq!(
        peer.sent(),
        vec![json!({ "type": "updateChannel", "universe": 0, "id": 5, "level": 128, "fadeTime": 250 })]
    );
    connection.close().await;
}

// ── Inbound dispatch ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn only_recognised_frames_are_dispatched() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    let (events, _sub) = record(&connection);
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let peer = connector.take_peer().unwrap();

    peer.push_text("definitely not json");
    peer.push_json(&json!({ "type": "somethingElse", "payload": 1 }));
    peer.push_json(&json!({ "type": "universesState", "universes": "zero" }));
    peer.push_json(&json!({ "noType": true }));
    peer.push_json(&json!({ "type": "universesState", "universes": [0, 1] }));
    sleep(Duration::from_millis(10)).await;

    let messages: Vec<ServerMessage> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            ConnectionEvent::Message(m) => Some(m.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        messages,
        vec![ServerMessage::UniversesState { universes: vec![0, 1] }]
    );
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn events_arrive_in_order() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept, Attempt::Refuse]);
    let connection = connection();
    let (events, _sub) = record(&connection);
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;

    let peer = connector.take_peer().unwrap();
    peer.push_json(&json!({ "type": "scenesChanged" }));
    peer.fail();
    // The refused reconnect lands one second later.
    sleep(Duration::from_millis(1_010)).await;

    let events = events.lock().unwrap().clone();
    assert_eq!(events[0], ConnectionEvent::Open);
    assert_eq!(events[1], ConnectionEvent::Message(ServerMessage::ScenesChanged));
    assert!(matches!(events[2], ConnectionEvent::Error(_)));
    assert!(matches!(events[3], ConnectionEvent::Close(_)));
    // Failed connect: error, then close without a code.
    assert!(matches!(events[4], ConnectionEvent::Error(_)));
    match &events[5] {
        ConnectionEvent::Close(info) => assert_eq!(info.code, None),
        other => panic!("expected close, got {other:?}"),
    }
    drop(peer);
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn peer_close_code_is_reported() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    let (events, _sub) = record(&connection);
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;

    let peer = connector.take_peer().unwrap();
    peer.close(4000, "maintenance");
    sleep(Duration::from_millis(10)).await;

    let events = events.lock().unwrap().clone();
    let close = events.iter().find_map(|e| match e {
        ConnectionEvent::Close(info) => Some(info.clone()),
        _ => None,
    });
    let close = close.unwrap();
    assert_eq!(close.code, Some(4000));
    assert_eq!(close.reason, "maintenance");
    assert!(!events.iter().any(|e| matches!(e, ConnectionEvent::Error(_))));
    assert_eq!(connection.ready_state(), ReadyState::Closed);
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_callback_stops_receiving() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    let (events, sub) = record(&connection);
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let peer = connector.take_peer().unwrap();

    sub.unsubscribe();
    sub.unsubscribe();
    peer.push_json(&json!({ "type": "cueListChanged" }));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(events.lock().unwrap().as_slice(), &[ConnectionEvent::Open]);
    connection.close().await;
}

// ── Keep-alive ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn pings_every_ten_seconds_while_open() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let mut peer = connector.take_peer().unwrap();

    sleep(Duration::from_millis(9_000)).await;
    assert!(peer.sent_types().is_empty());

    sleep(Duration::from_millis(26_000)).await;
    assert_eq!(peer.sent_types(), vec!["ping", "ping", "ping"]);
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn no_pings_after_socket_closes() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let mut peer = connector.take_peer().unwrap();

    peer.hang_up();
    sleep(Duration::from_millis(25_000)).await;
    assert!(peer.sent_types().is_empty());
    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn zero_ping_interval_disables_keep_alive() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept, Attempt::Accept]);
    let base = Url::parse("http://desk.test:8080/").unwrap();
    let mut config = ConnectionConfig::from_base_url(base).unwrap();
    config.ping_interval = Duration::ZERO;
    let connection = Connection::new(config);
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let mut peer = connector.take_peer().unwrap();

    sleep(Duration::from_secs(30)).await;
    assert!(peer.sent_types().is_empty());
    assert_eq!(connection.ready_state(), ReadyState::Open);

    // The loop is still alive: a peer close leads to a fresh socket.
    peer.close(1001, "going away");
    sleep(Duration::from_millis(1_100)).await;
    assert_eq!(connector.attempt_count(), 2);
    assert_eq!(connection.ready_state(), ReadyState::Open);
    assert_eq!(connection.socket_generation(), 2);

    connection.close().await;
}

#[tokio::test(start_paused = true)]
async fn zero_initial_delay_still_backs_off() {
    let connector = MockConnector::new();
    let base = Url::parse("http://desk.test:8080/").unwrap();
    let mut config = ConnectionConfig::from_base_url(base).unwrap();
    config.reconnect.initial_delay = Duration::ZERO;
    config.reconnect.max_delay = Duration::from_millis(1_000);
    let connection = Connection::new(config);
    connection.start(connector.clone());

    // Attempts at 0, 1, 3, 7, 15, 31, 63 ms.
    sleep(Duration::from_millis(100)).await;
    let attempts = connector.attempt_count();
    assert!((6..=7).contains(&attempts), "{attempts} attempts in 100ms");
    assert_eq!(connection.ready_state(), ReadyState::Closed);
    connection.close().await;
}

// ── Close ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn close_flushes_queue_then_sends_close_frame() {
    let connector = MockConnector::new();
    connector.script([Attempt::Accept]);
    let connection = connection();
    connection.start(connector.clone());
    sleep(Duration::from_millis(10)).await;
    let mut peer = connector.take_peer().unwrap();

    assert!(connection.send(&ClientMessage::TrackDetails).is_sent());
    connection.close().await;

    assert_eq!(peer.sent_types(), vec!["trackDetails"]);
    assert!(peer.saw_close());
    assert_eq!(connection.ready_state(), ReadyState::Closed);
}

#[tokio::test(start_paused = true)]
async fn no_reconnects_after_close() {
    let connector = MockConnector::new();
    let connection = connection();
    connection.start(connector.clone());
    sleep(Duration::from_millis(1_500)).await;
    assert_eq!(connector.attempt_count(), 2);

    connection.close().await;
    assert!(!connection.reconnect());
    sleep(Duration::from_secs(120)).await;

    assert_eq!(connector.attempt_count(), 2);
    assert_eq!(connection.ready_state(), ReadyState::Closed);
    assert_eq!(connection.send(&ClientMessage::Ping), SendOutcome::Dropped);
}
