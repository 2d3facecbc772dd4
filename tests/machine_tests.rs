// Integration tests for the dictation state machine
//
// The machine is synchronous, so these drive it with explicit instants and
// collect events in a Vec sink.

use dictate_stream::session::{
    DictateEvent, DictationMachine, Effect, Gesture, RecordingMode, SessionConfig, SessionStatus,
    CONNECTION_ERROR, CONNECTION_LOST, STARTUP_FAILED,
};
use dictate_stream::ExternalSignal;
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

type Machine = DictationMachine<Vec<DictateEvent>>;

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn new_machine() -> Machine {
    DictationMachine::new(SessionConfig::default(), Vec::new())
}

fn session_id(effects: &[Effect]) -> Uuid {
    match effects.first() {
        Some(Effect::Connect { session_id }) => *session_id,
        other => panic!("expected a connect effect, got {:?}", other),
    }
}

/// Start a short-tap session and open its channel at `t0`
fn connected_machine(t0: Instant) -> (Machine, Uuid) {
    let mut machine = new_machine();
    let id = session_id(&machine.gesture(Gesture::ShortTap, t0));
    assert!(machine.connected(id, t0));
    machine.sink_mut().clear();
    (machine, id)
}

fn send(machine: &mut Machine, value: serde_json::Value, now: Instant) -> Vec<Effect> {
    machine.inbound_text(&value.to_string(), now)
}

fn interim(text: &str) -> serde_json::Value {
    json!({"type": "interim_transcript", "text": text})
}

fn transcript(text: &str, turn_order: i64) -> serde_json::Value {
    json!({"type": "transcript", "text": text, "turn_order": turn_order})
}

fn text(detail: &str) -> DictateEvent {
    DictateEvent::Text(detail.to_string())
}

#[test]
fn test_short_tap_starts_session() {
    let t0 = Instant::now();
    let mut machine = new_machine();

    let effects = machine.gesture(Gesture::ShortTap, t0);

    assert!(matches!(effects.as_slice(), [Effect::Connect { .. }]));
    assert_eq!(machine.status(), SessionStatus::Active);
    assert_eq!(machine.sink(), &vec![DictateEvent::Start]);
    assert_eq!(
        machine.session().map(|s| s.mode),
        Some(RecordingMode::ShortTap)
    );
    // Liveness is only watched once the channel is open
    assert!(!machine.is_monitoring_liveness());
    assert!(!machine.accepts_audio());
}

#[test]
fn test_connected_arms_heartbeat_and_accepts_audio() {
    let t0 = Instant::now();
    let (machine, _) = connected_machine(t0);

    assert!(machine.is_monitoring_liveness());
    assert!(machine.accepts_audio());
    assert_eq!(machine.next_deadline(), Some(t0 + ms(7000)));
}

#[test]
fn test_interim_sequence_replaces_previous_interim() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("Hello", 0), t0);
    send(&mut machine, interim("wor"), t0 + ms(100));
    send(&mut machine, interim("world"), t0 + ms(200));
    send(&mut machine, interim("world again"), t0 + ms(300));

    assert_eq!(
        machine.sink(),
        &vec![
            text("Hello"),
            text("Hello wor"),
            text("Hello world"),
            text("Hello world again"),
        ]
    );
    assert_eq!(machine.display_text(), "Hello world again");
}

#[test]
fn test_turn_order_accumulates() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("Hello", 0), t0);
    send(&mut machine, transcript("World", 1), t0);

    let session = machine.session().expect("session");
    assert_eq!(session.transcript.accumulated(), "Hello");
    assert_eq!(session.transcript.last(), "World");
    assert_eq!(machine.display_text(), "Hello World");
    assert_eq!(machine.sink().last(), Some(&text("Hello World")));
}

#[test]
fn test_same_turn_refinement_replaces() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("This is a test", 0), t0);
    send(&mut machine, transcript("This is a test of refinement", 0), t0);

    assert_eq!(machine.display_text(), "This is a test of refinement");
}

#[test]
fn test_same_turn_unrelated_text_appends() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("Good morning", 0), t0);
    send(&mut machine, transcript("how are you", 0), t0);

    assert_eq!(machine.display_text(), "Good morning how are you");
}

#[test]
fn test_heartbeat_message_resets_deadline_without_text() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, json!({"type": "heartbeat"}), t0 + ms(6000));

    assert!(machine.sink().is_empty());
    assert_eq!(machine.next_deadline(), Some(t0 + ms(13000)));
    assert!(machine.poll_timers(t0 + ms(12999)).is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);
}

#[test]
fn test_heartbeat_timeout_reports_connection_lost_once() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, interim("Hello world"), t0 + ms(1000));
    machine.sink_mut().clear();

    assert!(machine.poll_timers(t0 + ms(7999)).is_empty());
    let effects = machine.poll_timers(t0 + ms(8000));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(
        machine.sink(),
        &vec![
            DictateEvent::Error(CONNECTION_LOST.to_string()),
            DictateEvent::End("Hello world".to_string()),
        ]
    );
    assert_eq!(machine.status(), SessionStatus::Idle);
    assert!(!machine.is_monitoring_liveness());

    // Nothing left to fire
    assert!(machine.poll_timers(t0 + ms(60000)).is_empty());
    assert_eq!(machine.sink().len(), 2);
}

#[test]
fn test_messages_every_five_seconds_keep_session_alive() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    for i in 1..=20 {
        let now = t0 + ms(5000 * i);
        assert!(machine.poll_timers(now).is_empty());
        send(&mut machine, json!({"type": "heartbeat"}), now);
    }

    assert_eq!(machine.status(), SessionStatus::Active);
    assert!(machine.sink().is_empty());
}

#[test]
fn test_malformed_json_does_not_reset_liveness() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    assert!(machine.inbound_text("{not json", t0 + ms(5000)).is_empty());
    assert_eq!(machine.next_deadline(), Some(t0 + ms(7000)));

    machine.poll_timers(t0 + ms(7000));
    assert_eq!(
        machine.sink().first(),
        Some(&DictateEvent::Error(CONNECTION_LOST.to_string()))
    );
}

#[test]
fn test_unknown_type_resets_liveness() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, json!({"type": "session_begins", "id": 3}), t0 + ms(5000));

    assert!(machine.sink().is_empty());
    assert_eq!(machine.next_deadline(), Some(t0 + ms(12000)));
}

#[test]
fn test_stop_with_interim_only_ends_with_interim() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, interim("interim only"), t0 + ms(100));
    let effects = machine.gesture(Gesture::ShortTap, t0 + ms(200));

    assert_eq!(effects, vec![Effect::SendClose]);
    assert_eq!(machine.status(), SessionStatus::Finalizing);
    assert!(!machine.is_monitoring_liveness());
    assert!(!machine.accepts_audio());

    assert!(machine.poll_timers(t0 + ms(699)).is_empty());
    let effects = machine.poll_timers(t0 + ms(700));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(
        machine.sink().last(),
        Some(&DictateEvent::End("interim only".to_string()))
    );
    assert_eq!(machine.status(), SessionStatus::Idle);
}

#[test]
fn test_final_within_grace_replaces_interim() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, interim("interim text"), t0);
    machine.gesture(Gesture::ShortTap, t0 + ms(100));
    send(&mut machine, transcript("final transcript", 0), t0 + ms(200));
    machine.poll_timers(t0 + ms(600));

    assert_eq!(
        machine.sink().last(),
        Some(&DictateEvent::End("final transcript".to_string()))
    );
}

#[test]
fn test_session_closed_while_finalizing_finalizes_immediately() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("done", 0), t0);
    machine.gesture(Gesture::ShortTap, t0 + ms(100));
    let effects = send(&mut machine, json!({"type": "session_closed"}), t0 + ms(150));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(machine.sink().last(), Some(&DictateEvent::End("done".to_string())));
    assert_eq!(machine.status(), SessionStatus::Idle);
    assert_eq!(machine.next_deadline(), None);
}

#[test]
fn test_stop_before_connect_finalizes_without_close() {
    let t0 = Instant::now();
    let mut machine = new_machine();
    let id = session_id(&machine.gesture(Gesture::ShortTap, t0));

    let effects = machine.gesture(Gesture::ShortTap, t0 + ms(50));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(machine.sink(), &vec![DictateEvent::Start]);
    assert_eq!(machine.status(), SessionStatus::Idle);

    // A late connection for the stopped session is refused
    assert!(!machine.connected(id, t0 + ms(100)));
    assert!(!machine.is_monitoring_liveness());
}

#[test]
fn test_offline_while_idle_is_ignored() {
    let t0 = Instant::now();
    let mut machine = new_machine();

    assert!(machine.signal(ExternalSignal::Offline, t0).is_empty());
    assert!(machine.sink().is_empty());
    assert_eq!(machine.status(), SessionStatus::Idle);
}

#[test]
fn test_offline_while_active_reports_connection_lost() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("Hello", 0), t0);
    send(&mut machine, interim("there"), t0);
    machine.sink_mut().clear();

    let effects = machine.signal(ExternalSignal::Offline, t0 + ms(10));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(
        machine.sink(),
        &vec![
            DictateEvent::Error(CONNECTION_LOST.to_string()),
            DictateEvent::End("Hello".to_string()),
        ]
    );
    assert_eq!(machine.status(), SessionStatus::Idle);
}

#[test]
fn test_session_closed_while_active_reports_connection_lost() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("so far", 0), t0);
    machine.sink_mut().clear();

    send(
        &mut machine,
        json!({"type": "session_closed", "reason": "idle"}),
        t0 + ms(10),
    );

    assert_eq!(
        machine.sink(),
        &vec![
            DictateEvent::Error(CONNECTION_LOST.to_string()),
            DictateEvent::End("so far".to_string()),
        ]
    );
}

#[test]
fn test_connection_lost_with_empty_transcript_skips_end() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    machine.signal(ExternalSignal::Offline, t0);

    assert_eq!(
        machine.sink(),
        &vec![DictateEvent::Error(CONNECTION_LOST.to_string())]
    );
}

#[test]
fn test_visibility_hidden_stops_like_manual_stop() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, interim("partial"), t0);
    let effects = machine.signal(ExternalSignal::VisibilityHidden, t0 + ms(10));

    assert_eq!(effects, vec![Effect::SendClose]);
    assert_eq!(machine.status(), SessionStatus::Finalizing);
}

#[test]
fn test_online_and_visible_are_ignored() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    assert!(machine.signal(ExternalSignal::Online, t0).is_empty());
    assert!(machine.signal(ExternalSignal::VisibilityVisible, t0).is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);
}

#[test]
fn test_transport_error_enters_error_then_idle() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    let effects = machine.transport_error("reset by peer", t0 + ms(100));

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(
        machine.sink(),
        &vec![DictateEvent::Error(CONNECTION_ERROR.to_string())]
    );
    assert_eq!(machine.status(), SessionStatus::Error);
    assert!(machine.session().is_none());

    // Gestures are ignored while the error is shown
    assert!(machine.gesture(Gesture::ShortTap, t0 + ms(500)).is_empty());

    machine.poll_timers(t0 + ms(2099));
    assert_eq!(machine.status(), SessionStatus::Error);
    machine.poll_timers(t0 + ms(2100));
    assert_eq!(machine.status(), SessionStatus::Idle);
}

#[test]
fn test_server_error_message_surfaces_detail() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, json!({"type": "error", "error": "quota exceeded"}), t0);

    assert_eq!(
        machine.sink(),
        &vec![DictateEvent::Error("quota exceeded".to_string())]
    );
    assert_eq!(machine.status(), SessionStatus::Error);
}

#[test]
fn test_unexpected_close_while_active_is_connection_error() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    machine.transport_closed(t0);

    assert_eq!(
        machine.sink(),
        &vec![DictateEvent::Error(CONNECTION_ERROR.to_string())]
    );
}

#[test]
fn test_startup_failure_and_stale_failure() {
    let t0 = Instant::now();
    let mut machine = new_machine();
    let id = session_id(&machine.gesture(Gesture::ShortTap, t0));

    assert!(machine
        .startup_failed(Uuid::new_v4(), "stale", t0)
        .is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);

    machine.startup_failed(id, "microphone denied", t0);
    assert_eq!(
        machine.sink(),
        &vec![
            DictateEvent::Start,
            DictateEvent::Error(STARTUP_FAILED.to_string()),
        ]
    );
    assert_eq!(machine.status(), SessionStatus::Error);
}

#[test]
fn test_long_press_ignores_short_tap() {
    let t0 = Instant::now();
    let mut machine = new_machine();
    let id = session_id(&machine.gesture(Gesture::LongPressStart, t0));
    machine.connected(id, t0);

    assert!(machine.gesture(Gesture::ShortTap, t0 + ms(100)).is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);

    assert_eq!(
        machine.gesture(Gesture::LongPressEnd, t0 + ms(900)),
        vec![Effect::SendClose]
    );
}

#[test]
fn test_short_tap_session_ignores_long_press_end() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    assert!(machine.gesture(Gesture::LongPressEnd, t0).is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);
}

#[test]
fn test_new_session_starts_with_clean_transcript() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, transcript("first", 0), t0);
    machine.signal(ExternalSignal::Offline, t0);

    let id = session_id(&machine.gesture(Gesture::ShortTap, t0 + ms(10)));
    machine.connected(id, t0 + ms(10));

    assert_eq!(machine.display_text(), "");
    let session = machine.session().expect("session");
    assert_eq!(session.transcript.current_turn_order(), -1);
}

#[test]
fn test_reset_drops_session_silently() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    send(&mut machine, interim("bye"), t0);
    machine.sink_mut().clear();

    assert_eq!(machine.reset(), vec![Effect::Release]);
    assert!(machine.sink().is_empty());
    assert_eq!(machine.status(), SessionStatus::Idle);
    assert_eq!(machine.next_deadline(), None);
}

#[test]
fn test_snapshot_reflects_session() {
    let t0 = Instant::now();
    let (mut machine, id) = connected_machine(t0);

    send(&mut machine, interim("snap"), t0);
    let snapshot = machine.snapshot();

    assert_eq!(snapshot.status, SessionStatus::Active);
    assert_eq!(snapshot.session_id, Some(id));
    assert_eq!(snapshot.mode, Some(RecordingMode::ShortTap));
    assert_eq!(snapshot.display_text, "snap");
    assert!(snapshot.last_inbound_at.is_some());
}

#[test]
fn test_whole_float_turn_order_is_accepted() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    machine.inbound_text(
        r#"{"type":"transcript","text":"Hello","turn_order":1.0}"#,
        t0,
    );
    machine.inbound_text(
        r#"{"type":"transcript","text":"Hello there","turn_order":1.0}"#,
        t0 + ms(10),
    );

    // Same turn, so the longer final refines the first
    assert_eq!(machine.sink(), &vec![text("Hello"), text("Hello there")]);
    assert_eq!(machine.status(), SessionStatus::Active);
}

#[test]
fn test_null_text_counts_for_liveness_only() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    machine.inbound_text(r#"{"type":"interim_transcript","text":null}"#, t0 + ms(6000));
    let effects = machine.poll_timers(t0 + ms(7500));

    assert!(effects.is_empty());
    assert!(machine.sink().is_empty());
    assert_eq!(machine.status(), SessionStatus::Active);
}

#[test]
fn test_structured_server_error_is_shown_as_json() {
    let t0 = Instant::now();
    let (mut machine, _) = connected_machine(t0);

    let effects = machine.inbound_text(
        r#"{"type":"error","error":{"code":500,"message":"boom"}}"#,
        t0,
    );

    assert_eq!(effects, vec![Effect::Release]);
    assert_eq!(
        machine.sink(),
        &vec![DictateEvent::Error(
            r#"{"code":500,"message":"boom"}"#.to_string()
        )]
    );
    assert_eq!(machine.status(), SessionStatus::Error);
}
