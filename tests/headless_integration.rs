use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use typomaster::admission::{admit, RejectReason, Submission};
use typomaster::runtime::{FixedTicker, Runner, SessionEvent, TestEventSource};
use typomaster::session::{Session, SessionConfig};

fn key(code: KeyCode) -> SessionEvent {
    SessionEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

fn send_str(tx: &mpsc::Sender<SessionEvent>, text: &str) {
    for c in text.chars() {
        tx.send(key(KeyCode::Char(c))).unwrap();
    }
}

// Headless integration using the runtime and a session without a TTY
#[test]
fn headless_typing_flow_completes() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut session = Session::new("hello world", SessionConfig::default());

    send_str(&tx, "hello world");
    tx.send(key(KeyCode::Esc)).unwrap();

    let result = runner.drive(&mut session).expect("a result");
    assert!(session.has_finished());
    assert_eq!(result.chars_typed, 11);
    assert_eq!(result.errors, 0);
    assert_eq!(result.accuracy, 100);
    assert!(!result.invalid_pattern);

    // Stopping twice never scores twice
    assert!(session.finish().is_none());
}

#[test]
fn headless_backspace_corrects_mistakes() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut session = Session::new("cats", SessionConfig::default());

    send_str(&tx, "cx");
    tx.send(key(KeyCode::Backspace)).unwrap();
    send_str(&tx, "ats");
    tx.send(key(KeyCode::Esc)).unwrap();

    let result = runner.drive(&mut session).expect("a result");
    assert_eq!(session.typed(), "cats");
    assert_eq!(result.errors, 0);
}

#[test]
fn headless_timed_session_finishes_by_time() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(10)),
    );
    let config = SessionConfig {
        duration_secs: 0.2,
        ..SessionConfig::default()
    };
    let mut session = Session::new("hello", config);

    send_str(&tx, "he");
    let result = runner.drive(&mut session).expect("a result");

    assert!(session.has_finished());
    assert!(result.time <= 0.2);
    assert_eq!(result.chars_typed, 2);
    drop(tx);
}

#[test]
fn headless_hang_up_stops_session() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut session = Session::new("hello", SessionConfig::default());

    send_str(&tx, "hel");
    drop(tx);

    let result = runner.drive(&mut session).expect("a result");
    assert_eq!(result.chars_typed, 3);
}

#[test]
fn headless_bot_input_is_dropped_or_rejected() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    let mut session = Session::new("the quick brown fox jumps", SessionConfig::default());

    // The second space never reaches the buffer; the long run is caught at scoring
    send_str(&tx, "the  quick aaaaaaaaaaaa");
    tx.send(key(KeyCode::Esc)).unwrap();

    let result = runner.drive(&mut session).expect("a result");
    assert_eq!(session.typed(), "the quick aaaaaaaaaaaa");
    assert!(result.invalid_pattern);

    let client = admit(&result);
    let server = admit(&Submission::from_result(&result));
    assert_eq!(client, server);
    assert_eq!(client.reason, Some(RejectReason::InvalidPattern));
}
