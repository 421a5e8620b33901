use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::debug;

use crate::metrics::TestResult;
use crate::session::Session;

/// Unified event type consumed by the session driver
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait SessionEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<SessionEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                    tx.send(SessionEvent::Key(key))
                }
                Ok(CtEvent::Resize(_, _)) => tx.send(SessionEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Shortest interval a ticker will wait; a zero timeout would busy-loop.
pub const MIN_TICK: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_TICK),
        }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for tests and headless driving
pub struct TestEventSource {
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<SessionEvent>) -> Self {
        Self { rx }
    }
}

impl SessionEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Stop,
}

/// Route one key press into the session.
pub fn apply_key(session: &mut Session, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc => KeyAction::Stop,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Stop,
        KeyCode::Char(c) => {
            session.type_char(c);
            KeyAction::Continue
        }
        KeyCode::Backspace => {
            session.backspace();
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

/// Runner that advances a session one event/tick at a time
pub struct Runner<E: SessionEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: SessionEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next event, `Tick` on timeout, `None` once the source has hung up
    pub fn next_event(&self) -> Option<SessionEvent> {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => Some(ev),
            Err(RecvTimeoutError::Timeout) => Some(SessionEvent::Tick),
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn drive(&self, session: &mut Session) -> Option<TestResult> {
        self.drive_with(session, |_| {})
    }

    /// Run `session` to completion against wall-clock time, calling
    /// `on_update` after every event. Returns the frozen result.
    pub fn drive_with<F: FnMut(&Session)>(
        &self,
        session: &mut Session,
        mut on_update: F,
    ) -> Option<TestResult> {
        let mut last = Instant::now();

        while !session.has_finished() {
            let event = self.next_event();

            // Charge the time spent waiting before applying the event, so the
            // wait for the very first key is never counted.
            let now = Instant::now();
            session.on_tick(now.duration_since(last).as_secs_f64());
            last = now;

            match event {
                Some(SessionEvent::Key(key)) => {
                    if apply_key(session, key) == KeyAction::Stop {
                        session.stop();
                    }
                }
                Some(SessionEvent::Tick) | Some(SessionEvent::Resize) => {}
                None => {
                    debug!("event source closed, stopping session");
                    session.stop();
                }
            }
            on_update(session);
        }

        session.finish()
    }
}
