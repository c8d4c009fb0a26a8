use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum HarkEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait HarkEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<HarkEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // key releases/repeats would double every character on some platforms
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => HarkEvent::Key(key),
                Ok(CtEvent::Resize(_, _)) => HarkEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(evt).is_err() {
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

impl HarkEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for tests
pub struct TestEventSource {
    rx: Receiver<HarkEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<HarkEvent>) -> Self {
        Self { rx }
    }
}

impl HarkEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<HarkEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: HarkEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: HarkEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to the tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> HarkEvent {
        self.wait(self.ticker.interval())
    }

    /// Like `step`, but wakes early for a timer due at `deadline`.
    pub fn step_until(&self, deadline: Option<Instant>) -> HarkEvent {
        let interval = self.ticker.interval();
        let timeout = deadline
            .map(|d| d.saturating_duration_since(Instant::now()).min(interval))
            .unwrap_or(interval);
        self.wait(timeout)
    }

    fn wait(&self, timeout: Duration) -> HarkEvent {
        match self.event_source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => HarkEvent::Tick,
        }
    }
}
