use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum SessionEvent {
    Key(KeyEvent),
    Resize,
    /// One second of the session countdown elapsed
    Tick,
    /// Nothing arrived within the poll interval
    Idle,
}

/// Source of terminal events (keyboard, resize, countdown)
pub trait SessionEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError>;

    /// Sender feeding this source, so a countdown can share the queue
    fn sender(&self) -> Sender<SessionEvent>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let key_tx = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if key_tx.send(SessionEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if key_tx.send(SessionEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "terminal event stream failed");
                    break;
                }
            }
        });

        Self { tx, rx }
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

    fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
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

/// Test event source for unit tests
pub struct TestEventSource {
    tx: Sender<SessionEvent>,
    rx: Receiver<SessionEvent>,
}

impl TestEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }
}

impl Default for TestEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<SessionEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    fn sender(&self) -> Sender<SessionEvent> {
        self.tx.clone()
    }
}

/// Runner that advances the application one event at a time
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

    /// Blocks up to the poll interval and returns the next event, or Idle on timeout
    pub fn step(&self) -> SessionEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                SessionEvent::Idle
            }
        }
    }

    pub fn sender(&self) -> Sender<SessionEvent> {
        self.event_source.sender()
    }
}

/// Longest a countdown thread sleeps before rechecking its stop flag
const STOP_SLICE: Duration = Duration::from_millis(20);

/// Scoped session timer: sends one `Tick` per period until stopped or dropped.
///
/// Dropping the handle stops the thread, so whoever owns the countdown owns
/// its lifetime; no tick is delivered after `stop` returns.
pub struct Countdown {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn spawn(tx: Sender<SessionEvent>, period: Duration) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::spawn(move || {
            // fixed deadlines: sleep overshoot does not carry into the next tick
            let mut next = Instant::now() + period;
            while flag.load(Ordering::Acquire) {
                let wait = next.saturating_duration_since(Instant::now());
                if !wait.is_zero() {
                    // short slices so stop() never waits a whole period
                    std::thread::sleep(wait.min(STOP_SLICE));
                    continue;
                }
                next += period;
                if !flag.load(Ordering::Acquire) || tx.send(SessionEvent::Tick).is_err() {
                    break;
                }
            }
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// One tick per second
    pub fn per_second(tx: Sender<SessionEvent>) -> Self {
        Self::spawn(tx, Duration::from_secs(1))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("countdown thread panicked");
            }
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Countdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_returns_idle_on_timeout() {
        let es = TestEventSource::new();
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            SessionEvent::Idle => {}
            other => panic!("expected Idle on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let es = TestEventSource::new();
        es.sender().send(SessionEvent::Resize).unwrap();
        let ticker = FixedTicker::new(Duration::from_millis(10));
        let runner = Runner::new(es, ticker);

        match runner.step() {
            SessionEvent::Resize => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn countdown_delivers_ticks() {
        let es = TestEventSource::new();
        let _countdown = Countdown::spawn(es.sender(), Duration::from_millis(5));

        let ev = es.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(ev, SessionEvent::Tick));
    }

    #[test]
    fn countdown_keeps_pace_with_wall_clock() {
        let es = TestEventSource::new();
        let period = Duration::from_millis(50);
        let started = Instant::now();
        let _countdown = Countdown::spawn(es.sender(), period);

        for _ in 0..20 {
            let ev = es.recv_timeout(Duration::from_secs(2)).unwrap();
            assert!(matches!(ev, SessionEvent::Tick));
        }
        let took = started.elapsed();

        // the 20th tick is due at 1000ms
        assert!(took >= Duration::from_millis(1000), "ticks came early: {took:?}");
        assert!(took < Duration::from_millis(1100), "ticks drifted: {took:?}");
    }

    #[test]
    fn stopped_countdown_sends_nothing_more() {
        let es = TestEventSource::new();
        let mut countdown = Countdown::spawn(es.sender(), Duration::from_millis(5));
        es.recv_timeout(Duration::from_secs(2)).unwrap();

        countdown.stop();
        assert!(!countdown.is_running());

        // drain anything sent before stop returned
        while es.recv_timeout(Duration::from_millis(1)).is_ok() {}
        assert!(es.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn dropping_countdown_stops_it() {
        let es = TestEventSource::new();
        {
            let _countdown = Countdown::spawn(es.sender(), Duration::from_millis(5));
        }
        while es.recv_timeout(Duration::from_millis(1)).is_ok() {}
        assert!(es.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
