//! Threaded host for [`Simulation`].
//!
//! Each `Engine` owns its own ticker thread and shutdown channel. The ticker
//! is the only code that advances the simulation; it is spawned by
//! `start`/`restart` and joined by `stop` or on drop. Direction changes go
//! through an atomic and never wait for a tick.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::{BoardSize, EngineConfig};
use crate::error::EngineError;
use crate::events::Observer;
use crate::game::{Simulation, Snapshot, TickOutcome};
use crate::input::{Direction, SharedDirection};

/// Running ticker thread plus the sender that cancels it.
struct Ticker {
    shutdown: Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    fn spawn(simulation: Arc<Mutex<Simulation>>, interval: Duration) -> Result<Self, EngineError> {
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("snake-ticker".into())
            .spawn(move || run_ticker(&simulation, &shutdown_rx, interval))
            .map_err(EngineError::Ticker)?;

        Ok(Self { shutdown, handle })
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    fn cancel(self) {
        let _ = self.shutdown.send(());
        if self.handle.join().is_err() {
            log::error!("ticker thread panicked outside a tick");
        }
    }
}

/// Snake simulation driven by a periodic background ticker.
pub struct Engine {
    simulation: Arc<Mutex<Simulation>>,
    direction: Arc<SharedDirection>,
    interval: Duration,
    ticker: Mutex<Option<Ticker>>,
}

impl Engine {
    /// Creates an idle engine. No thread runs until [`start`](Self::start).
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self::from_simulation(Simulation::new(config)?))
    }

    /// Wraps an existing simulation, e.g. one built with a fixed seed.
    #[must_use]
    pub fn from_simulation(simulation: Simulation) -> Self {
        let direction = simulation.direction_handle();
        let interval = simulation.config().tick_interval();

        Self {
            simulation: Arc::new(Mutex::new(simulation)),
            direction,
            interval,
            ticker: Mutex::new(None),
        }
    }

    /// Registers the observer that receives every notification.
    pub fn set_observer(&self, observer: Box<dyn Observer>) {
        lock(&self.simulation).set_observer(observer);
    }

    /// Begins a run on `board` and makes sure the ticker is running.
    ///
    /// A board that is too small fails here and no ticker is spawned.
    pub fn start(&self, board: BoardSize) -> Result<(), EngineError> {
        let mut ticker = lock(&self.ticker);
        lock(&self.simulation).start(board)?;
        self.ensure_ticker(&mut ticker)
    }

    /// Begins a fresh run on the current board, respawning the ticker after a stop.
    pub fn restart(&self) -> Result<(), EngineError> {
        let mut ticker = lock(&self.ticker);
        lock(&self.simulation).restart()?;
        self.ensure_ticker(&mut ticker)
    }

    /// Cancels the ticker and clears the board.
    pub fn stop(&self) {
        if let Some(ticker) = lock(&self.ticker).take() {
            ticker.cancel();
        }
        lock(&self.simulation).stop();
    }

    /// Records the requested direction without waiting for the current tick.
    pub fn change_direction(&self, direction: Direction) {
        self.direction.store(direction);
    }

    /// Shared handle an input thread can write directions into.
    #[must_use]
    pub fn direction_handle(&self) -> Arc<SharedDirection> {
        Arc::clone(&self.direction)
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        lock(&self.simulation).snapshot()
    }

    /// Returns true while a ticker thread is alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        lock(&self.ticker).as_ref().is_some_and(Ticker::is_running)
    }

    fn ensure_ticker(&self, slot: &mut Option<Ticker>) -> Result<(), EngineError> {
        if slot.as_ref().is_some_and(Ticker::is_running) {
            return Ok(());
        }
        if let Some(stale) = slot.take() {
            stale.cancel();
        }

        *slot = Some(Ticker::spawn(Arc::clone(&self.simulation), self.interval)?);
        log::debug!("ticker spawned with interval {:?}", self.interval);
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let ticker = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.cancel();
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("interval", &self.interval)
            .field("direction", &self.direction.load())
            .finish_non_exhaustive()
    }
}

/// Ticks until cancelled or until the owning engine goes away.
fn run_ticker(
    simulation: &Mutex<Simulation>,
    shutdown: &mpsc::Receiver<()>,
    interval: Duration,
) {
    let mut next_tick = Instant::now() + interval;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match shutdown.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        tick_once(simulation);

        next_tick += interval;
        let now = Instant::now();
        if now > next_tick + interval * 2 {
            // Too far behind; skip the missed ticks instead of bursting.
            next_tick = now;
        }
    }

    log::debug!("ticker stopped");
}

/// Runs one tick, containing any panic so the loop survives it.
fn tick_once(simulation: &Mutex<Simulation>) {
    let mut guard = lock(simulation);
    match panic::catch_unwind(AssertUnwindSafe(|| guard.tick())) {
        Ok(TickOutcome::Collided) => log::info!("game over"),
        Ok(_) => {}
        Err(payload) => log::error!("tick aborted: {}", panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::time::Duration;

    use crate::config::{BoardSize, Color, EngineConfig};
    use crate::error::EngineError;
    use crate::events::{ChannelObserver, EngineEvent, Observer};
    use crate::game::{EngineStatus, Simulation};
    use crate::input::Direction;
    use crate::snake::{Position, Segment, Snake};

    use super::{Engine, lock, panic_message, tick_once};

    const WAIT: Duration = Duration::from_secs(5);

    fn fast_engine(seed: u64) -> (Engine, Receiver<EngineEvent>) {
        let config = EngineConfig {
            tick_interval_ms: 5,
            ..EngineConfig::default()
        };
        let simulation = Simulation::new_with_seed(config, seed).expect("config is valid");
        let engine = Engine::from_simulation(simulation);
        let (tx, rx) = mpsc::channel();
        engine.set_observer(Box::new(ChannelObserver::new(tx)));
        (engine, rx)
    }

    fn next_event(rx: &Receiver<EngineEvent>) -> EngineEvent {
        rx.recv_timeout(WAIT).expect("engine should emit an event")
    }

    #[test]
    fn start_spawns_ticker_and_stop_joins_it() {
        let (engine, rx) = fast_engine(1);

        engine
            .start(BoardSize::new(600, 600))
            .expect("board fits");
        assert!(engine.is_ticking());
        assert!(matches!(next_event(&rx), EngineEvent::SnakeUpdated { .. }));
        assert!(matches!(next_event(&rx), EngineEvent::FruitUpdated { fruit: Some(_) }));
        assert_eq!(next_event(&rx), EngineEvent::GameStarted);

        engine.stop();
        assert!(!engine.is_ticking());
        assert_eq!(
            next_event(&rx),
            EngineEvent::SnakeUpdated { snake: Vec::new() }
        );
        assert_eq!(next_event(&rx), EngineEvent::FruitUpdated { fruit: None });
        assert_eq!(engine.snapshot().status, EngineStatus::Idle);
    }

    #[test]
    fn too_small_board_does_not_spawn_ticker() {
        let (engine, rx) = fast_engine(2);

        let result = engine.start(BoardSize::new(50, 50));

        assert!(matches!(result, Err(EngineError::BoardTooSmall { .. })));
        assert!(!engine.is_ticking());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ticker_moves_head_after_direction_change() {
        let (engine, rx) = fast_engine(3);
        engine
            .start(BoardSize::new(6000, 6000))
            .expect("board fits");
        let start_head = engine.snapshot().snake[0].position;
        while next_event(&rx) != EngineEvent::GameStarted {}

        engine.change_direction(Direction::Down);

        let moved = match next_event(&rx) {
            EngineEvent::SnakeUpdated { snake } => snake[0].position,
            other => panic!("expected a snake update, got {other:?}"),
        };
        assert_eq!(moved.x, start_head.x);
        assert_eq!(moved.y, start_head.y + 30);
    }

    #[test]
    fn restart_after_stop_spawns_fresh_ticker() {
        let (engine, rx) = fast_engine(4);
        engine
            .start(BoardSize::new(600, 600))
            .expect("board fits");
        engine.stop();
        assert!(!engine.is_ticking());

        engine.restart().expect("board is known");

        assert!(engine.is_ticking());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.status, EngineStatus::Running);
        assert_eq!(snapshot.snake.len(), 1);
        assert!(snapshot.fruit.is_some());
        assert_eq!(snapshot.direction, Direction::None);
        assert!(rx.try_iter().any(|event| event == EngineEvent::GameStarted));
    }

    #[test]
    fn dropping_engine_releases_observer() {
        let (engine, rx) = fast_engine(5);
        engine
            .start(BoardSize::new(600, 600))
            .expect("board fits");

        drop(engine);

        // The sender lives inside the simulation; iteration ends once both
        // the engine and its ticker have released it.
        let drained = rx.iter().count();
        assert!(drained >= 3);
    }

    struct PanicsOnFirstMove {
        started: bool,
        panicked: bool,
        moves: Sender<Vec<Segment>>,
    }

    impl Observer for PanicsOnFirstMove {
        fn snake_updated(&mut self, snake: &[Segment]) {
            if !self.started {
                return;
            }
            if !self.panicked {
                self.panicked = true;
                panic!("observer failure");
            }
            let _ = self.moves.send(snake.to_vec());
        }

        fn game_started(&mut self) {
            self.started = true;
        }
    }

    #[test]
    fn panicking_tick_does_not_stop_the_loop() {
        let config = EngineConfig {
            tick_interval_ms: 5,
            ..EngineConfig::default()
        };
        let engine =
            Engine::from_simulation(Simulation::new_with_seed(config, 6).expect("config is valid"));
        let (tx, rx) = mpsc::channel();
        engine.set_observer(Box::new(PanicsOnFirstMove {
            started: false,
            panicked: false,
            moves: tx,
        }));

        engine
            .start(BoardSize::new(6000, 6000))
            .expect("board fits");
        engine.change_direction(Direction::Right);

        let snake = rx
            .recv_timeout(WAIT)
            .expect("ticker should keep running after a panic");
        assert!(!snake.is_empty());
        assert!(engine.is_ticking());
    }

    #[test]
    fn observer_fault_still_applies_border_collision() {
        let mut simulation = Simulation::new_with_seed(EngineConfig::default(), 7)
            .expect("default config is valid");
        let (tx, _rx) = mpsc::channel();
        simulation.set_observer(Box::new(PanicsOnFirstMove {
            started: false,
            panicked: false,
            moves: tx,
        }));
        simulation
            .start(BoardSize::new(200, 200))
            .expect("board fits");
        simulation.place_snake(Snake::from_positions(
            &[Position::new(140, 100)],
            30,
            Color::Red,
            Color::Yellow,
        ));
        simulation.place_fruit(Some(Segment::fruit(
            Position::new(40, 40),
            30,
            Color::Green,
        )));
        simulation.change_direction(Direction::Right);

        let simulation = Mutex::new(simulation);
        tick_once(&simulation);

        let snapshot = lock(&simulation).snapshot();
        assert_eq!(snapshot.status, EngineStatus::GameOver);
        assert!(snapshot.snake.is_empty());
        assert!(snapshot.fruit.is_none());
    }

    #[test]
    fn panic_message_handles_common_payloads() {
        let text: Box<dyn std::any::Any + Send> = Box::new("static");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(text.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
