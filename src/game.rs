use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::{BoardSize, EngineConfig};
use crate::error::EngineError;
use crate::events::{EngineEvent, Notifier, Observer};
use crate::fruit::{spawn_fruit, spawn_position};
use crate::input::{Direction, SharedDirection, direction_change_is_valid};
use crate::snake::{Segment, Snake};

/// Current high-level simulation state.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Idle,
    Running,
    GameOver,
}

/// What a single [`Simulation::tick`] did.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TickOutcome {
    /// Nothing moved: not running, no direction, or no snake.
    Skipped,
    Moved,
    Grew,
    /// The head hit the border and the run was reset.
    Collided,
}

/// Owned copy of the observable simulation state.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: EngineStatus,
    pub board: Option<BoardSize>,
    /// Most recently requested direction.
    pub direction: Direction,
    /// Direction of the last applied move; differs from `direction` when a
    /// reversal was ignored.
    pub heading: Direction,
    pub tick_count: u64,
    pub snake: Vec<Segment>,
    pub fruit: Option<Segment>,
}

/// Single-threaded snake state machine.
///
/// Every mutation goes through its methods; observers only ever see
/// borrowed slices during a notification or owned [`Snapshot`]s.
#[derive(Debug)]
pub struct Simulation {
    config: EngineConfig,
    board: Option<BoardSize>,
    snake: Snake,
    fruit: Option<Segment>,
    status: EngineStatus,
    direction: Arc<SharedDirection>,
    heading: Direction,
    tick_count: u64,
    rng: StdRng,
    notifier: Notifier,
}

impl Simulation {
    /// Creates an idle simulation, seeded from `config.seed` or from entropy.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    /// Creates a deterministic simulation for tests and reproducible runs.
    pub fn new_with_seed(config: EngineConfig, seed: u64) -> Result<Self, EngineError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: EngineConfig, rng: StdRng) -> Result<Self, EngineError> {
        config.validate()?;

        Ok(Self {
            config,
            board: None,
            snake: Snake::default(),
            fruit: None,
            status: EngineStatus::Idle,
            direction: Arc::new(SharedDirection::default()),
            heading: Direction::None,
            tick_count: 0,
            rng,
            notifier: Notifier::default(),
        })
    }

    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.notifier.set_observer(observer);
    }

    /// Begins a run on `board`.
    ///
    /// Fails without touching any state when the board leaves no spawn range.
    pub fn start(&mut self, board: BoardSize) -> Result<(), EngineError> {
        let extent = self.config.segment_extent;
        if !board.fits_extent(extent) {
            return Err(EngineError::BoardTooSmall {
                width: board.width,
                height: board.height,
                extent,
            });
        }

        self.board = Some(board);
        self.initialize(board);
        Ok(())
    }

    /// Begins a fresh run on the board of the previous [`start`](Self::start).
    pub fn restart(&mut self) -> Result<(), EngineError> {
        let board = self.board.ok_or(EngineError::NotStarted)?;
        self.initialize(board);
        Ok(())
    }

    /// Ends the run and clears the board.
    pub fn stop(&mut self) {
        self.clear_board();
        self.status = EngineStatus::Idle;
        log::info!("simulation stopped after {} ticks", self.tick_count);

        self.notifier.snake_updated(self.snake.segments());
        self.notifier.fruit_updated(None);
    }

    /// Records the requested direction; it takes effect on the next tick.
    pub fn change_direction(&self, direction: Direction) {
        self.direction.store(direction);
    }

    /// Handle for writing the requested direction without borrowing the simulation.
    #[must_use]
    pub fn direction_handle(&self) -> Arc<SharedDirection> {
        Arc::clone(&self.direction)
    }

    /// Advances the simulation by one step.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != EngineStatus::Running {
            return TickOutcome::Skipped;
        }
        let Some(board) = self.board else {
            return TickOutcome::Skipped;
        };
        if self.snake.is_empty() {
            log::debug!("tick skipped: running with an empty snake");
            return TickOutcome::Skipped;
        }

        let direction = self.resolve_direction(self.direction.load());
        if direction == Direction::None {
            return TickOutcome::Skipped;
        }
        self.heading = direction;
        self.tick_count += 1;

        let extent = self.config.segment_extent;
        let step = i32::try_from(extent).unwrap_or(i32::MAX);

        self.snake.propagate_body();
        let Some(head) = self
            .snake
            .advance_head(direction, step, self.config.head_color)
        else {
            return TickOutcome::Skipped;
        };

        // Observers only run once the whole step has been applied.
        let mut pending = vec![EngineEvent::SnakeUpdated {
            snake: self.snake.segments().to_vec(),
        }];

        let mut outcome = TickOutcome::Moved;
        let eaten = self
            .fruit
            .filter(|fruit| head.is_within_distance(fruit.position, extent));
        if let Some(fruit) = eaten {
            self.snake.grow_into(fruit, self.config.body_color);
            pending.push(EngineEvent::SnakeUpdated {
                snake: self.snake.segments().to_vec(),
            });

            let next = spawn_fruit(&mut self.rng, board, extent, self.config.fruit_color);
            self.fruit = Some(next);
            pending.push(EngineEvent::FruitUpdated { fruit: Some(next) });

            log::debug!("fruit consumed, snake length {}", self.snake.len());
            outcome = TickOutcome::Grew;
        }

        if head.hits_border(board, extent) {
            self.game_over();
            pending.extend([
                EngineEvent::SnakeUpdated { snake: Vec::new() },
                EngineEvent::FruitUpdated { fruit: None },
                EngineEvent::GameOver,
            ]);
            outcome = TickOutcome::Collided;
        }

        for event in &pending {
            self.notifier.dispatch(event);
        }
        outcome
    }

    /// Applies the reversal policy to a requested direction.
    fn resolve_direction(&self, requested: Direction) -> Direction {
        if requested == Direction::None
            || self.config.allow_reversal
            || self.snake.len() < 2
            || direction_change_is_valid(self.heading, requested)
        {
            return requested;
        }

        log::debug!(
            "ignoring reversal from {:?} to {:?}",
            self.heading,
            requested
        );
        self.heading
    }

    fn initialize(&mut self, board: BoardSize) {
        let extent = self.config.segment_extent;
        let head_position = spawn_position(&mut self.rng, board, extent);

        self.snake = Snake::new(Segment::head(head_position, extent, self.config.head_color));
        self.fruit = Some(spawn_fruit(
            &mut self.rng,
            board,
            extent,
            self.config.fruit_color,
        ));
        self.direction.store(Direction::None);
        self.heading = Direction::None;
        self.tick_count = 0;
        self.status = EngineStatus::Running;

        log::info!(
            "run started on {}x{} board, head at ({}, {})",
            board.width,
            board.height,
            head_position.x,
            head_position.y
        );

        self.notifier.snake_updated(self.snake.segments());
        self.notifier.fruit_updated(self.fruit.as_ref());
        self.notifier.game_started();
    }

    fn game_over(&mut self) {
        let length = self.snake.len();
        self.clear_board();
        self.status = EngineStatus::GameOver;
        log::info!(
            "border collision after {} ticks, snake length {length}",
            self.tick_count
        );
    }

    fn clear_board(&mut self) {
        self.snake.clear();
        self.fruit = None;
        self.direction.store(Direction::None);
        self.heading = Direction::None;
    }

    /// Replaces the snake, e.g. to set up a specific scenario.
    pub fn place_snake(&mut self, snake: Snake) {
        self.snake = snake;
    }

    /// Replaces the fruit, e.g. to set up a specific scenario.
    pub fn place_fruit(&mut self, fruit: Option<Segment>) {
        self.fruit = fruit;
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status,
            board: self.board,
            direction: self.direction.load(),
            heading: self.heading,
            tick_count: self.tick_count,
            snake: self.snake.segments().to_vec(),
            fruit: self.fruit,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> EngineStatus {
        self.status
    }

    #[must_use]
    pub fn board(&self) -> Option<BoardSize> {
        self.board
    }

    #[must_use]
    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    #[must_use]
    pub fn fruit(&self) -> Option<&Segment> {
        self.fruit.as_ref()
    }

    /// The most recently requested direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction.load()
    }

    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
