use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// Movement directions for the snake head. `None` keeps the snake still.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    None,
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Returns the opposite direction. `None` is its own opposite.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Unit vector on screen axes (y grows downwards).
    #[must_use]
    pub fn unit(self) -> (i32, i32) {
        match self {
            Self::None => (0, 0),
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Up => 1,
            Self::Down => 2,
            Self::Left => 3,
            Self::Right => 4,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => Self::Up,
            2 => Self::Down,
            3 => Self::Left,
            4 => Self::Right,
            _ => Self::None,
        }
    }
}

/// Returns whether moving in `next` is legal after moving in `current`
/// (no immediate 180° turns).
#[must_use]
pub fn direction_change_is_valid(current: Direction, next: Direction) -> bool {
    current == Direction::None || next != current.opposite()
}

/// Latest requested direction, written by the input side and read once per tick.
///
/// Backed by a single atomic byte so writers never block the ticker.
#[derive(Debug, Default)]
pub struct SharedDirection(AtomicU8);

impl SharedDirection {
    pub fn store(&self, direction: Direction) {
        self.0.store(direction.to_bits(), Ordering::Release);
    }

    #[must_use]
    pub fn load(&self) -> Direction {
        Direction::from_bits(self.0.load(Ordering::Acquire))
    }
}

/// High-level commands delivered by an input collector.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Command {
    Direction(Direction),
    /// Confirm key: starts a fresh run on the current board.
    Restart,
    Stop,
    Quit,
}

impl Command {
    /// Parses one text token (case-insensitive). Returns `None` for unknown input.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let command = match token.trim().to_ascii_lowercase().as_str() {
            "up" | "w" | "k" => Self::Direction(Direction::Up),
            "down" | "s" | "j" => Self::Direction(Direction::Down),
            "left" | "a" | "h" => Self::Direction(Direction::Left),
            "right" | "d" | "l" => Self::Direction(Direction::Right),
            "enter" | "restart" | "r" => Self::Restart,
            "stop" => Self::Stop,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return None,
        };
        Some(command)
    }
}
