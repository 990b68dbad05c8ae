use serde::{Deserialize, Serialize};

use crate::config::{BoardSize, Color};
use crate::input::Direction;

/// Top-left corner of a segment in board units.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position moved `steps` units along `direction`.
    #[must_use]
    pub fn stepped(self, direction: Direction, steps: i32) -> Self {
        let (dx, dy) = direction.unit();
        Self {
            x: self.x.saturating_add(dx.saturating_mul(steps)),
            y: self.y.saturating_add(dy.saturating_mul(steps)),
        }
    }

    /// Squared Euclidean distance, widened so it cannot overflow.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }

    /// Returns true when `other` lies within `radius` (inclusive).
    #[must_use]
    pub fn is_within_distance(self, other: Self, radius: u32) -> bool {
        let radius = i64::from(radius);
        self.distance_squared(other) <= radius * radius
    }

    /// Returns true when a segment of `extent` at this position touches the
    /// board border.
    ///
    /// The low edges use a one-unit margin; the high edges reserve room for
    /// the segment itself.
    #[must_use]
    pub fn hits_border(self, board: BoardSize, extent: u32) -> bool {
        let x = i64::from(self.x);
        let y = i64::from(self.y);
        let max_x = i64::from(board.width) - i64::from(extent);
        let max_y = i64::from(board.height) - i64::from(extent);

        x <= 1 || x >= max_x || y <= 1 || y >= max_y
    }
}

/// Role of a square on the board.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Head,
    Body,
    Fruit,
}

/// One square on the board: a snake segment or the fruit.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub position: Position,
    pub extent: u32,
    pub color: Color,
}

impl Segment {
    #[must_use]
    pub fn head(position: Position, extent: u32, color: Color) -> Self {
        Self {
            kind: SegmentKind::Head,
            position,
            extent,
            color,
        }
    }

    #[must_use]
    pub fn body(position: Position, extent: u32, color: Color) -> Self {
        Self {
            kind: SegmentKind::Body,
            position,
            extent,
            color,
        }
    }

    #[must_use]
    pub fn fruit(position: Position, extent: u32, color: Color) -> Self {
        Self {
            kind: SegmentKind::Fruit,
            position,
            extent,
            color,
        }
    }
}

/// Ordered snake body. Index 0 is the head.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Snake {
    segments: Vec<Segment>,
}

impl Snake {
    /// Creates a one-segment snake.
    #[must_use]
    pub fn new(head: Segment) -> Self {
        Self {
            segments: vec![head],
        }
    }

    /// Creates a snake from explicit positions (first is the head).
    #[must_use]
    pub fn from_positions(
        positions: &[Position],
        extent: u32,
        head_color: Color,
        body_color: Color,
    ) -> Self {
        let segments = positions
            .iter()
            .enumerate()
            .map(|(index, &position)| {
                if index == 0 {
                    Segment::head(position, extent, head_color)
                } else {
                    Segment::body(position, extent, body_color)
                }
            })
            .collect();

        Self { segments }
    }

    /// Shifts every body segment onto the position of the segment ahead of it.
    ///
    /// Walks tail to head so each position is read before it is overwritten.
    pub fn propagate_body(&mut self) {
        for index in (1..self.segments.len()).rev() {
            self.segments[index].position = self.segments[index - 1].position;
        }
    }

    /// Moves the head `step` units along `direction` and returns its new position.
    pub fn advance_head(
        &mut self,
        direction: Direction,
        step: i32,
        color: Color,
    ) -> Option<Position> {
        let head = self.segments.first_mut()?;
        head.position = head.position.stepped(direction, step);
        head.color = color;
        Some(head.position)
    }

    /// Grows the snake by one segment placed where `fruit` was.
    ///
    /// The new segment becomes the head; the previous head turns into body.
    pub fn grow_into(&mut self, fruit: Segment, body_color: Color) {
        if let Some(previous_head) = self.segments.first_mut() {
            previous_head.kind = SegmentKind::Body;
            previous_head.color = body_color;
        }

        self.segments.insert(
            0,
            Segment {
                kind: SegmentKind::Head,
                ..fruit
            },
        );
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    #[must_use]
    pub fn head(&self) -> Option<&Segment> {
        self.segments.first()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments from head to tail.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}
