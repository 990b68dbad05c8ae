use rand::Rng;

use crate::config::{BoardSize, Color};
use crate::snake::{Position, Segment};

/// Draws a position uniformly from `[extent, dimension - extent)` on each axis.
///
/// Callers validate the board with [`BoardSize::fits_extent`] first; an empty
/// range here is a programming error.
#[must_use]
pub fn spawn_position<R: Rng + ?Sized>(rng: &mut R, board: BoardSize, extent: u32) -> Position {
    debug_assert!(board.fits_extent(extent));

    Position {
        x: spawn_axis(rng, board.width, extent),
        y: spawn_axis(rng, board.height, extent),
    }
}

fn spawn_axis<R: Rng + ?Sized>(rng: &mut R, dimension: u32, extent: u32) -> i32 {
    let low = i64::from(extent);
    let high = i64::from(dimension) - i64::from(extent);
    let value = rng.gen_range(low..high.max(low + 1));
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Spawns a fruit at a random position.
///
/// The snake's cells are not excluded, so a fruit may land under the body.
#[must_use]
pub fn spawn_fruit<R: Rng + ?Sized>(
    rng: &mut R,
    board: BoardSize,
    extent: u32,
    color: Color,
) -> Segment {
    Segment::fruit(spawn_position(rng, board, extent), extent, color)
}
