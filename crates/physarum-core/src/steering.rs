//! Heading update and quantized movement.
//!
//! The policy is pure: every random input it needs is carried by a
//! [`TurnDraw`] that the engine samples ahead of the agent pass.

use crate::agent::normalize_heading;
use crate::constants::HEADING_DEGREES;
use crate::sensor::heading_vector;
use rand::Rng;

/// Random inputs consumed by one agent's turn.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TurnDraw {
    /// Tie-break direction: `true` turns toward increasing heading.
    pub coin: bool,
    /// Turn fraction in `(0, 1]`.
    pub fraction: f64,
}

impl TurnDraw {
    /// Draws the coin first, then the fraction.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let coin = rng.random_bool(0.5);
        let fraction = 1.0 - rng.random::<f64>();
        Self { coin, fraction }
    }
}

/// New heading given the `[left, center, right]` sensor readings.
pub fn turn(heading: i32, readings: [u32; 3], turn_step: u32, draw: TurnDraw) -> i32 {
    let [left, center, right] = readings;
    let step = turn_step as f64;
    let heading = heading as f64;
    let next = if left == center && center == right {
        if draw.coin {
            heading + step
        } else {
            heading - step
        }
    } else if left > right {
        heading - step * draw.fraction
    } else if left < right {
        heading + step * draw.fraction
    } else {
        heading
    };
    normalize_heading(next.round() as i32)
}

/// Per-heading unit displacement, rounded to one of the eight compass octants.
#[derive(Clone, Debug, PartialEq)]
pub struct MoveTable {
    move_step: i32,
    offsets: Vec<(i32, i32)>,
}

impl MoveTable {
    pub fn new(move_step: u32) -> Self {
        let offsets = (0..HEADING_DEGREES)
            .map(|heading| {
                let (cos, sin) = heading_vector(heading as f64);
                (cos.round() as i32, sin.round() as i32)
            })
            .collect();
        Self {
            move_step: move_step as i32,
            offsets,
        }
    }

    /// Position after moving `move_step` pixels along each quantized axis.
    /// `heading` is taken mod 360.
    pub fn advance(&self, x: i32, y: i32, heading: i32) -> (i32, i32) {
        let (dx, dy) = self.offsets[normalize_heading(heading) as usize];
        (
            x.wrapping_add(dx * self.move_step),
            y.wrapping_add(dy * self.move_step),
        )
    }
}

/// True iff `margin < x < width - margin` and `margin < y < height - margin`.
pub fn in_bounds(x: i32, y: i32, width: usize, height: usize, margin: u32) -> bool {
    let (x, y, margin) = (x as i64, y as i64, margin as i64);
    margin < x && x < width as i64 - margin && margin < y && y < height as i64 - margin
}
