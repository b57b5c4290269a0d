//! Logical-to-physical pixel mapping.
//!
//! The matrix is a single WS2812 string wired boustrophedon: even rows run
//! left to right, odd rows right to left. On top of that the panel can be
//! mounted in any of four orientations, so the mounting rotation is applied
//! to the logical coordinates before the serpentine flip.

use glowgrid_protocol::Rotation;

use crate::frame::{HEIGHT, WIDTH};

/// LEDs on the string.
pub const NUM_LEDS: usize = WIDTH * HEIGHT;

/// Physical LED index for logical pixel `(y, x)` under `rotation`.
pub fn led_index(rotation: Rotation, y: usize, x: usize) -> usize {
    let (py, px) = rotate(rotation, y, x);
    serpentine(py, px)
}

/// Rotate logical coordinates clockwise onto the panel.
fn rotate(rotation: Rotation, y: usize, x: usize) -> (usize, usize) {
    match rotation {
        Rotation::R0 => (y, x),
        Rotation::R90 => (x, HEIGHT - 1 - y),
        Rotation::R180 => (HEIGHT - 1 - y, WIDTH - 1 - x),
        Rotation::R270 => (WIDTH - 1 - x, y),
    }
}

/// Serpentine flip: odd rows run backwards on the string.
fn serpentine(y: usize, x: usize) -> usize {
    if y % 2 == 1 {
        y * WIDTH + (WIDTH - 1 - x)
    } else {
        y * WIDTH + x
    }
}
