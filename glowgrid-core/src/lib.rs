//! Board-agnostic core logic for the Glowgrid LED matrix firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Fixed-size frame and animation pools (parallel ring buffers)
//! - Time-driven playback state machine
//! - Command engine dispatching the wire protocol onto the pools
//! - Logical-to-physical pixel mapping (serpentine wiring, rotation)
//! - 8-bit color correction, brightness, and dithering math
//! - USB-C CC classification, debouncing, and power gating policy
//! - Bluetooth pairing flow and its matrix overlays
//!
//! Time is injected everywhere as `u32` milliseconds, so the whole crate is
//! host-testable.

#![no_std]
#![deny(unsafe_code)]

pub mod color;
pub mod engine;
pub mod frame;
pub mod layout;
pub mod pairing;
pub mod player;
pub mod pool;
pub mod power;
pub mod time;

pub use engine::{Dirty, Engine, Settings};
pub use frame::{Frame, HexError, FRAME_BYTES, HEIGHT, WIDTH};
pub use player::Player;
pub use pool::{Animation, AnimationPool, MAX_ANIMATIONS, MAX_FRAMES};
pub use power::{PowerDecision, PowerMonitor};

/// Invariant-violation sink.
///
/// Reached only when a pool index or cursor is provably out of range. Logs
/// and continues; the main loop must never crash.
pub(crate) fn cant_happen(fault: Fault) {
    #[cfg(feature = "defmt")]
    defmt::error!("invariant violated: {}", fault as u8);
    let _ = fault;
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Fault {
    RetireWithoutHead = 1,
    FrameSpanExceedsRing = 2,
    FrameSlotWithoutAnimation = 3,
}
