//! Capacitive touch pad sampling.
//!
//! Three TTP223-style touch pads drive their outputs high while touched.
//! The loop samples them once per tick; the pairing flow consumes the
//! three-pad chord and single-pad press edges.

use embassy_rp::gpio::Input;

/// One tick's worth of button state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub struct ButtonSample {
    /// All three pads held this tick.
    pub all_held: bool,
    /// At least one pad went from released to touched this tick.
    pub any_pressed_edge: bool,
}

pub struct TouchButtons<'d> {
    pads: [Input<'d>; 3],
    last: [bool; 3],
}

impl<'d> TouchButtons<'d> {
    pub fn new(a: Input<'d>, b: Input<'d>, c: Input<'d>) -> Self {
        Self {
            pads: [a, b, c],
            last: [false; 3],
        }
    }

    pub fn sample(&mut self) -> ButtonSample {
        let mut now = [false; 3];
        for (state, pad) in now.iter_mut().zip(self.pads.iter()) {
            *state = pad.is_high();
        }
        let any_pressed_edge = now
            .iter()
            .zip(self.last.iter())
            .any(|(&current, &before)| current && !before);
        self.last = now;
        ButtonSample {
            all_held: now.iter().all(|&held| held),
            any_pressed_edge,
        }
    }
}
