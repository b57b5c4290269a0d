//! Onboard status LEDs.
//!
//! The power LED is PWM-driven with the level the power monitor computes
//! (steady at 3 A, breathing at 1.5 A). The overrun LED pulses briefly
//! whenever a command is NAKed, so a misbehaving host is visible without a
//! terminal.

use embassy_rp::gpio::Output;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};

use glowgrid_core::time::deadline_reached;

/// Overrun pulse length.
pub const OVERRUN_PULSE_MS: u32 = 250;

/// PWM counter top; levels map 1:1 onto the 0..=255 range.
pub const PWM_TOP: u16 = 255;

pub struct StatusLeds<'d> {
    power: Pwm<'d>,
    power_config: PwmConfig,
    overrun: Output<'d>,
    overrun_until: Option<u32>,
}

impl<'d> StatusLeds<'d> {
    pub fn new(power: Pwm<'d>, power_config: PwmConfig, overrun: Output<'d>) -> Self {
        Self {
            power,
            power_config,
            overrun,
            overrun_until: None,
        }
    }

    /// Set the power LED level for this tick.
    pub fn set_power_level(&mut self, level: u8) {
        self.power_config.compare_b = level as u16;
        self.power.set_config(&self.power_config);
    }

    /// Light the overrun LED for [`OVERRUN_PULSE_MS`].
    pub fn pulse_overrun(&mut self, now_ms: u32) {
        self.overrun.set_high();
        self.overrun_until = Some(now_ms.wrapping_add(OVERRUN_PULSE_MS));
    }

    /// Expire a finished overrun pulse.
    pub fn update(&mut self, now_ms: u32) {
        if let Some(until) = self.overrun_until {
            if deadline_reached(now_ms, until) {
                self.overrun.set_low();
                self.overrun_until = None;
            }
        }
    }
}
