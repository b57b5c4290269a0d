//! Physical matrix driver.
//!
//! Owns the WS2812 string on PIO0 and the two matrix supply rails. Each
//! flush maps logical frame pixels through the mounting rotation and the
//! serpentine wiring, then runs them through correction, brightness, and
//! dithering before handing the buffer to the PIO.

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio_programs::ws2812::PioWs2812;
use embassy_time::Timer;
use smart_leds::RGB8;

use glowgrid_core::color::{shade, Correction};
use glowgrid_core::layout::{led_index, NUM_LEDS};
use glowgrid_core::{Frame, Settings, HEIGHT, WIDTH};
use glowgrid_protocol::Rotation;

/// Rail capacitance charge time before the first flush after power-up.
const RAIL_CHARGE_MS: u64 = 50;

pub struct MatrixDriver<'d> {
    ws: PioWs2812<'d, PIO0, 0, NUM_LEDS>,
    rail_logic: Output<'d>,
    rail_leds: Output<'d>,
    rails_on: bool,
    correction: Correction,
    brightness: u8,
    brightness_cap: u8,
    dither: bool,
    dither_phase: bool,
    rotation: Rotation,
    buf: [RGB8; NUM_LEDS],
}

impl<'d> MatrixDriver<'d> {
    pub fn new(
        ws: PioWs2812<'d, PIO0, 0, NUM_LEDS>,
        rail_logic: Output<'d>,
        rail_leds: Output<'d>,
        settings: &Settings,
    ) -> Self {
        Self {
            ws,
            rail_logic,
            rail_leds,
            rails_on: false,
            correction: Correction::from_packed(settings.correction),
            brightness: settings.brightness,
            brightness_cap: 0,
            dither: settings.dither,
            dither_phase: false,
            rotation: settings.rotation,
            buf: [RGB8::default(); NUM_LEDS],
        }
    }

    /// Energize or cut the matrix supply rails. Powering up waits for the
    /// rail capacitance to charge so the first flush is not browned out.
    pub async fn set_rails(&mut self, on: bool) {
        if on == self.rails_on {
            return;
        }
        self.rails_on = on;
        if on {
            self.rail_logic.set_high();
            self.rail_leds.set_high();
            Timer::after_millis(RAIL_CHARGE_MS).await;
        } else {
            self.rail_leds.set_low();
            self.rail_logic.set_low();
        }
    }

    /// Upper brightness clamp from the power budget.
    pub fn set_brightness_cap(&mut self, cap: u8) {
        self.brightness_cap = cap;
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.brightness = settings.brightness;
        self.dither = settings.dither;
        self.correction = Correction::from_packed(settings.correction);
        self.rotation = settings.rotation;
    }

    /// Render one logical frame onto the string.
    pub async fn show(&mut self, frame: &Frame) {
        if !self.rails_on {
            return;
        }
        let level = self.brightness.min(self.brightness_cap);
        self.dither_phase = !self.dither_phase;
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let (r, g, b) = frame.pixel(y, x);
                let led = led_index(self.rotation, y, x);
                self.buf[led] = RGB8 {
                    r: shade(r, self.correction.r, level, self.dither, self.dither_phase),
                    g: shade(g, self.correction.g, level, self.dither, self.dither_phase),
                    b: shade(b, self.correction.b, level, self.dither, self.dither_phase),
                };
            }
        }
        self.ws.write(&self.buf).await;
    }

    /// Blank the string immediately.
    pub async fn clear(&mut self) {
        if !self.rails_on {
            return;
        }
        self.buf = [RGB8::default(); NUM_LEDS];
        self.ws.write(&self.buf).await;
    }
}
