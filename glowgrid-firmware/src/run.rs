//! The cooperative main loop.
//!
//! One iteration every 30 ms: power update, then either the pairing UI or
//! {display + protocol service}, then dirty-settings application and the
//! status LEDs, then sleep out the budget. The loop drops to a 15 ms
//! budget while a changed CC classification awaits its confirmation
//! sample. All mutable state lives in [`Board`]; handlers only ever see
//! borrowed references.

use defmt::*;
use embassy_rp::clocks::RoscRng;
use embassy_time::{Duration, Instant, Timer};
use heapless::String;
use rand_core::RngCore;

use glowgrid_core::pairing::{PairingAction, PairingFlow};
use glowgrid_core::power::CONFIRM_DELAY_MS;
use glowgrid_core::{Dirty, Engine, Frame};
use glowgrid_hal::{PrefKey, PrefsStore, TextStream};
use glowgrid_hal_rp2040::FlashPrefsStore;
use glowgrid_protocol::{Reply, MAX_REPLY_LEN};

use crate::buttons::TouchButtons;
use crate::cc_sense::CcSense;
use crate::matrix::MatrixDriver;
use crate::status_led::StatusLeds;
use crate::transport::TransportMux;

/// Base loop budget.
pub const LOOP_BUDGET_MS: u32 = 30;

/// Everything the loop owns.
pub struct Board<'d> {
    pub engine: Engine,
    pub pairing: PairingFlow,
    pub matrix: MatrixDriver<'d>,
    pub transport: TransportMux<'d>,
    pub buttons: TouchButtons<'d>,
    pub status: StatusLeds<'d>,
    pub cc: CcSense<'d>,
    pub prefs: FlashPrefsStore<'d>,
    pub rng: RoscRng,
    /// Scratch frame for the pairing overlays.
    pub overlay: Frame,
    /// Reply rendering buffer, reused across lines.
    pub reply: String<MAX_REPLY_LEN>,
}

pub async fn main_loop(mut board: Board<'_>) -> ! {
    info!("main loop running");
    loop {
        let tick_start = Instant::now();
        let now_ms = tick_start.as_millis() as u32;

        // Power first: USB-C compliance gates everything else.
        let (cc1_mv, cc2_mv) = board.cc.sample_mv().await;
        if let Some(limit) = board.engine.power_mut().sample(cc1_mv, cc2_mv, now_ms) {
            info!("usb current accepted: {}", limit.as_token());
        }
        let decision = board.engine.power().decision();
        board.matrix.set_brightness_cap(decision.brightness_cap);
        board.matrix.set_rails(decision.rails_on).await;

        // Buttons drive the pairing flow.
        let buttons = board.buttons.sample();
        if let Some(action) = board
            .pairing
            .update(buttons.all_held, buttons.any_pressed_edge, now_ms)
        {
            match action {
                PairingAction::Begin => {
                    let pin = board.rng.next_u32() % 1_000_000;
                    board.pairing.begin(pin, now_ms);
                    board.transport.bt().begin_pairing(pin);
                    info!("pairing window open");
                }
                PairingAction::Accept => info!("pairing accepted"),
                PairingAction::Cancel => info!("pairing window expired"),
            }
        }
        if board.pairing.is_active() && !board.transport.link_up() {
            board.pairing.link_lost();
        }
        board.transport.select_wireless(board.pairing.is_active());

        if board.pairing.in_progress() {
            board.pairing.render_overlay(&mut board.overlay, now_ms);
            board.matrix.show(&board.overlay).await;
        } else {
            board.matrix.show(board.engine.current_frame(now_ms)).await;
            service_protocol(&mut board, now_ms).await;
        }

        let dirty = board.engine.take_dirty();
        if dirty.any() {
            apply_dirty(&mut board, dirty).await;
        }

        board
            .status
            .set_power_level(board.engine.power().status_level(now_ms));
        board.status.update(now_ms);

        // Sleep out the budget; sample faster while a power change awaits
        // confirmation.
        let budget_ms = if board.engine.power().confirm_pending() {
            CONFIRM_DELAY_MS
        } else {
            LOOP_BUDGET_MS
        };
        let budget = Duration::from_millis(budget_ms as u64);
        let elapsed = tick_start.elapsed();
        if elapsed < budget {
            Timer::after(budget - elapsed).await;
        }
    }
}

/// Drain the active transport, replying to each completed line before the
/// next byte is consumed. Pipelined hosts are bounded by the RX buffer.
async fn service_protocol(board: &mut Board<'_>, now_ms: u32) {
    while let Some(byte) = board.transport.read_byte() {
        let Some(reply) = board.engine.feed(byte, now_ms) else {
            continue;
        };
        board.reply.clear();
        match reply.render(&mut board.reply) {
            Ok(()) => board.transport.write_str(&board.reply),
            Err(_) => error!("reply exceeded render buffer"),
        }
        if reply.is_nak() {
            board.status.pulse_overrun(now_ms);
        }
        if matches!(reply, Reply::AckReset) {
            board.matrix.clear().await;
        }
    }
}

/// Push changed settings into the matrix driver and the preference store.
async fn apply_dirty(board: &mut Board<'_>, dirty: Dirty) {
    let settings = *board.engine.settings();
    board.matrix.apply_settings(&settings);

    if dirty.brightness {
        persist(&mut board.prefs, PrefKey::Brightness, settings.brightness as u32).await;
    }
    if dirty.dither {
        persist(&mut board.prefs, PrefKey::Dither, settings.dither as u32).await;
    }
    if dirty.correction {
        persist(&mut board.prefs, PrefKey::ColorCorrection, settings.correction).await;
    }
    if dirty.rotation {
        persist(&mut board.prefs, PrefKey::Rotation, settings.rotation.as_u32()).await;
    }
    if dirty.power_override {
        match board.engine.power().override_limit() {
            Some(limit) => {
                persist(&mut board.prefs, PrefKey::PowerOverride, limit.as_u32()).await;
            }
            None => {
                if let Err(e) = board.prefs.remove(PrefKey::PowerOverride).await {
                    warn!("pref remove failed: {}", e);
                }
            }
        }
    }
}

async fn persist(prefs: &mut FlashPrefsStore<'_>, key: PrefKey, value: u32) {
    if let Err(e) = prefs.store(key, value).await {
        warn!("pref write failed: {}", e);
    }
}
