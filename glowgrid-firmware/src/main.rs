//! Glowgrid - 16x16 LED Matrix Firmware
//!
//! Main firmware binary for the RP2040-based Glowgrid board. The board
//! receives pixel animations over a line-oriented text protocol (wired
//! serial or a Bluetooth SPP module), queues them in fixed-size pools, and
//! plays them back on a serpentine-wired WS2812 matrix. USB-C CC sensing
//! decides when the matrix rails may be energized.
//!
//! Everything runs in one cooperative 30 ms loop; see `run.rs`.
//!
//! # Pinout
//!
//! | Pin     | Function                         |
//! |---------|----------------------------------|
//! | GPIO0/1 | wired host UART (TX/RX)          |
//! | GPIO2-4 | touch pads                       |
//! | GPIO8/9 | Bluetooth module UART (TX/RX)    |
//! | GPIO10  | Bluetooth module STATE           |
//! | GPIO14  | matrix logic rail enable         |
//! | GPIO15  | matrix LED rail enable           |
//! | GPIO16  | WS2812 data (PIO0)               |
//! | GPIO17  | power status LED (PWM)           |
//! | GPIO18  | overrun status LED               |
//! | GPIO26/27 | USB-C CC1/CC2 sense (ADC)      |

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Channel as AdcChannel, Config as AdcConfig, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::clocks::RoscRng;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{PIO0, UART0, UART1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::pio_programs::ws2812::{PioWs2812, PioWs2812Program};
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use heapless::String;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use glowgrid_core::pairing::PairingFlow;
use glowgrid_core::{Engine, Frame, Settings};
use glowgrid_hal::{PrefKey, PrefsStore};
use glowgrid_hal_rp2040::{FlashPrefsStore, UartTextStream};
use glowgrid_protocol::CurrentLimit;

use crate::buttons::TouchButtons;
use crate::cc_sense::CcSense;
use crate::matrix::MatrixDriver;
use crate::run::Board;
use crate::status_led::{StatusLeds, PWM_TOP};
use crate::transport::{BtModule, TransportMux};

mod buttons;
mod cc_sense;
mod matrix;
mod run;
mod status_led;
mod transport;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

// Wired RX holds well over 30 ms of 115200 baud traffic (~430 bytes) so a
// pipelining host never overruns between loop ticks.
static WIRED_TX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();
static WIRED_RX_BUF: StaticCell<[u8; 4096]> = StaticCell::new();
static BT_TX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();
static BT_RX_BUF: StaticCell<[u8; 4096]> = StaticCell::new();

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Glowgrid firmware starting...");

    let p = embassy_rp::init(Default::default());

    // Preferences come up first; everything else is configured from them.
    let mut prefs = FlashPrefsStore::new(p.FLASH, p.DMA_CH1);
    let settings = Settings::from_prefs(
        load_pref(&mut prefs, PrefKey::Brightness).await,
        load_pref(&mut prefs, PrefKey::Dither).await,
        load_pref(&mut prefs, PrefKey::ColorCorrection).await,
        load_pref(&mut prefs, PrefKey::Rotation).await,
    );
    let power_override = load_pref(&mut prefs, PrefKey::PowerOverride)
        .await
        .and_then(CurrentLimit::from_u32);
    info!(
        "boot settings: brightness={} dither={} rotation={}",
        settings.brightness,
        settings.dither,
        settings.rotation.as_token()
    );

    let engine = Engine::new(settings, power_override);

    // Wired host port.
    let uart_config = UartConfig::default(); // 115200 baud default
    let wired_tx_buf = WIRED_TX_BUF.init([0u8; 1024]);
    let wired_rx_buf = WIRED_RX_BUF.init([0u8; 4096]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, wired_tx_buf, wired_rx_buf);
    let (wired_tx, wired_rx) = uart.split();
    let wired = UartTextStream::new(wired_rx, wired_tx);

    // Bluetooth SPP module on the second UART; STATE is high while a link
    // is up.
    let bt_config = UartConfig::default();
    let bt_tx_buf = BT_TX_BUF.init([0u8; 1024]);
    let bt_rx_buf = BT_RX_BUF.init([0u8; 4096]);
    let bt_uart = Uart::new_blocking(p.UART1, p.PIN_8, p.PIN_9, bt_config);
    let bt_uart = bt_uart.into_buffered(Irqs, bt_tx_buf, bt_rx_buf);
    let (bt_tx, bt_rx) = bt_uart.split();
    let bt_state = Input::new(p.PIN_10, Pull::Down);
    let bt = BtModule::new(UartTextStream::new(bt_rx, bt_tx), bt_state);

    let transport = TransportMux::new(wired, bt);

    // WS2812 matrix on PIO0 plus its two supply rails.
    let Pio {
        mut common, sm0, ..
    } = Pio::new(p.PIO0, Irqs);
    let ws2812_program = PioWs2812Program::new(&mut common);
    let ws = PioWs2812::new(&mut common, sm0, p.DMA_CH0, p.PIN_16, &ws2812_program);
    let rail_logic = Output::new(p.PIN_14, Level::Low);
    let rail_leds = Output::new(p.PIN_15, Level::Low);
    let matrix = MatrixDriver::new(ws, rail_logic, rail_leds, &settings);

    // USB-C CC sense.
    let adc = Adc::new(p.ADC, Irqs, AdcConfig::default());
    let cc1 = AdcChannel::new_pin(p.PIN_26, Pull::None);
    let cc2 = AdcChannel::new_pin(p.PIN_27, Pull::None);
    let cc = CcSense::new(adc, cc1, cc2);

    // Touch pads, active high.
    let buttons = TouchButtons::new(
        Input::new(p.PIN_2, Pull::Down),
        Input::new(p.PIN_3, Pull::Down),
        Input::new(p.PIN_4, Pull::Down),
    );

    // Status LEDs.
    let mut pwm_config = PwmConfig::default();
    pwm_config.top = PWM_TOP;
    pwm_config.compare_b = 0;
    let power_led = Pwm::new_output_b(p.PWM_SLICE0, p.PIN_17, pwm_config.clone());
    let overrun_led = Output::new(p.PIN_18, Level::Low);
    let status = StatusLeds::new(power_led, pwm_config, overrun_led);

    info!("peripherals initialized");

    let board = Board {
        engine,
        pairing: PairingFlow::new(),
        matrix,
        transport,
        buttons,
        status,
        cc,
        prefs,
        rng: RoscRng,
        overlay: Frame::new(),
        reply: String::new(),
    };

    run::main_loop(board).await
}

async fn load_pref(prefs: &mut FlashPrefsStore<'_>, key: PrefKey) -> Option<u32> {
    match prefs.load(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("pref read failed: {}", e);
            None
        }
    }
}
