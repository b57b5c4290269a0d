//! Host transport selection: wired serial or the Bluetooth module.
//!
//! Both transports are plain text streams; the mux is a tagged selection
//! between them, switched by the pairing flow. Higher layers only ever see
//! one stream.

use core::fmt::Write as _;

use embassy_rp::gpio::Input;
use heapless::String;

use glowgrid_hal::TextStream;
use glowgrid_hal_rp2040::UartTextStream;

/// Which stream the protocol currently runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Link {
    Wired,
    Wireless,
}

/// UART-attached Bluetooth SPP module.
///
/// The module bridges its radio link onto the UART transparently; the only
/// control surface the firmware needs is the pairing PIN (AT command) and
/// the STATE pin, which the module drives high while a link is up.
pub struct BtModule<'d> {
    stream: UartTextStream,
    state: Input<'d>,
}

impl<'d> BtModule<'d> {
    pub fn new(stream: UartTextStream, state: Input<'d>) -> Self {
        Self { stream, state }
    }

    /// True while the module reports a connected link.
    pub fn link_up(&self) -> bool {
        self.state.is_high()
    }

    /// Program the pairing PIN for the discoverable window.
    pub fn begin_pairing(&mut self, pin: u32) {
        let mut command: String<24> = String::new();
        if write!(command, "AT+PSWD={:06}\r\n", pin % 1_000_000).is_ok() {
            self.stream.write_str(&command);
        }
        self.drain_module_response();
    }

    /// Drop whatever the module replied to an AT command so it is not fed
    /// to the protocol parser.
    fn drain_module_response(&mut self) {
        while self.stream.read_byte().is_some() {}
    }
}

/// The two host transports plus the active tag.
pub struct TransportMux<'d> {
    wired: UartTextStream,
    wireless: BtModule<'d>,
    active: Link,
}

impl<'d> TransportMux<'d> {
    pub fn new(wired: UartTextStream, wireless: BtModule<'d>) -> Self {
        Self {
            wired,
            wireless,
            active: Link::Wired,
        }
    }

    pub fn link_up(&self) -> bool {
        self.wireless.link_up()
    }

    pub fn bt(&mut self) -> &mut BtModule<'d> {
        &mut self.wireless
    }

    /// Route the protocol over the wireless stream iff pairing is active.
    pub fn select_wireless(&mut self, wireless: bool) {
        let link = if wireless { Link::Wireless } else { Link::Wired };
        if link != self.active {
            defmt::info!("transport switched to {}", link);
            self.active = link;
        }
    }

    pub fn active(&self) -> Link {
        self.active
    }
}

impl TextStream for TransportMux<'_> {
    fn available(&mut self) -> bool {
        match self.active {
            Link::Wired => self.wired.available(),
            Link::Wireless => self.wireless.stream.available(),
        }
    }

    fn read_byte(&mut self) -> Option<u8> {
        match self.active {
            Link::Wired => self.wired.read_byte(),
            Link::Wireless => self.wireless.stream.read_byte(),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) {
        match self.active {
            Link::Wired => self.wired.write_all(bytes),
            Link::Wireless => self.wireless.stream.write_all(bytes),
        }
    }
}
