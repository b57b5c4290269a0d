//! Buffered-UART text streams.
//!
//! Both transports are interrupt-buffered UARTs: the wired host port and
//! the serial side of the Bluetooth module. The buffered halves give the
//! cooperative main loop non-blocking reads; writes go straight into the
//! TX ring.

use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};
use embedded_io::{Read, ReadReady, Write};

use glowgrid_hal::TextStream;

/// A split buffered UART exposed as a protocol text stream.
pub struct UartTextStream {
    rx: BufferedUartRx,
    tx: BufferedUartTx,
}

impl UartTextStream {
    pub fn new(rx: BufferedUartRx, tx: BufferedUartTx) -> Self {
        Self { rx, tx }
    }

    /// Direct access to the TX half, for module AT command setup.
    pub fn tx(&mut self) -> &mut BufferedUartTx {
        &mut self.tx
    }
}

impl TextStream for UartTextStream {
    fn available(&mut self) -> bool {
        self.rx.read_ready().unwrap_or(false)
    }

    fn read_byte(&mut self) -> Option<u8> {
        if !self.available() {
            return None;
        }
        let mut byte = [0u8; 1];
        match self.rx.read(&mut byte) {
            Ok(n) if n > 0 => Some(byte[0]),
            _ => None,
        }
    }

    fn write_all(&mut self, bytes: &[u8]) {
        // A full TX ring stalls briefly; replies are short.
        let _ = Write::write_all(&mut self.tx, bytes);
    }
}
