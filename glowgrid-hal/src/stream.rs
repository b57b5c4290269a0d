//! Text byte-stream transports.
//!
//! The protocol layer only needs three capabilities from a transport:
//! whether a byte is waiting, reading one without blocking, and writing a
//! reply. Both the wired serial port and the Bluetooth module link
//! implement this; the transport mux forwards to whichever is active.

/// A non-blocking byte stream carrying protocol text.
///
/// Reads never block: the main loop polls [`TextStream::read_byte`] until
/// the RX buffer is drained. Writes may block briefly on a full TX buffer;
/// replies are short and the loop budget absorbs it.
pub trait TextStream {
    /// True when at least one byte is waiting to be read.
    fn available(&mut self) -> bool;

    /// Take the next received byte, if any.
    fn read_byte(&mut self) -> Option<u8>;

    /// Send raw bytes.
    fn write_all(&mut self, bytes: &[u8]);

    /// Send text.
    fn write_str(&mut self, text: &str) {
        self.write_all(text.as_bytes());
    }
}
