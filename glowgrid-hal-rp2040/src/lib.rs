//! RP2040 implementations of the Glowgrid hardware capabilities
//!
//! - [`flash`]: preference store in the last flash sector, wear-leveled via
//!   `sequential-storage`
//! - [`uart`]: buffered-UART text streams for the wired port and the
//!   Bluetooth module

#![no_std]

pub mod flash;
pub mod uart;

pub use flash::FlashPrefsStore;
pub use uart::UartTextStream;
