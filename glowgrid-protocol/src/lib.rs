//! Glowgrid host/device wire protocol
//!
//! This crate defines the line-oriented text protocol between a host (browser
//! client or script) and the Glowgrid LED matrix. The protocol streams
//! animations as framed pixel rows and lets the host query and configure the
//! device.
//!
//! # Protocol overview
//!
//! Requests are ASCII lines terminated by `\n` (a preceding `\r` is
//! stripped). The first token is a three-letter command, followed by up to
//! three arguments separated by whitespace:
//!
//! ```text
//! ANM 2000          start loading a 2000 ms animation
//! FRM 1000          start loading a 1000 ms frame into it
//! RGB FF0000…       append one 16-pixel row (96 uppercase hex digits)
//! DON               seal the animation for playback
//! ```
//!
//! The device answers every command line with exactly one reply line,
//! terminated by `\r\n`:
//!
//! ```text
//! ACK <CMD> [<args>]
//! NAK <CMD> <CODE>
//! ```
//!
//! Line-level failures (`NAK LIN`, `NAK LTL`, `NAK CMD`) carry no command
//! mnemonic. The host may pipeline request lines up to the device's receive
//! buffer; replies come back in order.

#![no_std]
#![deny(unsafe_code)]

pub mod command;
pub mod line;
pub mod reply;

pub use command::{Command, CorrectionArg, CurrentLimit, PowerArg, Rotation, ROW_HEX_LEN};
pub use line::{LineBuffer, LineError, MAX_LINE_LEN};
pub use reply::{
    DebugAnimation, DebugDump, NakCode, PowerReport, QueueEntry, Reply, MAX_QUEUE_ENTRIES,
    MAX_REPLY_LEN,
};

/// Protocol version reported by `VER`.
pub const PROTOCOL_VERSION: &str = "1.0";
