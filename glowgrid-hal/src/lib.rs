//! Hardware capability traits
//!
//! These traits define the interface between the Glowgrid application logic
//! and chip-specific implementations:
//!
//! - Byte-stream transports carrying the text protocol (wired serial, the
//!   Bluetooth module link)
//! - Persistent key/value preference storage

#![no_std]
#![deny(unsafe_code)]
#![allow(async_fn_in_trait, reason = "single-threaded embedded")]

pub mod storage;
pub mod stream;

pub use storage::{PrefKey, PrefsError, PrefsStore};
pub use stream::TextStream;
