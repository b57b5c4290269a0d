//! Reply types and their wire rendering.
//!
//! Every executed command produces exactly one [`Reply`]; rendering appends
//! `\r\n`-terminated text to a caller-provided buffer. `DBG` is the one
//! free-form, multi-line reply.

use core::fmt::{self, Write};

use heapless::{String, Vec};

use crate::command::{CurrentLimit, Rotation};
use crate::PROTOCOL_VERSION;

/// One entry per animation slot can appear in a `QUE` reply.
pub const MAX_QUEUE_ENTRIES: usize = 32;

/// Rendering buffer size that fits every reply, including a full `DBG` dump.
pub const MAX_REPLY_LEN: usize = 3072;

/// Failure codes carried by `NAK` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NakCode {
    /// Bad argument count or value.
    Arg,
    /// Slot pool exhausted.
    Underflow,
    /// No frame is being loaded.
    NoFrame,
    /// The loading frame is already full.
    Overflow,
    /// No animation is being loaded.
    NoAnimation,
    /// Unparseable line.
    Line,
    /// Line exceeded the buffer.
    LineTooLong,
    /// Unknown command.
    UnknownCommand,
}

impl NakCode {
    pub fn as_token(self) -> &'static str {
        match self {
            NakCode::Arg => "ARG",
            NakCode::Underflow => "UFL",
            NakCode::NoFrame => "NFM",
            NakCode::Overflow => "OFL",
            NakCode::NoAnimation => "NOA",
            NakCode::Line => "LIN",
            NakCode::LineTooLong => "LTL",
            NakCode::UnknownCommand => "CMD",
        }
    }
}

/// Device's belief about the available USB current.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerReport {
    Known(CurrentLimit),
    /// CC sampling has not settled yet.
    Unknown,
}

impl PowerReport {
    pub fn as_token(self) -> &'static str {
        match self {
            PowerReport::Known(limit) => limit.as_token(),
            PowerReport::Unknown => "UNK",
        }
    }
}

/// One live animation in a `QUE` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    /// Remaining display time for the head animation, full duration for the
    /// rest.
    pub remaining_ms: u32,
    pub frames: u16,
}

/// Snapshot of one animation record for the `DBG` dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugAnimation {
    pub being_loaded: bool,
    pub started: bool,
    pub frame_start: u16,
    pub num_frames: u16,
    pub duration_ms: u32,
}

/// Snapshot of the ring cursors for the `DBG` dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugDump {
    pub animation_start: u16,
    pub animation_len: u16,
    pub animation_cap: u16,
    pub frame_start: u16,
    pub frame_len: u16,
    pub frame_cap: u16,
    pub current_frame: u16,
    pub animations: Vec<DebugAnimation, MAX_QUEUE_ENTRIES>,
}

/// One reply line (or, for `DBG`, block) to send back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    AckVersion,
    AckFree { animations: u16, frames: u16 },
    AckQueue(Vec<QueueEntry, MAX_QUEUE_ENTRIES>),
    AckReset,
    AckCorrection(u32),
    AckBrightness(u8),
    AckDither(bool),
    AckRotate(Rotation),
    AckPower(PowerReport),
    AckAnimation(u32),
    AckFrame(u32),
    AckRow(u8),
    AckDone,
    AckNext,
    Debug(DebugDump),
    /// `NAK <CMD> <CODE>`
    Nak { cmd: &'static str, code: NakCode },
    /// `NAK <CODE>` for failures with no command context (`LIN`, `LTL`,
    /// `CMD`).
    NakBare(NakCode),
}

impl Reply {
    pub const fn nak(cmd: &'static str, code: NakCode) -> Self {
        Reply::Nak { cmd, code }
    }

    /// True for any `NAK` shape.
    pub fn is_nak(&self) -> bool {
        matches!(self, Reply::Nak { .. } | Reply::NakBare(_))
    }

    /// Render the reply, `\r\n` terminated, appending to `out`.
    pub fn render<const N: usize>(&self, out: &mut String<N>) -> fmt::Result {
        match self {
            Reply::AckVersion => write!(out, "ACK VER {PROTOCOL_VERSION}\r\n"),
            Reply::AckFree { animations, frames } => {
                write!(out, "ACK FRE {animations} {frames}\r\n")
            }
            Reply::AckQueue(entries) => {
                write!(out, "ACK QUE")?;
                for entry in entries {
                    write!(out, " ({},{})", entry.remaining_ms, entry.frames)?;
                }
                write!(out, "\r\n")
            }
            Reply::AckReset => write!(out, "ACK RST\r\n"),
            Reply::AckCorrection(packed) => write!(out, "ACK CLC {packed:06X}\r\n"),
            Reply::AckBrightness(value) => write!(out, "ACK DIM {value}\r\n"),
            Reply::AckDither(true) => write!(out, "ACK DTH ON\r\n"),
            Reply::AckDither(false) => write!(out, "ACK DTH OFF\r\n"),
            Reply::AckRotate(rotation) => write!(out, "ACK ROT {}\r\n", rotation.as_token()),
            Reply::AckPower(report) => write!(out, "ACK PWR {}\r\n", report.as_token()),
            Reply::AckAnimation(ms) => write!(out, "ACK ANM {ms}\r\n"),
            Reply::AckFrame(ms) => write!(out, "ACK FRM {ms}\r\n"),
            Reply::AckRow(row) => write!(out, "ACK RGB {row}\r\n"),
            Reply::AckDone => write!(out, "ACK DON ANM\r\n"),
            Reply::AckNext => write!(out, "ACK NXT\r\n"),
            Reply::Debug(dump) => {
                write!(
                    out,
                    "DBG animations start={} len={} cap={}\r\n",
                    dump.animation_start, dump.animation_len, dump.animation_cap
                )?;
                write!(
                    out,
                    "DBG frames start={} len={} cap={} current={}\r\n",
                    dump.frame_start, dump.frame_len, dump.frame_cap, dump.current_frame
                )?;
                for (i, anim) in dump.animations.iter().enumerate() {
                    write!(
                        out,
                        "DBG anim[{i}] loading={} started={} first={} count={} duration={}\r\n",
                        anim.being_loaded as u8,
                        anim.started as u8,
                        anim.frame_start,
                        anim.num_frames,
                        anim.duration_ms
                    )?;
                }
                Ok(())
            }
            Reply::Nak { cmd, code } => write!(out, "NAK {cmd} {}\r\n", code.as_token()),
            Reply::NakBare(code) => write!(out, "NAK {}\r\n", code.as_token()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(reply: &Reply) -> String<MAX_REPLY_LEN> {
        let mut out = String::new();
        reply.render(&mut out).unwrap();
        out
    }

    #[test]
    fn test_render_version() {
        assert_eq!(rendered(&Reply::AckVersion).as_str(), "ACK VER 1.0\r\n");
    }

    #[test]
    fn test_render_free() {
        let reply = Reply::AckFree {
            animations: 32,
            frames: 16,
        };
        assert_eq!(rendered(&reply).as_str(), "ACK FRE 32 16\r\n");
    }

    #[test]
    fn test_render_queue() {
        let mut entries = Vec::new();
        entries
            .push(QueueEntry {
                remaining_ms: 1500,
                frames: 3,
            })
            .unwrap();
        entries
            .push(QueueEntry {
                remaining_ms: 2000,
                frames: 4,
            })
            .unwrap();
        assert_eq!(
            rendered(&Reply::AckQueue(entries)).as_str(),
            "ACK QUE (1500,3) (2000,4)\r\n"
        );
    }

    #[test]
    fn test_render_empty_queue() {
        assert_eq!(rendered(&Reply::AckQueue(Vec::new())).as_str(), "ACK QUE\r\n");
    }

    #[test]
    fn test_render_correction_padded() {
        assert_eq!(
            rendered(&Reply::AckCorrection(0x00B0F0)).as_str(),
            "ACK CLC 00B0F0\r\n"
        );
    }

    #[test]
    fn test_render_naks() {
        assert_eq!(
            rendered(&Reply::nak("RGB", NakCode::NoFrame)).as_str(),
            "NAK RGB NFM\r\n"
        );
        assert_eq!(
            rendered(&Reply::NakBare(NakCode::LineTooLong)).as_str(),
            "NAK LTL\r\n"
        );
    }

    #[test]
    fn test_render_power_unknown() {
        assert_eq!(
            rendered(&Reply::AckPower(PowerReport::Unknown)).as_str(),
            "ACK PWR UNK\r\n"
        );
    }

    #[test]
    fn test_full_queue_fits_buffer() {
        let mut entries = Vec::new();
        for _ in 0..MAX_QUEUE_ENTRIES {
            entries
                .push(QueueEntry {
                    remaining_ms: u32::MAX,
                    frames: u16::MAX,
                })
                .unwrap();
        }
        let mut out: String<MAX_REPLY_LEN> = String::new();
        Reply::AckQueue(entries).render(&mut out).unwrap();
        assert!(out.ends_with("\r\n"));
    }
}
