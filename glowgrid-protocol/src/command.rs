//! Request grammar: tokenizing and argument validation.
//!
//! Parsing is purely syntactic. Resource and sequencing failures (`UFL`,
//! `NFM`, `OFL`, `NOA`) are produced by the command engine, not here.

use heapless::Vec;

use crate::reply::{NakCode, Reply};

/// Commands are exactly three ASCII characters.
pub const CMD_LEN: usize = 3;

/// At most four whitespace-separated tokens are retained per line; extra
/// tokens are dropped.
pub const MAX_TOKENS: usize = 4;

/// Hex digits in one `RGB` row payload: 16 pixels, 6 digits each.
pub const ROW_HEX_LEN: usize = 96;

/// Physical mounting rotation of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Wire token, zero-padded degrees.
    pub fn as_token(self) -> &'static str {
        match self {
            Rotation::R0 => "000",
            Rotation::R90 => "090",
            Rotation::R180 => "180",
            Rotation::R270 => "270",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "000" => Some(Rotation::R0),
            "090" => Some(Rotation::R90),
            "180" => Some(Rotation::R180),
            "270" => Some(Rotation::R270),
            _ => None,
        }
    }

    /// Persisted encoding: degrees.
    pub fn as_u32(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }
}

/// USB current level, as advertised on CC or forced by `PWR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CurrentLimit {
    /// USB-C 3.0 A advertisement.
    Amps3_0,
    /// USB-C 1.5 A advertisement.
    Amps1_5,
    /// Legacy USB, at most 0.5 A.
    Amps0_5,
}

impl CurrentLimit {
    pub fn as_token(self) -> &'static str {
        match self {
            CurrentLimit::Amps3_0 => "3.0A",
            CurrentLimit::Amps1_5 => "1.5A",
            CurrentLimit::Amps0_5 => "0.5A",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "3.0A" => Some(CurrentLimit::Amps3_0),
            "1.5A" => Some(CurrentLimit::Amps1_5),
            "0.5A" => Some(CurrentLimit::Amps0_5),
            _ => None,
        }
    }

    /// Persisted encoding: milliamps.
    pub fn as_u32(self) -> u32 {
        match self {
            CurrentLimit::Amps3_0 => 3000,
            CurrentLimit::Amps1_5 => 1500,
            CurrentLimit::Amps0_5 => 500,
        }
    }

    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            3000 => Some(CurrentLimit::Amps3_0),
            1500 => Some(CurrentLimit::Amps1_5),
            500 => Some(CurrentLimit::Amps0_5),
            _ => None,
        }
    }
}

/// Argument form of `CLC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CorrectionArg {
    /// `CLC`: report the current correction.
    Read,
    /// `CLC RRGGBB`: set and persist a packed 24-bit correction.
    Set(u32),
    /// `CLC RST`: restore the default correction.
    Reset,
}

/// Argument form of `PWR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerArg {
    /// `PWR`: report the current belief.
    Read,
    /// `PWR <limit>`: override and persist the belief.
    Set(CurrentLimit),
    /// `PWR RST`: drop the override, back to CC sampling.
    Reset,
}

/// One parsed request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `VER`: firmware version handshake.
    Version,
    /// `FRE`: free animation and frame slot counts.
    FreeSlots,
    /// `QUE`: live queue durations and frame counts.
    Queue,
    /// `RST`: full reset of pools, parser state, and matrix.
    Reset,
    /// `DBG`: diagnostic dump of ring indices.
    Debug,
    Correction(CorrectionArg),
    /// `DIM [n]`: read or set brightness.
    Brightness(Option<u8>),
    /// `DTH ON|OFF`: binary dithering.
    Dither(bool),
    /// `ROT [deg]`: read or set the mounting rotation.
    Rotate(Option<Rotation>),
    Power(PowerArg),
    /// `ANM <ms>`: start loading an animation.
    Animation { duration_ms: u32 },
    /// `FRM <ms>`: start loading a frame into the loading animation.
    Frame { duration_ms: u32 },
    /// `RGB <hex>`: append one pixel row to the loading frame.
    PixelRow(&'a str),
    /// `DON`: seal the loading animation.
    Done,
    /// `NXT`: skip to the next queued animation.
    Next,
}

impl<'a> Command<'a> {
    /// Parse one request line.
    ///
    /// `Ok(None)` for a blank line (no reply is sent), `Err` carries the
    /// `NAK` to emit for a malformed one.
    pub fn parse(line: &'a str) -> Result<Option<Self>, Reply> {
        let mut tokens: Vec<&str, MAX_TOKENS> = Vec::new();
        for token in line.split_ascii_whitespace() {
            if tokens.push(token).is_err() {
                break;
            }
        }
        let Some(&cmd) = tokens.first() else {
            return Ok(None);
        };
        if cmd.len() != CMD_LEN {
            return Err(Reply::NakBare(NakCode::Line));
        }
        let args = &tokens[1..];

        let command = match cmd {
            "VER" => Self::no_args("VER", args, Command::Version)?,
            "FRE" => Self::no_args("FRE", args, Command::FreeSlots)?,
            "QUE" => Self::no_args("QUE", args, Command::Queue)?,
            "RST" => Self::no_args("RST", args, Command::Reset)?,
            "DBG" => Self::no_args("DBG", args, Command::Debug)?,
            "DON" => Self::no_args("DON", args, Command::Done)?,
            "NXT" => Self::no_args("NXT", args, Command::Next)?,
            "CLC" => match args {
                &[] => Command::Correction(CorrectionArg::Read),
                &["RST"] => Command::Correction(CorrectionArg::Reset),
                &[hex] => Command::Correction(CorrectionArg::Set(
                    parse_hex6(hex).ok_or(Reply::nak("CLC", NakCode::Arg))?,
                )),
                _ => return Err(Reply::nak("CLC", NakCode::Arg)),
            },
            "DIM" => match args {
                &[] => Command::Brightness(None),
                &[value] => {
                    let value = parse_u32(value)
                        .filter(|&v| v <= u8::MAX as u32)
                        .ok_or(Reply::nak("DIM", NakCode::Arg))?;
                    Command::Brightness(Some(value as u8))
                }
                _ => return Err(Reply::nak("DIM", NakCode::Arg)),
            },
            "DTH" => match args {
                &["ON"] => Command::Dither(true),
                &["OFF"] => Command::Dither(false),
                _ => return Err(Reply::nak("DTH", NakCode::Arg)),
            },
            "ROT" => match args {
                &[] => Command::Rotate(None),
                &[token] => Command::Rotate(Some(
                    Rotation::from_token(token).ok_or(Reply::nak("ROT", NakCode::Arg))?,
                )),
                _ => return Err(Reply::nak("ROT", NakCode::Arg)),
            },
            "PWR" => match args {
                &[] => Command::Power(PowerArg::Read),
                &["RST"] => Command::Power(PowerArg::Reset),
                &[token] => Command::Power(PowerArg::Set(
                    CurrentLimit::from_token(token).ok_or(Reply::nak("PWR", NakCode::Arg))?,
                )),
                _ => return Err(Reply::nak("PWR", NakCode::Arg)),
            },
            "ANM" => Command::Animation {
                duration_ms: Self::one_duration("ANM", args)?,
            },
            "FRM" => Command::Frame {
                duration_ms: Self::one_duration("FRM", args)?,
            },
            "RGB" => match args {
                &[hex] if hex.len() == ROW_HEX_LEN => Command::PixelRow(hex),
                _ => return Err(Reply::nak("RGB", NakCode::Arg)),
            },
            _ => return Err(Reply::NakBare(NakCode::UnknownCommand)),
        };
        Ok(Some(command))
    }

    fn no_args(name: &'static str, args: &[&str], command: Self) -> Result<Self, Reply> {
        if args.is_empty() {
            Ok(command)
        } else {
            Err(Reply::nak(name, NakCode::Arg))
        }
    }

    fn one_duration(name: &'static str, args: &[&str]) -> Result<u32, Reply> {
        match args {
            &[value] => parse_u32(value).ok_or(Reply::nak(name, NakCode::Arg)),
            _ => Err(Reply::nak(name, NakCode::Arg)),
        }
    }
}

/// Decimal u32, digits only, rejecting overflow.
fn parse_u32(token: &str) -> Option<u32> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Exactly six uppercase hex digits packed as `R<<16 | G<<8 | B`.
fn parse_hex6(token: &str) -> Option<u32> {
    if token.len() != 6 {
        return None;
    }
    let mut value = 0u32;
    for b in token.bytes() {
        let digit = match b {
            b'0'..=b'9' => b - b'0',
            b'A'..=b'F' => b - b'A' + 10,
            _ => return None,
        };
        value = (value << 4) | digit as u32;
    }
    Some(value)
}
