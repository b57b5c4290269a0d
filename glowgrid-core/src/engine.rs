//! Command engine: dispatches parsed protocol commands onto the pools.
//!
//! The engine owns everything a command can touch: the animation pool, the
//! player, the line buffer, the display settings, and the power monitor.
//! The main loop stays the single holder of mutable state and threads
//! borrowed references down here. Settings changes are flagged dirty; the
//! loop applies them to the matrix driver and the preference store after
//! each iteration.

use heapless::Vec;

use glowgrid_protocol::{
    Command, CorrectionArg, CurrentLimit, DebugAnimation, DebugDump, LineBuffer, LineError,
    NakCode, PowerArg, QueueEntry, Reply, Rotation, MAX_QUEUE_ENTRIES,
};

use crate::color::DEFAULT_CORRECTION;
use crate::frame::Frame;
use crate::player::Player;
use crate::pool::AnimationPool;
use crate::power::PowerMonitor;

/// Display settings a host can change and persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    pub brightness: u8,
    pub dither: bool,
    /// Packed `R<<16|G<<8|B` color correction.
    pub correction: u32,
    pub rotation: Rotation,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brightness: u8::MAX,
            dither: true,
            correction: DEFAULT_CORRECTION,
            rotation: Rotation::R0,
        }
    }
}

impl Settings {
    /// Rebuild settings from raw preference values; absent keys fall back
    /// to defaults.
    pub fn from_prefs(
        brightness: Option<u32>,
        dither: Option<u32>,
        correction: Option<u32>,
        rotation: Option<u32>,
    ) -> Self {
        let default = Self::default();
        Self {
            brightness: brightness
                .map(|v| v.min(u8::MAX as u32) as u8)
                .unwrap_or(default.brightness),
            dither: dither.map(|v| v != 0).unwrap_or(default.dither),
            correction: correction
                .map(|v| v & 0x00FF_FFFF)
                .unwrap_or(default.correction),
            rotation: rotation
                .and_then(Rotation::from_u32)
                .unwrap_or(default.rotation),
        }
    }
}

/// Settings the loop still has to apply and persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dirty {
    pub brightness: bool,
    pub dither: bool,
    pub correction: bool,
    pub rotation: bool,
    pub power_override: bool,
}

impl Dirty {
    pub fn any(&self) -> bool {
        self.brightness || self.dither || self.correction || self.rotation || self.power_override
    }
}

/// The protocol front end and everything it mutates.
pub struct Engine {
    pool: AnimationPool,
    player: Player,
    line: LineBuffer,
    settings: Settings,
    dirty: Dirty,
    power: PowerMonitor,
    /// Frame ring slot currently accepting `RGB` rows.
    loading_frame: Option<usize>,
}

impl Engine {
    pub fn new(settings: Settings, power_override: Option<CurrentLimit>) -> Self {
        Self {
            pool: AnimationPool::new(),
            player: Player::new(),
            line: LineBuffer::new(),
            settings,
            dirty: Dirty::default(),
            power: PowerMonitor::new(power_override),
            loading_frame: None,
        }
    }

    /// Feed one transport byte; returns the reply once a line completes.
    pub fn feed(&mut self, byte: u8, now_ms: u32) -> Option<Reply> {
        match self.line.feed(byte)? {
            Ok(line) => self.handle_line(&line, now_ms),
            Err(LineError::TooLong) => Some(Reply::NakBare(NakCode::LineTooLong)),
            Err(LineError::Invalid) => Some(Reply::NakBare(NakCode::Line)),
        }
    }

    /// Execute one complete request line. Blank lines produce no reply.
    pub fn handle_line(&mut self, line: &str, now_ms: u32) -> Option<Reply> {
        match Command::parse(line) {
            Ok(Some(command)) => Some(self.execute(command, now_ms)),
            Ok(None) => None,
            Err(nak) => Some(nak),
        }
    }

    /// The frame to display this tick.
    pub fn current_frame(&mut self, now_ms: u32) -> &Frame {
        self.player.current_frame(&mut self.pool, now_ms)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Dirty flags accumulated since the last call; cleared on read.
    pub fn take_dirty(&mut self) -> Dirty {
        core::mem::take(&mut self.dirty)
    }

    pub fn power(&self) -> &PowerMonitor {
        &self.power
    }

    pub fn power_mut(&mut self) -> &mut PowerMonitor {
        &mut self.power
    }

    fn execute(&mut self, command: Command<'_>, now_ms: u32) -> Reply {
        match command {
            Command::Version => Reply::AckVersion,
            Command::FreeSlots => Reply::AckFree {
                animations: self.pool.free_animation_slots() as u16,
                frames: self.pool.free_frame_slots() as u16,
            },
            Command::Queue => Reply::AckQueue(self.queue_entries(now_ms)),
            Command::Reset => {
                self.pool.reset();
                self.player.reset();
                self.loading_frame = None;
                Reply::AckReset
            }
            Command::Debug => Reply::Debug(self.debug_dump()),
            Command::Correction(arg) => {
                match arg {
                    CorrectionArg::Read => {}
                    CorrectionArg::Set(packed) => {
                        self.settings.correction = packed;
                        self.dirty.correction = true;
                    }
                    CorrectionArg::Reset => {
                        self.settings.correction = DEFAULT_CORRECTION;
                        self.dirty.correction = true;
                    }
                }
                Reply::AckCorrection(self.settings.correction)
            }
            Command::Brightness(value) => {
                if let Some(value) = value {
                    self.settings.brightness = value;
                    self.dirty.brightness = true;
                }
                Reply::AckBrightness(self.settings.brightness)
            }
            Command::Dither(on) => {
                self.settings.dither = on;
                self.dirty.dither = true;
                Reply::AckDither(on)
            }
            Command::Rotate(rotation) => {
                if let Some(rotation) = rotation {
                    self.settings.rotation = rotation;
                    self.dirty.rotation = true;
                }
                Reply::AckRotate(self.settings.rotation)
            }
            Command::Power(arg) => {
                match arg {
                    PowerArg::Read => {}
                    PowerArg::Set(limit) => {
                        self.power.set_override(Some(limit));
                        self.dirty.power_override = true;
                    }
                    PowerArg::Reset => {
                        self.power.set_override(None);
                        self.dirty.power_override = true;
                    }
                }
                Reply::AckPower(self.power.report())
            }
            Command::Animation { duration_ms } => {
                if !self.pool.start_loading(duration_ms) {
                    return Reply::nak("ANM", NakCode::Underflow);
                }
                self.loading_frame = None;
                Reply::AckAnimation(duration_ms)
            }
            Command::Frame { duration_ms } => {
                if !self.pool.is_loading_animation() {
                    return Reply::nak("FRM", NakCode::NoAnimation);
                }
                let Some(idx) = self.pool.frame_to_load() else {
                    return Reply::nak("FRM", NakCode::Underflow);
                };
                self.pool.frame_mut(idx).set_duration_ms(duration_ms);
                self.loading_frame = Some(idx);
                Reply::AckFrame(duration_ms)
            }
            Command::PixelRow(hex) => {
                let Some(idx) = self.loading_frame else {
                    return Reply::nak("RGB", NakCode::NoFrame);
                };
                let frame = self.pool.frame_mut(idx);
                if frame.is_complete() {
                    return Reply::nak("RGB", NakCode::Overflow);
                }
                match frame.load_hex(hex) {
                    Ok(row) => Reply::AckRow(row as u8),
                    Err(_) => Reply::nak("RGB", NakCode::Arg),
                }
            }
            Command::Done => {
                if !self.pool.is_loading_animation() {
                    return Reply::nak("DON", NakCode::NoAnimation);
                }
                self.pool.finalize_loading();
                self.loading_frame = None;
                Reply::AckDone
            }
            Command::Next => {
                self.pool.skip_current();
                Reply::AckNext
            }
        }
    }

    /// Live queue, head first; the head reports its remaining time once
    /// started, queued animations their full duration.
    fn queue_entries(&self, now_ms: u32) -> Vec<QueueEntry, MAX_QUEUE_ENTRIES> {
        let mut entries = Vec::new();
        for (i, anim) in self.pool.live_animations().enumerate() {
            let remaining_ms = if i == 0 && anim.started {
                self.player.head_remaining_ms(now_ms)
            } else {
                anim.duration_ms
            };
            let _ = entries.push(QueueEntry {
                remaining_ms,
                frames: anim.num_frames as u16,
            });
        }
        entries
    }

    fn debug_dump(&self) -> DebugDump {
        let mut dump = DebugDump {
            animation_start: self.pool.animations_start() as u16,
            animation_len: self.pool.animations_len() as u16,
            animation_cap: crate::pool::MAX_ANIMATIONS as u16,
            frame_start: self.pool.frames_start() as u16,
            frame_len: self.pool.frames_len() as u16,
            frame_cap: crate::pool::MAX_FRAMES as u16,
            current_frame: self.player.current_frame_index() as u16,
            animations: Vec::new(),
        };
        for anim in self.pool.live_animations() {
            let _ = dump.animations.push(DebugAnimation {
                being_loaded: anim.being_loaded,
                started: anim.started,
                frame_start: anim.frame_start as u16,
                num_frames: anim.num_frames as u16,
                duration_ms: anim.duration_ms,
            });
        }
        dump
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &AnimationPool {
        &self.pool
    }
}
