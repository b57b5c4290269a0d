//! USB-C current negotiation and matrix power gating.
//!
//! The two CC pins are sampled every loop iteration; the higher voltage
//! advertises the host's current capability. A changed classification is
//! only accepted after a confirmation sample 15 ms later agrees, which
//! filters the transient CC excursions PD messaging causes while still
//! meeting the 60 ms compliance window on a 30 ms base loop.
//!
//! The accepted (or overridden) current decides whether the matrix rails
//! are energized and how hard the software brightness cap clamps, and
//! drives the power status LED pattern.

use glowgrid_protocol::{CurrentLimit, PowerReport};

use crate::time::deadline_reached;

/// CC voltage at or above this means a 1.5 A advertisement.
pub const CC_THRESHOLD_1A5_MV: u16 = 660;
/// CC voltage at or above this means a 3.0 A advertisement.
pub const CC_THRESHOLD_3A0_MV: u16 = 1230;

/// Delay before the confirmation sample of a changed classification.
pub const CONFIRM_DELAY_MS: u32 = 15;

/// Software brightness cap at a 3.0 A budget.
pub const BRIGHTNESS_CAP_3A0: u8 = 192;
/// Software brightness cap at a 1.5 A budget.
pub const BRIGHTNESS_CAP_1A5: u8 = 96;

/// Status LED breathing period at 1.5 A.
pub const BREATH_PERIOD_MS: u32 = 3000;
/// Status LED level ceiling (3/4 of full).
pub const STATUS_LEVEL_PEAK: u8 = 192;
/// Status LED level floor while breathing (1/4 of full).
pub const STATUS_LEVEL_FLOOR: u8 = 64;

/// Classify one pair of CC readings into an advertised current.
pub fn classify(cc1_mv: u16, cc2_mv: u16) -> CurrentLimit {
    let mv = cc1_mv.max(cc2_mv);
    if mv >= CC_THRESHOLD_3A0_MV {
        CurrentLimit::Amps3_0
    } else if mv >= CC_THRESHOLD_1A5_MV {
        CurrentLimit::Amps1_5
    } else {
        CurrentLimit::Amps0_5
    }
}

/// What the main loop applies after a power update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerDecision {
    /// Energize the matrix supply rails.
    pub rails_on: bool,
    /// Upper clamp on the user brightness.
    pub brightness_cap: u8,
}

/// Debounced CC sampling state plus the host-set override.
pub struct PowerMonitor {
    /// Last accepted classification; `None` until sampling settles.
    accepted: Option<CurrentLimit>,
    /// Host override from `PWR`, persisted across boots.
    override_limit: Option<CurrentLimit>,
    /// Changed classification awaiting its confirmation sample.
    candidate: Option<(CurrentLimit, u32)>,
}

impl PowerMonitor {
    pub fn new(override_limit: Option<CurrentLimit>) -> Self {
        Self {
            accepted: None,
            override_limit,
            candidate: None,
        }
    }

    /// Feed one CC sample pair.
    ///
    /// Returns the newly accepted classification when a confirmation sample
    /// agrees with its candidate; `None` otherwise. Samples are ignored
    /// while an override is set.
    pub fn sample(&mut self, cc1_mv: u16, cc2_mv: u16, now_ms: u32) -> Option<CurrentLimit> {
        if self.override_limit.is_some() {
            self.candidate = None;
            return None;
        }
        let classification = classify(cc1_mv, cc2_mv);
        if self.accepted == Some(classification) {
            self.candidate = None;
            return None;
        }
        match self.candidate {
            Some((candidate, seen_at)) if candidate == classification => {
                if deadline_reached(now_ms, seen_at.wrapping_add(CONFIRM_DELAY_MS)) {
                    self.candidate = None;
                    self.accepted = Some(classification);
                    Some(classification)
                } else {
                    None
                }
            }
            // First observation of this classification; confirm later.
            _ => {
                self.candidate = Some((classification, now_ms));
                None
            }
        }
    }

    /// True while a changed classification awaits confirmation; the loop
    /// shortens its sleep to [`CONFIRM_DELAY_MS`].
    pub fn confirm_pending(&self) -> bool {
        self.override_limit.is_none() && self.candidate.is_some()
    }

    /// Current belief: the override if set, else the accepted sample.
    pub fn belief(&self) -> Option<CurrentLimit> {
        self.override_limit.or(self.accepted)
    }

    pub fn override_limit(&self) -> Option<CurrentLimit> {
        self.override_limit
    }

    pub fn set_override(&mut self, limit: Option<CurrentLimit>) {
        self.override_limit = limit;
        self.candidate = None;
    }

    /// Belief as reported by `PWR`.
    pub fn report(&self) -> PowerReport {
        match self.belief() {
            Some(limit) => PowerReport::Known(limit),
            None => PowerReport::Unknown,
        }
    }

    /// Rails and brightness cap for the current belief. Legacy USB cannot
    /// feed the matrix, so it stays dark below 1.5 A.
    pub fn decision(&self) -> PowerDecision {
        match self.belief() {
            Some(CurrentLimit::Amps3_0) => PowerDecision {
                rails_on: true,
                brightness_cap: BRIGHTNESS_CAP_3A0,
            },
            Some(CurrentLimit::Amps1_5) => PowerDecision {
                rails_on: true,
                brightness_cap: BRIGHTNESS_CAP_1A5,
            },
            Some(CurrentLimit::Amps0_5) | None => PowerDecision {
                rails_on: false,
                brightness_cap: 0,
            },
        }
    }

    /// PWM level for the power status LED.
    ///
    /// Steady at 3.0 A, Gaussian breathing at 1.5 A, dark otherwise.
    pub fn status_level(&self, now_ms: u32) -> u8 {
        match self.belief() {
            Some(CurrentLimit::Amps3_0) => STATUS_LEVEL_PEAK,
            Some(CurrentLimit::Amps1_5) => breath_level(now_ms),
            _ => 0,
        }
    }
}

/// Gaussian breathing: peak mid-period, settling to the floor at the edges.
fn breath_level(now_ms: u32) -> u8 {
    const SIGMA_MS: f32 = 450.0;
    let phase = (now_ms % BREATH_PERIOD_MS) as f32 - (BREATH_PERIOD_MS / 2) as f32;
    let shape = libm::expf(-(phase * phase) / (2.0 * SIGMA_MS * SIGMA_MS));
    let span = (STATUS_LEVEL_PEAK - STATUS_LEVEL_FLOOR) as f32;
    STATUS_LEVEL_FLOOR + (shape * span) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify(0, 0), CurrentLimit::Amps0_5);
        assert_eq!(classify(659, 0), CurrentLimit::Amps0_5);
        assert_eq!(classify(660, 0), CurrentLimit::Amps1_5);
        assert_eq!(classify(0, 1229), CurrentLimit::Amps1_5);
        assert_eq!(classify(1230, 0), CurrentLimit::Amps3_0);
        // The higher CC pin wins.
        assert_eq!(classify(100, 1700), CurrentLimit::Amps3_0);
    }

    #[test]
    fn test_change_needs_confirmation() {
        let mut monitor = PowerMonitor::new(None);
        assert_eq!(monitor.sample(1700, 0, 0), None);
        assert!(monitor.confirm_pending());
        // Confirmation sample 15 ms later agrees.
        assert_eq!(monitor.sample(1700, 0, 15), Some(CurrentLimit::Amps3_0));
        assert!(!monitor.confirm_pending());
        assert_eq!(monitor.belief(), Some(CurrentLimit::Amps3_0));
    }

    #[test]
    fn test_transient_rejected() {
        let mut monitor = PowerMonitor::new(None);
        monitor.sample(1700, 0, 0);
        monitor.sample(1700, 0, 15);
        // A brief excursion disagrees with its own confirmation sample.
        assert_eq!(monitor.sample(100, 0, 1000), None);
        assert_eq!(monitor.sample(1700, 0, 1015), None);
        assert_eq!(monitor.belief(), Some(CurrentLimit::Amps3_0));
        // Back to agreement: candidate cleared.
        assert!(!monitor.confirm_pending());
    }

    #[test]
    fn test_confirmation_not_early() {
        let mut monitor = PowerMonitor::new(None);
        monitor.sample(900, 0, 0);
        // A second sample too soon does not accept yet.
        assert_eq!(monitor.sample(900, 0, 5), None);
        assert_eq!(monitor.sample(900, 0, 15), Some(CurrentLimit::Amps1_5));
    }

    #[test]
    fn test_override_bypasses_sampling() {
        let mut monitor = PowerMonitor::new(Some(CurrentLimit::Amps3_0));
        assert_eq!(monitor.sample(0, 0, 0), None);
        assert_eq!(monitor.belief(), Some(CurrentLimit::Amps3_0));
        assert_eq!(monitor.report(), PowerReport::Known(CurrentLimit::Amps3_0));

        monitor.set_override(None);
        assert_eq!(monitor.report(), PowerReport::Unknown);
    }

    #[test]
    fn test_decisions() {
        let mut monitor = PowerMonitor::new(None);
        assert_eq!(
            monitor.decision(),
            PowerDecision {
                rails_on: false,
                brightness_cap: 0
            }
        );
        monitor.set_override(Some(CurrentLimit::Amps1_5));
        assert_eq!(
            monitor.decision(),
            PowerDecision {
                rails_on: true,
                brightness_cap: BRIGHTNESS_CAP_1A5
            }
        );
        monitor.set_override(Some(CurrentLimit::Amps0_5));
        assert!(!monitor.decision().rails_on);
    }

    #[test]
    fn test_breath_level_bounds() {
        for t in (0..BREATH_PERIOD_MS).step_by(10) {
            let level = breath_level(t);
            assert!(level >= STATUS_LEVEL_FLOOR);
            assert!(level <= STATUS_LEVEL_PEAK);
        }
        // Peak mid-period, floor at the edges.
        assert_eq!(breath_level(BREATH_PERIOD_MS / 2), STATUS_LEVEL_PEAK);
        assert!(breath_level(0) <= STATUS_LEVEL_FLOOR + 2);
    }

    #[test]
    fn test_status_levels() {
        let mut monitor = PowerMonitor::new(Some(CurrentLimit::Amps3_0));
        assert_eq!(monitor.status_level(0), STATUS_LEVEL_PEAK);
        monitor.set_override(Some(CurrentLimit::Amps0_5));
        assert_eq!(monitor.status_level(0), 0);
        monitor.set_override(Some(CurrentLimit::Amps1_5));
        assert!(monitor.status_level(1500) >= STATUS_LEVEL_FLOOR);
    }
}
