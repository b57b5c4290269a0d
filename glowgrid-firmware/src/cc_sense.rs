//! USB-C CC pin sampling.
//!
//! The two CC lines sit on ADC inputs through a protection divider of
//! ratio 1 (direct sense; CC stays below the 3.3 V rail for every Rp
//! advertisement). Readings are converted to millivolts for the power
//! monitor's thresholds.

use embassy_rp::adc::{Adc, Async, Channel, Error};

/// ADC reference in millivolts.
const VREF_MV: u32 = 3300;
/// 12-bit conversion range.
const ADC_MAX: u32 = 4096;

pub struct CcSense<'d> {
    adc: Adc<'d, Async>,
    cc1: Channel<'d>,
    cc2: Channel<'d>,
}

impl<'d> CcSense<'d> {
    pub fn new(adc: Adc<'d, Async>, cc1: Channel<'d>, cc2: Channel<'d>) -> Self {
        Self { adc, cc1, cc2 }
    }

    /// One reading of both CC pins in millivolts.
    ///
    /// A conversion error reads as 0 mV and classifies as legacy USB.
    pub async fn sample_mv(&mut self) -> (u16, u16) {
        let cc1 = to_mv(self.adc.read(&mut self.cc1).await);
        let cc2 = to_mv(self.adc.read(&mut self.cc2).await);
        (cc1, cc2)
    }
}

fn to_mv(raw: Result<u16, Error>) -> u16 {
    let raw = raw.unwrap_or(0) as u32;
    (raw * VREF_MV / ADC_MAX) as u16
}
