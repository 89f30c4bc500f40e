//! RIAA playback equalization with an optional subsonic high-pass.
//!
//! Per channel: subsonic (20 Hz, 1st or 2nd order) → RIAA de-emphasis.
//! Both designs are computed once per sample rate; switching the subsonic
//! order at runtime reuses the same filter memory.

use crate::dsp::biquad::{BiquadCoeffs, BiquadState};
use nih_plug::prelude::Enum;
use serde::{Deserialize, Serialize};

// -----------------------------
// Tunables
// -----------------------------

const SUBSONIC_HZ: f32 = 20.0;

/// Subsonic (rumble) filter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Enum)]
#[repr(usize)]
pub enum SubsonicMode {
    #[default]
    #[serde(rename = "off")]
    #[name = "Off"]
    Off,
    #[serde(rename = "first_order")]
    #[name = "1st Order"]
    FirstOrder,
    #[serde(rename = "second_order")]
    #[name = "2nd Order"]
    SecondOrder,
}

impl SubsonicMode {
    /// Maps the 0/1/2 selector used on the command line.
    pub fn from_index(index: u32) -> Self {
        match index {
            1 => SubsonicMode::FirstOrder,
            2 => SubsonicMode::SecondOrder,
            _ => SubsonicMode::Off,
        }
    }
}

pub struct RiaaChannel {
    riaa: BiquadCoeffs,
    subsonic_first: BiquadCoeffs,
    subsonic_second: BiquadCoeffs,
    riaa_state: BiquadState,
    subsonic_state: BiquadState,
}

impl RiaaChannel {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            riaa: BiquadCoeffs::riaa(sample_rate),
            subsonic_first: BiquadCoeffs::highpass(sample_rate, SUBSONIC_HZ, 1),
            subsonic_second: BiquadCoeffs::highpass(sample_rate, SUBSONIC_HZ, 2),
            riaa_state: BiquadState::new(),
            subsonic_state: BiquadState::new(),
        }
    }

    #[inline]
    pub fn process(&mut self, input: f32, subsonic: SubsonicMode, riaa_enable: bool) -> f32 {
        let mut y = match subsonic {
            SubsonicMode::Off => input,
            SubsonicMode::FirstOrder => self.subsonic_first.process(&mut self.subsonic_state, input),
            SubsonicMode::SecondOrder => {
                self.subsonic_second.process(&mut self.subsonic_state, input)
            }
        };

        if riaa_enable {
            y = self.riaa.process(&mut self.riaa_state, y);
        }
        y
    }

    pub fn reset(&mut self) {
        self.riaa_state.reset();
        self.subsonic_state.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bypass_when_everything_is_off() {
        let mut ch = RiaaChannel::new(48_000.0);
        for x in [0.3, -0.7, 0.01] {
            assert_eq!(ch.process(x, SubsonicMode::Off, false), x);
        }
    }

    #[test]
    fn subsonic_removes_dc_offset() {
        for mode in [SubsonicMode::FirstOrder, SubsonicMode::SecondOrder] {
            let mut ch = RiaaChannel::new(44_100.0);
            let mut y = 1.0;
            for _ in 0..44_100 {
                y = ch.process(0.5, mode, false);
            }
            assert!(y.abs() < 1e-3, "{mode:?} left {y}");
        }
    }

    #[test]
    fn riaa_boosts_bass_relative_to_treble() {
        let sr = 48_000.0;
        let measure = |freq: f32| {
            let mut ch = RiaaChannel::new(sr);
            let mut peak = 0.0f32;
            for i in 0..48_000 {
                let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin() * 0.01;
                let y = ch.process(x, SubsonicMode::Off, true);
                if i > 24_000 {
                    peak = peak.max(y.abs());
                }
            }
            peak
        };
        let bass = measure(50.0);
        let mid = measure(1000.0);
        let treble = measure(10_000.0);
        assert!(bass > mid * 4.0);
        assert!(treble < mid * 0.3);
        assert!((mid - 0.01).abs() < 5e-4);
    }

    #[test]
    fn reset_clears_memory() {
        let mut ch = RiaaChannel::new(48_000.0);
        ch.process(1.0, SubsonicMode::SecondOrder, true);
        ch.reset();
        let mut fresh = RiaaChannel::new(48_000.0);
        let a = ch.process(0.25, SubsonicMode::SecondOrder, true);
        let b = fresh.process(0.25, SubsonicMode::SecondOrder, true);
        assert_eq!(a, b);
    }

    #[test]
    fn selector_mapping() {
        assert_eq!(SubsonicMode::from_index(0), SubsonicMode::Off);
        assert_eq!(SubsonicMode::from_index(1), SubsonicMode::FirstOrder);
        assert_eq!(SubsonicMode::from_index(2), SubsonicMode::SecondOrder);
        assert_eq!(SubsonicMode::from_index(7), SubsonicMode::Off);
    }
}
