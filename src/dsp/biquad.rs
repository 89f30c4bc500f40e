//! Biquad Filter Implementation (IIR 2nd Order)
//!
//! Direct-form I second-order sections used by every stage of the chain:
//! the subsonic high-pass, RIAA de-emphasis, the hum notch and the click
//! detector's pre-emphasis.
//!
//! # Design Notes
//! - Coefficients and state are separate values: one `BiquadCoeffs` may drive
//!   several `BiquadState`s (left/right channels share a design).
//! - Feedback terms are stored pre-negated, so a section evaluates as
//!   `y = b0*x + b1*x1 + b2*x2 + a1*y1 + a2*y2`.
//! - Designs are computed in f64 and stored as f32.
//! - `process` is allocation-free and safe for the audio thread.

use std::f64::consts::PI;

/// RIAA time constants in seconds.
const RIAA_T1: f64 = 3180e-6;
const RIAA_T2: f64 = 318e-6;
const RIAA_T3: f64 = 75e-6;
const RIAA_REFERENCE_HZ: f64 = 1000.0;

const BUTTERWORTH_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Filter coefficients with pre-negated feedback terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

/// Per-channel filter memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Pass-through section.
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    /// Process a single sample through `state`.
    #[inline]
    pub fn process(&self, state: &mut BiquadState, x: f32) -> f32 {
        let mut y = self.b0 * x + self.b1 * state.x1 + self.b2 * state.x2
            + self.a1 * state.y1
            + self.a2 * state.y2;

        // Flush denormals in the feedback path
        if y.abs() < 1e-25 {
            y = 0.0;
        }

        state.x2 = state.x1;
        state.x1 = x;
        state.y2 = state.y1;
        state.y1 = y;
        y
    }

    /// Both poles strictly inside the unit circle.
    ///
    /// With the pre-negated convention the denominator is `1 - a1 z^-1 - a2 z^-2`,
    /// so the stability triangle reads `|a2| < 1` and `|a1| < 1 - a2`.
    pub fn is_stable(&self) -> bool {
        let a1 = self.a1 as f64;
        let a2 = self.a2 as f64;
        a2.abs() < 1.0 && a1.abs() < 1.0 - a2
    }

    /// Magnitude response in dB at `freq`.
    pub fn response_db(&self, freq: f32, sample_rate: f32) -> f32 {
        let w = 2.0 * PI * freq as f64 / sample_rate as f64;
        let (c1, s1) = (w.cos(), -w.sin());
        let (c2, s2) = ((2.0 * w).cos(), -(2.0 * w).sin());

        let num_re = self.b0 as f64 + self.b1 as f64 * c1 + self.b2 as f64 * c2;
        let num_im = self.b1 as f64 * s1 + self.b2 as f64 * s2;
        let den_re = 1.0 - self.a1 as f64 * c1 - self.a2 as f64 * c2;
        let den_im = -(self.a1 as f64) * s1 - self.a2 as f64 * s2;

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt().max(1e-30);
        (20.0 * (num / den).max(1e-30).log10()) as f32
    }

    fn from_normalized(b: [f64; 3], a: [f64; 3]) -> Self {
        let inv_a0 = 1.0 / a[0];
        Self {
            b0: (b[0] * inv_a0) as f32,
            b1: (b[1] * inv_a0) as f32,
            b2: (b[2] * inv_a0) as f32,
            a1: (-a[1] * inv_a0) as f32,
            a2: (-a[2] * inv_a0) as f32,
        }
    }

    // ---------------------------------------------------------------------
    // Filter designers
    // ---------------------------------------------------------------------

    /// High-pass at `cutoff`. Order 1 is a bilinear one-pole; anything else
    /// gives a 2nd-order Butterworth section.
    pub fn highpass(sample_rate: f32, cutoff: f32, order: u32) -> Self {
        let fs = sample_rate as f64;
        let fc = (cutoff as f64).clamp(1e-3, 0.499 * fs);

        if order == 1 {
            let t = (PI * fc / fs).tan();
            let a = (1.0 - t) / (1.0 + t);
            let g = 0.5 * (1.0 + a);
            return Self {
                b0: g as f32,
                b1: -g as f32,
                b2: 0.0,
                a1: a as f32,
                a2: 0.0,
            };
        }

        let w0 = 2.0 * PI * fc / fs;
        let cw0 = w0.cos();
        let alpha = w0.sin() / (2.0 * BUTTERWORTH_Q);

        Self::from_normalized(
            [(1.0 + cw0) * 0.5, -(1.0 + cw0), (1.0 + cw0) * 0.5],
            [1.0 + alpha, -2.0 * cw0, 1.0 - alpha],
        )
    }

    /// Band-reject centred on `freq` with quality `q`.
    pub fn notch(sample_rate: f32, freq: f32, q: f32) -> Self {
        let fs = sample_rate as f64;
        let f0 = (freq as f64).clamp(1e-3, 0.499 * fs);
        let w0 = 2.0 * PI * f0 / fs;
        let cw0 = w0.cos();
        let alpha = w0.sin() / (2.0 * (q as f64).max(1e-6));

        Self::from_normalized([1.0, -2.0 * cw0, 1.0], [1.0 + alpha, -2.0 * cw0, 1.0 - alpha])
    }

    /// RIAA playback de-emphasis, 0 dB at 1 kHz.
    ///
    /// Bilinear transform of `(1 + sT2) / ((1 + sT1)(1 + sT3))`.
    pub fn riaa(sample_rate: f32) -> Self {
        let k = 2.0 * sample_rate as f64;
        let k2 = k * k;

        let b = [1.0 + RIAA_T2 * k, 2.0, 1.0 - RIAA_T2 * k];
        let a = [
            1.0 + (RIAA_T1 + RIAA_T3) * k + RIAA_T1 * RIAA_T3 * k2,
            2.0 - 2.0 * RIAA_T1 * RIAA_T3 * k2,
            1.0 - (RIAA_T1 + RIAA_T3) * k + RIAA_T1 * RIAA_T3 * k2,
        ];

        let raw = Self::from_normalized(b, a);
        let ref_db = raw.response_db(RIAA_REFERENCE_HZ as f32, sample_rate) as f64;
        let norm = 10f64.powf(-ref_db / 20.0);

        Self::from_normalized([b[0] * norm, b[1] * norm, b[2] * norm], a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_sine(c: &BiquadCoeffs, freq: f32, sr: f32, n: usize) -> f32 {
        let mut state = BiquadState::new();
        let mut peak = 0.0f32;
        for i in 0..n {
            let x = (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin();
            let y = c.process(&mut state, x);
            if i > n / 2 {
                peak = peak.max(y.abs());
            }
        }
        peak
    }

    #[test]
    fn identity_passes_through() {
        let c = BiquadCoeffs::identity();
        let mut s = BiquadState::new();
        for x in [0.5, -0.25, 1.0] {
            assert_eq!(c.process(&mut s, x), x);
        }
    }

    #[test]
    fn feedback_sign_convention() {
        // y[n] = x[n] + 0.5*y[n-1]
        let c = BiquadCoeffs {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.5,
            a2: 0.0,
        };
        let mut s = BiquadState::new();
        assert_eq!(c.process(&mut s, 1.0), 1.0);
        assert_eq!(c.process(&mut s, 0.0), 0.5);
        assert_eq!(c.process(&mut s, 0.0), 0.25);
    }

    #[test]
    fn highpass_blocks_dc_and_passes_treble() {
        let sr = 48_000.0;
        for order in [1, 2] {
            let c = BiquadCoeffs::highpass(sr, 20.0, order);
            assert!(c.is_stable());

            let mut s = BiquadState::new();
            let mut y = 0.0;
            for _ in 0..48_000 {
                y = c.process(&mut s, 1.0);
            }
            assert!(y.abs() < 1e-3, "order {order} DC residue {y}");

            assert!(c.response_db(1000.0, sr).abs() < 0.1);
        }
        let c2 = BiquadCoeffs::highpass(sr, 1000.0, 2);
        assert!((c2.response_db(1000.0, sr) + 3.01).abs() < 0.05);
    }

    #[test]
    fn notch_nulls_centre() {
        let sr = 48_000.0;
        let hum = BiquadCoeffs::notch(sr, 50.0, 10.0);
        assert!(hum.is_stable());
        // f32 coefficient rounding limits the depth this close to DC
        assert!(hum.response_db(50.0, sr) < -20.0);
        assert!(hum.response_db(1000.0, sr).abs() < 0.1);

        let c = BiquadCoeffs::notch(sr, 1000.0, 10.0);
        assert!(c.response_db(1000.0, sr) < -40.0);
        let peak = run_sine(&c, 1000.0, sr, 48_000);
        assert!(peak < 0.02, "1 kHz leaked at {peak}");
    }

    #[test]
    fn riaa_curve_matches_reference_points() {
        for &sr in &crate::dsp::utils::SUPPORTED_SAMPLE_RATES {
            let c = BiquadCoeffs::riaa(sr as f32);
            assert!(c.is_stable(), "unstable at {sr}");
            assert!(c.response_db(1000.0, sr as f32).abs() < 0.01);
            let low = c.response_db(20.0, sr as f32);
            assert!((low - 19.27).abs() < 0.5, "20 Hz at {sr}: {low}");
        }

        let c = BiquadCoeffs::riaa(96_000.0);
        let high = c.response_db(10_000.0, 96_000.0);
        assert!((high + 13.73).abs() < 1.0, "10 kHz: {high}");

        // -19.62 dB ideal; bilinear warping costs more the closer 20 kHz is to Nyquist
        let top_96k = c.response_db(20_000.0, 96_000.0);
        assert!((top_96k + 19.62).abs() < 1.5, "20 kHz at 96k: {top_96k}");
        let c = BiquadCoeffs::riaa(192_000.0);
        let top_192k = c.response_db(20_000.0, 192_000.0);
        assert!((top_192k + 19.62).abs() < 0.5, "20 kHz at 192k: {top_192k}");
    }

    #[test]
    fn unstable_poles_are_flagged() {
        let c = BiquadCoeffs {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 1.2,
        };
        assert!(!c.is_stable());
    }
}
