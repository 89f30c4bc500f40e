use crate::dsp::biquad::{BiquadCoeffs, BiquadState};

/// Mains hum notch (stereo-linked design, per-channel memory).
///
/// Coefficients are redesigned only when frequency or Q actually change.
pub struct HumNotch {
    coeffs: BiquadCoeffs,
    state_l: BiquadState,
    state_r: BiquadState,
    sample_rate: f32,
    last_freq: f32,
    last_q: f32,
}

impl HumNotch {
    pub const DEFAULT_FREQ_HZ: f32 = 50.0;
    pub const DEFAULT_Q: f32 = 10.0;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            coeffs: BiquadCoeffs::notch(sample_rate, Self::DEFAULT_FREQ_HZ, Self::DEFAULT_Q),
            state_l: BiquadState::new(),
            state_r: BiquadState::new(),
            sample_rate,
            last_freq: Self::DEFAULT_FREQ_HZ,
            last_q: Self::DEFAULT_Q,
        }
    }

    /// Redesign if `freq`/`q` moved since the last call.
    pub fn update(&mut self, freq: f32, q: f32) {
        if freq != self.last_freq || q != self.last_q {
            self.coeffs = BiquadCoeffs::notch(self.sample_rate, freq, q);
            self.last_freq = freq;
            self.last_q = q;
        }
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (
            self.coeffs.process(&mut self.state_l, left),
            self.coeffs.process(&mut self.state_r, right),
        )
    }

    pub fn reset(&mut self) {
        self.state_l.reset();
        self.state_r.reset();
    }

    pub fn coeffs(&self) -> &BiquadCoeffs {
        &self.coeffs
    }
}
