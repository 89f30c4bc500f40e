//! LPC Predictor
//!
//! Autocorrelation + Levinson-Durbin linear prediction. Coefficients are fitted
//! on a batch window with [`LpcPredictor::analyze`], then used to predict the
//! stream one sample ahead. The residual spikes on waveform discontinuities,
//! which makes it a model-based companion to the MAD click detector.
//!
//! # Design Notes
//! - Autocorrelation and recursion run in f64; coefficients are stored as f32.
//! - A failed analysis never touches the current coefficients.
//! - History is a fixed `LPC_MAX_ORDER` ring regardless of the active order.

use crate::error::{PhonoError, PhonoResult};

pub const LPC_MAX_ORDER: usize = 32;

/// Fixed-capacity history of the most recent samples.
#[derive(Debug, Clone, Copy)]
struct HistoryRing {
    buf: [f32; LPC_MAX_ORDER],
    /// Next write slot
    head: usize,
}

impl HistoryRing {
    const fn new() -> Self {
        Self {
            buf: [0.0; LPC_MAX_ORDER],
            head: 0,
        }
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        self.buf[self.head] = sample;
        self.head = (self.head + 1) % LPC_MAX_ORDER;
    }

    /// `age` 0 is the newest sample.
    #[inline]
    fn recent(&self, age: usize) -> f32 {
        debug_assert!(age < LPC_MAX_ORDER);
        self.buf[(self.head + LPC_MAX_ORDER - 1 - age) % LPC_MAX_ORDER]
    }
}

#[derive(Debug, Clone)]
pub struct LpcPredictor {
    order: usize,
    /// Stored negated: prediction is `-Σ coeffs[i] * x[n-1-i]`
    coeffs: [f32; LPC_MAX_ORDER],
    history: HistoryRing,
}

impl LpcPredictor {
    pub fn new(order: usize) -> PhonoResult<Self> {
        if !(1..=LPC_MAX_ORDER).contains(&order) {
            return Err(PhonoError::InvalidOrder(order));
        }
        Ok(Self {
            order,
            coeffs: [0.0; LPC_MAX_ORDER],
            history: HistoryRing::new(),
        })
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Active coefficients in storage (negated) convention.
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs[..self.order]
    }

    /// Clears history; coefficients are kept.
    pub fn reset(&mut self) {
        self.history = HistoryRing::new();
    }

    /// Fit coefficients to `signal` (biased autocorrelation, no window).
    pub fn analyze(&mut self, signal: &[f32]) -> PhonoResult<()> {
        let needed = self.order + 1;
        if signal.len() < needed {
            return Err(PhonoError::WindowTooShort {
                needed,
                got: signal.len(),
            });
        }

        let mut r = [0.0f64; LPC_MAX_ORDER + 1];
        for (k, rk) in r.iter_mut().enumerate().take(self.order + 1) {
            *rk = signal[k..]
                .iter()
                .zip(signal.iter())
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum();
        }

        self.solve_autocorrelation(&r[..=self.order])
    }

    /// Levinson-Durbin on externally computed autocorrelation `r[0..=order]`.
    pub fn solve_autocorrelation(&mut self, r: &[f64]) -> PhonoResult<()> {
        let order = self.order;
        if r.len() < order + 1 {
            return Err(PhonoError::WindowTooShort {
                needed: order + 1,
                got: r.len(),
            });
        }
        if !(r[0] > 0.0) {
            return Err(PhonoError::ZeroEnergy);
        }

        let mut a = [0.0f64; LPC_MAX_ORDER];
        let mut prev = [0.0f64; LPC_MAX_ORDER];
        let mut e = r[0];

        for i in 0..order {
            let acc: f64 = (0..i).map(|j| a[j] * r[i - j]).sum();
            let k = (r[i + 1] - acc) / e;

            prev[..i].copy_from_slice(&a[..i]);
            for j in 0..i {
                a[j] = prev[j] - k * prev[i - j - 1];
            }
            a[i] = k;

            e *= 1.0 - k * k;
            if !(e > 0.0) {
                return Err(PhonoError::Unstable(i));
            }
        }

        for (dst, &src) in self.coeffs.iter_mut().zip(a.iter()).take(order) {
            *dst = -src as f32;
        }
        Ok(())
    }

    /// One-step prediction from the current history.
    #[inline]
    pub fn predict(&self) -> f32 {
        let mut prediction = 0.0f32;
        for i in 0..self.order {
            prediction -= self.coeffs[i] * self.history.recent(i);
        }
        prediction
    }

    /// Append the true sample to the history.
    #[inline]
    pub fn update(&mut self, sample: f32) {
        self.history.push(sample);
    }

    /// Predict, absorb `actual`, and return `(actual - predicted, predicted)`.
    #[inline]
    pub fn predict_error(&mut self, actual: f32) -> (f32, f32) {
        let predicted = self.predict();
        self.update(actual);
        (actual - predicted, predicted)
    }
}
