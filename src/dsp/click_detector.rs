//! MAD Click Detector
//!
//! Streaming impulse detector: each sample is high-pass emphasized, pushed into
//! a `2*window_size+1` history, and the window's centre sample is scored as
//! `|centre - median| / (MAD + epsilon)`. Runs of outlier samples are
//! confirmed as a click once they end, provided they stayed short.
//!
//! # Perceptual Contract
//! - **Target Source**: Vinyl ticks and pops, i.e. broadband impulses a few
//!   samples long riding on music.
//! - **Intended Effect**: Flag clicks without reacting to bass or kick drums
//!   (the HPF removes them) or sustained transients (length cap).
//! - **Will Not Do**:
//!   - Modify audio. It only reports.
//!   - Decide in real time: decisions lag the input by `window_size` samples.
//!
//! # Lifecycle
//! - **Warm-up**: the first `2*window_size+1` calls always return `false`.
//! - **Reset**: clears history and candidate state, keeps configuration.

use crate::dsp::biquad::{BiquadCoeffs, BiquadState};
use crate::dsp::utils::median_in_place;
use crate::error::{PhonoError, PhonoResult};

// -----------------------------
// Defaults
// -----------------------------

/// Window half-width and max click length, in seconds.
const DEFAULT_WINDOW_SEC: f32 = 0.00075;
const DEFAULT_THRESHOLD: f32 = 7.0;
const DEFAULT_EPSILON: f32 = 1e-9;
const DEFAULT_HPF_HZ: f32 = 10_000.0;
const DEFAULT_HPF_ORDER: u32 = 2;

const MAX_HPF_STAGES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickDetectorConfig {
    /// Samples on each side of the centre sample
    pub window_size: usize,
    /// Outlier score above which a sample is a click candidate
    pub threshold: f32,
    /// Added to the MAD so a flat window never divides by zero
    pub epsilon: f32,
    /// Longer candidate runs are treated as music transients
    pub max_click_length: u32,
    /// Minimum summed |sample| over a run; 0 disables the check
    pub min_energy: f32,
    pub hpf_freq: f32,
    /// 4 cascades two 2nd-order sections, anything else uses one
    pub hpf_order: u32,
}

impl ClickDetectorConfig {
    /// Defaults scaled to `sample_rate` (36-sample window at 48 kHz).
    pub fn for_sample_rate(sample_rate: f32) -> Self {
        let window = (sample_rate * DEFAULT_WINDOW_SEC) as usize;
        Self {
            window_size: window,
            threshold: DEFAULT_THRESHOLD,
            epsilon: DEFAULT_EPSILON,
            max_click_length: window as u32,
            min_energy: 0.0,
            hpf_freq: DEFAULT_HPF_HZ,
            hpf_order: DEFAULT_HPF_ORDER,
        }
    }
}

/// A confirmed click, in detector sample positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    /// Input index of the first outlier sample
    pub start: u64,
    pub length: u32,
    /// Sum of |filtered sample| over the run
    pub energy: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CandidateState {
    Idle,
    InClick { start: u64, length: u32, energy: f32 },
    /// Run exceeded the length cap; swallow it until it ends
    Rejecting,
}

pub struct ClickDetector {
    config: ClickDetectorConfig,

    hpf: BiquadCoeffs,
    hpf_state: [BiquadState; MAX_HPF_STAGES],
    hpf_stages: usize,

    // Filtered history and scratch, sized 2*window_size+1
    buffer: Vec<f32>,
    work: Vec<f32>,
    deviation: Vec<f32>,
    write_pos: usize,
    samples_filled: usize,

    /// Input index of the current centre sample once warm
    samples_seen: u64,
    state: CandidateState,
    last_click: Option<ClickEvent>,
}

impl ClickDetector {
    pub fn new(config: ClickDetectorConfig, sample_rate: f32) -> PhonoResult<Self> {
        if config.window_size == 0 {
            return Err(PhonoError::InvalidConfig(
                "click detector window_size must be at least 1".into(),
            ));
        }
        if !(config.epsilon > 0.0) {
            return Err(PhonoError::InvalidConfig(
                "click detector epsilon must be positive".into(),
            ));
        }

        let len = 2 * config.window_size + 1;
        Ok(Self {
            config,
            hpf: BiquadCoeffs::highpass(sample_rate, config.hpf_freq, 2),
            hpf_state: [BiquadState::new(); MAX_HPF_STAGES],
            hpf_stages: if config.hpf_order == 4 { 2 } else { 1 },
            buffer: vec![0.0; len],
            work: vec![0.0; len],
            deviation: vec![0.0; len],
            write_pos: 0,
            samples_filled: 0,
            samples_seen: 0,
            state: CandidateState::Idle,
            last_click: None,
        })
    }

    pub fn config(&self) -> &ClickDetectorConfig {
        &self.config
    }

    /// Decision delay relative to the newest input sample.
    pub fn latency(&self) -> usize {
        self.config.window_size
    }

    /// The click confirmed by the most recent `true` from [`process`](Self::process).
    pub fn last_click(&self) -> Option<ClickEvent> {
        self.last_click
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.hpf_state = [BiquadState::new(); MAX_HPF_STAGES];
        self.write_pos = 0;
        self.samples_filled = 0;
        self.samples_seen = 0;
        self.state = CandidateState::Idle;
        self.last_click = None;
    }

    /// Feed one sample; `true` when a click run has just been confirmed.
    pub fn process(&mut self, sample: f32) -> bool {
        let filtered = self.prefilter(sample);

        let len = self.buffer.len();
        self.buffer[self.write_pos] = filtered;
        self.write_pos = (self.write_pos + 1) % len;
        self.samples_seen += 1;

        if self.samples_filled < len {
            self.samples_filled += 1;
            return false;
        }

        // Oldest sample sits at write_pos
        let (newer, older) = self.buffer.split_at(self.write_pos);
        self.work[..older.len()].copy_from_slice(older);
        self.work[older.len()..].copy_from_slice(newer);

        let ws = self.config.window_size;
        let centre = self.work[ws];
        let centre_index = self.samples_seen - 1 - ws as u64;

        let median = median_in_place(&mut self.work);
        for (dev, &x) in self.deviation.iter_mut().zip(self.work.iter()) {
            *dev = (x - median).abs();
        }
        let mad = median_in_place(&mut self.deviation);

        let score = (centre - median).abs() / (mad + self.config.epsilon);
        self.advance(score > self.config.threshold, centre, centre_index)
    }

    /// Pre-emphasis: one 2nd-order section, or two cascaded for order 4.
    #[inline]
    fn prefilter(&mut self, sample: f32) -> f32 {
        let mut filtered = sample;
        for state in self.hpf_state.iter_mut().take(self.hpf_stages) {
            filtered = self.hpf.process(state, filtered);
        }
        filtered
    }

    fn advance(&mut self, candidate: bool, centre: f32, centre_index: u64) -> bool {
        match (self.state, candidate) {
            (CandidateState::Idle, true) => {
                self.state = CandidateState::InClick {
                    start: centre_index,
                    length: 1,
                    energy: centre.abs(),
                };
                false
            }
            (CandidateState::InClick { start, length, energy }, true) => {
                let length = length + 1;
                if length > self.config.max_click_length {
                    self.state = CandidateState::Rejecting;
                } else {
                    self.state = CandidateState::InClick {
                        start,
                        length,
                        energy: energy + centre.abs(),
                    };
                }
                false
            }
            (CandidateState::InClick { start, length, energy }, false) => {
                self.state = CandidateState::Idle;
                let min = self.config.min_energy;
                let valid = !(min > 0.0 && energy < min);
                if valid {
                    self.last_click = Some(ClickEvent {
                        start,
                        length,
                        energy,
                    });
                }
                valid
            }
            (CandidateState::Rejecting, true) => false,
            (CandidateState::Rejecting, false) | (CandidateState::Idle, false) => {
                self.state = CandidateState::Idle;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f32 = 48_000.0;

    fn sine(n: usize, freq: f32, amp: f32) -> Vec<f32> {
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / SR).sin())
            .collect()
    }

    /// Near-transparent pre-emphasis so tests can reason about raw samples.
    fn flat_config() -> ClickDetectorConfig {
        ClickDetectorConfig {
            hpf_freq: 1.0,
            ..ClickDetectorConfig::for_sample_rate(SR)
        }
    }

    fn run(det: &mut ClickDetector, signal: &[f32]) -> Vec<ClickEvent> {
        let mut events = Vec::new();
        for &x in signal {
            if det.process(x) {
                events.extend(det.last_click());
            }
        }
        events
    }

    #[test]
    fn test_default_config_at_48k() {
        let c = ClickDetectorConfig::for_sample_rate(SR);
        assert_eq!(c.window_size, 36);
        assert_eq!(c.max_click_length, 36);
        assert_eq!(c.threshold, 7.0);
        assert_eq!(c.hpf_order, 2);
    }

    #[test]
    fn test_rejects_degenerate_config() {
        let mut c = ClickDetectorConfig::for_sample_rate(SR);
        c.window_size = 0;
        assert!(ClickDetector::new(c, SR).is_err());

        let mut c = ClickDetectorConfig::for_sample_rate(SR);
        c.epsilon = 0.0;
        assert!(ClickDetector::new(c, SR).is_err());
    }

    #[test]
    fn test_warm_up_never_detects() {
        for window_size in [1usize, 4, 36] {
            let config = ClickDetectorConfig {
                window_size,
                ..flat_config()
            };
            let mut det = ClickDetector::new(config, SR).unwrap();
            // Impulses everywhere: still nothing until the window is full
            for i in 0..(2 * window_size + 1) {
                let x = if i % 2 == 0 { 10.0 } else { -10.0 };
                assert!(!det.process(x), "window {window_size} fired at call {i}");
            }
        }
    }

    #[test]
    fn test_clean_sine_has_no_false_positives() {
        let mut det = ClickDetector::new(ClickDetectorConfig::for_sample_rate(SR), SR).unwrap();
        let events = run(&mut det, &sine(5 * 48_000, 1000.0, 0.3));
        assert!(events.is_empty(), "false positives: {events:?}");

        let mut det = ClickDetector::new(flat_config(), SR).unwrap();
        let events = run(&mut det, &sine(2 * 48_000, 440.0, 0.8));
        assert!(events.is_empty());
    }

    #[test]
    fn test_isolated_impulse_detected_once() {
        let mut det = ClickDetector::new(flat_config(), SR).unwrap();
        let mut signal = sine(48_000, 1000.0, 0.3);
        signal[20_000] += 3.0;

        let events = run(&mut det, &signal);
        assert_eq!(events.len(), 1, "{events:?}");
        assert_eq!(events[0].start, 20_000);
        assert_eq!(events[0].length, 1);
    }

    #[test]
    fn test_long_run_is_rejected() {
        let config = ClickDetectorConfig {
            max_click_length: 5,
            ..flat_config()
        };
        let mut det = ClickDetector::new(config, SR).unwrap();
        let mut signal = sine(48_000, 1000.0, 0.3);
        for (k, x) in signal[10_000..10_012].iter_mut().enumerate() {
            *x += if k % 2 == 0 { 3.0 } else { -3.0 };
        }
        assert!(run(&mut det, &signal).is_empty());

        // Same burst is short enough under the default cap
        let mut det = ClickDetector::new(flat_config(), SR).unwrap();
        let events = run(&mut det, &signal);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].length, 12);
    }

    #[test]
    fn test_min_energy_filters_weak_runs() {
        let config = ClickDetectorConfig {
            min_energy: 100.0,
            ..flat_config()
        };
        let mut det = ClickDetector::new(config, SR).unwrap();
        let mut signal = sine(48_000, 1000.0, 0.3);
        signal[20_000] += 3.0;
        assert!(run(&mut det, &signal).is_empty());
    }

    #[test]
    fn test_reset_restarts_warm_up() {
        let mut det = ClickDetector::new(flat_config(), SR).unwrap();
        let signal = sine(1000, 1000.0, 0.3);
        run(&mut det, &signal);
        det.reset();
        for _ in 0..73 {
            assert!(!det.process(50.0));
        }
        assert_eq!(det.config().window_size, 36);
    }

    fn three_clicks(size: usize) -> (Vec<f32>, [usize; 3]) {
        let mut signal = sine(size, 1000.0, 0.3);
        let positions = [size / 4, size / 2, 3 * size / 4];
        signal[positions[0]] += 2.0;
        signal[positions[0] + 1] += 1.0;
        signal[positions[1]] += -1.5;
        signal[positions[2]] += 1.8;
        signal[positions[2] + 1] += 1.2;
        signal[positions[2] + 2] += 0.6;
        (signal, positions)
    }

    #[test]
    fn test_fourth_order_cascades_two_sections() {
        let order2 = ClickDetectorConfig::for_sample_rate(SR);
        let order4 = ClickDetectorConfig {
            hpf_order: 4,
            ..order2
        };
        let mut det2 = ClickDetector::new(order2, SR).unwrap();
        let mut det4 = ClickDetector::new(order4, SR).unwrap();
        assert_eq!(det2.hpf_stages, 1);
        assert_eq!(det4.hpf_stages, 2);

        // 1 kHz sits well below the 10 kHz corner; a second section doubles the dB loss
        let tone = sine(9600, 1000.0, 0.5);
        let mut peak2 = 0.0f32;
        let mut peak4 = 0.0f32;
        for (i, &x) in tone.iter().enumerate() {
            let y2 = det2.prefilter(x);
            let y4 = det4.prefilter(x);
            if i >= 4800 {
                peak2 = peak2.max(y2.abs());
                peak4 = peak4.max(y4.abs());
            }
        }
        assert!(peak2 > 0.0);
        assert!(peak4 < 0.1 * peak2, "order 2: {peak2}, order 4: {peak4}");
    }

    #[test]
    fn test_fourth_order_finds_all_three_clicks() {
        let (signal, positions) = three_clicks(48_000);
        let config = ClickDetectorConfig {
            hpf_order: 4,
            ..ClickDetectorConfig::for_sample_rate(SR)
        };
        let mut det = ClickDetector::new(config, SR).unwrap();
        let events = run(&mut det, &signal);

        for &p in &positions {
            let hit = events
                .iter()
                .any(|e| (e.start as i64 - p as i64).abs() <= 10);
            assert!(hit, "no detection near {p}: {events:?}");
        }
    }

    #[test]
    fn test_three_click_scenario() {
        let (signal, positions) = three_clicks(48_000);

        let mut det = ClickDetector::new(ClickDetectorConfig::for_sample_rate(SR), SR).unwrap();
        let events = run(&mut det, &signal);

        for e in &events {
            let near = positions
                .iter()
                .any(|&p| (e.start as i64 - p as i64).abs() <= 10);
            assert!(near, "stray detection at {}", e.start);
        }

        // Count detections more than 10 samples apart
        let mut distinct = 0;
        let mut last: Option<u64> = None;
        for e in &events {
            if last.map_or(true, |l| e.start - l > 10) {
                distinct += 1;
            }
            last = Some(e.start);
        }
        assert!((2..=4).contains(&distinct), "distinct clicks: {distinct}");
    }
}
