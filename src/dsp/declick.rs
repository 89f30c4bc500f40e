//! Spike Declicker (whole-buffer)
//!
//! Clicks are narrow regions whose short-window mean square towers over the
//! mean square of a wide surrounding window. Such regions are replaced by a
//! straight line between the samples just outside them.
//!
//! Derived from the Audacity Click Removal effect by Craig DeForest.
//!
//! # Design Notes
//! - The wide baseline is a power-of-two cascaded moving sum, O(n log sep).
//! - Several narrow widths run coarse to fine; each pass sees the buffer as
//!   repaired by the previous ones.
//! - The algorithm is batch only: a repair needs the sample to the right of
//!   the spike. Buffers shorter than [`MIN_BUFFER`] are left untouched.
//! - [`Declicker`] owns its scratch so repeated calls do not allocate.

use crate::dsp::utils::{power_ratio_db, spike_threshold_from_db};

/// Shortest buffer the declicker will touch.
pub const MIN_BUFFER: usize = 4096;

/// Requested wide-window separation; the cascade rounds it up to 4096.
const SEPARATION: usize = 2049;
/// Offset of the narrow window inside the wide one.
const NARROW_OFFSET: usize = SEPARATION / 2;

/// Largest narrow window that stays inside the analysed range.
const MAX_CLICK_WIDTH: usize = 3 * NARROW_OFFSET - 1;

const DEFAULT_THRESHOLD: u32 = 200;
const DEFAULT_WIDTH_MS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeclickConfig {
    /// Spike level relative to the baseline, 1..=900 (x10 ratio)
    pub threshold: u32,
    /// Widest spike that will be repaired
    pub click_width_ms: f32,
}

impl Default for DeclickConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            click_width_ms: DEFAULT_WIDTH_MS,
        }
    }
}

impl DeclickConfig {
    /// Build from the user-facing dB threshold.
    pub fn from_db(threshold_db: f32, click_width_ms: f32) -> Self {
        Self {
            threshold: spike_threshold_from_db(threshold_db),
            click_width_ms,
        }
    }
}

/// Summary of one buffer call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeclickStats {
    pub click_count: u32,
    /// Mean repaired span in samples
    pub avg_spike_length: f32,
    /// Mean of the per-spike peak narrow/wide power ratio, in dB
    pub avg_ratio_db: f32,
}

/// Running totals across many buffer calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclickTotals {
    clicks: u64,
    spike_length_sum: f64,
    ratio_linear_sum: f64,
    ratio_calls: u64,
}

impl DeclickTotals {
    pub fn add(&mut self, stats: &DeclickStats) {
        if stats.click_count == 0 {
            return;
        }
        self.clicks += stats.click_count as u64;
        self.spike_length_sum += stats.avg_spike_length as f64 * stats.click_count as f64;

        // Averaged in the linear power domain
        let linear = if stats.avg_ratio_db > 0.0 {
            10f64.powf(stats.avg_ratio_db as f64 / 10.0)
        } else {
            1.0
        };
        self.ratio_linear_sum += linear;
        self.ratio_calls += 1;
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn avg_spike_length(&self) -> f32 {
        if self.clicks == 0 {
            return 0.0;
        }
        (self.spike_length_sum / self.clicks as f64) as f32
    }

    pub fn avg_ratio_db(&self) -> f32 {
        if self.ratio_calls == 0 {
            return 0.0;
        }
        power_ratio_db(self.ratio_linear_sum / self.ratio_calls as f64) as f32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct Declicker {
    sample_rate: f32,
    // Squared samples and the moving-sum baseline
    b2: Vec<f32>,
    ms_seq: Vec<f32>,
}

impl Declicker {
    /// `capacity` is the largest buffer processed without reallocating.
    pub fn new(sample_rate: f32, capacity: usize) -> Self {
        Self {
            sample_rate,
            b2: vec![0.0; capacity],
            ms_seq: vec![0.0; capacity],
        }
    }

    fn click_width(&self, config: &DeclickConfig) -> usize {
        let samples = (config.click_width_ms * self.sample_rate / 1000.0) as usize;
        samples.clamp(1, MAX_CLICK_WIDTH)
    }

    /// Remove spikes from `buffer` in place.
    pub fn process(&mut self, buffer: &mut [f32], config: &DeclickConfig) -> DeclickStats {
        let len = buffer.len();
        if len < MIN_BUFFER || config.threshold == 0 || !(config.click_width_ms > 0.0) {
            return DeclickStats::default();
        }
        if self.b2.len() < len {
            self.b2.resize(len, 0.0);
            self.ms_seq.resize(len, 0.0);
        }

        let click_width = self.click_width(config);
        let threshold = config.threshold as f32;
        let b2 = &mut self.b2[..len];
        let ms_seq = &mut self.ms_seq[..len];

        for ((sq, ms), &x) in b2.iter_mut().zip(ms_seq.iter_mut()).zip(buffer.iter()) {
            *sq = x * x;
            *ms = *sq;
        }

        // ms_seq[j] becomes the sum of b2[j..j + sep]
        let mut sep = 1;
        while sep < SEPARATION {
            for j in 0..len - sep {
                ms_seq[j] += ms_seq[j + sep];
            }
            sep *= 2;
        }
        if len <= sep {
            return DeclickStats::default();
        }
        let span = len - sep;
        let inv_sep = 1.0 / sep as f32;
        for ms in ms_seq[..span].iter_mut() {
            *ms *= inv_sep;
        }

        let mut count = 0u32;
        let mut length_sum = 0.0f64;
        let mut ratio_db_sum = 0.0f64;

        let mut wrc = (click_width / 4).max(1);
        while wrc >= 1 {
            let ww = click_width / wrc;
            let inv_ww = 1.0 / ww as f32;

            let mut left: Option<usize> = None;
            let mut peak_ratio = 0.0f32;

            for i in 0..span {
                let start = i + NARROW_OFFSET;
                let msw = b2[start..start + ww].iter().sum::<f32>() * inv_ww;
                let baseline = ms_seq[i];

                // Digital silence is never a spike
                if msw > 0.0 && msw >= threshold * baseline / 10.0 {
                    if left.is_none() {
                        left = Some(start);
                        peak_ratio = 0.0;
                    }
                    peak_ratio = peak_ratio.max(msw / baseline.max(f32::MIN_POSITIVE));
                } else if let Some(l) = left.take() {
                    if start - l > ww * 2 {
                        // Too broad for a click
                        continue;
                    }
                    let end = start + ww;
                    let lv = buffer[l];
                    let rv = buffer[end];
                    let run = (end - l) as f32;
                    for j in l..end {
                        let y = (rv * (j - l) as f32 + lv * (end - j) as f32) / run;
                        buffer[j] = y;
                        b2[j] = y * y;
                    }

                    count += 1;
                    length_sum += (end - l) as f64;
                    ratio_db_sum += power_ratio_db(peak_ratio as f64);
                }
            }

            wrc /= 2;
        }

        if count == 0 {
            return DeclickStats::default();
        }
        DeclickStats {
            click_count: count,
            avg_spike_length: (length_sum / count as f64) as f32,
            avg_ratio_db: (ratio_db_sum / count as f64) as f32,
        }
    }
}

/// One-shot convenience around [`Declicker`]; allocates its scratch.
pub fn declick_process(buffer: &mut [f32], config: &DeclickConfig, sample_rate: f32) -> DeclickStats {
    Declicker::new(sample_rate, buffer.len()).process(buffer, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SR: f32 = 44_100.0;

    fn music(n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| {
                let t = i as f32 / SR;
                0.3 * (2.0 * PI * 220.0 * t).sin() + 0.1 * (2.0 * PI * 1250.0 * t).sin()
            })
            .collect()
    }

    fn config() -> DeclickConfig {
        DeclickConfig {
            threshold: 200,
            click_width_ms: 1.0,
        }
    }

    #[test]
    fn test_short_buffer_untouched() {
        let mut buf = music(MIN_BUFFER - 1);
        buf[2000] += 5.0;
        let original = buf.clone();
        let stats = declick_process(&mut buf, &config(), SR);
        assert_eq!(stats.click_count, 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_disabled_configs_are_noops() {
        let mut buf = music(8192);
        buf[3000] += 5.0;
        let original = buf.clone();

        let zero_thr = DeclickConfig {
            threshold: 0,
            ..config()
        };
        assert_eq!(declick_process(&mut buf, &zero_thr, SR).click_count, 0);

        let zero_width = DeclickConfig {
            click_width_ms: 0.0,
            ..config()
        };
        assert_eq!(declick_process(&mut buf, &zero_width, SR).click_count, 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_removes_spikes_in_analysed_region() {
        let mut buf = music(8192);
        let clean = buf.clone();
        for &(pos, amp) in &[(2000usize, 3.0f32), (3000, -3.0), (4500, 3.0)] {
            buf[pos] += amp;
            buf[pos + 1] += amp * 0.5;
        }

        let stats = declick_process(&mut buf, &config(), SR);
        assert_eq!(stats.click_count, 3, "{stats:?}");
        assert!(stats.avg_spike_length >= 1.0);
        assert!(stats.avg_ratio_db > 13.0);

        for &pos in &[2000usize, 3000, 4500] {
            let err = (buf[pos] - clean[pos]).abs();
            assert!(err < 0.5, "residual {err} at {pos}");
        }
        // Far from any spike nothing moved
        assert_eq!(buf[1500], clean[1500]);
    }

    #[test]
    fn test_second_pass_finds_nothing() {
        let mut buf = music(16_384);
        for pos in [1500usize, 2600, 3900, 5000] {
            buf[pos] += 3.0;
        }
        let mut declicker = Declicker::new(SR, buf.len());
        let first = declicker.process(&mut buf, &config());
        assert!(first.click_count > 0);

        let repaired = buf.clone();
        let second = declicker.process(&mut buf, &config());
        assert_eq!(second.click_count, 0);
        assert_eq!(buf, repaired);
    }

    #[test]
    fn test_clean_music_untouched() {
        let mut buf = music(16_384);
        let original = buf.clone();
        let stats = declick_process(&mut buf, &config(), SR);
        assert_eq!(stats.click_count, 0);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_interpolation_is_linear() {
        let mut buf = vec![0.0f32; 8192];
        for (i, x) in buf.iter_mut().enumerate() {
            *x = 0.01 * ((i % 7) as f32 - 3.0);
        }
        buf[3000] = 2.0;
        declick_process(&mut buf, &config(), SR);
        assert!(buf[3000].abs() < 0.05);
    }

    #[test]
    fn test_silence_is_not_a_click() {
        let mut buf = vec![0.0f32; 8192];
        assert_eq!(declick_process(&mut buf, &config(), SR).click_count, 0);

        buf[2500] = 3.0;
        let stats = declick_process(&mut buf, &config(), SR);
        assert_eq!(stats.click_count, 1);
        assert_eq!(buf[2500], 0.0);
    }

    #[test]
    fn test_totals_weight_by_click_count() {
        let mut totals = DeclickTotals::default();
        totals.add(&DeclickStats {
            click_count: 1,
            avg_spike_length: 10.0,
            avg_ratio_db: 20.0,
        });
        totals.add(&DeclickStats {
            click_count: 3,
            avg_spike_length: 2.0,
            avg_ratio_db: 20.0,
        });
        totals.add(&DeclickStats::default());

        assert_eq!(totals.clicks(), 4);
        assert!((totals.avg_spike_length() - 4.0).abs() < 1e-6);
        assert!((totals.avg_ratio_db() - 20.0).abs() < 1e-4);

        totals.reset();
        assert_eq!(totals.clicks(), 0);
        assert_eq!(totals.avg_ratio_db(), 0.0);
    }

    #[test]
    fn test_threshold_from_db() {
        let c = DeclickConfig::from_db(0.0, 1.0);
        assert_eq!(c.threshold, 9);
        assert_eq!(DeclickConfig::default().threshold, 200);
    }
}
