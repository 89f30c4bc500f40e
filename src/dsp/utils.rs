use crate::error::{PhonoError, PhonoResult};

/// Sample rates the filter designs are validated for.
pub const SUPPORTED_SAMPLE_RATES: [u32; 6] = [44_100, 48_000, 88_200, 96_000, 176_400, 192_000];

pub fn db_to_gain(db: f32) -> f32 {
    (10.0f32).powf(db / 20.0)
}

pub fn gain_to_db(gain: f32) -> f32 {
    20.0 * gain.max(1e-12).log10()
}

/// Power ratio expressed in dB (10·log10).
pub fn power_ratio_db(ratio: f64) -> f64 {
    10.0 * ratio.max(1e-24).log10()
}

/// Returns the index of `sample_rate` in [`SUPPORTED_SAMPLE_RATES`].
pub fn sample_rate_index(sample_rate: u32) -> Option<usize> {
    SUPPORTED_SAMPLE_RATES
        .iter()
        .position(|&sr| sr == sample_rate)
}

/// Accepts host-provided rates that round to a supported table entry.
pub fn validate_sample_rate(sample_rate: f32) -> PhonoResult<u32> {
    let rounded = sample_rate.round();
    if !rounded.is_finite() || rounded <= 0.0 {
        return Err(PhonoError::UnsupportedSampleRate(0));
    }
    let sr = rounded as u32;
    match sample_rate_index(sr) {
        Some(_) => Ok(sr),
        None => Err(PhonoError::UnsupportedSampleRate(sr)),
    }
}

/// Maps a spike threshold in dB to the declicker's integer level.
///
/// 0 dB lands on 9, the Audacity default range is then 1..=900.
pub fn spike_threshold_from_db(threshold_db: f32) -> u32 {
    let voltage_ratio = 10.0f32.powf(threshold_db / 20.0);
    let level = (voltage_ratio * 9.0).round();
    if level.is_nan() {
        return 1;
    }
    level.clamp(1.0, 900.0) as u32
}

/// Median of `values`, reordering them in place.
///
/// The contents of `values` are unspecified afterwards. Even lengths average
/// the two middle elements; an empty slice yields 0.
pub fn median_in_place(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mid = n / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    let upper = *upper;
    if n % 2 == 1 {
        return upper;
    }
    let lower_max = lower
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    0.5 * (lower_max + upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_handles_odd_even_and_empty() {
        let mut odd = [5.0, -1.0, 3.0, 9.0, 0.0];
        assert_eq!(median_in_place(&mut odd), 3.0);

        let mut even = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(median_in_place(&mut even), 2.5);

        let mut empty: [f32; 0] = [];
        assert_eq!(median_in_place(&mut empty), 0.0);
    }

    #[test]
    fn median_ignores_single_outlier() {
        let mut window = [0.1, 0.12, 0.09, 0.11, 40.0, 0.1, 0.1];
        let m = median_in_place(&mut window);
        assert!((m - 0.1).abs() < 1e-6);
    }

    #[test]
    fn spike_threshold_mapping_covers_range() {
        assert_eq!(spike_threshold_from_db(0.0), 9);
        assert_eq!(spike_threshold_from_db(40.0), 900);
        assert_eq!(spike_threshold_from_db(-60.0), 1);
        assert_eq!(spike_threshold_from_db(80.0), 900);
        // 20·log10(200/9) ≈ 26.9 dB reproduces the Audacity default of 200
        assert_eq!(spike_threshold_from_db(26.94), 200);
    }

    #[test]
    fn sample_rate_validation() {
        assert_eq!(validate_sample_rate(48_000.0).ok(), Some(48_000));
        assert_eq!(validate_sample_rate(44_099.6).ok(), Some(44_100));
        assert!(matches!(
            validate_sample_rate(32_000.0),
            Err(PhonoError::UnsupportedSampleRate(32_000))
        ));
        assert_eq!(sample_rate_index(192_000), Some(5));
    }

    #[test]
    fn db_helpers() {
        assert!((db_to_gain(6.0) - 1.9953).abs() < 1e-3);
        assert!(gain_to_db(1.0).abs() < 1e-6);
        assert!((power_ratio_db(100.0) - 20.0).abs() < 1e-9);
    }
}
