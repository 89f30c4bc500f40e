//! Stereo restoration chain.
//!
//! Order per block: spike declick (block-based, before any EQ), then per
//! sample subsonic → RIAA → hum notch → output gain, with clipped samples
//! counted after gain. Statistics persist across blocks until
//! [`StereoPipeline::reset_stats`].

use crate::debug::DiagJournal;
use crate::dsp::utils::{db_to_gain, validate_sample_rate};
use crate::dsp::{BlockDeclicker, DeclickConfig, DeclickTotals, HumNotch, RiaaChannel, SubsonicMode};
use crate::error::PhonoResult;
use serde::{Deserialize, Serialize};

/// Control values for one block. Also the persisted settings schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub gain_db: f32,
    pub subsonic: SubsonicMode,
    pub riaa_enable: bool,
    pub declick_enable: bool,
    pub spike_threshold_db: f32,
    pub spike_width_ms: f32,
    pub notch_enable: bool,
    pub notch_freq: f32,
    pub notch_q: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            gain_db: 0.0,
            subsonic: SubsonicMode::Off,
            riaa_enable: true,
            declick_enable: false,
            spike_threshold_db: 10.0,
            spike_width_ms: 1.0,
            notch_enable: false,
            notch_freq: HumNotch::DEFAULT_FREQ_HZ,
            notch_q: HumNotch::DEFAULT_Q,
        }
    }
}

impl PipelineConfig {
    pub const GAIN_DB_RANGE: (f32, f32) = (-40.0, 40.0);
    pub const SPIKE_THRESHOLD_DB_RANGE: (f32, f32) = (0.0, 40.0);
    pub const SPIKE_WIDTH_MS_RANGE: (f32, f32) = (0.1, 10.0);
    pub const NOTCH_FREQ_RANGE: (f32, f32) = (40.0, 70.0);
    pub const NOTCH_Q_RANGE: (f32, f32) = (1.0, 50.0);

    pub fn declick_config(&self) -> DeclickConfig {
        DeclickConfig::from_db(self.spike_threshold_db, self.spike_width_ms)
    }

    /// Pull every value into its control range (NaN falls back to the default).
    pub fn clamped(mut self) -> Self {
        let d = Self::default();
        fn fit(v: f32, (lo, hi): (f32, f32), fallback: f32) -> f32 {
            if v.is_nan() {
                fallback
            } else {
                v.clamp(lo, hi)
            }
        }
        self.gain_db = fit(self.gain_db, Self::GAIN_DB_RANGE, d.gain_db);
        self.spike_threshold_db = fit(
            self.spike_threshold_db,
            Self::SPIKE_THRESHOLD_DB_RANGE,
            d.spike_threshold_db,
        );
        self.spike_width_ms = fit(self.spike_width_ms, Self::SPIKE_WIDTH_MS_RANGE, d.spike_width_ms);
        self.notch_freq = fit(self.notch_freq, Self::NOTCH_FREQ_RANGE, d.notch_freq);
        self.notch_q = fit(self.notch_q, Self::NOTCH_Q_RANGE, d.notch_q);
        self
    }
}

/// Running counters published to meters and printed by the tools.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipelineStats {
    pub clipped_samples: u64,
    pub detected_clicks: u64,
    pub avg_spike_length: f32,
    pub avg_spike_ratio_db: f32,
}

pub struct StereoPipeline {
    sample_rate: u32,
    riaa_l: RiaaChannel,
    riaa_r: RiaaChannel,
    notch: HumNotch,
    declick_l: BlockDeclicker,
    declick_r: BlockDeclicker,

    totals: DeclickTotals,
    clipped_samples: u64,
    /// Gain reached at the end of the previous block
    gain_lin: f32,
    journal: Option<DiagJournal>,
}

impl StereoPipeline {
    pub fn new(sample_rate: f32) -> PhonoResult<Self> {
        let sr = validate_sample_rate(sample_rate)?;
        let fs = sr as f32;
        Ok(Self {
            sample_rate: sr,
            riaa_l: RiaaChannel::new(fs),
            riaa_r: RiaaChannel::new(fs),
            notch: HumNotch::new(fs),
            declick_l: BlockDeclicker::for_channel(fs, 0),
            declick_r: BlockDeclicker::for_channel(fs, 1),
            totals: DeclickTotals::default(),
            clipped_samples: 0,
            gain_lin: 1.0,
            journal: None,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Per-window declick repairs are recorded here from now on.
    pub fn attach_journal(&mut self, journal: DiagJournal) {
        self.journal = Some(journal);
    }

    pub fn latency_samples(&self) -> u32 {
        BlockDeclicker::LATENCY as u32
    }

    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32], config: &PipelineConfig) {
        let declick = config.declick_config();
        self.declick_l.process(
            left,
            &declick,
            config.declick_enable,
            &mut self.totals,
            self.journal.as_mut(),
        );
        self.declick_r.process(
            right,
            &declick,
            config.declick_enable,
            &mut self.totals,
            self.journal.as_mut(),
        );

        if config.notch_enable {
            self.notch.update(config.notch_freq, config.notch_q);
        }

        let n = left.len().min(right.len());
        let target = db_to_gain(config.gain_db);
        let step = if n > 0 {
            (target - self.gain_lin) / n as f32
        } else {
            0.0
        };

        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut y_l = self.riaa_l.process(*l, config.subsonic, config.riaa_enable);
            let mut y_r = self.riaa_r.process(*r, config.subsonic, config.riaa_enable);

            if config.notch_enable {
                (y_l, y_r) = self.notch.process(y_l, y_r);
            }

            self.gain_lin += step;
            y_l *= self.gain_lin;
            y_r *= self.gain_lin;

            if y_l.abs() > 1.0 {
                self.clipped_samples += 1;
            }
            if y_r.abs() > 1.0 {
                self.clipped_samples += 1;
            }

            *l = y_l;
            *r = y_r;
        }
        self.gain_lin = target;
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            clipped_samples: self.clipped_samples,
            detected_clicks: self.totals.clicks(),
            avg_spike_length: self.totals.avg_spike_length(),
            avg_spike_ratio_db: self.totals.avg_ratio_db(),
        }
    }

    /// Clears filter memory and buffered audio; counters survive.
    pub fn reset(&mut self) {
        self.riaa_l.reset();
        self.riaa_r.reset();
        self.notch.reset();
        self.declick_l.reset();
        self.declick_r.reset();
    }

    pub fn reset_stats(&mut self) {
        self.totals.reset();
        self.clipped_samples = 0;
    }
}
