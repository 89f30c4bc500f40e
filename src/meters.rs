//! Lock-free meter values shared between the audio thread and the editor.
//!
//! Floats are stored as their bit patterns in `AtomicU32`; counters use
//! `AtomicU64`. Everything is written once per block with relaxed ordering.

use crate::pipeline::PipelineStats;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Level and restoration statistics for the editor.
#[derive(Default)]
pub struct Meters {
    input_peak_l: AtomicU32,
    input_peak_r: AtomicU32,
    output_peak_l: AtomicU32,
    output_peak_r: AtomicU32,

    clipped_samples: AtomicU64,
    detected_clicks: AtomicU64,
    avg_spike_length: AtomicU32,
    avg_spike_ratio_db: AtomicU32,
}

impl Meters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_peak_l(&self, val: f32) {
        self.input_peak_l.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_input_peak_r(&self, val: f32) {
        self.input_peak_r.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_peak_l(&self, val: f32) {
        self.output_peak_l.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_output_peak_r(&self, val: f32) {
        self.output_peak_r.store(val.to_bits(), Ordering::Relaxed);
    }

    pub fn set_stats(&self, stats: &PipelineStats) {
        self.clipped_samples
            .store(stats.clipped_samples, Ordering::Relaxed);
        self.detected_clicks
            .store(stats.detected_clicks, Ordering::Relaxed);
        self.avg_spike_length
            .store(stats.avg_spike_length.to_bits(), Ordering::Relaxed);
        self.avg_spike_ratio_db
            .store(stats.avg_spike_ratio_db.to_bits(), Ordering::Relaxed);
    }

    pub fn get_input_peak_l(&self) -> f32 {
        f32::from_bits(self.input_peak_l.load(Ordering::Relaxed))
    }

    pub fn get_input_peak_r(&self) -> f32 {
        f32::from_bits(self.input_peak_r.load(Ordering::Relaxed))
    }

    pub fn get_output_peak_l(&self) -> f32 {
        f32::from_bits(self.output_peak_l.load(Ordering::Relaxed))
    }

    pub fn get_output_peak_r(&self) -> f32 {
        f32::from_bits(self.output_peak_r.load(Ordering::Relaxed))
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            clipped_samples: self.clipped_samples.load(Ordering::Relaxed),
            detected_clicks: self.detected_clicks.load(Ordering::Relaxed),
            avg_spike_length: f32::from_bits(self.avg_spike_length.load(Ordering::Relaxed)),
            avg_spike_ratio_db: f32::from_bits(self.avg_spike_ratio_db.load(Ordering::Relaxed)),
        }
    }

    pub fn reset(&self) {
        self.set_input_peak_l(-80.0);
        self.set_input_peak_r(-80.0);
        self.set_output_peak_l(-80.0);
        self.set_output_peak_r(-80.0);
        self.set_stats(&PipelineStats::default());
    }
}
