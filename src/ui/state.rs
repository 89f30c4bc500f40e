//! Editor data model.
//!
//! Parameter values are read straight from the shared `PhonoParams`. The
//! restoration counters live in atomics, so a timer emits
//! [`StatsEvent::Refresh`] and the model copies them into display strings.

use crate::meters::Meters;
use crate::pipeline::PipelineStats;
use crate::PhonoParams;
use nih_plug_vizia::vizia::prelude::*;
use std::sync::Arc;

#[derive(Lens, Clone)]
pub struct PhonoData {
    pub params: Arc<PhonoParams>,
    pub meters: Arc<Meters>,
    pub clicks_text: String,
    pub spike_text: String,
    pub clipped_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatsEvent {
    Refresh,
}

impl PhonoData {
    pub fn new(params: Arc<PhonoParams>, meters: Arc<Meters>) -> Self {
        let mut data = Self {
            params,
            meters,
            clicks_text: String::new(),
            spike_text: String::new(),
            clipped_text: String::new(),
        };
        data.apply(&PipelineStats::default());
        data
    }

    fn apply(&mut self, stats: &PipelineStats) {
        self.clicks_text = format!("{} clicks", stats.detected_clicks);
        self.spike_text = if stats.detected_clicks == 0 {
            "-".to_string()
        } else {
            format!(
                "{:.1} smp / {:.1} dB",
                stats.avg_spike_length, stats.avg_spike_ratio_db
            )
        };
        self.clipped_text = format!("{} clipped", stats.clipped_samples);
    }
}

impl Model for PhonoData {
    fn event(&mut self, cx: &mut EventContext, event: &mut Event) {
        event.map(|stats_event, _| match stats_event {
            StatsEvent::Refresh => {
                let stats = self.meters.get_stats();
                self.apply(&stats);
                cx.needs_redraw();
            }
        });
    }
}
