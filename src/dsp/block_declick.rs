//! Streaming adapter for the batch declicker.
//!
//! Hosts hand us blocks of any size; the declicker needs thousands of samples
//! at once and only repairs the middle of what it is given. Input is gathered
//! in a ring and analysed as 8192-sample windows hopping by half a window, so
//! each window's repairable region butts up against the next one's. The older
//! half of every window is final once analysed and is released downstream.
//!
//! # Lifecycle
//! - **Latency**: fixed at [`BlockDeclicker::LATENCY`] samples, even while
//!   bypassed, so toggling declick never shifts the timeline.
//! - **Reset**: drops buffered audio and re-primes the delay with silence.
//! - **Diagnostics**: windows that repaired something are recorded in an
//!   optional [`DiagJournal`] without allocating.

use crate::debug::{DiagEvent, DiagJournal};
use crate::dsp::declick::{DeclickConfig, DeclickTotals, Declicker};
use ringbuf::{Consumer, Producer, RingBuffer};

const WINDOW: usize = 8192;
const HOP: usize = WINDOW / 2;

pub struct BlockDeclicker {
    declicker: Declicker,
    channel: u8,
    windows_analysed: u64,
    /// Older half is already repaired, newer half is fresh input
    window: Vec<f32>,

    input_producer: Producer<f32>,
    input_consumer: Consumer<f32>,
    output_producer: Producer<f32>,
    output_consumer: Consumer<f32>,
}

impl BlockDeclicker {
    pub const LATENCY: usize = WINDOW;

    pub fn new(sample_rate: f32) -> Self {
        Self::for_channel(sample_rate, 0)
    }

    /// `channel` only labels diagnostics.
    pub fn for_channel(sample_rate: f32, channel: u8) -> Self {
        let (in_prod, in_cons) = RingBuffer::<f32>::new(HOP).split();
        let (out_prod, out_cons) = RingBuffer::<f32>::new(WINDOW).split();

        let mut out_prod_init = out_prod;
        for _ in 0..HOP {
            let _ = out_prod_init.push(0.0);
        }

        Self {
            declicker: Declicker::new(sample_rate, WINDOW),
            channel,
            windows_analysed: 0,
            window: vec![0.0; WINDOW],
            input_producer: in_prod,
            input_consumer: in_cons,
            output_producer: out_prod_init,
            output_consumer: out_cons,
        }
    }

    /// Process `samples` in place. Repairs are applied only when `enabled`;
    /// statistics of every analysed window are added to `totals`.
    pub fn process(
        &mut self,
        samples: &mut [f32],
        config: &DeclickConfig,
        enabled: bool,
        totals: &mut DeclickTotals,
        mut journal: Option<&mut DiagJournal>,
    ) {
        for sample in samples.iter_mut() {
            let _ = self.input_producer.push(*sample);

            if self.input_consumer.len() >= HOP {
                self.flush_window(config, enabled, totals, journal.as_deref_mut());
            }

            *sample = self.output_consumer.pop().unwrap_or(0.0);
        }
    }

    fn flush_window(
        &mut self,
        config: &DeclickConfig,
        enabled: bool,
        totals: &mut DeclickTotals,
        journal: Option<&mut DiagJournal>,
    ) {
        for slot in self.window[HOP..].iter_mut() {
            *slot = self.input_consumer.pop().unwrap_or(0.0);
        }

        if enabled {
            let stats = self.declicker.process(&mut self.window, config);
            totals.add(&stats);

            if let (Some(journal), true) = (journal, stats.click_count > 0) {
                journal.record(DiagEvent {
                    channel: self.channel,
                    window: self.windows_analysed,
                    clicks: stats.click_count,
                    avg_spike_length: stats.avg_spike_length,
                    avg_ratio_db: stats.avg_ratio_db,
                });
            }
        }
        self.windows_analysed += 1;

        for &x in &self.window[..HOP] {
            let _ = self.output_producer.push(x);
        }
        self.window.copy_within(HOP.., 0);
    }

    pub fn reset(&mut self) {
        while self.input_consumer.pop().is_some() {}
        while self.output_consumer.pop().is_some() {}
        self.window.fill(0.0);
        self.windows_analysed = 0;

        for _ in 0..HOP {
            let _ = self.output_producer.push(0.0);
        }
    }
}
