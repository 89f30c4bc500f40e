pub mod debug;
pub mod dsp;
pub mod error;
mod meters;
pub mod pipeline;
pub mod settings;
mod ui;

use crate::debug::{DiagReader, JOURNAL_CAPACITY};
use crate::dsp::SubsonicMode;
use crate::meters::Meters;
use crate::pipeline::{PipelineConfig, StereoPipeline};
use assert_no_alloc::permit_alloc;
use nih_plug::prelude::*;
use nih_plug_vizia::{create_vizia_editor, ViziaState, ViziaTheming};
use std::sync::{Arc, Mutex};
use ui::build_ui;

pub use crate::error::{PhonoError, PhonoResult};
pub use crate::settings::CONFIG_ENV_VAR;

const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;
/// Meter fall rate
const PEAK_DECAY_DB_PER_SEC: f32 = 13.0;
const METER_FLOOR_DB: f32 = -80.0;

// -----------------------------------------------------------------------------
// PARAMETERS
// -----------------------------------------------------------------------------
#[derive(Params)]
pub struct PhonoParams {
    #[id = "gain"]
    pub gain: FloatParam,

    #[id = "subsonic"]
    pub subsonic: EnumParam<SubsonicMode>,

    #[id = "riaa"]
    pub riaa: BoolParam,

    // -------------------------------------------------------------------------
    // SPIKE DECLICK
    // -------------------------------------------------------------------------
    #[id = "declick"]
    pub declick: BoolParam,

    #[id = "spike_thr"]
    pub spike_threshold: FloatParam,

    #[id = "spike_width"]
    pub spike_width: FloatParam,

    // -------------------------------------------------------------------------
    // HUM NOTCH
    // -------------------------------------------------------------------------
    #[id = "notch"]
    pub notch: BoolParam,

    #[id = "notch_freq"]
    pub notch_freq: FloatParam,

    #[id = "notch_q"]
    pub notch_q: FloatParam,

    /// Momentary: write the current values as the new defaults
    #[id = "store"]
    pub store: BoolParam,
}

impl PhonoParams {
    fn from_config(config: &PipelineConfig) -> Self {
        let range = |(min, max): (f32, f32)| FloatRange::Linear { min, max };

        Self {
            gain: FloatParam::new("Gain", config.gain_db, range(PipelineConfig::GAIN_DB_RANGE))
                .with_value_to_string(Arc::new(format_db)),

            subsonic: EnumParam::new("Subsonic", config.subsonic),

            riaa: BoolParam::new("RIAA", config.riaa_enable),

            declick: BoolParam::new("Declick", config.declick_enable),

            spike_threshold: FloatParam::new(
                "Spike Threshold",
                config.spike_threshold_db,
                range(PipelineConfig::SPIKE_THRESHOLD_DB_RANGE),
            )
            .with_value_to_string(Arc::new(format_db)),

            spike_width: FloatParam::new(
                "Spike Width",
                config.spike_width_ms,
                range(PipelineConfig::SPIKE_WIDTH_MS_RANGE),
            )
            .with_value_to_string(Arc::new(format_ms)),

            notch: BoolParam::new("Notch", config.notch_enable),

            notch_freq: FloatParam::new(
                "Notch Frequency",
                config.notch_freq,
                range(PipelineConfig::NOTCH_FREQ_RANGE),
            )
            .with_value_to_string(Arc::new(format_hz)),

            notch_q: FloatParam::new("Notch Q", config.notch_q, range(PipelineConfig::NOTCH_Q_RANGE))
                .with_value_to_string(Arc::new(format_q)),

            store: BoolParam::new("Store Settings", false).non_automatable(),
        }
    }

    /// Snapshot of the current values.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            gain_db: self.gain.value(),
            subsonic: self.subsonic.value(),
            riaa_enable: self.riaa.value(),
            declick_enable: self.declick.value(),
            spike_threshold_db: self.spike_threshold.value(),
            spike_width_ms: self.spike_width.value(),
            notch_enable: self.notch.value(),
            notch_freq: self.notch_freq.value(),
            notch_q: self.notch_q.value(),
        }
    }
}

fn format_db(v: f32) -> String {
    format!("{:.1} dB", v)
}

fn format_ms(v: f32) -> String {
    format!("{:.2} ms", v)
}

fn format_hz(v: f32) -> String {
    format!("{:.1} Hz", v)
}

fn format_q(v: f32) -> String {
    format!("{:.1}", v)
}

/// Work handed off the audio thread.
#[derive(Debug, Clone)]
pub enum PhonoTask {
    StoreSettings(PipelineConfig),
}

// -----------------------------------------------------------------------------
// PLUGIN STRUCT
// -----------------------------------------------------------------------------
struct PhonoStagePlugin {
    params: Arc<PhonoParams>,
    editor_state: Arc<ViziaState>,
    pipeline: Option<StereoPipeline>,
    sample_rate: f32,

    // Store toggle edge detection
    last_store: bool,

    // Metering
    meters: Arc<Meters>,
    diag_reader: Arc<Mutex<Option<DiagReader>>>,
    peak_input_l: f32,
    peak_input_r: f32,
    peak_output_l: f32,
    peak_output_r: f32,
}

impl Default for PhonoStagePlugin {
    fn default() -> Self {
        let defaults = PipelineConfig::load_or_default();
        Self {
            params: Arc::new(PhonoParams::from_config(&defaults)),
            editor_state: ViziaState::new(|| (560, 420)),
            pipeline: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            last_store: false,
            meters: Arc::new(Meters::new()),
            diag_reader: Arc::new(Mutex::new(None)),
            peak_input_l: METER_FLOOR_DB,
            peak_input_r: METER_FLOOR_DB,
            peak_output_l: METER_FLOOR_DB,
            peak_output_r: METER_FLOOR_DB,
        }
    }
}

impl Plugin for PhonoStagePlugin {
    const NAME: &'static str = "PhonoStage";
    const VENDOR: &'static str = "PhonoStage";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),
        ..AudioIOLayout::const_default()
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = PhonoTask;

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        context: &mut impl InitContext<Self>,
    ) -> bool {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.sample_rate = buffer_config.sample_rate;

            let mut pipeline = match permit_alloc(|| StereoPipeline::new(self.sample_rate)) {
                Ok(p) => p,
                Err(e) => {
                    nih_error!("initialize rejected: {}", e);
                    return false;
                }
            };
            let (journal, reader) = permit_alloc(|| debug::journal(JOURNAL_CAPACITY));
            pipeline.attach_journal(journal);
            if let Ok(mut slot) = self.diag_reader.lock() {
                *slot = Some(reader);
            }

            let pipeline_latency = pipeline.latency_samples();
            context.set_latency_samples(pipeline_latency);
            self.pipeline = Some(pipeline);

            self.last_store = self.params.store.value();
            self.meters.reset();
            nih_log!(
                "initialize: {} Hz, latency {} samples",
                self.sample_rate,
                pipeline_latency
            );

            true
        }))
        .unwrap_or(false)
    }

    fn editor(&mut self, _async_executor: AsyncExecutor<Self>) -> Option<Box<dyn Editor>> {
        let params = self.params.clone();
        let meters = self.meters.clone();
        let diag_reader = self.diag_reader.clone();
        create_vizia_editor(
            self.editor_state.clone(),
            ViziaTheming::default(),
            move |cx, gui_context| {
                build_ui(
                    cx,
                    params.clone(),
                    meters.clone(),
                    diag_reader.clone(),
                    gui_context,
                );
            },
        )
    }

    fn task_executor(&mut self) -> TaskExecutor<Self> {
        Box::new(move |task| match task {
            PhonoTask::StoreSettings(config) => match PipelineConfig::default_path() {
                Some(path) => match config.save(&path) {
                    Ok(()) => log::info!("Stored settings to {}", path.display()),
                    Err(e) => log::warn!("Could not store settings: {}", e),
                },
                None => log::warn!("No settings location (set {} or HOME)", CONFIG_ENV_VAR),
            },
        })
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.process_internal(buffer, context)
        }))
        .unwrap_or(ProcessStatus::Normal)
    }

    fn reset(&mut self) {
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            if let Some(pipeline) = self.pipeline.as_mut() {
                pipeline.reset();
            }
            self.peak_input_l = METER_FLOOR_DB;
            self.peak_input_r = METER_FLOOR_DB;
            self.peak_output_l = METER_FLOOR_DB;
            self.peak_output_r = METER_FLOOR_DB;
        }))
        .unwrap_or(());
    }
}

#[inline]
fn peak_db(x: f32) -> f32 {
    20.0 * x.abs().max(1e-6).log10()
}

impl PhonoStagePlugin {
    fn process_internal(
        &mut self,
        buffer: &mut Buffer,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let config = self.params.config();

        let store = self.params.store.value();
        if store && !self.last_store {
            context.execute_background(PhonoTask::StoreSettings(config));
        }
        self.last_store = store;

        let Some(pipeline) = self.pipeline.as_mut() else {
            return ProcessStatus::Normal;
        };

        let channels = buffer.as_slice();
        if channels.len() < 2 {
            return ProcessStatus::Normal;
        }
        let (first_channel, remaining) = channels.split_at_mut(1);
        let (Some(left), Some(right)) = (first_channel.get_mut(0), remaining.get_mut(0)) else {
            return ProcessStatus::Normal;
        };
        let left: &mut [f32] = left;
        let right: &mut [f32] = right;
        let frame_count = left.len().min(right.len());

        for idx in 0..frame_count {
            self.peak_input_l = self.peak_input_l.max(peak_db(left[idx]));
            self.peak_input_r = self.peak_input_r.max(peak_db(right[idx]));
        }

        pipeline.process_block(&mut left[..frame_count], &mut right[..frame_count], &config);

        for idx in 0..frame_count {
            self.peak_output_l = self.peak_output_l.max(peak_db(left[idx]));
            self.peak_output_r = self.peak_output_r.max(peak_db(right[idx]));
        }

        let decay = PEAK_DECAY_DB_PER_SEC / self.sample_rate * frame_count as f32;
        self.peak_input_l = (self.peak_input_l - decay).max(METER_FLOOR_DB);
        self.peak_input_r = (self.peak_input_r - decay).max(METER_FLOOR_DB);
        self.peak_output_l = (self.peak_output_l - decay).max(METER_FLOOR_DB);
        self.peak_output_r = (self.peak_output_r - decay).max(METER_FLOOR_DB);

        // Once per buffer
        self.meters.set_input_peak_l(self.peak_input_l);
        self.meters.set_input_peak_r(self.peak_input_r);
        self.meters.set_output_peak_l(self.peak_output_l);
        self.meters.set_output_peak_r(self.peak_output_r);
        self.meters.set_stats(&pipeline.stats());

        ProcessStatus::Normal
    }
}

impl ClapPlugin for PhonoStagePlugin {
    const CLAP_ID: &'static str = "com.phonostage.phonostage";
    const CLAP_DESCRIPTION: Option<&'static str> = Some("Vinyl Playback Restoration");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Restoration,
        ClapFeature::Stereo,
    ];
}

impl Vst3Plugin for PhonoStagePlugin {
    const VST3_CLASS_ID: [u8; 16] = *b"PhonoStageRIAA01";
    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Restoration];
}

nih_export_clap!(PhonoStagePlugin);
nih_export_vst3!(PhonoStagePlugin);
