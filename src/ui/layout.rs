//! Top-level editor layout: header, levels column, controls, statistics.

use crate::debug::DiagReader;
use crate::meters::Meters;
use crate::ui::components::{create_momentary_button, create_slider, create_toggle};
use crate::ui::meters::{ClipLed, LevelMeter, MeterType};
use crate::ui::state::{PhonoData, StatsEvent};
use crate::PhonoParams;
use nih_plug::prelude::{nih_log, GuiContext};
use nih_plug_vizia::vizia::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const STATS_REFRESH: Duration = Duration::from_millis(100);
const DIAG_DRAIN: Duration = Duration::from_millis(250);

const STYLE: &str = r#"
    .app-root {
        background-color: #1a1612;
        color: #eadfce;
        child-space: 12px;
        row-between: 10px;
    }

    .header {
        height: 48px;
        col-between: 12px;
        border-bottom: 1px solid #483c30;
    }

    .header-title {
        font-size: 20px;
        font-weight: bold;
        color: #f3c36b;
    }

    .header-sub {
        font-size: 11px;
        color: #a8987f;
    }

    .section-title {
        font-size: 11px;
        color: #a8987f;
        height: 18px;
    }

    .levels {
        width: 96px;
        col-between: 4px;
    }

    level-meter {
        width: 14px;
        height: 1s;
    }

    clip-led {
        width: 14px;
        height: 14px;
    }

    .controls {
        row-between: 6px;
    }

    .param-row {
        height: 28px;
        col-between: 8px;
    }

    .slider-label {
        width: 110px;
        font-size: 12px;
        child-top: 1s;
        child-bottom: 1s;
    }

    .slider {
        width: 1s;
    }

    .toggle {
        height: 24px;
        width: 1s;
    }

    .toggle-row {
        height: 28px;
        col-between: 6px;
    }

    .small-button {
        height: 24px;
        width: 120px;
        child-space: 1s;
        border: 1px solid #483c30;
        border-radius: 4px;
        font-size: 11px;
    }

    .stats {
        height: 28px;
        col-between: 16px;
        font-size: 12px;
        child-top: 1s;
        child-bottom: 1s;
    }
"#;

pub fn build_ui(
    cx: &mut Context,
    params: Arc<PhonoParams>,
    meters: Arc<Meters>,
    diag_reader: Arc<Mutex<Option<DiagReader>>>,
    gui_context: Arc<dyn GuiContext>,
) {
    if let Err(e) = cx.add_stylesheet(STYLE) {
        nih_log!("stylesheet failed to load: {:?}", e);
    }

    let diag_timer = cx.add_timer(DIAG_DRAIN, None, move |_, action| {
        if let TimerAction::Tick(_) = action {
            if let Ok(mut slot) = diag_reader.try_lock() {
                if let Some(reader) = slot.as_mut() {
                    reader.drain_to_log();
                }
            }
        }
    });
    cx.start_timer(diag_timer);

    PhonoData::new(params.clone(), meters.clone()).build(cx);

    let stats_timer = cx.add_timer(STATS_REFRESH, None, |cx, action| {
        if let TimerAction::Tick(_) = action {
            cx.emit(StatsEvent::Refresh);
        }
    });
    cx.start_timer(stats_timer);

    VStack::new(cx, move |cx| {
        build_header(cx).class("header");

        HStack::new(cx, move |cx| {
            build_levels(cx, meters.clone());
            build_controls(cx, params.clone(), gui_context.clone());
        })
        .col_between(Pixels(16.0));

        build_stats(cx).class("stats");
    })
    .class("app-root");
}

pub fn build_header(cx: &mut Context) -> Handle<'_, HStack> {
    HStack::new(cx, |cx| {
        VStack::new(cx, |cx| {
            Label::new(cx, "PHONOSTAGE").class("header-title");
            Label::new(cx, "RIAA playback and vinyl restoration").class("header-sub");
        });
    })
}

pub fn build_levels(cx: &mut Context, meters: Arc<Meters>) -> Handle<'_, VStack> {
    VStack::new(cx, move |cx| {
        Label::new(cx, "IN / OUT").class("section-title");
        HStack::new(cx, move |cx| {
            LevelMeter::new(cx, meters.clone(), MeterType::InputL);
            LevelMeter::new(cx, meters.clone(), MeterType::InputR);
            Element::new(cx).width(Pixels(8.0));
            LevelMeter::new(cx, meters.clone(), MeterType::OutputL);
            LevelMeter::new(cx, meters.clone(), MeterType::OutputR);
        })
        .class("levels");
        HStack::new(cx, move |cx| {
            ClipLed::new(cx, meters.clone());
            Label::new(cx, "CLIP").class("section-title");
        })
        .height(Pixels(20.0))
        .col_between(Pixels(6.0));
    })
    .width(Pixels(96.0))
}

pub fn build_controls(
    cx: &mut Context,
    params: Arc<PhonoParams>,
    gui: Arc<dyn GuiContext>,
) -> Handle<'_, VStack> {
    VStack::new(cx, move |cx| {
        Label::new(cx, "EQ").class("section-title");
        HStack::new(cx, |cx| {
            create_toggle(cx, "RIAA", |p| &p.riaa);
        })
        .class("toggle-row");
        create_slider(cx, "Subsonic", |p| &p.subsonic);
        create_slider(cx, "Gain", |p| &p.gain);

        Label::new(cx, "DECLICK").class("section-title");
        HStack::new(cx, |cx| {
            create_toggle(cx, "Declick", |p| &p.declick);
        })
        .class("toggle-row");
        create_slider(cx, "Threshold", |p| &p.spike_threshold);
        create_slider(cx, "Width", |p| &p.spike_width);

        Label::new(cx, "HUM").class("section-title");
        HStack::new(cx, |cx| {
            create_toggle(cx, "Notch", |p| &p.notch);
        })
        .class("toggle-row");
        create_slider(cx, "Frequency", |p| &p.notch_freq);
        create_slider(cx, "Q", |p| &p.notch_q);

        create_momentary_button(cx, "Store Defaults", params.clone(), gui.clone(), |p| &p.store);
    })
    .class("controls")
}

pub fn build_stats(cx: &mut Context) -> Handle<'_, HStack> {
    HStack::new(cx, |cx| {
        Label::new(cx, PhonoData::clicks_text);
        Label::new(cx, PhonoData::spike_text);
        Label::new(cx, PhonoData::clipped_text);
    })
}
