//! Custom drawn meter widgets. Values come from `crate::meters`.

use crate::meters::Meters;
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::vizia::vg;
use std::sync::Arc;

#[derive(Clone, Copy)]
pub enum MeterType {
    InputL,
    InputR,
    OutputL,
    OutputR,
}

pub struct LevelMeter {
    meters: Arc<Meters>,
    meter_type: MeterType,
}

impl LevelMeter {
    pub fn new(cx: &mut Context, meters: Arc<Meters>, meter_type: MeterType) -> Handle<'_, Self> {
        Self { meters, meter_type }.build(cx, |_| {})
    }
}

impl View for LevelMeter {
    fn element(&self) -> Option<&'static str> {
        Some("level-meter")
    }

    fn draw(&self, cx: &mut DrawContext, canvas: &mut Canvas) {
        let b = cx.bounds();

        let level = match self.meter_type {
            MeterType::InputL => self.meters.get_input_peak_l(),
            MeterType::InputR => self.meters.get_input_peak_r(),
            MeterType::OutputL => self.meters.get_output_peak_l(),
            MeterType::OutputR => self.meters.get_output_peak_r(),
        };
        let norm = ((level + 60.0) / 60.0).clamp(0.0, 1.0);

        let mut bg = vg::Path::new();
        bg.rect(b.x, b.y, b.w, b.h);
        canvas.fill_path(&bg, &vg::Paint::color(vg::Color::rgb(24, 20, 16)));
        canvas.stroke_path(
            &bg,
            &vg::Paint::color(vg::Color::rgb(72, 60, 48)).with_line_width(1.0),
        );

        if norm > 0.001 {
            let fh = b.h * norm;
            let fy = b.y + (b.h - fh);

            let mut f = vg::Path::new();
            f.rect(b.x + 1.0, fy, b.w - 2.0, fh);
            let paint = vg::Paint::linear_gradient(
                b.x,
                b.y + b.h,
                b.x,
                b.y,
                vg::Color::rgb(217, 160, 62),
                vg::Color::rgb(239, 68, 68),
            );
            canvas.fill_path(&f, &paint);
        }

        // 6 dB ticks
        let mut l = vg::Path::new();
        let step = b.h / 10.0;
        for i in 1..10 {
            let y = b.y + i as f32 * step;
            l.move_to(b.x, y);
            l.line_to(b.x + b.w, y);
        }
        canvas.stroke_path(
            &l,
            &vg::Paint::color(vg::Color::rgba(0, 0, 0, 100)).with_line_width(1.0),
        );
    }
}

/// Lights once any output sample has exceeded full scale.
pub struct ClipLed {
    meters: Arc<Meters>,
}

impl ClipLed {
    pub fn new(cx: &mut Context, meters: Arc<Meters>) -> Handle<'_, Self> {
        Self { meters }.build(cx, |_| {})
    }
}

impl View for ClipLed {
    fn element(&self) -> Option<&'static str> {
        Some("clip-led")
    }

    fn draw(&self, cx: &mut DrawContext, canvas: &mut Canvas) {
        let b = cx.bounds();
        let clipped = self.meters.get_stats().clipped_samples > 0;

        let color = if clipped {
            vg::Color::rgb(239, 68, 68)
        } else {
            vg::Color::rgb(60, 40, 36)
        };

        let mut dot = vg::Path::new();
        dot.circle(b.x + b.w / 2.0, b.y + b.h / 2.0, b.w.min(b.h) / 2.0 - 1.0);
        canvas.fill_path(&dot, &vg::Paint::color(color));
    }
}
