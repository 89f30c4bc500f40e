//! Parameter row builders.
//!
//! Every control binds through `PhonoData::params` so host automation and the
//! editor stay in sync. Styling lives in the stylesheet in `layout`.

use crate::ui::state::PhonoData;
use crate::PhonoParams;
use nih_plug::params::Param;
use nih_plug::prelude::{GuiContext, ParamSetter};
use nih_plug_vizia::vizia::prelude::*;
use nih_plug_vizia::widgets::*;
use std::sync::Arc;

pub fn create_slider<'a, P>(
    cx: &'a mut Context,
    label: &'static str,
    map: impl Fn(&Arc<PhonoParams>) -> &P + Copy + 'static,
) -> Handle<'a, HStack>
where
    P: Param + 'static,
{
    HStack::new(cx, move |cx| {
        Label::new(cx, label).class("slider-label");
        ParamSlider::new(cx, PhonoData::params, move |p| map(p)).class("slider");
    })
    .class("param-row")
}

pub fn create_toggle<'a, P>(
    cx: &'a mut Context,
    label: &'static str,
    map: impl Fn(&Arc<PhonoParams>) -> &P + Copy + 'static,
) -> Handle<'a, ParamButton>
where
    P: Param<Plain = bool> + 'static,
{
    ParamButton::new(cx, PhonoData::params, move |p| map(p))
        .with_label(label)
        .class("toggle")
}

/// Holds the parameter on while the mouse is down, so it never stays latched.
pub fn create_momentary_button<'a, P>(
    cx: &'a mut Context,
    label: &'static str,
    params: Arc<PhonoParams>,
    gui: Arc<dyn GuiContext>,
    param_getter: impl Fn(&PhonoParams) -> &P + Copy + Send + Sync + 'static,
) -> Handle<'a, HStack>
where
    P: Param<Plain = bool> + 'static,
{
    let params_down = params.clone();
    let gui_down = gui.clone();

    let set = move |params: &PhonoParams, gui: &dyn GuiContext, on: bool| {
        let s = ParamSetter::new(gui);
        let param = param_getter(params);
        s.begin_set_parameter(param);
        s.set_parameter(param, on);
        s.end_set_parameter(param);
    };

    HStack::new(cx, move |cx| {
        Label::new(cx, label).hoverable(false);
    })
    .class("small-button")
    .on_mouse_down(move |cx, btn| {
        if btn == MouseButton::Left {
            set(params_down.as_ref(), gui_down.as_ref(), true);
            cx.capture();
        }
    })
    .on_mouse_up(move |cx, btn| {
        if btn == MouseButton::Left {
            set(params.as_ref(), gui.as_ref(), false);
            cx.release();
        }
    })
}
