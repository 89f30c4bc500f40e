//! PhonoStage editor
//!
//! - `state`: data model and the stats refresh event
//! - `components`: parameter row builders
//! - `layout`: top-level layout and stylesheet
//! - `meters`: custom drawn meter widgets

pub mod components;
pub mod layout;
pub mod meters;
pub mod state;

pub use layout::build_ui;
