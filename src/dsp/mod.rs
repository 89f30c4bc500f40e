pub mod biquad;
pub mod block_declick;
pub mod click_detector;
pub mod declick;
pub mod lpc;
pub mod notch;
pub mod riaa;
pub mod utils;

pub use biquad::{BiquadCoeffs, BiquadState};
pub use block_declick::BlockDeclicker;
pub use click_detector::{ClickDetector, ClickDetectorConfig, ClickEvent};
pub use declick::{declick_process, DeclickConfig, DeclickStats, DeclickTotals, Declicker};
pub use lpc::{LpcPredictor, LPC_MAX_ORDER};
pub use notch::HumNotch;
pub use riaa::{RiaaChannel, SubsonicMode};
