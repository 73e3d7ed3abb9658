//! Scrolling waterfall rendering of repeated frequency/power scans.
//!
//! Every scan is reduced to one row of pixels (max-hold per column, gaps
//! filled from the left), pushed on top of the history, and published
//! through a double buffer so a display never sees a half-painted frame.

pub mod config;
pub mod history;
pub mod palette;
pub mod raster;
pub mod rate;
pub mod render_info;
pub mod scan;
pub mod sweep_csv;
pub mod synth;
pub mod waterfall;

pub use config::WaterfallConfig;
pub use palette::{draw_scale, scale_bands, ColorPalette, GradientPalette, PaletteKind, ScaleArea};
pub use raster::PaletteWindow;
pub use rate::{Ema, RateEstimator};
pub use scan::{SpectrumScan, SweepScan};
pub use waterfall::Waterfall;
