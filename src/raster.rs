use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::palette::ColorPalette;
use crate::scan::SpectrumScan;

pub const DEFAULT_PALETTE_FLOOR_DB: f32 = -90.0;
pub const DEFAULT_PALETTE_WINDOW_DB: f32 = 65.0; // top of the scale at -25 dB

/// Power range `[floor_db, floor_db + window_db]` mapped linearly onto `[0, 1]`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PaletteWindow {
    pub floor_db: f32,
    pub window_db: f32,
}

impl Default for PaletteWindow {
    fn default() -> Self {
        Self {
            floor_db: DEFAULT_PALETTE_FLOOR_DB,
            window_db: DEFAULT_PALETTE_WINDOW_DB,
        }
    }
}

impl PaletteWindow {
    pub fn new(floor_db: f32, window_db: f32) -> Self {
        Self { floor_db, window_db }
    }

    pub fn max_db(&self) -> f32 {
        self.floor_db + self.window_db
    }

    /// Normalizes a power reading into `[0, 1]`.
    ///
    /// Readings at or below the floor give exactly 0, readings at or above
    /// the top of the window give exactly 1. NaN is treated as no power.
    pub fn normalize(&self, power_db: f32) -> f32 {
        if power_db.is_nan() || power_db <= self.floor_db {
            0.0
        } else if power_db >= self.max_db() {
            1.0
        } else {
            (power_db - self.floor_db) / self.window_db
        }
    }
}

/// Pixel column of `freq_hz` in a row `columns` wide, clamped to the row.
///
/// A zero, negative or non-finite frequency range puts every sample in column 0.
pub fn pixel_column(freq_hz: f64, start_hz: f64, freq_range_hz: f64, columns: usize) -> usize {
    // Written positively so a NaN range fails the test
    if columns == 0 || !(freq_range_hz.is_finite() && freq_range_hz > 0.0) {
        return 0;
    }
    let position = (freq_hz - start_hz) / freq_range_hz;
    let column = (columns as f64 * position).round();
    // NaN saturates to 0 on the cast
    column.clamp(0.0, (columns - 1) as f64) as usize
}

/// Max-hold pass: writes the peak normalized power of every column.
///
/// `row` is reset first; columns no sample maps into stay `None`.
pub fn rasterize<S>(scan: &S, window: PaletteWindow, row: &mut [Option<f32>])
where
    S: SpectrumScan + ?Sized,
{
    row.fill(None);
    if row.is_empty() {
        return;
    }

    let start_hz = scan.start_freq_hz();
    let freq_range_hz = scan.stop_freq_hz() - start_hz;
    for i in 0..scan.sample_count() {
        let column = pixel_column(scan.frequency_at(i), start_hz, freq_range_hz, row.len());
        let value = window.normalize(scan.power_at(i));
        let slot = &mut row[column];
        *slot = Some(match *slot {
            Some(held) => held.max(value),
            None => value,
        });
    }
}

/// Color pass: resolves every column to a color, filling gaps from the left.
///
/// A column without data repeats the last painted color to its left, or the
/// palette's index 0 color when nothing to its left has data.
pub fn resolve_colors(row: &[Option<f32>], palette: &dyn ColorPalette, out: &mut Vec<Color32>) {
    out.clear();
    out.reserve(row.len());
    let mut last_valid = palette.color_at_index(0);
    for value in row {
        if let Some(value) = *value {
            last_valid = palette.color_for_normalized(value);
        }
        out.push(last_valid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::GradientPalette;
    use crate::scan::SweepScan;

    fn window() -> PaletteWindow {
        PaletteWindow::new(-90.0, 60.0)
    }

    #[test]
    fn normalization_hits_exact_bounds() {
        let w = window();
        assert_eq!(w.normalize(-90.0), 0.0);
        assert_eq!(w.normalize(-30.0), 1.0);
        assert_eq!(w.normalize(-60.0), 0.5);
        assert_eq!(w.normalize(-200.0), w.normalize(-90.0));
        assert_eq!(w.normalize(40.0), w.normalize(-30.0));
        assert_eq!(w.normalize(f32::NAN), 0.0);
    }

    #[test]
    fn zero_width_window_never_divides() {
        let w = PaletteWindow::new(-50.0, 0.0);
        assert_eq!(w.normalize(-50.0), 0.0);
        assert_eq!(w.normalize(-49.0), 1.0);
        assert_eq!(w.normalize(-51.0), 0.0);
    }

    #[test]
    fn columns_are_always_in_bounds() {
        let width = 17;
        let freqs = [-1e9, 0.0, 1e6, 1.5e6, 2e6, 2.00001e6, 5e9, f64::NAN, f64::INFINITY];
        for &freq in &freqs {
            let column = pixel_column(freq, 1e6, 1e6, width);
            assert!(column < width, "{} mapped to {}", freq, column);
        }
    }

    #[test]
    fn degenerate_range_maps_to_first_column() {
        assert_eq!(pixel_column(5e6, 5e6, 0.0, 10), 0);
        assert_eq!(pixel_column(7e6, 5e6, -2e6, 10), 0);
        assert_eq!(pixel_column(7e6, 5e6, f64::NAN, 10), 0);
        assert_eq!(pixel_column(7e6, 5e6, f64::INFINITY, 10), 0);
        assert_eq!(pixel_column(7e6, 5e6, 1e6, 0), 0);
    }

    #[test]
    fn stop_frequency_clamps_to_last_column() {
        assert_eq!(pixel_column(2e6, 1e6, 1e6, 10), 9);
        assert_eq!(pixel_column(1e6, 1e6, 1e6, 10), 0);
    }

    #[test]
    fn max_hold_keeps_the_peak_not_the_latest() {
        let scan = SweepScan::new(
            1e6,
            2e6,
            1e3,
            vec![(1.5e6, -40.0), (1.5e6, -80.0), (1.5e6, -60.0)],
        );
        let mut row = vec![None; 10];
        rasterize(&scan, window(), &mut row);
        let expected = window().normalize(-40.0);
        assert_eq!(row[5], Some(expected));
        assert_eq!(row.iter().filter(|c| c.is_some()).count(), 1);
    }

    #[test]
    fn rasterize_resets_previous_contents() {
        let scan = SweepScan::new(1e6, 2e6, 1e3, vec![(1.1e6, -60.0)]);
        let mut row = vec![Some(1.0); 10];
        rasterize(&scan, window(), &mut row);
        assert_eq!(row[1], Some(0.5));
        assert!(row.iter().enumerate().all(|(i, c)| i == 1 || c.is_none()));
    }

    #[test]
    fn empty_scan_leaves_every_column_empty() {
        let scan = SweepScan::new(1e6, 2e6, 1e3, Vec::new());
        let mut row = vec![Some(0.3); 4];
        rasterize(&scan, window(), &mut row);
        assert!(row.iter().all(Option::is_none));
    }

    #[test]
    fn gaps_repeat_left_neighbor() {
        let palette = GradientPalette::grayscale();
        let row = [None, None, Some(1.0), None, None, Some(0.0), None];
        let mut colors = Vec::new();
        resolve_colors(&row, &palette, &mut colors);

        let default = palette.color_at_index(0);
        let white = palette.color_for_normalized(1.0);
        let black = palette.color_for_normalized(0.0);
        assert_eq!(colors, vec![default, default, white, white, white, black, black]);
    }

    #[test]
    fn single_sample_end_to_end() {
        let palette = GradientPalette::hot_iron_blue();
        let w = PaletteWindow::new(-90.0, 65.0);
        let scan = SweepScan::new(1e6, 2e6, 1e5, vec![(1.5e6, -90.0)]);
        let mut row = vec![None; 10];
        rasterize(&scan, w, &mut row);
        assert_eq!(row[5], Some(0.0));

        let mut colors = Vec::new();
        resolve_colors(&row, &palette, &mut colors);
        assert!(colors.iter().all(|&c| c == palette.color_at_index(0)));
    }
}
