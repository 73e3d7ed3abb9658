use egui::{Color32, ColorImage};
use serde::{Deserialize, Serialize};

/// Number of entries in a palette lookup table.
pub const PALETTE_LUT_SIZE: usize = 256; // one entry per 8-bit level

/// Height in pixels of one band of the scale legend.
pub const SCALE_BAND_STEP: usize = 3;

/// Maps normalized power to display colors.
pub trait ColorPalette {
    /// Color for a power value already normalized to `[0, 1]`.
    fn color_for_normalized(&self, value: f32) -> Color32;

    /// Color at a raw palette index. Index 0 is the "no signal yet" color.
    fn color_at_index(&self, index: usize) -> Color32;
}

/// Built-in palettes selectable from the configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaletteKind {
    #[default]
    HotIronBlue,
    Grayscale,
}

impl PaletteKind {
    pub fn build(self) -> GradientPalette {
        match self {
            PaletteKind::HotIronBlue => GradientPalette::hot_iron_blue(),
            PaletteKind::Grayscale => GradientPalette::grayscale(),
        }
    }
}

/// Palette backed by a lookup table interpolated from color stops.
#[derive(Debug, Clone)]
pub struct GradientPalette {
    lut: Vec<Color32>,
}

impl GradientPalette {
    /// Builds a lookup table from `(position, color)` stops.
    ///
    /// Positions are expected in `[0, 1]` and ascending. An empty stop list
    /// yields an all-black palette.
    pub fn from_stops(stops: &[(f32, Color32)]) -> Self {
        let lut = (0..PALETTE_LUT_SIZE)
            .map(|i| {
                let t = i as f32 / (PALETTE_LUT_SIZE - 1) as f32;
                sample_stops(stops, t)
            })
            .collect();
        Self { lut }
    }

    pub fn hot_iron_blue() -> Self {
        Self::from_stops(&[
            (0.00, Color32::from_rgb(0, 0, 32)),
            (0.20, Color32::from_rgb(0, 0, 160)),
            (0.40, Color32::from_rgb(128, 0, 160)),
            (0.60, Color32::from_rgb(224, 32, 32)),
            (0.80, Color32::from_rgb(255, 160, 0)),
            (0.95, Color32::from_rgb(255, 255, 64)),
            (1.00, Color32::from_rgb(255, 255, 255)),
        ])
    }

    pub fn grayscale() -> Self {
        Self::from_stops(&[(0.0, Color32::BLACK), (1.0, Color32::WHITE)])
    }

    pub fn len(&self) -> usize {
        self.lut.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lut.is_empty()
    }
}

impl ColorPalette for GradientPalette {
    fn color_for_normalized(&self, value: f32) -> Color32 {
        // NaN falls through to index 0
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let index = (value * (self.lut.len() - 1) as f32).round() as usize;
        self.color_at_index(index)
    }

    fn color_at_index(&self, index: usize) -> Color32 {
        self.lut[index.min(self.lut.len() - 1)]
    }
}

fn sample_stops(stops: &[(f32, Color32)], t: f32) -> Color32 {
    let (first, last) = match (stops.first(), stops.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Color32::BLACK,
    };
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }
    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t >= p0 && t <= p1 {
            let span = p1 - p0;
            let f = if span > 0.0 { (t - p0) / span } else { 0.0 };
            return lerp_color(c0, c1, f);
        }
    }
    last.1
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgb(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()))
}

/// Target rectangle of the scale legend, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleArea {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// One horizontal band of the legend, relative to the top of the area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleBand {
    pub offset: usize,
    pub height: usize,
    pub normalized: f32,
}

/// Band layout of a legend `height` pixels tall: top band is 100%, bottom 0%.
pub fn scale_bands(height: usize, step: usize) -> impl Iterator<Item = ScaleBand> {
    let step = step.max(1);
    (0..height).step_by(step).map(move |offset| ScaleBand {
        offset,
        height: step.min(height - offset),
        normalized: 1.0 - offset as f32 / height as f32,
    })
}

/// Paints the palette as a vertical gradient into `area`, clipped to the image.
pub fn draw_scale(palette: &dyn ColorPalette, image: &mut ColorImage, area: ScaleArea) {
    let [image_width, image_height] = image.size;
    let x_end = area.x.saturating_add(area.width).min(image_width);
    if area.x >= x_end {
        return;
    }

    for band in scale_bands(area.height, SCALE_BAND_STEP) {
        let color = palette.color_for_normalized(band.normalized);
        let y_start = area.y + band.offset;
        let y_end = (y_start + band.height).min(image_height);
        for y in y_start..y_end {
            let row = y * image_width;
            image.pixels[row + area.x..row + x_end].fill(color);
        }
    }
}
