use std::time::Duration;

use crossbeam_channel::Receiver;
use eframe::egui;
use egui::{pos2, vec2, Align2, Color32, FontId, Rect, Sense, TextureHandle, TextureOptions};
use log::{debug, error};

use spectrum_waterfall::palette::SCALE_BAND_STEP;
use spectrum_waterfall::{scale_bands, SweepScan, Waterfall};

const LEGEND_WIDTH: f32 = 16.0;
const LEGEND_MARGIN: f32 = 48.0; // room for the dB labels
const REPAINT_INTERVAL: Duration = Duration::from_millis(16); // ~60 Hz

/// Horizontal placement of the waterfall inside the panel, in points.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawingOffsets {
    pub x_offset: f32,
    pub width: Option<f32>,
}

/// Shows the waterfall image, its status line and the palette legend.
pub struct WaterfallApp {
    waterfall: Waterfall,
    scans: Receiver<SweepScan>,
    offsets: DrawingOffsets,
    texture: Option<TextureHandle>,
    dirty: bool,
    floor_db: f32,
    window_db: f32,
}

impl WaterfallApp {
    pub fn new(waterfall: Waterfall, scans: Receiver<SweepScan>, offsets: DrawingOffsets) -> Self {
        let window = waterfall.palette_window();
        Self {
            waterfall,
            scans,
            offsets,
            texture: None,
            dirty: true,
            floor_db: window.floor_db,
            window_db: window.window_db,
        }
    }

    fn drain_scans(&mut self) {
        for scan in self.scans.try_iter() {
            self.waterfall.ingest(&scan);
            self.dirty = true;
        }
    }

    /// Keeps the history as tall as the panel is in physical pixels.
    fn sync_history(&mut self, chart_height_px: usize) {
        if chart_height_px == 0 || chart_height_px == self.waterfall.history_size() {
            return;
        }
        match self.waterfall.resize(chart_height_px) {
            Ok(()) => {
                debug!(
                    "History follows panel height: {}x{} px",
                    self.waterfall.width(),
                    chart_height_px
                );
                self.dirty = true;
            }
            Err(e) => error!("Failed to resize waterfall history: {:?}", e),
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) -> egui::TextureId {
        let id = match self.texture.as_mut() {
            Some(texture) => {
                if self.dirty {
                    texture.set(self.waterfall.current_image().clone(), TextureOptions::LINEAR);
                }
                texture.id()
            }
            None => {
                let texture = ctx.load_texture(
                    "waterfall",
                    self.waterfall.current_image().clone(),
                    TextureOptions::LINEAR,
                );
                let id = texture.id();
                self.texture = Some(texture);
                id
            }
        };
        self.dirty = false;
        id
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Palette floor");
            let floor = ui.add(
                egui::DragValue::new(&mut self.floor_db)
                    .speed(1.0)
                    .suffix(" dB")
                    .clamp_range(-200.0..=50.0),
            );
            ui.label("Window");
            let window = ui.add(
                egui::DragValue::new(&mut self.window_db)
                    .speed(1.0)
                    .suffix(" dB")
                    .clamp_range(1.0..=200.0),
            );
            if floor.changed() || window.changed() {
                self.waterfall.set_palette_window(self.floor_db, self.window_db);
            }
        });
    }

    fn paint_legend(&self, painter: &egui::Painter, rect: Rect) {
        let palette = self.waterfall.palette();
        let height = rect.height().max(0.0) as usize;
        for band in scale_bands(height, SCALE_BAND_STEP) {
            let band_rect = Rect::from_min_size(
                pos2(rect.left(), rect.top() + band.offset as f32),
                vec2(rect.width(), band.height as f32),
            );
            painter.rect_filled(band_rect, 0.0, palette.color_for_normalized(band.normalized));
        }

        let window = self.waterfall.palette_window();
        let font = FontId::monospace(11.0);
        painter.text(
            rect.left_top() + vec2(-4.0, 0.0),
            Align2::RIGHT_TOP,
            format!("{:.0}", window.max_db()),
            font.clone(),
            Color32::WHITE,
        );
        painter.text(
            rect.left_bottom() + vec2(-4.0, 0.0),
            Align2::RIGHT_BOTTOM,
            format!("{:.0}", window.floor_db),
            font,
            Color32::WHITE,
        );
    }
}

impl eframe::App for WaterfallApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_scans();
        ctx.request_repaint_after(REPAINT_INTERVAL);

        egui::TopBottomPanel::top("palette_controls").show(ctx, |ui| self.controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let (panel, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
                let legend = Rect::from_min_max(
                    pos2(panel.right() - LEGEND_WIDTH, panel.top()),
                    panel.right_bottom(),
                );
                let chart_left = panel.left() + self.offsets.x_offset;
                let chart_right = panel.right() - LEGEND_WIDTH - LEGEND_MARGIN;
                let chart_width = self
                    .offsets
                    .width
                    .unwrap_or(chart_right - chart_left)
                    .min(chart_right - chart_left)
                    .max(1.0);
                let chart = Rect::from_min_size(
                    pos2(chart_left, panel.top()),
                    vec2(chart_width, panel.height()),
                );

                let height_px = (chart.height() * ctx.pixels_per_point()).round().max(0.0) as usize;
                self.sync_history(height_px);

                let texture_id = self.upload_texture(ctx);
                let painter = ui.painter_at(panel);
                let uv = Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0));
                painter.image(texture_id, chart, uv, Color32::WHITE);
                painter.text(
                    chart.right_bottom() + vec2(-8.0, -8.0),
                    Align2::RIGHT_BOTTOM,
                    self.waterfall.status_text(),
                    FontId::monospace(12.0),
                    Color32::WHITE,
                );
                self.paint_legend(&painter, legend);
            });
    }
}
