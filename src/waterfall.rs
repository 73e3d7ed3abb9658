use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use anyhow::Result;
use egui::{Color32, ColorImage};
use log::{debug, info, trace};

use crate::config::WaterfallConfig;
use crate::history::{blank_image, resize_pair, shift_down_into};
use crate::palette::ColorPalette;
use crate::raster::{rasterize, resolve_colors, PaletteWindow};
use crate::rate::RateEstimator;
use crate::render_info::RenderInfoTracker;
use crate::scan::SpectrumScan;

/// State touched only by `ingest` and `resize`, guarded by one lock.
struct IngestState {
    window: PaletteWindow,
    columns: Vec<Option<f32>>, // max-hold accumulator, one slot per column
    colors: Vec<Color32>,
    info: RenderInfoTracker,
}

/// Scrolling, double-buffered waterfall image.
///
/// Every scan becomes row 0 of the work buffer, older rows move down by one
/// and the buffers swap. `ingest`, `resize` and `set_palette_window` are
/// serialised through a single mutex; `current_image` only reads the active
/// index atomically and locks the one buffer it returns.
pub struct Waterfall {
    state: Mutex<IngestState>,
    images: [RwLock<ColorImage>; 2],
    active: AtomicUsize,
    width: usize,
    palette: Box<dyn ColorPalette + Send + Sync>,
}

impl Waterfall {
    pub fn new(config: &WaterfallConfig) -> Result<Self> {
        Self::with_parts(
            config,
            Box::new(config.palette.build()),
            RenderInfoTracker::default(),
        )
    }

    pub fn with_palette(config: &WaterfallConfig, palette: Box<dyn ColorPalette + Send + Sync>) -> Result<Self> {
        Self::with_parts(config, palette, RenderInfoTracker::default())
    }

    pub fn with_estimator(config: &WaterfallConfig, estimator: Box<dyn RateEstimator + Send>) -> Result<Self> {
        Self::with_parts(
            config,
            Box::new(config.palette.build()),
            RenderInfoTracker::new(estimator),
        )
    }

    fn with_parts(
        config: &WaterfallConfig,
        palette: Box<dyn ColorPalette + Send + Sync>,
        info: RenderInfoTracker,
    ) -> Result<Self> {
        let width = config.max_width.max(1);
        let height = config.history_height;
        let columns = config.effective_columns();

        let images = [
            RwLock::new(blank_image(width, height)?),
            RwLock::new(blank_image(width, height)?),
        ];
        info!(
            "Waterfall created: {}x{} pixels, {} columns, palette {} dB + {} dB",
            width, height, columns, config.palette_window.floor_db, config.palette_window.window_db
        );

        Ok(Self {
            state: Mutex::new(IngestState {
                window: config.palette_window,
                columns: vec![None; columns],
                colors: Vec::with_capacity(columns),
                info,
            }),
            images,
            active: AtomicUsize::new(0),
            width,
            palette,
        })
    }

    /// Adds one scan as the newest row and makes it displayable.
    pub fn ingest<S>(&self, scan: &S)
    where
        S: SpectrumScan + ?Sized,
    {
        self.ingest_at(scan, Instant::now());
    }

    /// Same as [`Waterfall::ingest`] with an explicit arrival time, for
    /// replaying recorded feeds.
    pub fn ingest_at<S>(&self, scan: &S, now: Instant)
    where
        S: SpectrumScan + ?Sized,
    {
        let mut state = self.lock_state();
        let state = &mut *state;

        let prev_index = self.active.load(Ordering::Acquire);
        let work_index = 1 - prev_index;
        {
            let prev = self.images[prev_index].read().unwrap_or_else(PoisonError::into_inner);
            let mut work = self.images[work_index].write().unwrap_or_else(PoisonError::into_inner);
            shift_down_into(&prev, &mut work);
            drop(prev);

            rasterize(scan, state.window, &mut state.columns);
            resolve_colors(&state.columns, self.palette.as_ref(), &mut state.colors);
            paint_top_row(&mut work, &state.colors);
        }
        self.active.store(work_index, Ordering::Release);

        state.info.record_frame(scan.sample_count(), now);
        trace!("Ingested scan with {} samples into buffer {}", scan.sample_count(), work_index);
    }

    /// Changes the history length to `height` rows, keeping painted content
    /// anchored at the top-left.
    pub fn resize(&self, height: usize) -> Result<()> {
        let _state = self.lock_state();

        let current = self.history_size();
        if current == height {
            return Ok(());
        }

        let resized = {
            let first = self.images[0].read().unwrap_or_else(PoisonError::into_inner);
            let second = self.images[1].read().unwrap_or_else(PoisonError::into_inner);
            resize_pair([&*first, &*second], height)?
        };
        for (slot, image) in self.images.iter().zip(resized) {
            *slot.write().unwrap_or_else(PoisonError::into_inner) = image;
        }
        debug!("Waterfall history resized from {} to {} rows", current, height);
        Ok(())
    }

    /// The most recently completed frame. Callers only read it.
    pub fn current_image(&self) -> impl Deref<Target = ColorImage> + '_ {
        let index = self.active.load(Ordering::Acquire);
        self.images[index].read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_palette_window(&self, floor_db: f32, window_db: f32) {
        self.lock_state().window = PaletteWindow::new(floor_db, window_db);
        debug!("Palette window set to {} dB + {} dB", floor_db, window_db);
    }

    pub fn palette_window(&self) -> PaletteWindow {
        self.lock_state().window
    }

    pub fn status_text(&self) -> String {
        self.lock_state().info.text().to_string()
    }

    pub fn history_size(&self) -> usize {
        self.current_image().size[1]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn columns(&self) -> usize {
        self.lock_state().columns.len()
    }

    pub fn palette(&self) -> &dyn ColorPalette {
        self.palette.as_ref()
    }

    fn lock_state(&self) -> MutexGuard<'_, IngestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Paints row 0, stretching each column over its share of the image width.
fn paint_top_row(image: &mut ColorImage, colors: &[Color32]) {
    let [width, height] = image.size;
    if height == 0 || colors.is_empty() {
        return;
    }
    let columns = colors.len();
    let row = &mut image.pixels[..width];
    for (column, &color) in colors.iter().enumerate() {
        let x_start = (column * width / columns).min(width - 1);
        let x_end = ((column + 1) * width / columns).clamp(x_start + 1, width);
        row[x_start..x_end].fill(color);
    }
}
