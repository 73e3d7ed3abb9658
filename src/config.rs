use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::palette::PaletteKind;
use crate::raster::PaletteWindow;

pub const DEFAULT_MAX_WIDTH: usize = 1920; // widest display we expect to fill
pub const DEFAULT_HISTORY_HEIGHT: usize = 200;

/// Everything the waterfall needs to know up front, stored as YAML.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WaterfallConfig {
    /// Fixed pixel width of both buffers.
    pub max_width: usize,
    /// Initial history length in rows; the host changes it through `resize`.
    pub history_height: usize,
    /// Number of frequency columns per row. `None` uses one per pixel.
    pub columns: Option<usize>,
    pub palette_window: PaletteWindow,
    pub palette: PaletteKind,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            history_height: DEFAULT_HISTORY_HEIGHT,
            columns: None,
            palette_window: PaletteWindow::default(),
            palette: PaletteKind::default(),
        }
    }
}

impl WaterfallConfig {
    /// Loads the configuration at `path`, writing the defaults there first
    /// if the file does not exist yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config found at {}. Creating it with defaults.", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        info!("Loading waterfall config from {}", path.display());
        let yaml_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&yaml_str)
            .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml_str = serde_yaml::to_string(self)?;
        fs::write(path, yaml_str).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Waterfall config saved to {}", path.display());
        Ok(())
    }

    /// Columns actually rasterized: never zero and never wider than the buffer.
    pub fn effective_columns(&self) -> usize {
        let width = self.max_width.max(1);
        match self.columns {
            Some(columns) if columns > width => {
                warn!("{} columns requested but buffer is {} wide; clamping", columns, width);
                width
            }
            Some(columns) => columns.max(1),
            None => width,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.max_width == 0 {
            return Err(anyhow!("max_width must be at least 1"));
        }
        if !self.palette_window.floor_db.is_finite() || !self.palette_window.window_db.is_finite() {
            return Err(anyhow!("palette_window values must be finite"));
        }
        Ok(())
    }
}
