use anyhow::{anyhow, Result};
use egui::{Color32, ColorImage};

/// Color of rows that have not been painted yet.
pub const BLANK: Color32 = Color32::BLACK; // opaque, alpha 255

/// Allocates a `width` x `height` image filled with [`BLANK`].
///
/// Allocation failure is reported instead of aborting, so a host asking for
/// an absurd history length gets an error back.
pub fn blank_image(width: usize, height: usize) -> Result<ColorImage> {
    let len = width
        .checked_mul(height)
        .ok_or_else(|| anyhow!("waterfall of {}x{} pixels overflows usize", width, height))?;
    let mut pixels = Vec::new();
    pixels
        .try_reserve_exact(len)
        .map_err(|e| anyhow!("failed to allocate {}x{} waterfall image: {}", width, height, e))?;
    pixels.resize(len, BLANK);
    Ok(ColorImage {
        size: [width, height],
        pixels,
    })
}

/// Copies `src` into a new image of `height` rows, anchored at the top-left.
///
/// Rows past the new height are dropped, added rows are blank.
pub fn resized_copy(src: &ColorImage, height: usize) -> Result<ColorImage> {
    let [width, src_height] = src.size;
    let mut dst = blank_image(width, height)?;
    let kept = width * src_height.min(height); // overlap, in pixels
    dst.pixels[..kept].copy_from_slice(&src.pixels[..kept]);
    Ok(dst)
}

/// Resizes both images of a pair, one per rayon task.
pub fn resize_pair(pair: [&ColorImage; 2], height: usize) -> Result<[ColorImage; 2]> {
    let (first, second) = rayon::join(
        || resized_copy(pair[0], height),
        || resized_copy(pair[1], height),
    );
    Ok([first?, second?])
}

/// Writes `src` into `dst` moved down by one row and blanks row 0.
///
/// Both images must have the same size; the bottom row of `src` falls off.
pub fn shift_down_into(src: &ColorImage, dst: &mut ColorImage) {
    debug_assert_eq!(src.size, dst.size);
    let [width, height] = dst.size;
    if height == 0 {
        return;
    }
    let moved = width * (height - 1); // everything but the last row
    dst.pixels[width..].copy_from_slice(&src.pixels[..moved]);
    dst.pixels[..width].fill(BLANK); // painted by the caller
}
