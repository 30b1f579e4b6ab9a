//! Letterboxes a source image onto a fixed-ratio canvas.
//!
//! Pixels that still hold [`PADDING_SENTINEL`] after composition mark the
//! area the fill service should synthesize; every other pixel is original
//! content that must be preserved.

use crate::aspect_ratio::AspectRatio;
use crate::source_image::SourceImage;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// Opaque black.
pub const PADDING_SENTINEL: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// Where the source lands on the canvas, in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}


#[derive(Debug, Clone, PartialEq)]
pub struct CompositedCanvas {
    pixels: RgbaImage,
    placement: Placement,
}

impl CompositedCanvas {
    pub fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions {
            width: self.pixels.width(),
            height: self.pixels.height(),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }
}

/// Canvas size for `ratio` with the longer side pinned to `max_dim`.
///
/// Halves round away from zero. Neither side drops below one pixel.
pub fn compute_canvas_size(ratio: &AspectRatio, max_dim: u32) -> CanvasDimensions {
    let max = max_dim.max(1) as f64;
    let mut width = max;
    let mut height = max / ratio.value();

    if height > max {
        height = max;
        width = max * ratio.value();
    }

    CanvasDimensions {
        width: (width.round() as u32).max(1),
        height: (height.round() as u32).max(1),
    }
}

/// Fractional letterbox rectangle of a `source_width` x `source_height` image
/// fitted inside `canvas`.
pub fn letterbox(source_width: u32, source_height: u32, canvas: CanvasDimensions) -> (f64, f64, f64, f64) {
    let img_ratio = source_width as f64 / source_height as f64;
    let container_ratio = canvas.ratio();
    let container_width = canvas.width as f64;
    let container_height = canvas.height as f64;

    if img_ratio > container_ratio {
        let draw_height = container_width / img_ratio;
        (0.0, (container_height - draw_height) / 2.0, container_width, draw_height)
    } else {
        let draw_width = container_height * img_ratio;
        ((container_width - draw_width) / 2.0, 0.0, draw_width, container_height)
    }
}

/// Draws `source` centered and scaled to fit on a sentinel-filled canvas.
///
/// Returns `None` when the source has no pixels.
pub fn compose(source: &SourceImage, canvas: CanvasDimensions) -> Option<CompositedCanvas> {
    if source.width() == 0 || source.height() == 0 || canvas.width == 0 || canvas.height == 0 {
        return None;
    }

    let (x, y, w, h) = letterbox(source.width(), source.height(), canvas);
    let placement = Placement {
        x: x.round() as u32,
        y: y.round() as u32,
        width: (w.round() as u32).clamp(1, canvas.width),
        height: (h.round() as u32).clamp(1, canvas.height),
    };

    let mut pixels = RgbaImage::from_pixel(canvas.width, canvas.height, PADDING_SENTINEL);
    let scaled = if (placement.width, placement.height) == (source.width(), source.height()) {
        source.pixels().clone()
    } else {
        imageops::resize(source.pixels(), placement.width, placement.height, FilterType::Triangle)
    };
    imageops::overlay(&mut pixels, &scaled, placement.x as i64, placement.y as i64);

    log::debug!(
        "🧩 Composed {}x{} source onto {}x{} canvas at ({}, {}) size {}x{}",
        source.width(),
        source.height(),
        canvas.width,
        canvas.height,
        placement.x,
        placement.y,
        placement.width,
        placement.height
    );

    Some(CompositedCanvas { pixels, placement })
}
