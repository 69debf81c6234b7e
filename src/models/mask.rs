// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Freehand mask painting.
//!
//! Strokes are rasterized into a working RGBA buffer while the mask editor is
//! open. The working buffer is copied into the persisted [`MaskBitmap`] only on
//! an explicit commit; closing the editor without saving reverts it.

use super::stroke::{Point, Stroke};
use image::{imageops, Rgba, RgbaImage};

pub const MIN_BRUSH_WIDTH: f64 = 2.0;
pub const MAX_BRUSH_WIDTH: f64 = 100.0;
pub const DEFAULT_BRUSH_WIDTH: f64 = 40.0;

/// Colour every stroke is painted with.
pub const STROKE_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Tint used when previewing the mask over the source image.
const PREVIEW_TINT: [u8; 3] = [255, 48, 96];
const PREVIEW_OPACITY: f32 = 0.5;

/// The saved mask, sized to the source image's natural dimensions.
#[derive(Debug, Clone)]
pub struct MaskBitmap {
    pixels: RgbaImage,
    has_mask: bool,
}

impl MaskBitmap {
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            has_mask: false,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// True iff at least one channel was non-zero at the last commit.
    pub fn has_mask(&self) -> bool {
        self.has_mask
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StrokeState {
    Idle,
    Drawing(Stroke),
}

#[derive(Debug)]
pub struct MaskEngine {
    working: RgbaImage,
    persisted: MaskBitmap,
    state: StrokeState,
    brush_width: f64,
}

impl Default for MaskEngine {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl MaskEngine {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            working: RgbaImage::new(width, height),
            persisted: MaskBitmap::blank(width, height),
            state: StrokeState::Idle,
            brush_width: DEFAULT_BRUSH_WIDTH,
        }
    }

    /// Discard both buffers and resize them for a newly loaded source image.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.working = RgbaImage::new(width, height);
        self.persisted = MaskBitmap::blank(width, height);
        self.state = StrokeState::Idle;
        log::debug!("Mask reset to {}x{}", width, height);
    }

    pub fn brush_width(&self) -> f64 {
        self.brush_width
    }

    /// Applies to subsequent segments only.
    pub fn set_brush_width(&mut self, width: f64) {
        self.brush_width = width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
    }

    #[cfg(test)]
    pub fn is_drawing(&self) -> bool {
        matches!(self.state, StrokeState::Drawing(_))
    }

    #[cfg(test)]
    pub fn working(&self) -> &RgbaImage {
        &self.working
    }

    pub fn persisted(&self) -> &MaskBitmap {
        &self.persisted
    }

    pub fn has_mask(&self) -> bool {
        self.persisted.has_mask()
    }

    /// Load the persisted mask into the working buffer for editing.
    pub fn open_editor(&mut self) {
        self.working = self.persisted.pixels.clone();
        self.state = StrokeState::Idle;
    }

    /// Throw away unsaved strokes.
    pub fn revert(&mut self) {
        self.open_editor();
        log::debug!("Mask edits reverted");
    }

    /// Start a stroke, painting a disc so a single tap leaves a dot.
    pub fn begin_stroke(&mut self, point: Point) {
        let radius = self.brush_width / 2.0;
        fill_disc(&mut self.working, point, radius, STROKE_COLOR);
        self.state = StrokeState::Drawing(Stroke::begin(point, self.brush_width));
        log::debug!("Stroke started at ({:.1}, {:.1})", point.x, point.y);
    }

    /// Extend the current stroke. Returns `false` when no stroke is active.
    pub fn continue_stroke(&mut self, point: Point) -> bool {
        let StrokeState::Drawing(stroke) = &mut self.state else {
            return false;
        };
        let Some(last) = stroke.last_point() else {
            return false;
        };
        stroke_segment(&mut self.working, last, point, self.brush_width, STROKE_COLOR);
        stroke.add_point(point);
        true
    }

    /// Finish the current stroke. Safe to call when idle.
    pub fn end_stroke(&mut self) {
        if let StrokeState::Drawing(stroke) = std::mem::replace(&mut self.state, StrokeState::Idle) {
            log::debug!(
                "Stroke finished with {} points at width {:.0}",
                stroke.point_count(),
                stroke.width
            );
        }
    }

    /// Erase the working raster. `has_mask` is untouched until the next commit.
    pub fn clear(&mut self) {
        self.working.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
        self.state = StrokeState::Idle;
    }

    /// Scan the working raster for any non-zero channel.
    pub fn compute_has_mask(&self) -> bool {
        self.working.as_raw().iter().any(|&channel| channel != 0)
    }

    /// Copy the working raster into the persisted mask and re-evaluate
    /// `has_mask`.
    pub fn commit(&mut self) -> bool {
        self.end_stroke();
        let (width, height) = self.persisted.dimensions();
        let pixels = if self.working.dimensions() == (width, height) {
            self.working.clone()
        } else {
            imageops::resize(&self.working, width, height, imageops::FilterType::Nearest)
        };
        self.persisted = MaskBitmap {
            pixels,
            has_mask: self.compute_has_mask(),
        };
        log::info!("Mask committed, has_mask = {}", self.persisted.has_mask);
        self.persisted.has_mask
    }

    /// Composite the working mask as a translucent tint over `source`.
    pub fn preview_over(&self, source: &RgbaImage) -> RgbaImage {
        let mut out = source.clone();
        if source.dimensions() != self.working.dimensions() {
            return out;
        }
        for (dst, mask) in out.pixels_mut().zip(self.working.pixels()) {
            let alpha = mask.0[3] as f32 / 255.0 * PREVIEW_OPACITY;
            if alpha <= 0.0 {
                continue;
            }
            for c in 0..3 {
                let base = dst.0[c] as f32;
                dst.0[c] = (base + (PREVIEW_TINT[c] as f32 - base) * alpha).round() as u8;
            }
            dst.0[3] = dst.0[3].max((alpha * 255.0) as u8);
        }
        out
    }
}

/// Fill every pixel whose centre lies within `radius` of `center`.
fn fill_disc(img: &mut RgbaImage, center: Point, radius: f64, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = clip_bounds(img, center, center, radius) else {
        return;
    };
    let r2 = radius * radius;
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f64 + 0.5 - center.x;
            let dy = y as f64 + 0.5 - center.y;
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Rasterize a thick segment with round caps. Consecutive segments share an
/// endpoint, so the caps also form round joins.
fn stroke_segment(img: &mut RgbaImage, a: Point, b: Point, width: f64, color: Rgba<u8>) {
    let radius = width / 2.0;
    let Some((x0, y0, x1, y1)) = clip_bounds(img, a, b, radius) else {
        return;
    };
    let r2 = radius * radius;
    let (vx, vy) = (b.x - a.x, b.y - a.y);
    let len2 = vx * vx + vy * vy;
    for y in y0..y1 {
        for x in x0..x1 {
            let px = x as f64 + 0.5;
            let py = y as f64 + 0.5;
            let t = if len2 > 0.0 {
                (((px - a.x) * vx + (py - a.y) * vy) / len2).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let dx = px - (a.x + t * vx);
            let dy = py - (a.y + t * vy);
            if dx * dx + dy * dy <= r2 {
                img.put_pixel(x, y, color);
            }
        }
    }
}

/// Pixel bounds covering both points grown by `radius`, clipped to the image.
fn clip_bounds(img: &RgbaImage, a: Point, b: Point, radius: f64) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = img.dimensions();
    let min_x = (a.x.min(b.x) - radius).floor().max(0.0);
    let min_y = (a.y.min(b.y) - radius).floor().max(0.0);
    let max_x = (a.x.max(b.x) + radius).ceil().min(w as f64);
    let max_y = (a.y.max(b.y) + radius).ceil().min(h as f64);
    if !(min_x < max_x && min_y < max_y) {
        return None;
    }
    Some((min_x as u32, min_y as u32, max_x as u32, max_y as u32))
}
