// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pan/zoom view state for the mask editor viewport.
//!
//! The controller owns the scale and offsets that map canvas pixels onto the
//! viewport. Every mutation queues a [`TransformUpdate`] that the rendering
//! layer drains to re-apply the transform and refresh the zoom indicator.

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;
pub const ZOOM_STEP: f64 = 0.1;

/// Fraction of the viewport the image occupies after a fit.
const FIT_MARGIN: f64 = 0.95;

/// Scale and offsets of the canvas inside the viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Notification emitted after any change to the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformUpdate {
    pub state: ViewState,
    /// Zoom indicator value, rounded to the nearest whole percent.
    pub zoom_percent: u32,
}

#[derive(Debug, Default)]
pub struct ViewController {
    state: ViewState,
    viewport_size: (f64, f64),
    image_size: Option<(u32, u32)>,
    pending: Option<TransformUpdate>,
}

impl ViewController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn zoom_percent(&self) -> u32 {
        (self.state.scale * 100.0).round() as u32
    }

    pub fn viewport_size(&self) -> (f64, f64) {
        self.viewport_size
    }

    /// Record the size of the visible viewport. Does not move the view.
    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport_size = (width.max(0.0), height.max(0.0));
    }

    /// Record the natural size of the image shown in the viewport.
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.image_size = Some((width, height));
    }

    /// Step the zoom one notch, keeping the canvas point under
    /// `(point_x, point_y)` fixed on screen.
    ///
    /// Returns `false` when the scale is already at the clamped extreme, in
    /// which case neither the scale nor the offsets change.
    pub fn zoom_at_point(&mut self, direction: ZoomDirection, point_x: f64, point_y: f64) -> bool {
        let old_scale = self.state.scale;
        let step = match direction {
            ZoomDirection::In => ZOOM_STEP,
            ZoomDirection::Out => -ZOOM_STEP,
        };
        let new_scale = round_to_tenth(old_scale + step).clamp(MIN_ZOOM, MAX_ZOOM);
        let moved_forward = match direction {
            ZoomDirection::In => new_scale > old_scale,
            ZoomDirection::Out => new_scale < old_scale,
        };
        if !moved_forward {
            return false;
        }

        let ratio = new_scale / old_scale;
        self.state = ViewState {
            scale: new_scale,
            offset_x: point_x - (point_x - self.state.offset_x) * ratio,
            offset_y: point_y - (point_y - self.state.offset_y) * ratio,
        };
        log::debug!("Zoom {:?}: {:.2} -> {:.2}", direction, old_scale, new_scale);
        self.notify();
        true
    }

    /// Zoom one notch around the viewport centre.
    pub fn zoom_at_center(&mut self, direction: ZoomDirection) -> bool {
        let (width, height) = self.viewport_size;
        self.zoom_at_point(direction, width / 2.0, height / 2.0)
    }

    /// Move the view by a screen-space delta. Unclamped.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.state.offset_x += dx;
        self.state.offset_y += dy;
        self.notify();
    }

    /// Scale the image to fill 95% of the viewport and centre it.
    ///
    /// The fitted scale is clamped to the zoom range but not rounded. Returns
    /// `false` if either the image or the viewport has no area yet.
    pub fn fit_to_viewport(&mut self) -> bool {
        let Some((image_w, image_h)) = self.image_size else {
            return false;
        };
        let (view_w, view_h) = self.viewport_size;
        if image_w == 0 || image_h == 0 || view_w <= 0.0 || view_h <= 0.0 {
            return false;
        }

        let (image_w, image_h) = (image_w as f64, image_h as f64);
        let scale = ((view_w / image_w).min(view_h / image_h) * FIT_MARGIN).clamp(MIN_ZOOM, MAX_ZOOM);
        self.state = ViewState {
            scale,
            offset_x: (view_w - image_w * scale) / 2.0,
            offset_y: (view_h - image_h * scale) / 2.0,
        };
        log::debug!("Fit to viewport {:.0}x{:.0}: scale {:.3}", view_w, view_h, scale);
        self.notify();
        true
    }

    /// Drain the pending transform notification, if any.
    pub fn take_update(&mut self) -> Option<TransformUpdate> {
        self.pending.take()
    }

    fn notify(&mut self) {
        self.pending = Some(TransformUpdate {
            state: self.state,
            zoom_percent: self.zoom_percent(),
        });
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
