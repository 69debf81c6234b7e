// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the coordinate transform between viewport-local
//! pointer positions and canvas (image pixel) coordinates, plus the rounding
//! rule used whenever a computed dimension becomes a pixel count.

use crate::models::stroke::Point;
use crate::models::view::ViewState;

/// Convert a viewport-local position to canvas coordinates.
///
/// Exact inverse of the rendering transform `translate(offset) scale(scale)`.
pub fn screen_to_canvas(screen: Point, view: &ViewState) -> Point {
    Point {
        x: (screen.x - view.offset_x) / view.scale,
        y: (screen.y - view.offset_y) / view.scale,
    }
}

/// Convert canvas coordinates to a viewport-local position.
pub fn canvas_to_screen(canvas: Point, view: &ViewState) -> Point {
    Point {
        x: canvas.x * view.scale + view.offset_x,
        y: canvas.y * view.scale + view.offset_y,
    }
}

/// Round a computed dimension half-up to a whole pixel count.
pub fn round_half_up(value: f64) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    (value + 0.5).floor() as u32
}
