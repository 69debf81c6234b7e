// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Stroke data structures.
//!
//! This module defines the points and the in-progress freehand stroke that
//! the mask editor rasterizes. Finished strokes are not retained; only their
//! effect on the mask raster persists.

/// A 2D point, either viewport-local or in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An ordered sequence of canvas-space points drawn with one brush width.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub width: f64,
    pub points: Vec<Point>,
}

impl Stroke {
    /// Start a stroke at the given point.
    pub fn begin(start: Point, width: f64) -> Self {
        Self {
            width,
            points: vec![start],
        }
    }

    /// Append a point to the stroke.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    /// The most recent point, where the next segment starts.
    pub fn last_point(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_tracks_last_point() {
        let mut stroke = Stroke::begin(Point::new(1.0, 2.0), 10.0);
        assert_eq!(stroke.last_point(), Some(Point::new(1.0, 2.0)));

        stroke.add_point(Point::new(5.0, 6.0));
        assert_eq!(stroke.point_count(), 2);
        assert_eq!(stroke.last_point(), Some(Point::new(5.0, 6.0)));
    }
}
