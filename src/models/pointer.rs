// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer input state machine for the mask editor.
//!
//! Raw toolkit events are translated into [`InputEvent`]s by the UI layer and
//! dispatched here. The machine decides whether a drag paints the mask or pans
//! the view, and keeps the brush cursor overlay in sync.

use super::mask::MaskEngine;
use super::stroke::Point;
use super::view::{ViewController, ZoomDirection};
use crate::util::geometry::screen_to_canvas;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Toolkit-independent input command. Positions are viewport-local pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown { x: f64, y: f64, button: PointerButton },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    PointerLeave,
    SpaceDown,
    SpaceUp,
    /// Negative `delta_y` zooms in.
    Wheel { delta_y: f64, x: f64, y: f64 },
    ZoomIn,
    ZoomOut,
    Fit,
}

/// Screen-space brush outline drawn under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BrushCursor {
    pub visible: bool,
    pub x: f64,
    pub y: f64,
    pub diameter: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Interaction {
    Idle,
    Panning { anchor: Point },
    Drawing,
}

#[derive(Debug)]
pub struct PointerInput {
    brush_toggle: bool,
    spacebar_held: bool,
    editor_open: bool,
    interaction: Interaction,
    cursor: BrushCursor,
}

impl Default for PointerInput {
    fn default() -> Self {
        Self {
            brush_toggle: true,
            spacebar_held: false,
            editor_open: false,
            interaction: Interaction::Idle,
            cursor: BrushCursor::default(),
        }
    }
}

impl PointerInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brush mode as selected by the user, ignoring the spacebar override.
    pub fn brush_toggle(&self) -> bool {
        self.brush_toggle
    }

    pub fn set_brush_toggle(&mut self, active: bool) {
        self.brush_toggle = active;
        if !active {
            self.cursor.visible = false;
        }
    }

    /// Effective brush mode: the toggle, unless space is held.
    pub fn brush_active(&self) -> bool {
        self.brush_toggle && !self.spacebar_held
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.interaction, Interaction::Panning { .. })
    }

    pub fn is_drawing(&self) -> bool {
        self.interaction == Interaction::Drawing
    }

    pub fn cursor(&self) -> BrushCursor {
        self.cursor
    }

    pub fn editor_open(&self) -> bool {
        self.editor_open
    }

    pub fn open_editor(&mut self) {
        self.editor_open = true;
        self.spacebar_held = false;
        self.interaction = Interaction::Idle;
    }

    pub fn close_editor(&mut self, mask: &mut MaskEngine) {
        self.release(mask);
        self.editor_open = false;
        self.spacebar_held = false;
        self.cursor.visible = false;
    }

    /// Dispatch one input event.
    pub fn handle(&mut self, event: InputEvent, view: &mut ViewController, mask: &mut MaskEngine) {
        match event {
            InputEvent::PointerDown { x, y, button } => self.pointer_down(x, y, button, view, mask),
            InputEvent::PointerMove { x, y } => self.pointer_move(x, y, view, mask),
            InputEvent::PointerUp => self.release(mask),
            InputEvent::PointerLeave => {
                self.release(mask);
                self.cursor.visible = false;
            }
            InputEvent::SpaceDown => {
                if self.editor_open && !self.spacebar_held {
                    self.spacebar_held = true;
                    self.cursor.visible = false;
                    log::debug!("Spacebar held: pan mode");
                }
            }
            InputEvent::SpaceUp => {
                if self.spacebar_held {
                    self.spacebar_held = false;
                    log::debug!("Spacebar released: brush mode {}", self.brush_toggle);
                }
            }
            InputEvent::Wheel { delta_y, x, y } => {
                if delta_y < 0.0 {
                    view.zoom_at_point(ZoomDirection::In, x, y);
                } else if delta_y > 0.0 {
                    view.zoom_at_point(ZoomDirection::Out, x, y);
                }
                self.refresh_cursor_size(view, mask);
            }
            InputEvent::ZoomIn => {
                view.zoom_at_center(ZoomDirection::In);
                self.refresh_cursor_size(view, mask);
            }
            InputEvent::ZoomOut => {
                view.zoom_at_center(ZoomDirection::Out);
                self.refresh_cursor_size(view, mask);
            }
            InputEvent::Fit => {
                view.fit_to_viewport();
                self.refresh_cursor_size(view, mask);
            }
        }
    }

    fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        button: PointerButton,
        view: &ViewController,
        mask: &mut MaskEngine,
    ) {
        if self.brush_active() {
            mask.begin_stroke(screen_to_canvas(Point::new(x, y), &view.state()));
            self.interaction = Interaction::Drawing;
        } else if button == PointerButton::Primary {
            self.interaction = Interaction::Panning {
                anchor: Point::new(x, y),
            };
        }
    }

    fn pointer_move(&mut self, x: f64, y: f64, view: &mut ViewController, mask: &mut MaskEngine) {
        self.cursor.x = x;
        self.cursor.y = y;
        self.cursor.visible = self.brush_active() && !self.is_panning();
        self.refresh_cursor_size(view, mask);

        match self.interaction {
            Interaction::Panning { anchor } => {
                view.pan(x - anchor.x, y - anchor.y);
                self.interaction = Interaction::Panning {
                    anchor: Point::new(x, y),
                };
            }
            Interaction::Drawing => {
                mask.continue_stroke(screen_to_canvas(Point::new(x, y), &view.state()));
            }
            Interaction::Idle => {}
        }
    }

    /// End whichever of panning or drawing is active.
    fn release(&mut self, mask: &mut MaskEngine) {
        if self.interaction == Interaction::Drawing {
            mask.end_stroke();
        }
        self.interaction = Interaction::Idle;
    }

    fn refresh_cursor_size(&mut self, view: &ViewController, mask: &MaskEngine) {
        self.cursor.diameter = mask.brush_width() * view.scale();
    }
}
