// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image display and the mask editor viewport.
//!
//! Outside the editor the source image is shown fitted to the panel. Inside
//! the editor raw egui input is translated into [`InputEvent`]s in viewport
//! coordinates; the session state machine decides what they mean.

use crate::models::pointer::{InputEvent, PointerButton, PointerInput};
use crate::models::stroke::Point;
use crate::models::view::ViewController;
use crate::util::geometry::canvas_to_screen;

const BACKGROUND: egui::Color32 = egui::Color32::from_gray(40);

/// Result of one frame of the mask editor.
pub struct EditorOutput {
    pub events: Vec<InputEvent>,
    /// Size of the viewport in points.
    pub viewport: egui::Vec2,
}

/// Show the source image (or a welcome message) fitted to the panel.
pub fn show_preview(ui: &mut egui::Ui, texture: Option<&egui::TextureHandle>, image_size: Option<(u32, u32)>) {
    ui.style_mut().visuals.extreme_bg_color = BACKGROUND;
    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        if let (Some(texture), Some((img_width, img_height))) = (texture, image_size) {
            let available = ui.available_size();
            let img_aspect = img_width as f32 / img_height as f32;
            let available_aspect = available.x / available.y;

            let (display_width, display_height) = if img_aspect > available_aspect {
                (available.x, available.x / img_aspect)
            } else {
                (available.y * img_aspect, available.y)
            };

            let x_offset = (available.x - display_width) / 2.0;
            let y_offset = (available.y - display_height) / 2.0;
            let image_rect = egui::Rect::from_min_size(
                ui.min_rect().min + egui::vec2(x_offset, y_offset),
                egui::vec2(display_width, display_height),
            );

            ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        } else {
            ui.centered_and_justified(|ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.heading(
                        egui::RichText::new("MaskForge")
                            .size(32.0)
                            .color(egui::Color32::from_gray(200)),
                    );
                    ui.add_space(20.0);
                    ui.label(
                        egui::RichText::new("Open an image to edit it, or generate one from a prompt")
                            .color(egui::Color32::from_gray(180)),
                    );
                    ui.add_space(10.0);
                    ui.label(
                        egui::RichText::new("File → Open Image...")
                            .weak()
                            .color(egui::Color32::from_gray(130)),
                    );
                });
            });
        }
    });
}

/// Draw the mask editor and collect this frame's input.
pub fn show_editor(
    ui: &mut egui::Ui,
    texture: Option<&egui::TextureHandle>,
    image_size: (u32, u32),
    view: &ViewController,
    input: &PointerInput,
    zoom_percent: u32,
) -> EditorOutput {
    let (rect, _response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
    let painter = ui.painter_at(rect);
    painter.rect_filled(rect, 0.0, BACKGROUND);

    let state = view.state();
    let to_screen = |x: f64, y: f64| {
        let p = canvas_to_screen(Point::new(x, y), &state);
        rect.min + egui::vec2(p.x as f32, p.y as f32)
    };
    let image_rect = egui::Rect::from_min_max(
        to_screen(0.0, 0.0),
        to_screen(image_size.0 as f64, image_size.1 as f64),
    );

    if let Some(texture) = texture {
        painter.image(
            texture.id(),
            image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );
    }
    painter.rect_stroke(image_rect, 0.0, egui::Stroke::new(1.0, egui::Color32::from_gray(90)));

    let cursor = input.cursor();
    if cursor.visible {
        let center = rect.min + egui::vec2(cursor.x as f32, cursor.y as f32);
        let radius = (cursor.diameter / 2.0) as f32;
        painter.circle_stroke(center, radius + 1.0, egui::Stroke::new(1.0, egui::Color32::BLACK));
        painter.circle_stroke(center, radius, egui::Stroke::new(1.5, egui::Color32::WHITE));
    }

    painter.text(
        rect.right_bottom() - egui::vec2(10.0, 10.0),
        egui::Align2::RIGHT_BOTTOM,
        format!("{}%", zoom_percent),
        egui::FontId::proportional(14.0),
        egui::Color32::from_gray(220),
    );

    let events = collect_events(ui, rect);

    let hovering = ui.input(|i| i.pointer.hover_pos()).is_some_and(|pos| rect.contains(pos));
    if hovering {
        if cursor.visible {
            ui.ctx().set_cursor_icon(egui::CursorIcon::None);
        } else if input.is_panning() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
        } else if !input.brush_active() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
        }
    }

    EditorOutput {
        events,
        viewport: rect.size(),
    }
}

/// Translate egui input into editor events, relative to `rect`.
fn collect_events(ui: &egui::Ui, rect: egui::Rect) -> Vec<InputEvent> {
    let local = |pos: egui::Pos2| ((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);
    let keyboard = !ui.ctx().wants_keyboard_input();
    let inside_id = ui.id().with("pointer_inside");
    let was_inside = ui.ctx().data(|d| d.get_temp::<bool>(inside_id)).unwrap_or(false);

    let mut events = Vec::new();
    let inside = ui.input(|i| {
        if keyboard {
            if i.key_pressed(egui::Key::Space) {
                events.push(InputEvent::SpaceDown);
            }
            if i.key_released(egui::Key::Space) {
                events.push(InputEvent::SpaceUp);
            }
            if i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals) {
                events.push(InputEvent::ZoomIn);
            }
            if i.key_pressed(egui::Key::Minus) {
                events.push(InputEvent::ZoomOut);
            }
            if i.key_pressed(egui::Key::Num0) {
                events.push(InputEvent::Fit);
            }
        }

        let latest = i.pointer.latest_pos();
        let inside = latest.is_some_and(|pos| rect.contains(pos));

        if let Some(pos) = latest {
            let (x, y) = local(pos);
            if i.pointer.is_moving() && (inside || i.pointer.any_down()) {
                events.push(InputEvent::PointerMove { x, y });
            }
            if inside {
                let buttons = [
                    (egui::PointerButton::Primary, PointerButton::Primary),
                    (egui::PointerButton::Secondary, PointerButton::Secondary),
                    (egui::PointerButton::Middle, PointerButton::Middle),
                ];
                for (egui_button, button) in buttons {
                    if i.pointer.button_pressed(egui_button) {
                        events.push(InputEvent::PointerDown { x, y, button });
                    }
                }
                let scroll = i.raw_scroll_delta.y;
                if scroll != 0.0 {
                    // egui reports wheel-up as positive.
                    events.push(InputEvent::Wheel {
                        delta_y: -scroll as f64,
                        x,
                        y,
                    });
                }
            }
        }

        if i.pointer.any_released() {
            events.push(InputEvent::PointerUp);
        }
        inside
    });

    if was_inside && !inside {
        events.push(InputEvent::PointerLeave);
    }
    ui.ctx().data_mut(|d| d.insert_temp(inside_id, inside));
    events
}
