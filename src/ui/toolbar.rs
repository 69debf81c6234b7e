// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Mask editor toolbar.
//!
//! Brush toggle and size, zoom controls, and the clear/save/cancel actions.

use crate::models::mask::{MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};

/// Result of toolbar interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    None,
    SetBrush(bool),
    SetBrushWidth(f64),
    ZoomIn,
    ZoomOut,
    Fit,
    Clear,
    Save,
    Cancel,
}

/// Display the editor toolbar.
pub fn show(ui: &mut egui::Ui, brush_toggle: bool, brush_width: f64) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        if ui.selectable_label(brush_toggle, "🖌 Brush").clicked() {
            action = ToolbarAction::SetBrush(!brush_toggle);
        }
        if ui.selectable_label(!brush_toggle, "✋ Pan").clicked() {
            action = ToolbarAction::SetBrush(false);
        }

        let mut width = brush_width;
        if ui
            .add(egui::Slider::new(&mut width, MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH).text("Size"))
            .changed()
        {
            action = ToolbarAction::SetBrushWidth(width);
        }

        ui.separator();

        if ui.button("➖").on_hover_text("Zoom out (-)").clicked() {
            action = ToolbarAction::ZoomOut;
        }
        if ui.button("➕").on_hover_text("Zoom in (+)").clicked() {
            action = ToolbarAction::ZoomIn;
        }
        if ui.button("Fit").on_hover_text("Fit to view (0)").clicked() {
            action = ToolbarAction::Fit;
        }

        ui.separator();

        if ui.button("Clear").clicked() {
            action = ToolbarAction::Clear;
        }
        if ui.button("Cancel").on_hover_text("Discard changes (Esc)").clicked() {
            action = ToolbarAction::Cancel;
        }
        if ui.button("Save Mask").clicked() {
            action = ToolbarAction::Save;
        }

        ui.separator();
        ui.label(
            egui::RichText::new("Hold Space to pan, scroll to zoom")
                .italics()
                .weak(),
        );
    });

    action
}
