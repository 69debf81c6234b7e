// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Generation panel.
//!
//! Operation selection, prompt and per-operation options, the Generate
//! button, the status line and the list of results from this session.

use crate::models::request::{
    AspectRatio, Creativity, OperationKind, UpscaleFactor, VideoAspectRatio, MAX_IMAGE_COUNT,
    MIN_IMAGE_COUNT,
};
use crate::models::session::Artifact;
use std::path::PathBuf;

/// User-editable generation options.
#[derive(Debug, Clone)]
pub struct GenerationForm {
    pub operation: OperationKind,
    pub prompt: String,
    pub count: u8,
    pub aspect_ratio: AspectRatio,
    /// Send the loaded image along with image and video generation.
    pub use_reference: bool,
    pub upscale_factor: UpscaleFactor,
    pub creativity: Creativity,
    pub video_aspect_ratio: VideoAspectRatio,
}

impl Default for GenerationForm {
    fn default() -> Self {
        Self {
            operation: OperationKind::ImageGen,
            prompt: String::new(),
            count: MIN_IMAGE_COUNT,
            aspect_ratio: AspectRatio::default(),
            use_reference: false,
            upscale_factor: UpscaleFactor::default(),
            creativity: Creativity::default(),
            video_aspect_ratio: VideoAspectRatio::default(),
        }
    }
}

/// A named output and where it ended up.
pub struct ResultEntry {
    pub artifact: Artifact,
    pub saved_to: Option<PathBuf>,
    pub texture: Option<egui::TextureHandle>,
}

/// Read-only state the panel reflects.
pub struct PanelState<'a> {
    pub loading: bool,
    pub has_source: bool,
    pub has_mask: bool,
    pub status: Option<&'a str>,
}

/// Result of panel interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertiesAction {
    None,
    Generate,
    OpenMaskEditor,
    UseResult(usize),
}

const THUMBNAIL_WIDTH: f32 = 220.0;

/// Display the generation panel.
pub fn show(
    ui: &mut egui::Ui,
    form: &mut GenerationForm,
    state: PanelState<'_>,
    results: &[ResultEntry],
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Generate");
    ui.separator();

    egui::ComboBox::from_label("Operation")
        .selected_text(form.operation.label())
        .show_ui(ui, |ui| {
            for kind in OperationKind::all() {
                ui.selectable_value(&mut form.operation, *kind, kind.label());
            }
        });

    ui.add_space(6.0);

    if form.operation != OperationKind::Upscale {
        ui.label("Prompt");
        ui.add(
            egui::TextEdit::multiline(&mut form.prompt)
                .desired_rows(4)
                .desired_width(f32::INFINITY)
                .hint_text("Describe what you want"),
        );
    }

    match form.operation {
        OperationKind::ImageGen => {
            ui.add(egui::Slider::new(&mut form.count, MIN_IMAGE_COUNT..=MAX_IMAGE_COUNT).text("Images"));
            egui::ComboBox::from_label("Aspect ratio")
                .selected_text(form.aspect_ratio.as_str())
                .show_ui(ui, |ui| {
                    for ratio in AspectRatio::all() {
                        ui.selectable_value(&mut form.aspect_ratio, *ratio, ratio.as_str());
                    }
                });
            ui.add_enabled(
                state.has_source,
                egui::Checkbox::new(&mut form.use_reference, "Use loaded image as reference"),
            );
        }
        OperationKind::GenerativeEdit => {
            if !state.has_source {
                ui.label(egui::RichText::new("Load an image to edit").weak());
            }
        }
        OperationKind::InpaintEdit => {
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.has_source && !state.loading, egui::Button::new("Edit Mask..."))
                    .clicked()
                {
                    action = PropertiesAction::OpenMaskEditor;
                }
                let mask_text = if state.has_mask { "Mask saved" } else { "No mask" };
                ui.label(egui::RichText::new(mask_text).weak());
            });
        }
        OperationKind::Upscale => {
            egui::ComboBox::from_label("Scale")
                .selected_text(format!("{}%", form.upscale_factor.percent()))
                .show_ui(ui, |ui| {
                    for factor in UpscaleFactor::all() {
                        ui.selectable_value(&mut form.upscale_factor, *factor, format!("{}%", factor.percent()));
                    }
                });
            egui::ComboBox::from_label("Creativity")
                .selected_text(form.creativity.label())
                .show_ui(ui, |ui| {
                    for creativity in Creativity::all() {
                        ui.selectable_value(&mut form.creativity, *creativity, creativity.label());
                    }
                });
        }
        OperationKind::VideoGen => {
            ui.horizontal(|ui| {
                ui.label("Aspect ratio");
                for ratio in [VideoAspectRatio::Landscape, VideoAspectRatio::Portrait] {
                    ui.selectable_value(&mut form.video_aspect_ratio, ratio, ratio.as_str());
                }
            });
            ui.add_enabled(
                state.has_source,
                egui::Checkbox::new(&mut form.use_reference, "Start from loaded image"),
            );
        }
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui
            .add_enabled(!state.loading, egui::Button::new("Generate"))
            .clicked()
        {
            action = PropertiesAction::Generate;
        }
        if state.loading {
            ui.spinner();
        }
    });

    if let Some(status) = state.status {
        ui.add_space(4.0);
        ui.label(egui::RichText::new(status).small());
    }

    ui.separator();
    ui.heading("Results");

    egui::ScrollArea::vertical().show(ui, |ui| {
        if results.is_empty() {
            ui.label(egui::RichText::new("Nothing generated yet").weak());
        }
        for (idx, entry) in results.iter().enumerate().rev() {
            ui.group(|ui| {
                ui.label(egui::RichText::new(&entry.artifact.file_name).strong());
                if let Some(texture) = &entry.texture {
                    let size = texture.size_vec2();
                    let scale = (THUMBNAIL_WIDTH / size.x).min(1.0);
                    ui.image((texture.id(), size * scale));
                }
                if let Some(path) = &entry.saved_to {
                    ui.label(egui::RichText::new(path.display().to_string()).small().weak());
                }
                if entry.texture.is_some()
                    && ui
                        .add_enabled(!state.loading, egui::Button::new("Use as source").small())
                        .clicked()
                {
                    action = PropertiesAction::UseResult(idx);
                }
            });
        }
    });

    action
}
