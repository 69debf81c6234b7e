// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the [`Session`] and reflects it into egui panels. Image
//! decoding and generation requests run on background threads and report
//! back over channels polled once per frame.

use crate::api::gemini::GeminiClient;
use crate::generation::{GenerationError, GenerationOutput, Orchestrator, StatusEvent, TokioDelay};
use crate::io::storage::{LocalStorage, CREDENTIAL_KEY};
use crate::models::config::AppConfig;
use crate::models::image::SourceImage;
use crate::models::pointer::InputEvent;
use crate::models::request::{GenerationRequest, OperationKind};
use crate::models::session::Session;
use crate::ui::{canvas, properties, toolbar};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};

/// Message from a generation worker thread.
enum WorkerMessage {
    Status(StatusEvent),
    Finished(Result<GenerationOutput, GenerationError>),
}

/// An in-flight generation and what is needed to name its outputs.
struct PendingGeneration {
    receiver: Receiver<WorkerMessage>,
    has_reference: bool,
    source_name: Option<String>,
}

/// Main application state.
pub struct MaskForgeApp {
    config: AppConfig,
    storage: LocalStorage,
    session: Session,

    /// Loaded source image texture for display
    source_texture: Option<egui::TextureHandle>,

    /// Source with the working mask tinted over it
    editor_texture: Option<egui::TextureHandle>,
    editor_dirty: bool,

    /// Fit the view once the editor viewport has a size
    needs_fit: bool,
    zoom_percent: u32,

    form: properties::GenerationForm,
    results: Vec<properties::ResultEntry>,
    status: Option<String>,
    output_dir: PathBuf,

    settings_open: bool,
    credential_input: String,

    /// Receiver for background image loading
    image_loader: Option<Receiver<Result<SourceImage, String>>>,
    generation: Option<PendingGeneration>,
}

impl MaskForgeApp {
    pub fn new(config: AppConfig, storage: LocalStorage) -> Self {
        let credential = storage.get(CREDENTIAL_KEY).map(str::to_string);
        let mut session = Session::new(config.brand.clone(), credential);
        session.mask.set_brush_width(config.default_brush_width);
        let output_dir = config
            .output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::io::media::default_output_dir);
        let settings_open = session.credential().is_none();

        Self {
            config,
            storage,
            session,
            source_texture: None,
            editor_texture: None,
            editor_dirty: false,
            needs_fit: false,
            zoom_percent: 100,
            form: properties::GenerationForm::default(),
            results: Vec::new(),
            status: None,
            output_dir,
            settings_open,
            credential_input: String::new(),
            image_loader: None,
            generation: None,
        }
    }

    /// Load an image file in the background.
    fn load_image_file(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.image_loader = Some(receiver);
        self.session.begin_import();
        self.status = Some("Loading image...".to_string());

        std::thread::spawn(move || {
            let result = crate::io::media::load_image(&path).map_err(|e| format!("{:#}", e));
            let _ = sender.send(result);
        });
    }

    /// Make `image` the current source and upload its texture.
    fn set_source(&mut self, ctx: &egui::Context, image: SourceImage) {
        let size = [image.natural_width() as usize, image.natural_height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.pixels.as_raw());
        self.source_texture = Some(ctx.load_texture("source_image", color_image, egui::TextureOptions::LINEAR));
        self.editor_texture = None;
        self.session.load_source(image);
        self.needs_fit = true;
    }

    fn poll_image_loader(&mut self, ctx: &egui::Context) {
        let Some(receiver) = &self.image_loader else {
            return;
        };
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => Err("Image loader stopped unexpectedly".to_string()),
        };
        self.image_loader = None;

        match result {
            Ok(image) => {
                self.set_source(ctx, image);
                self.status = None;
            }
            Err(e) => {
                self.session.abort_import();
                log::error!("Failed to load image: {}", e);
                self.status = Some(e);
            }
        }
    }

    // -- Generation --------------------------------------------------------

    fn build_request(&self) -> Result<GenerationRequest, GenerationError> {
        let form = &self.form;
        match form.operation {
            OperationKind::ImageGen => Ok(self.session.image_request(
                &form.prompt,
                form.count,
                form.aspect_ratio,
                form.use_reference,
            )),
            OperationKind::GenerativeEdit => self.session.edit_request(&form.prompt),
            OperationKind::InpaintEdit => self.session.inpaint_request(&form.prompt),
            OperationKind::Upscale => self.session.upscale_request(form.upscale_factor, form.creativity),
            OperationKind::VideoGen => Ok(self.session.video_request(
                &form.prompt,
                form.video_aspect_ratio,
                form.use_reference,
            )),
        }
    }

    fn start_generation(&mut self, ctx: &egui::Context) {
        let api_key = match self.session.begin_loading() {
            Ok(key) => key,
            Err(e) => {
                if matches!(e, GenerationError::MissingCredential) {
                    self.settings_open = true;
                }
                self.status = Some(e.to_string());
                return;
            }
        };
        let request = match self.build_request() {
            Ok(request) => request,
            Err(e) => {
                self.session.finish_loading();
                self.status = Some(e.to_string());
                return;
            }
        };

        log::info!("Starting {} request", request.kind().slug());
        let (sender, receiver) = channel();
        self.generation = Some(PendingGeneration {
            receiver,
            has_reference: request.has_reference(),
            source_name: request.source_name().map(str::to_string),
        });
        self.status = Some("Generating...".to_string());

        let config = self.config.clone();
        let ctx = ctx.clone();
        std::thread::spawn(move || {
            let result = run_generation(&config, api_key, &request, |event| {
                let _ = sender.send(WorkerMessage::Status(event));
                ctx.request_repaint();
            });
            let _ = sender.send(WorkerMessage::Finished(result));
            ctx.request_repaint();
        });
    }

    fn poll_generation(&mut self, ctx: &egui::Context) {
        loop {
            let Some(pending) = &self.generation else {
                return;
            };
            let message = match pending.receiver.try_recv() {
                Ok(message) => message,
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => WorkerMessage::Finished(Err(GenerationError::Startup(
                    "the request worker stopped unexpectedly".to_string(),
                ))),
            };

            match message {
                WorkerMessage::Status(event) => self.status = Some(event.message()),
                WorkerMessage::Finished(result) => {
                    if let Some(pending) = self.generation.take() {
                        self.finish_generation(ctx, pending, result);
                    }
                    return;
                }
            }
        }
    }

    fn finish_generation(
        &mut self,
        ctx: &egui::Context,
        pending: PendingGeneration,
        result: Result<GenerationOutput, GenerationError>,
    ) {
        self.session.finish_loading();
        let output = match result {
            Ok(output) => output,
            Err(e) => {
                log::error!("Generation failed: {}", e);
                self.status = Some(e.to_string());
                return;
            }
        };

        let artifacts = self
            .session
            .name_outputs(output, pending.has_reference, pending.source_name.as_deref());
        let count = artifacts.len();
        let mut failures = 0;

        for artifact in artifacts {
            let saved_to = match crate::io::media::save_artifact(&self.output_dir, &artifact) {
                Ok(path) => Some(path),
                Err(e) => {
                    log::error!("Failed to save {}: {:#}", artifact.file_name, e);
                    failures += 1;
                    None
                }
            };
            let texture = if artifact.data.mime_type.starts_with("image/") {
                artifact.data.decode().ok().map(|pixels| {
                    let size = [pixels.width() as usize, pixels.height() as usize];
                    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
                    ctx.load_texture(artifact.file_name.clone(), color_image, egui::TextureOptions::LINEAR)
                })
            } else {
                None
            };
            self.results.push(properties::ResultEntry {
                artifact,
                saved_to,
                texture,
            });
        }

        self.status = Some(if failures == 0 {
            format!("Saved {} file(s) to {}", count, self.output_dir.display())
        } else {
            format!("{} of {} file(s) could not be saved", failures, count)
        });
    }

    /// Load a previous result as the new source image.
    fn use_result(&mut self, ctx: &egui::Context, idx: usize) {
        let Some(entry) = self.results.get(idx) else {
            return;
        };
        let name = std::path::Path::new(&entry.artifact.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);
        let image = entry
            .artifact
            .data
            .decode()
            .and_then(|pixels| SourceImage::from_pixels(pixels, name));
        match image {
            Ok(image) => self.set_source(ctx, image),
            Err(e) => {
                log::error!("Failed to use result as source: {}", e);
                self.status = Some(format!("Could not load result: {}", e));
            }
        }
    }

    /// Write the current configuration to a YAML or JSON file.
    fn export_settings(&self, path: PathBuf) {
        let mut config = self.config.clone();
        config.output_dir = Some(self.output_dir.display().to_string());

        let extension = path.extension().and_then(|s| s.to_str());
        let result = match extension {
            Some("yaml") | Some("yml") => crate::io::serialization::export_yaml(&config, &path),
            Some("json") => crate::io::serialization::export_json(&config, &path),
            _ => {
                log::error!("Unsupported file extension: {:?}", extension);
                return;
            }
        };

        match result {
            Ok(_) => log::info!("Exported settings to {}", path.display()),
            Err(e) => log::error!("Failed to export settings: {}", e),
        }
    }

    // -- Mask editor -------------------------------------------------------

    fn open_mask_editor(&mut self) {
        match self.session.open_mask_editor() {
            Ok(()) => {
                self.editor_dirty = true;
                self.needs_fit = true;
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn handle_toolbar(&mut self, action: toolbar::ToolbarAction) {
        match action {
            toolbar::ToolbarAction::SetBrush(active) => self.session.input.set_brush_toggle(active),
            toolbar::ToolbarAction::SetBrushWidth(width) => self.session.mask.set_brush_width(width),
            toolbar::ToolbarAction::ZoomIn => self.session.handle_input(InputEvent::ZoomIn),
            toolbar::ToolbarAction::ZoomOut => self.session.handle_input(InputEvent::ZoomOut),
            toolbar::ToolbarAction::Fit => self.session.handle_input(InputEvent::Fit),
            toolbar::ToolbarAction::Clear => {
                self.session.mask.clear();
                self.editor_dirty = true;
            }
            toolbar::ToolbarAction::Save => {
                let has_mask = self.session.save_mask();
                self.status = Some(if has_mask { "Mask saved" } else { "Mask is empty" }.to_string());
            }
            toolbar::ToolbarAction::Cancel => self.session.cancel_mask(),
            toolbar::ToolbarAction::None => {}
        }
    }

    fn refresh_editor_texture(&mut self, ctx: &egui::Context) {
        if !self.editor_dirty {
            return;
        }
        self.editor_dirty = false;
        let Some(source) = self.session.source() else {
            return;
        };
        let preview = self.session.mask.preview_over(&source.pixels);
        let size = [preview.width() as usize, preview.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, preview.as_raw());
        match &mut self.editor_texture {
            Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
            None => {
                self.editor_texture = Some(ctx.load_texture("mask_editor", color_image, egui::TextureOptions::LINEAR));
            }
        }
    }

    fn show_editor(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            let action = toolbar::show(ui, self.session.input.brush_toggle(), self.session.mask.brush_width());
            self.handle_toolbar(action);
        });
        if !self.session.input.editor_open() {
            ctx.request_repaint();
            return;
        }

        if !ctx.wants_keyboard_input() && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.session.cancel_mask();
            ctx.request_repaint();
            return;
        }

        self.refresh_editor_texture(ctx);
        let image_size = self
            .session
            .source()
            .map(|s| (s.natural_width(), s.natural_height()))
            .unwrap_or((0, 0));

        let output = egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                canvas::show_editor(
                    ui,
                    self.editor_texture.as_ref(),
                    image_size,
                    &self.session.view,
                    &self.session.input,
                    self.zoom_percent,
                )
            })
            .inner;

        let viewport = (output.viewport.x as f64, output.viewport.y as f64);
        if viewport != self.session.view.viewport_size() {
            self.session.view.set_viewport_size(viewport.0, viewport.1);
        }
        if self.needs_fit && self.session.view.fit_to_viewport() {
            self.needs_fit = false;
        }

        for event in output.events {
            let stroke_event = matches!(
                event,
                InputEvent::PointerDown { .. } | InputEvent::PointerMove { .. }
            );
            let was_drawing = self.session.input.is_drawing();
            self.session.handle_input(event);
            if stroke_event && (was_drawing || self.session.input.is_drawing()) {
                self.editor_dirty = true;
            }
        }

        if let Some(update) = self.session.view.take_update() {
            self.zoom_percent = update.zoom_percent;
            ctx.request_repaint();
        }
    }

    fn show_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.settings_open;
        let mut save = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Gemini API key");
                let hint = if self.session.credential().is_some() {
                    "A key is saved. Enter a new one to replace it."
                } else {
                    "Paste your API key"
                };
                ui.add(
                    egui::TextEdit::singleline(&mut self.credential_input)
                        .password(true)
                        .hint_text(hint),
                );
                ui.label(egui::RichText::new(format!("Outputs are saved to {}", self.output_dir.display())).small().weak());
                if ui.button("Save").clicked() {
                    save = true;
                }
            });

        if save {
            let key = std::mem::take(&mut self.credential_input);
            self.session.set_credential(key);
            match self.session.credential() {
                Some(key) => {
                    if let Err(e) = self.storage.set(CREDENTIAL_KEY, key) {
                        log::error!("Failed to store API key: {:#}", e);
                        self.status = Some("API key set for this session only (could not save it)".to_string());
                    } else {
                        log::info!("API key saved to {}", self.storage.path().display());
                        self.status = Some("API key saved".to_string());
                    }
                    open = false;
                }
                None => self.status = Some(GenerationError::MissingCredential.to_string()),
            }
        }
        self.settings_open = open;
    }
}

/// Run one request to completion on a current-thread runtime.
fn run_generation(
    config: &AppConfig,
    api_key: String,
    request: &GenerationRequest,
    on_status: impl FnMut(StatusEvent),
) -> Result<GenerationOutput, GenerationError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| GenerationError::Startup(e.to_string()))?;
    let client = GeminiClient::new(config, api_key).map_err(|e| GenerationError::Startup(e.user_message()))?;
    let orchestrator = Orchestrator::new(client, TokioDelay, config.safety_threshold);
    runtime.block_on(orchestrator.run(request, on_status))
}

impl eframe::App for MaskForgeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_image_loader(ctx);
        self.poll_generation(ctx);

        // Keep the spinner moving
        if self.session.is_loading() {
            ctx.request_repaint();
        }

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Image...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", &crate::io::media::IMAGE_EXTENSIONS)
                            .pick_file()
                        {
                            self.load_image_file(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Choose Output Folder...").clicked() {
                        if let Some(dir) = rfd::FileDialog::new()
                            .set_directory(&self.output_dir)
                            .pick_folder()
                        {
                            log::info!("Output folder set to {}", dir.display());
                            self.output_dir = dir;
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Settings...").clicked() {
                        self.settings_open = true;
                        ui.close_menu();
                    }
                    ui.menu_button("Export Settings", |ui| {
                        if ui.button("Export as YAML...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("YAML", &["yaml", "yml"])
                                .set_file_name("config.yaml")
                                .save_file()
                            {
                                self.export_settings(path);
                            }
                            ui.close_menu();
                        }
                        if ui.button("Export as JSON...").clicked() {
                            if let Some(path) = rfd::FileDialog::new()
                                .add_filter("JSON", &["json"])
                                .set_file_name("config.json")
                                .save_file()
                            {
                                self.export_settings(path);
                            }
                            ui.close_menu();
                        }
                    });
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Mask", |ui| {
                    let can_edit = self.session.source().is_some() && !self.session.is_loading();
                    if ui.add_enabled(can_edit, egui::Button::new("Edit Mask...")).clicked() {
                        self.open_mask_editor();
                        ui.close_menu();
                    }
                });
            });
        });

        let editor_open = self.session.input.editor_open();

        let properties_action = egui::SidePanel::right("properties")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!editor_open, |ui| {
                    properties::show(
                        ui,
                        &mut self.form,
                        properties::PanelState {
                            loading: self.session.is_loading(),
                            has_source: self.session.source().is_some(),
                            has_mask: self.session.mask.has_mask(),
                            status: self.status.as_deref(),
                        },
                        &self.results,
                    )
                })
                .inner
            })
            .inner;

        match properties_action {
            properties::PropertiesAction::Generate => self.start_generation(ctx),
            properties::PropertiesAction::OpenMaskEditor => self.open_mask_editor(),
            properties::PropertiesAction::UseResult(idx) => self.use_result(ctx, idx),
            properties::PropertiesAction::None => {}
        }

        if self.session.input.editor_open() {
            self.show_editor(ctx);
        } else {
            egui::CentralPanel::default().show(ctx, |ui| {
                if self.image_loader.is_some() {
                    ui.centered_and_justified(|ui| ui.spinner());
                } else {
                    let image_size = self.session.source().map(|s| (s.natural_width(), s.natural_height()));
                    canvas::show_preview(ui, self.source_texture.as_ref(), image_size);
                }
            });
        }

        if self.settings_open {
            self.show_settings(ctx);
        }
    }
}
