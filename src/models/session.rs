// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Session state shared by the editor and the generation controls.
//!
//! Owns the current source image, the mask, the view, the pointer state
//! machine, the API credential and the output-name counters. Everything is
//! touched from the UI thread only.

use super::image::{EncodedImage, SourceImage};
use super::mask::MaskEngine;
use super::pointer::{InputEvent, PointerInput};
use super::request::{
    AspectRatio, Creativity, GenerationRequest, OperationKind, UpscaleFactor, VideoAspectRatio,
};
use super::view::ViewController;
use crate::generation::{GenerationError, GenerationOutput};
use std::collections::HashMap;
use std::sync::Arc;

/// A named output ready to be shown or saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub data: EncodedImage,
}

/// Per-session output counters, one sequence per operation kind and
/// whether a reference image was supplied.
#[derive(Debug, Default)]
pub struct OutputNamer {
    counters: HashMap<(OperationKind, bool), u32>,
}

impl OutputNamer {
    pub fn next(&mut self, kind: OperationKind, has_reference: bool) -> u32 {
        let counter = self.counters.entry((kind, has_reference)).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Reset only the sequences derived from an uploaded image.
    pub fn reset_image_counters(&mut self) {
        self.counters.retain(|(_, has_reference), _| !has_reference);
    }
}

/// `<brand>-<kind>[-<source>](<n>).<ext>`
pub fn artifact_name(brand: &str, kind: OperationKind, source: Option<&str>, counter: u32) -> String {
    match source {
        Some(source) => format!("{}-{}-{}({}).{}", brand, kind.slug(), source, counter, kind.extension()),
        None => format!("{}-{}({}).{}", brand, kind.slug(), counter, kind.extension()),
    }
}

pub struct Session {
    brand: String,
    credential: Option<String>,
    source: Option<Arc<SourceImage>>,
    pub mask: MaskEngine,
    pub view: ViewController,
    pub input: PointerInput,
    namer: OutputNamer,
    loading: bool,
    importing: bool,
}

impl Session {
    pub fn new(brand: impl Into<String>, credential: Option<String>) -> Self {
        Self {
            brand: brand.into(),
            credential: credential.filter(|c| !c.trim().is_empty()),
            source: None,
            mask: MaskEngine::default(),
            view: ViewController::new(),
            input: PointerInput::new(),
            namer: OutputNamer::default(),
            loading: false,
            importing: false,
        }
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn set_credential(&mut self, credential: String) {
        let credential = credential.trim().to_string();
        self.credential = (!credential.is_empty()).then_some(credential);
    }

    pub fn source(&self) -> Option<&Arc<SourceImage>> {
        self.source.as_ref()
    }

    /// Replace the source image. Mask, view size and image-derived counters
    /// are reset before the new image becomes visible to any other call.
    pub fn load_source(&mut self, image: SourceImage) {
        let (width, height) = (image.natural_width(), image.natural_height());
        self.input.close_editor(&mut self.mask);
        self.mask.reset(width, height);
        self.view.set_image_size(width, height);
        self.view.fit_to_viewport();
        self.namer.reset_image_counters();
        log::info!(
            "Loaded source image {} ({}x{}, {})",
            image.name.as_deref().unwrap_or("<unnamed>"),
            width,
            height,
            image.mime_type()
        );
        self.source = Some(Arc::new(image));
        self.importing = false;
    }

    /// Mark an image file as being decoded in the background. Cleared by
    /// [`Session::load_source`] or [`Session::abort_import`].
    pub fn begin_import(&mut self) {
        self.importing = true;
    }

    pub fn abort_import(&mut self) {
        self.importing = false;
    }

    /// True while a generation or an image import is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading || self.importing
    }

    /// Gate a new orchestrated call. Returns the credential to use.
    pub fn begin_loading(&mut self) -> Result<String, GenerationError> {
        if self.is_loading() {
            return Err(GenerationError::Busy);
        }
        let credential = self.credential.clone().ok_or(GenerationError::MissingCredential)?;
        self.loading = true;
        Ok(credential)
    }

    pub fn finish_loading(&mut self) {
        self.loading = false;
    }

    // -- Mask editor -------------------------------------------------------

    pub fn open_mask_editor(&mut self) -> Result<(), GenerationError> {
        if self.importing {
            return Err(GenerationError::Busy);
        }
        if self.source.is_none() {
            return Err(GenerationError::MissingSource);
        }
        self.mask.open_editor();
        self.input.open_editor();
        self.view.fit_to_viewport();
        Ok(())
    }

    /// Commit the working mask and close the editor.
    pub fn save_mask(&mut self) -> bool {
        self.input.close_editor(&mut self.mask);
        self.mask.commit()
    }

    /// Close the editor, discarding unsaved strokes.
    pub fn cancel_mask(&mut self) {
        self.input.close_editor(&mut self.mask);
        self.mask.revert();
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        self.input.handle(event, &mut self.view, &mut self.mask);
    }

    // -- Request builders --------------------------------------------------

    fn require_source(&self) -> Result<Arc<SourceImage>, GenerationError> {
        self.source.clone().ok_or(GenerationError::MissingSource)
    }

    pub fn image_request(
        &self,
        prompt: &str,
        count: u8,
        aspect_ratio: AspectRatio,
        use_reference: bool,
    ) -> GenerationRequest {
        GenerationRequest::ImageGen {
            prompt: prompt.to_string(),
            count,
            aspect_ratio,
            reference: if use_reference { self.source.clone() } else { None },
        }
    }

    pub fn edit_request(&self, prompt: &str) -> Result<GenerationRequest, GenerationError> {
        Ok(GenerationRequest::GenerativeEdit {
            prompt: prompt.to_string(),
            source: self.require_source()?,
        })
    }

    pub fn inpaint_request(&self, prompt: &str) -> Result<GenerationRequest, GenerationError> {
        let source = self.require_source()?;
        if !self.mask.has_mask() {
            return Err(GenerationError::EmptyMask);
        }
        Ok(GenerationRequest::InpaintEdit {
            prompt: prompt.to_string(),
            source,
            mask: self.mask.persisted().pixels().clone(),
        })
    }

    pub fn upscale_request(
        &self,
        factor: UpscaleFactor,
        creativity: Creativity,
    ) -> Result<GenerationRequest, GenerationError> {
        Ok(GenerationRequest::Upscale {
            source: self.require_source()?,
            factor,
            creativity,
        })
    }

    pub fn video_request(
        &self,
        prompt: &str,
        aspect_ratio: VideoAspectRatio,
        use_source: bool,
    ) -> GenerationRequest {
        GenerationRequest::VideoGen {
            prompt: prompt.to_string(),
            source: if use_source { self.source.clone() } else { None },
            aspect_ratio,
        }
    }

    /// Assign output names to a finished generation.
    pub fn name_outputs(
        &mut self,
        output: GenerationOutput,
        has_reference: bool,
        source_name: Option<&str>,
    ) -> Vec<Artifact> {
        let kind = output.kind;
        output
            .outputs
            .into_iter()
            .map(|data| {
                let counter = self.namer.next(kind, has_reference);
                Artifact {
                    file_name: artifact_name(&self.brand, kind, source_name, counter),
                    data,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stroke::Point;
    use image::RgbaImage;

    fn image(name: &str, width: u32, height: u32) -> SourceImage {
        SourceImage::from_pixels(RgbaImage::new(width, height), Some(name.into())).unwrap()
    }

    fn output(kind: OperationKind, count: usize) -> GenerationOutput {
        GenerationOutput {
            kind,
            outputs: vec![EncodedImage::new(vec![1], "image/png"); count],
        }
    }

    #[test]
    fn test_artifact_names() {
        assert_eq!(
            artifact_name("maskforge", OperationKind::GenerativeEdit, Some("cat"), 3),
            "maskforge-edit-cat(3).png"
        );
        assert_eq!(
            artifact_name("maskforge", OperationKind::VideoGen, None, 1),
            "maskforge-video(1).mp4"
        );
    }

    #[test]
    fn test_counters_are_per_kind_and_reference() {
        let mut session = Session::new("mf", Some("key".into()));
        let names: Vec<_> = session
            .name_outputs(output(OperationKind::ImageGen, 2), false, None)
            .into_iter()
            .map(|a| a.file_name)
            .collect();
        assert_eq!(names, vec!["mf-image(1).png", "mf-image(2).png"]);

        let with_ref = session.name_outputs(output(OperationKind::ImageGen, 1), true, Some("dog"));
        assert_eq!(with_ref[0].file_name, "mf-image-dog(1).png");

        let again = session.name_outputs(output(OperationKind::ImageGen, 1), false, None);
        assert_eq!(again[0].file_name, "mf-image(3).png");
    }

    #[test]
    fn test_upload_resets_only_image_counters() {
        let mut session = Session::new("mf", None);
        session.name_outputs(output(OperationKind::ImageGen, 1), false, None);
        session.name_outputs(output(OperationKind::Upscale, 2), true, Some("a"));

        session.load_source(image("b", 8, 8));

        let upscale = session.name_outputs(output(OperationKind::Upscale, 1), true, Some("b"));
        assert_eq!(upscale[0].file_name, "mf-upscale-b(1).png");
        let plain = session.name_outputs(output(OperationKind::ImageGen, 1), false, None);
        assert_eq!(plain[0].file_name, "mf-image(2).png");
    }

    #[test]
    fn test_loading_gate() {
        let mut session = Session::new("mf", None);
        assert!(matches!(session.begin_loading(), Err(GenerationError::MissingCredential)));
        assert!(!session.is_loading());

        session.set_credential("  secret  ".into());
        assert_eq!(session.begin_loading().unwrap(), "secret");
        assert!(matches!(session.begin_loading(), Err(GenerationError::Busy)));

        session.finish_loading();
        assert!(session.begin_loading().is_ok());
    }

    #[test]
    fn test_import_in_flight_blocks_generation_and_editor() {
        let mut session = Session::new("mf", Some("key".into()));
        session.load_source(image("cat", 8, 8));

        session.begin_import();
        assert!(session.is_loading());
        assert!(matches!(session.begin_loading(), Err(GenerationError::Busy)));
        assert!(matches!(session.open_mask_editor(), Err(GenerationError::Busy)));
        assert!(!session.input.editor_open());

        session.load_source(image("dog", 8, 8));
        assert!(!session.is_loading());
        assert!(session.open_mask_editor().is_ok());
    }

    #[test]
    fn test_failed_import_releases_the_gate() {
        let mut session = Session::new("mf", Some("key".into()));
        session.begin_import();
        session.abort_import();
        assert!(!session.is_loading());
        assert!(session.begin_loading().is_ok());
        // A running generation is not cleared by an import ending.
        session.abort_import();
        assert!(session.is_loading());
    }

    #[test]
    fn test_reloading_same_stem_repeats_image_names() {
        let mut session = Session::new("mf", None);
        session.load_source(image("cat", 8, 8));
        let first = session.name_outputs(output(OperationKind::GenerativeEdit, 1), true, Some("cat"));
        session.load_source(image("cat", 8, 8));
        let second = session.name_outputs(output(OperationKind::GenerativeEdit, 1), true, Some("cat"));
        // Same name again; io::media::save_artifact keeps both files.
        assert_eq!(first[0].file_name, second[0].file_name);
    }

    #[test]
    fn test_blank_credential_is_treated_as_missing() {
        let mut session = Session::new("mf", Some("   ".into()));
        assert_eq!(session.credential(), None);
        session.set_credential(String::new());
        assert!(matches!(session.begin_loading(), Err(GenerationError::MissingCredential)));
    }

    #[test]
    fn test_new_source_clears_mask() {
        let mut session = Session::new("mf", None);
        session.load_source(image("a", 32, 32));
        session.open_mask_editor().unwrap();
        session.mask.begin_stroke(Point::new(4.0, 4.0));
        assert!(session.save_mask());

        session.load_source(image("b", 16, 8));
        assert!(!session.mask.has_mask());
        assert_eq!(session.mask.persisted().dimensions(), (16, 8));
        assert!(matches!(session.inpaint_request("x"), Err(GenerationError::EmptyMask)));
    }

    #[test]
    fn test_cancel_mask_keeps_saved_mask() {
        let mut session = Session::new("mf", None);
        session.load_source(image("a", 32, 32));
        session.open_mask_editor().unwrap();
        session.mask.begin_stroke(Point::new(4.0, 4.0));
        session.save_mask();

        session.open_mask_editor().unwrap();
        session.mask.clear();
        session.cancel_mask();
        assert!(session.mask.has_mask());
        assert!(session.mask.compute_has_mask());
        assert!(!session.input.editor_open());
    }

    #[test]
    fn test_requests_need_a_source() {
        let session = Session::new("mf", None);
        assert!(matches!(session.edit_request("x"), Err(GenerationError::MissingSource)));
        assert!(matches!(
            session.upscale_request(UpscaleFactor::Percent200, Creativity::Low),
            Err(GenerationError::MissingSource)
        ));
        let request = session.image_request("x", 1, AspectRatio::Square, true);
        assert!(!request.has_reference());
    }

    #[test]
    fn test_inpaint_request_carries_saved_mask() {
        let mut session = Session::new("mf", None);
        session.load_source(image("a", 10, 10));
        session.open_mask_editor().unwrap();
        session.mask.begin_stroke(Point::new(5.0, 5.0));
        session.save_mask();

        let GenerationRequest::InpaintEdit { mask, source, .. } = session.inpaint_request("fill").unwrap() else {
            panic!("inpaint request expected");
        };
        assert_eq!(mask.dimensions(), (10, 10));
        assert_eq!(source.name.as_deref(), Some("a"));
    }
}
