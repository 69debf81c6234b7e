// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Generation request types.
//!
//! A [`GenerationRequest`] is built fresh for each user action and carries
//! everything the orchestrator needs to issue the remote call.

use super::image::SourceImage;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kind of remote operation, also used for output naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    ImageGen,
    GenerativeEdit,
    InpaintEdit,
    Upscale,
    VideoGen,
}

impl OperationKind {
    /// Short name used in output file names.
    pub fn slug(&self) -> &'static str {
        match self {
            OperationKind::ImageGen => "image",
            OperationKind::GenerativeEdit => "edit",
            OperationKind::InpaintEdit => "inpaint",
            OperationKind::Upscale => "upscale",
            OperationKind::VideoGen => "video",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OperationKind::VideoGen => "mp4",
            _ => "png",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::ImageGen => "Generate Image",
            OperationKind::GenerativeEdit => "Edit Image",
            OperationKind::InpaintEdit => "Inpaint Masked Area",
            OperationKind::Upscale => "Upscale",
            OperationKind::VideoGen => "Generate Video",
        }
    }

    pub fn all() -> &'static [OperationKind] {
        &[
            OperationKind::ImageGen,
            OperationKind::GenerativeEdit,
            OperationKind::InpaintEdit,
            OperationKind::Upscale,
            OperationKind::VideoGen,
        ]
    }
}

/// Aspect ratios accepted by the image generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape4x3,
    Portrait3x4,
    Landscape16x9,
    Portrait9x16,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Portrait9x16 => "9:16",
        }
    }

    pub fn all() -> &'static [AspectRatio] {
        &[
            AspectRatio::Square,
            AspectRatio::Landscape4x3,
            AspectRatio::Portrait3x4,
            AspectRatio::Landscape16x9,
            AspectRatio::Portrait9x16,
        ]
    }
}

/// Aspect ratios accepted by the video model; also the letterbox targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoAspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl VideoAspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoAspectRatio::Landscape => "16:9",
            VideoAspectRatio::Portrait => "9:16",
        }
    }

    /// Width divided by height.
    pub fn ratio(&self) -> f64 {
        match self {
            VideoAspectRatio::Landscape => 16.0 / 9.0,
            VideoAspectRatio::Portrait => 9.0 / 16.0,
        }
    }
}

/// How freely the upscaler may invent detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Creativity {
    Low,
    #[default]
    Medium,
    High,
}

impl Creativity {
    pub fn label(&self) -> &'static str {
        match self {
            Creativity::Low => "Low",
            Creativity::Medium => "Medium",
            Creativity::High => "High",
        }
    }

    pub(crate) fn instruction(&self) -> &'static str {
        match self {
            Creativity::Low => "Stay strictly faithful to the original; only sharpen existing detail.",
            Creativity::Medium => "Add plausible fine detail where the original is soft.",
            Creativity::High => "Freely enrich textures and fine detail while keeping the subject recognisable.",
        }
    }

    pub fn all() -> &'static [Creativity] {
        &[Creativity::Low, Creativity::Medium, Creativity::High]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpscaleFactor {
    Percent150,
    #[default]
    Percent200,
    Percent300,
    Percent400,
}

impl UpscaleFactor {
    pub fn percent(&self) -> u32 {
        match self {
            UpscaleFactor::Percent150 => 150,
            UpscaleFactor::Percent200 => 200,
            UpscaleFactor::Percent300 => 300,
            UpscaleFactor::Percent400 => 400,
        }
    }

    pub fn all() -> &'static [UpscaleFactor] {
        &[
            UpscaleFactor::Percent150,
            UpscaleFactor::Percent200,
            UpscaleFactor::Percent300,
            UpscaleFactor::Percent400,
        ]
    }
}

/// One blocking threshold applied to every harm category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyThreshold {
    BlockNone,
    BlockOnlyHigh,
    #[default]
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

impl SafetyThreshold {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SafetyThreshold::BlockNone => "BLOCK_NONE",
            SafetyThreshold::BlockOnlyHigh => "BLOCK_ONLY_HIGH",
            SafetyThreshold::BlockMediumAndAbove => "BLOCK_MEDIUM_AND_ABOVE",
            SafetyThreshold::BlockLowAndAbove => "BLOCK_LOW_AND_ABOVE",
        }
    }
}

pub const MIN_IMAGE_COUNT: u8 = 1;
pub const MAX_IMAGE_COUNT: u8 = 4;

#[derive(Debug, Clone)]
pub enum GenerationRequest {
    ImageGen {
        prompt: String,
        count: u8,
        aspect_ratio: AspectRatio,
        reference: Option<Arc<SourceImage>>,
    },
    GenerativeEdit {
        prompt: String,
        source: Arc<SourceImage>,
    },
    InpaintEdit {
        prompt: String,
        source: Arc<SourceImage>,
        mask: RgbaImage,
    },
    Upscale {
        source: Arc<SourceImage>,
        factor: UpscaleFactor,
        creativity: Creativity,
    },
    VideoGen {
        prompt: String,
        source: Option<Arc<SourceImage>>,
        aspect_ratio: VideoAspectRatio,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            GenerationRequest::ImageGen { .. } => OperationKind::ImageGen,
            GenerationRequest::GenerativeEdit { .. } => OperationKind::GenerativeEdit,
            GenerationRequest::InpaintEdit { .. } => OperationKind::InpaintEdit,
            GenerationRequest::Upscale { .. } => OperationKind::Upscale,
            GenerationRequest::VideoGen { .. } => OperationKind::VideoGen,
        }
    }

    /// The image the request was derived from, if any.
    pub fn reference(&self) -> Option<&SourceImage> {
        match self {
            GenerationRequest::ImageGen { reference, .. } => reference.as_deref(),
            GenerationRequest::VideoGen { source, .. } => source.as_deref(),
            GenerationRequest::GenerativeEdit { source, .. }
            | GenerationRequest::InpaintEdit { source, .. }
            | GenerationRequest::Upscale { source, .. } => Some(source),
        }
    }

    pub fn has_reference(&self) -> bool {
        self.reference().is_some()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.reference().and_then(|source| source.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> Arc<SourceImage> {
        Arc::new(SourceImage::from_pixels(RgbaImage::new(2, 2), Some("dog".into())).unwrap())
    }

    #[test]
    fn test_reference_tracking() {
        let plain = GenerationRequest::ImageGen {
            prompt: "a lighthouse".into(),
            count: 2,
            aspect_ratio: AspectRatio::Landscape16x9,
            reference: None,
        };
        assert_eq!(plain.kind(), OperationKind::ImageGen);
        assert!(!plain.has_reference());
        assert_eq!(plain.source_name(), None);

        let upscale = GenerationRequest::Upscale {
            source: source(),
            factor: UpscaleFactor::Percent300,
            creativity: Creativity::Low,
        };
        assert!(upscale.has_reference());
        assert_eq!(upscale.source_name(), Some("dog"));
    }

    #[test]
    fn test_safety_threshold_serializes_snake_case() {
        let yaml = serde_yaml::to_string(&SafetyThreshold::BlockOnlyHigh).unwrap();
        assert_eq!(yaml.trim(), "block_only_high");
    }
}
