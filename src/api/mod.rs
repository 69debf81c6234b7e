// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Boundary to the remote generative model service.
//!
//! The orchestrator only sees the [`GenerativeApi`] trait; [`gemini`] holds
//! the HTTP implementation.

pub mod error;
pub mod gemini;

pub use error::ApiError;

use crate::models::image::EncodedImage;
use crate::models::request::SafetyThreshold;

/// Harm categories a safety threshold is applied to.
pub const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage(EncodedImage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagesRequest {
    pub prompt: String,
    pub count: u8,
    pub output_mime: String,
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub parts: Vec<Part>,
    pub modalities: Vec<Modality>,
    pub safety: SafetyThreshold,
}

/// First candidate of a content response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentResponse {
    pub image: Option<EncodedImage>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideosRequest {
    pub prompt: String,
    pub image: Option<EncodedImage>,
    pub count: u8,
    pub aspect_ratio: String,
}

/// Handle to a long-running video job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoOperation {
    pub name: String,
    pub done: bool,
    pub progress_percent: Option<f64>,
    pub video_uris: Vec<String>,
    pub error: Option<String>,
}

/// Contract of the remote service.
#[allow(async_fn_in_trait)]
pub trait GenerativeApi {
    async fn generate_images(&self, request: &ImagesRequest) -> Result<Vec<EncodedImage>, ApiError>;

    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse, ApiError>;

    async fn generate_videos(&self, request: &VideosRequest) -> Result<VideoOperation, ApiError>;

    async fn poll_operation(&self, operation: &VideoOperation) -> Result<VideoOperation, ApiError>;

    /// Download a finished video. Fails unless the response status is OK.
    async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, ApiError>;
}

impl<T: GenerativeApi> GenerativeApi for &T {
    async fn generate_images(&self, request: &ImagesRequest) -> Result<Vec<EncodedImage>, ApiError> {
        (**self).generate_images(request).await
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse, ApiError> {
        (**self).generate_content(request).await
    }

    async fn generate_videos(&self, request: &VideosRequest) -> Result<VideoOperation, ApiError> {
        (**self).generate_videos(request).await
    }

    async fn poll_operation(&self, operation: &VideoOperation) -> Result<VideoOperation, ApiError> {
        (**self).poll_operation(operation).await
    }

    async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, ApiError> {
        (**self).fetch_video(uri).await
    }
}
