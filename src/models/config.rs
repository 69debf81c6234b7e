// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration.
//!
//! Loaded once at startup from a YAML or JSON file. The API credential is
//! not part of the configuration; see `io::storage`.

use super::mask::DEFAULT_BRUSH_WIDTH;
use super::request::SafetyThreshold;
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix of every output file name.
    pub brand: String,
    pub api_base_url: String,
    pub image_model: String,
    pub content_model: String,
    pub video_model: String,
    pub safety_threshold: SafetyThreshold,
    pub default_brush_width: f64,
    /// Where generated artifacts are saved. `None` means the downloads folder.
    pub output_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            brand: "maskforge".to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            image_model: "imagen-4.0-generate-001".to_string(),
            content_model: "gemini-2.5-flash-image".to_string(),
            video_model: "veo-3.0-generate-001".to_string(),
            safety_threshold: SafetyThreshold::default(),
            default_brush_width: DEFAULT_BRUSH_WIDTH,
            output_dir: None,
        }
    }
}
