// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! HTTP client for the Generative Language REST API.
//!
//! Images come from the `:predict` endpoint of an Imagen model, edits from
//! `:generateContent`, and videos from `:predictLongRunning` followed by
//! operation polling.

use super::{
    ApiError, ContentRequest, ContentResponse, GenerativeApi, ImagesRequest, Part, VideoOperation,
    VideosRequest, SAFETY_CATEGORIES,
};
use crate::models::config::AppConfig;
use crate::models::image::EncodedImage;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    image_model: String,
    content_model: String,
    video_model: String,
}

impl GeminiClient {
    pub fn new(config: &AppConfig, api_key: String) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("maskforge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            image_model: config.image_model.clone(),
            content_model: config.content_model.clone(),
            video_model: config.video_model.clone(),
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        read_json(response).await
    }

    async fn get_json(&self, url: &str) -> Result<Value, ApiError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, ApiError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::from_response(status.as_u16(), &body));
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Append the credential as a `key` query parameter.
pub fn with_key(uri: &str, api_key: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, api_key)
}

impl GenerativeApi for GeminiClient {
    async fn generate_images(&self, request: &ImagesRequest) -> Result<Vec<EncodedImage>, ApiError> {
        let body = json!({
            "instances": [{ "prompt": request.prompt }],
            "parameters": {
                "sampleCount": request.count,
                "aspectRatio": request.aspect_ratio,
                "outputOptions": { "mimeType": request.output_mime },
            },
        });
        let value = self
            .post_json(&self.model_url(&self.image_model, "predict"), &body)
            .await?;
        let response: PredictResponse = decode(value)?;
        response
            .predictions
            .into_iter()
            .filter_map(|p| p.bytes_base64_encoded.map(|data| (data, p.mime_type)))
            .map(|(data, mime)| {
                let mime = mime.unwrap_or_else(|| request.output_mime.clone());
                EncodedImage::from_base64(&data, mime).map_err(|e| ApiError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse, ApiError> {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                Part::Text(text) => json!({ "text": text }),
                Part::InlineImage(image) => json!({
                    "inlineData": { "mimeType": image.mime_type, "data": image.to_base64() }
                }),
            })
            .collect();
        let modalities: Vec<&str> = request.modalities.iter().map(|m| m.as_api_str()).collect();
        let safety: Vec<Value> = SAFETY_CATEGORIES
            .iter()
            .map(|category| json!({ "category": category, "threshold": request.safety.as_api_str() }))
            .collect();
        let body = json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": { "responseModalities": modalities },
            "safetySettings": safety,
        });

        let value = self
            .post_json(&self.model_url(&self.content_model, "generateContent"), &body)
            .await?;
        let response: GenerateContentResponse = decode(value)?;
        let mut out = ContentResponse::default();
        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();
        for part in parts {
            if let Some(text) = part.text {
                out.text.get_or_insert_with(String::new).push_str(&text);
            }
            if let Some(inline) = part.inline_data {
                if out.image.is_none() {
                    out.image = Some(
                        EncodedImage::from_base64(&inline.data, inline.mime_type)
                            .map_err(|e| ApiError::Decode(e.to_string()))?,
                    );
                }
            }
        }
        Ok(out)
    }

    async fn generate_videos(&self, request: &VideosRequest) -> Result<VideoOperation, ApiError> {
        let mut instance = json!({ "prompt": request.prompt });
        if let Some(image) = &request.image {
            instance["image"] = json!({
                "bytesBase64Encoded": image.to_base64(),
                "mimeType": image.mime_type,
            });
        }
        let body = json!({
            "instances": [instance],
            "parameters": {
                "aspectRatio": request.aspect_ratio,
                "sampleCount": request.count,
            },
        });
        let value = self
            .post_json(&self.model_url(&self.video_model, "predictLongRunning"), &body)
            .await?;
        Ok(decode::<OperationResponse>(value)?.into_operation())
    }

    async fn poll_operation(&self, operation: &VideoOperation) -> Result<VideoOperation, ApiError> {
        let url = format!("{}/{}", self.base_url, operation.name);
        let value = self.get_json(&url).await?;
        let mut polled = decode::<OperationResponse>(value)?.into_operation();
        if polled.name.is_empty() {
            polled.name = operation.name.clone();
        }
        Ok(polled)
    }

    async fn fetch_video(&self, uri: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(with_key(uri, &self.api_key)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    done: bool,
    metadata: Option<OperationMetadata>,
    response: Option<OperationResult>,
    error: Option<OperationError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationMetadata {
    progress_percent: Option<f64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateVideoResponse {
    #[serde(default)]
    generated_samples: Vec<GeneratedSample>,
}

#[derive(Deserialize)]
struct GeneratedSample {
    video: Option<VideoRef>,
}

#[derive(Deserialize)]
struct VideoRef {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl OperationResponse {
    fn into_operation(self) -> VideoOperation {
        let video_uris = self
            .response
            .and_then(|r| r.generate_video_response)
            .map(|r| {
                r.generated_samples
                    .into_iter()
                    .filter_map(|s| s.video.and_then(|v| v.uri))
                    .collect()
            })
            .unwrap_or_default();
        VideoOperation {
            name: self.name,
            done: self.done,
            progress_percent: self.metadata.and_then(|m| m.progress_percent),
            video_uris,
            error: self.error.map(|e| e.message),
        }
    }
}
