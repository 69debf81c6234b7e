// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Runs one generation request against the remote API.
//!
//! Each call goes `Attempting(n) -> Success | Retrying(n + 1) | Exhausted`.
//! Transport errors and empty results both count as failed attempts; the
//! same payload is re-sent after a fixed delay. Progress is reported through
//! [`StatusEvent`]s rather than written to any UI directly.

use super::retry::{RetryDecision, RetryPolicy, RetryState, POLL_INTERVAL};
use super::GenerationError;
use crate::api::{
    ApiError, ContentRequest, GenerativeApi, ImagesRequest, Modality, Part, VideoOperation,
    VideosRequest,
};
use crate::models::image::{EncodedImage, PNG_MIME};
use crate::models::request::{GenerationRequest, OperationKind, SafetyThreshold, MAX_IMAGE_COUNT, MIN_IMAGE_COUNT};
use crate::ops::compositing::{self, CompositeError};
use crate::util::geometry::round_half_up;
use std::time::Duration;

pub const VIDEO_MIME: &str = "video/mp4";

/// Synthetic progress step used when the operation reports none.
const PROGRESS_STEP: f64 = 5.0;
const PROGRESS_CAP: f64 = 99.0;

/// Suspension used for retry backoff and poll intervals.
#[allow(async_fn_in_trait)]
pub trait Delay {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

impl<T: Delay> Delay for &T {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await;
    }
}

/// Progress notification for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    Attempt { attempt: u32, max_attempts: u32 },
    AttemptFailed { attempt: u32, message: String },
    RetryScheduled { next_attempt: u32, delay: Duration },
    VideoProgress { percent: f64 },
    Succeeded { outputs: usize },
    Failed { message: String },
}

impl StatusEvent {
    pub fn message(&self) -> String {
        match self {
            StatusEvent::Attempt {
                attempt,
                max_attempts,
            } => {
                if *attempt == 1 {
                    "Generating...".to_string()
                } else {
                    format!("Retrying (attempt {} of {})...", attempt, max_attempts)
                }
            }
            StatusEvent::AttemptFailed { attempt, message } => {
                format!("Attempt {} failed: {}", attempt, message)
            }
            StatusEvent::RetryScheduled { next_attempt, delay } => {
                format!("Retrying in {}s (attempt {})...", delay.as_secs(), next_attempt)
            }
            StatusEvent::VideoProgress { percent } => format!("Generating video... {:.0}%", percent),
            StatusEvent::Succeeded { outputs } => format!("Done: {} result(s).", outputs),
            StatusEvent::Failed { message } => message.clone(),
        }
    }
}

/// Successful result, not yet named.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub kind: OperationKind,
    pub outputs: Vec<EncodedImage>,
}

/// A request turned into the exact remote call(s) it needs.
#[derive(Debug, Clone)]
enum Payload {
    Images(ImagesRequest),
    Content {
        request: ContentRequest,
        repeat: u8,
        resize_to: Option<(u32, u32)>,
    },
    Video(VideosRequest),
}

#[derive(Debug)]
enum AttemptError {
    Api(ApiError),
    Composite(CompositeError),
}

impl From<ApiError> for AttemptError {
    fn from(err: ApiError) -> Self {
        AttemptError::Api(err)
    }
}

pub struct Orchestrator<A, D = TokioDelay> {
    api: A,
    delay: D,
    policy: RetryPolicy,
    poll_interval: Duration,
    safety: SafetyThreshold,
}

impl<A: GenerativeApi, D: Delay> Orchestrator<A, D> {
    pub fn new(api: A, delay: D, safety: SafetyThreshold) -> Self {
        Self {
            api,
            delay,
            policy: RetryPolicy::default(),
            poll_interval: POLL_INTERVAL,
            safety,
        }
    }

    /// Run `request` to success or retry exhaustion.
    ///
    /// Payload preparation errors are returned immediately and never retried.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        mut on_status: impl FnMut(StatusEvent),
    ) -> Result<GenerationOutput, GenerationError> {
        let kind = request.kind();
        let payload = self.prepare(request)?;
        let mut retry = RetryState::new();

        loop {
            let attempt = retry.attempt();
            log::info!("{} attempt {}/{}", kind.slug(), attempt, self.policy.max_attempts);
            on_status(StatusEvent::Attempt {
                attempt,
                max_attempts: self.policy.max_attempts,
            });

            let err = match self.attempt(&payload, &mut on_status).await {
                Ok(outputs) => {
                    log::info!("{} succeeded with {} output(s)", kind.slug(), outputs.len());
                    on_status(StatusEvent::Succeeded {
                        outputs: outputs.len(),
                    });
                    return Ok(GenerationOutput { kind, outputs });
                }
                Err(AttemptError::Composite(err)) => {
                    log::error!("{} failed to post-process result: {}", kind.slug(), err);
                    on_status(StatusEvent::Failed {
                        message: err.to_string(),
                    });
                    return Err(err.into());
                }
                Err(AttemptError::Api(err)) => err,
            };

            let message = err.user_message();
            log::warn!("{} attempt {} failed: {}", kind.slug(), attempt, err);
            on_status(StatusEvent::AttemptFailed {
                attempt,
                message: message.clone(),
            });

            match retry.record_failure(message, &self.policy) {
                RetryDecision::Retry {
                    next_attempt,
                    delay,
                } => {
                    on_status(StatusEvent::RetryScheduled {
                        next_attempt,
                        delay,
                    });
                    self.delay.sleep(delay).await;
                }
                RetryDecision::Exhausted => {
                    let message = retry.last_error().unwrap_or_default().to_string();
                    log::error!("{} gave up after {} attempts: {}", kind.slug(), attempt, message);
                    let err = GenerationError::Exhausted {
                        attempts: attempt,
                        message,
                    };
                    on_status(StatusEvent::Failed {
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }
    }

    fn prepare(&self, request: &GenerationRequest) -> Result<Payload, GenerationError> {
        let payload = match request {
            GenerationRequest::ImageGen {
                prompt,
                count,
                aspect_ratio,
                reference,
            } => {
                let prompt = require_prompt(prompt)?;
                let count = (*count).clamp(MIN_IMAGE_COUNT, MAX_IMAGE_COUNT);
                match reference {
                    None => Payload::Images(ImagesRequest {
                        prompt,
                        count,
                        output_mime: PNG_MIME.to_string(),
                        aspect_ratio: aspect_ratio.as_str().to_string(),
                    }),
                    Some(source) => Payload::Content {
                        request: self.content_request(
                            source.encoded.clone(),
                            format!(
                                "Using the attached image as a reference, {}\nUse a {} aspect ratio.",
                                prompt,
                                aspect_ratio.as_str()
                            ),
                        ),
                        repeat: count,
                        resize_to: None,
                    },
                }
            }
            GenerationRequest::GenerativeEdit { prompt, source } => Payload::Content {
                request: self.content_request(source.encoded.clone(), require_prompt(prompt)?),
                repeat: 1,
                resize_to: None,
            },
            GenerationRequest::InpaintEdit {
                prompt,
                source,
                mask,
            } => {
                let prompt = require_prompt(prompt)?;
                let punched = compositing::punch_hole(&source.pixels, mask)?;
                Payload::Content {
                    request: self.content_request(punched, inpaint_instruction(&prompt)),
                    repeat: 1,
                    resize_to: None,
                }
            }
            GenerationRequest::Upscale {
                source,
                factor,
                creativity,
            } => {
                let percent = factor.percent() as f64 / 100.0;
                let target = (
                    round_half_up(source.natural_width() as f64 * percent),
                    round_half_up(source.natural_height() as f64 * percent),
                );
                let instruction = format!(
                    "Upscale this image to {}% of its resolution ({}x{} pixels). {} \
                     Preserve the composition, subject and colours exactly.",
                    factor.percent(),
                    target.0,
                    target.1,
                    creativity.instruction()
                );
                Payload::Content {
                    request: self.content_request(source.encoded.clone(), instruction),
                    repeat: 1,
                    resize_to: Some(target),
                }
            }
            GenerationRequest::VideoGen {
                prompt,
                source,
                aspect_ratio,
            } => {
                let image = source
                    .as_ref()
                    .map(|s| compositing::letterbox(&s.pixels, *aspect_ratio))
                    .transpose()?;
                Payload::Video(VideosRequest {
                    prompt: require_prompt(prompt)?,
                    image,
                    count: 1,
                    aspect_ratio: aspect_ratio.as_str().to_string(),
                })
            }
        };
        Ok(payload)
    }

    fn content_request(&self, image: EncodedImage, text: String) -> ContentRequest {
        ContentRequest {
            parts: vec![Part::InlineImage(image), Part::Text(text)],
            modalities: vec![Modality::Text, Modality::Image],
            safety: self.safety,
        }
    }

    async fn attempt(
        &self,
        payload: &Payload,
        on_status: &mut impl FnMut(StatusEvent),
    ) -> Result<Vec<EncodedImage>, AttemptError> {
        match payload {
            Payload::Images(request) => {
                let images = self.api.generate_images(request).await?;
                if images.is_empty() {
                    return Err(ApiError::EmptyResult("The model returned no images.".into()).into());
                }
                Ok(images)
            }
            Payload::Content {
                request,
                repeat,
                resize_to,
            } => {
                let mut images = Vec::new();
                let mut reply = None;
                for _ in 0..*repeat {
                    let response = self.api.generate_content(request).await?;
                    match response.image {
                        Some(image) => images.push(image),
                        None => reply = response.text.or(reply),
                    }
                }
                if images.is_empty() {
                    let message = match reply {
                        Some(text) => format!("The model returned no image: {}", text.trim()),
                        None => "The model returned no image.".to_string(),
                    };
                    return Err(ApiError::EmptyResult(message).into());
                }
                match resize_to {
                    Some((width, height)) => images
                        .iter()
                        .map(|image| {
                            let pixels = image.decode().map_err(|e| ApiError::Decode(e.to_string()))?;
                            compositing::resize_exact(&pixels, *width, *height)
                                .map_err(AttemptError::Composite)
                        })
                        .collect(),
                    None => Ok(images),
                }
            }
            Payload::Video(request) => self.generate_video(request, on_status).await,
        }
    }

    /// Start the job, poll it to completion, then download the result.
    async fn generate_video(
        &self,
        request: &VideosRequest,
        on_status: &mut impl FnMut(StatusEvent),
    ) -> Result<Vec<EncodedImage>, AttemptError> {
        let mut operation: VideoOperation = self.api.generate_videos(request).await?;
        let mut progress = 0.0;
        while !operation.done {
            self.delay.sleep(self.poll_interval).await;
            operation = self.api.poll_operation(&operation).await?;
            progress = match operation.progress_percent {
                Some(reported) => reported,
                None => (progress + PROGRESS_STEP).min(PROGRESS_CAP),
            };
            log::info!("Video operation {}: {:.0}%", operation.name, progress);
            on_status(StatusEvent::VideoProgress { percent: progress });
        }

        if let Some(message) = operation.error {
            return Err(ApiError::Remote {
                http_status: None,
                status: None,
                message,
            }
            .into());
        }
        let Some(uri) = operation.video_uris.first() else {
            return Err(ApiError::EmptyResult("The model returned no videos.".into()).into());
        };
        let bytes = self.api.fetch_video(uri).await?;
        if bytes.is_empty() {
            return Err(ApiError::EmptyResult("The downloaded video was empty.".into()).into());
        }
        Ok(vec![EncodedImage::new(bytes, VIDEO_MIME)])
    }
}

fn require_prompt(prompt: &str) -> Result<String, GenerationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(GenerationError::EmptyPrompt);
    }
    Ok(prompt.to_string())
}

fn inpaint_instruction(prompt: &str) -> String {
    format!(
        "The attached image has a transparent region. Fill only the transparent region: {} \
         Keep every opaque pixel exactly as it is and blend the new content seamlessly.",
        prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ContentResponse, VideoOperation};
    use crate::generation::retry::RETRY_DELAY;
    use crate::models::image::SourceImage;
    use crate::models::request::{AspectRatio, Creativity, UpscaleFactor, VideoAspectRatio};
    use crate::ops::compositing::encode_png;
    use image::{Rgba, RgbaImage};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::sync::Arc;

    type Scripted<T> = RefCell<VecDeque<Result<T, ApiError>>>;

    #[derive(Default)]
    struct FakeApi {
        images: Scripted<Vec<EncodedImage>>,
        content: Scripted<ContentResponse>,
        videos: Scripted<VideoOperation>,
        polls: Scripted<VideoOperation>,
        fetches: Scripted<Vec<u8>>,
        image_calls: Cell<u32>,
        content_requests: RefCell<Vec<ContentRequest>>,
        video_requests: RefCell<Vec<VideosRequest>>,
        poll_calls: Cell<u32>,
    }

    fn next<T>(queue: &Scripted<T>) -> Result<T, ApiError> {
        queue
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Transport("connection reset".into())))
    }

    impl GenerativeApi for FakeApi {
        async fn generate_images(&self, _request: &ImagesRequest) -> Result<Vec<EncodedImage>, ApiError> {
            self.image_calls.set(self.image_calls.get() + 1);
            next(&self.images)
        }

        async fn generate_content(&self, request: &ContentRequest) -> Result<ContentResponse, ApiError> {
            self.content_requests.borrow_mut().push(request.clone());
            next(&self.content)
        }

        async fn generate_videos(&self, request: &VideosRequest) -> Result<VideoOperation, ApiError> {
            self.video_requests.borrow_mut().push(request.clone());
            next(&self.videos)
        }

        async fn poll_operation(&self, _operation: &VideoOperation) -> Result<VideoOperation, ApiError> {
            self.poll_calls.set(self.poll_calls.get() + 1);
            next(&self.polls)
        }

        async fn fetch_video(&self, _uri: &str) -> Result<Vec<u8>, ApiError> {
            next(&self.fetches)
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        sleeps: RefCell<Vec<Duration>>,
    }

    impl Delay for RecordingDelay {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }

    fn png(width: u32, height: u32) -> EncodedImage {
        encode_png(&RgbaImage::from_pixel(width, height, Rgba([9, 9, 9, 255]))).unwrap()
    }

    fn source(width: u32, height: u32) -> Arc<SourceImage> {
        let pixels = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 255]));
        Arc::new(SourceImage::from_pixels(pixels, Some("photo".into())).unwrap())
    }

    fn image_request() -> GenerationRequest {
        GenerationRequest::ImageGen {
            prompt: "a red fox in snow".into(),
            count: 2,
            aspect_ratio: AspectRatio::Square,
            reference: None,
        }
    }

    fn pending(name: &str, progress: Option<f64>) -> VideoOperation {
        VideoOperation {
            name: name.into(),
            done: false,
            progress_percent: progress,
            ..Default::default()
        }
    }

    fn finished(uri: &str) -> VideoOperation {
        VideoOperation {
            name: "operations/1".into(),
            done: true,
            video_uris: vec![uri.into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_ten_failures_exhaust_retries() {
        let api = FakeApi::default();
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut events = Vec::new();

        let result = orchestrator.run(&image_request(), |e| events.push(e)).await;

        match result {
            Err(GenerationError::Exhausted { attempts, message }) => {
                assert_eq!(attempts, 10);
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(api.image_calls.get(), 10);
        assert_eq!(*delay.sleeps.borrow(), vec![Duration::from_secs(5); 9]);
        assert!(matches!(events.last(), Some(StatusEvent::Failed { .. })));
        assert_eq!(
            events.iter().filter(|e| matches!(e, StatusEvent::Attempt { .. })).count(),
            10
        );
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let api = FakeApi::default();
        api.images.borrow_mut().extend([
            Err(ApiError::from_response(503, r#"{"error":{"code":503,"message":"overloaded"}}"#)),
            Err(ApiError::Transport("timeout".into())),
            Ok(vec![png(4, 4), png(4, 4)]),
        ]);
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());

        let output = orchestrator.run(&image_request(), |_| {}).await.unwrap();
        assert_eq!(output.kind, OperationKind::ImageGen);
        assert_eq!(output.outputs.len(), 2);
        assert_eq!(api.image_calls.get(), 3);
        assert_eq!(delay.sleeps.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_retried() {
        let api = FakeApi::default();
        api.images.borrow_mut().extend([Ok(vec![]), Ok(vec![png(2, 2)])]);
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut failures = Vec::new();

        let output = orchestrator
            .run(&image_request(), |e| {
                if let StatusEvent::AttemptFailed { message, .. } = e {
                    failures.push(message);
                }
            })
            .await
            .unwrap();

        assert_eq!(output.outputs.len(), 1);
        assert_eq!(failures, vec!["The model returned no images.".to_string()]);
    }

    #[tokio::test]
    async fn test_quota_error_uses_distinct_message() {
        let api = FakeApi::default();
        api.images.borrow_mut().push_back(Err(ApiError::from_response(
            429,
            r#"{"error":{"code":429,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#,
        )));
        api.images.borrow_mut().push_back(Ok(vec![png(1, 1)]));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut events = Vec::new();

        orchestrator.run(&image_request(), |e| events.push(e)).await.unwrap();
        assert!(events.contains(&StatusEvent::AttemptFailed {
            attempt: 1,
            message: crate::api::error::QUOTA_MESSAGE.to_string(),
        }));
    }

    #[tokio::test]
    async fn test_video_polls_until_done() {
        let api = FakeApi::default();
        api.videos.borrow_mut().push_back(Ok(pending("operations/1", None)));
        api.polls.borrow_mut().extend([
            Ok(pending("operations/1", None)),
            Ok(pending("operations/1", None)),
            Ok(finished("https://files/v1")),
        ]);
        api.fetches.borrow_mut().push_back(Ok(vec![0, 0, 0, 24, b'f', b't', b'y', b'p']));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut progress = Vec::new();

        let request = GenerationRequest::VideoGen {
            prompt: "waves at dusk".into(),
            source: None,
            aspect_ratio: VideoAspectRatio::Landscape,
        };
        let output = orchestrator
            .run(&request, |e| {
                if let StatusEvent::VideoProgress { percent } = e {
                    progress.push(percent);
                }
            })
            .await
            .unwrap();

        assert_eq!(api.poll_calls.get(), 3);
        assert_eq!(*delay.sleeps.borrow(), vec![POLL_INTERVAL; 3]);
        assert_eq!(progress, vec![5.0, 10.0, 15.0]);
        assert_eq!(output.outputs[0].mime_type, VIDEO_MIME);
    }

    #[tokio::test]
    async fn test_video_progress_prefers_reported_value() {
        let api = FakeApi::default();
        api.videos.borrow_mut().push_back(Ok(pending("operations/1", None)));
        api.polls.borrow_mut().extend([
            Ok(pending("operations/1", Some(62.0))),
            Ok(finished("https://files/v1")),
        ]);
        api.fetches.borrow_mut().push_back(Ok(vec![1]));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut progress = Vec::new();

        let request = GenerationRequest::VideoGen {
            prompt: "waves".into(),
            source: None,
            aspect_ratio: VideoAspectRatio::Portrait,
        };
        orchestrator
            .run(&request, |e| {
                if let StatusEvent::VideoProgress { percent } = e {
                    progress.push(percent);
                }
            })
            .await
            .unwrap();
        assert_eq!(progress, vec![62.0, 67.0]);
    }

    #[tokio::test]
    async fn test_failed_download_restarts_whole_video_sequence() {
        let api = FakeApi::default();
        api.videos.borrow_mut().extend([
            Ok(finished("https://files/v1")),
            Ok(finished("https://files/v2")),
        ]);
        api.fetches.borrow_mut().extend([
            Err(ApiError::HttpStatus {
                status: 404,
                body: String::new(),
            }),
            Ok(vec![7, 7, 7]),
        ]);
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());

        let request = GenerationRequest::VideoGen {
            prompt: "a comet".into(),
            source: Some(source(100, 50)),
            aspect_ratio: VideoAspectRatio::Portrait,
        };
        let output = orchestrator.run(&request, |_| {}).await.unwrap();

        assert_eq!(output.outputs[0].bytes, vec![7, 7, 7]);
        assert_eq!(api.video_requests.borrow().len(), 2);
        assert_eq!(*delay.sleeps.borrow(), vec![Duration::from_secs(5)]);

        let sent = api.video_requests.borrow()[0].image.clone().unwrap();
        let letterboxed = sent.decode().unwrap();
        assert_eq!(letterboxed.dimensions(), (100, 178));
    }

    #[tokio::test]
    async fn test_failed_poll_restarts_whole_video_sequence() {
        let api = FakeApi::default();
        api.videos.borrow_mut().extend([
            Ok(pending("operations/1", None)),
            Ok(pending("operations/2", None)),
        ]);
        api.polls.borrow_mut().extend([
            Err(ApiError::HttpStatus {
                status: 503,
                body: "backend unavailable".into(),
            }),
            Ok(finished("https://files/v2")),
        ]);
        api.fetches.borrow_mut().push_back(Ok(vec![4, 2]));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut events = Vec::new();

        let request = GenerationRequest::VideoGen {
            prompt: "a lighthouse".into(),
            source: None,
            aspect_ratio: VideoAspectRatio::Landscape,
        };
        let output = orchestrator.run(&request, |e| events.push(e)).await.unwrap();

        assert_eq!(output.outputs[0].bytes, vec![4, 2]);
        assert_eq!(api.video_requests.borrow().len(), 2);
        assert_eq!(api.poll_calls.get(), 2);
        assert_eq!(
            *delay.sleeps.borrow(),
            vec![POLL_INTERVAL, RETRY_DELAY, POLL_INTERVAL]
        );
        assert!(events.iter().any(|e| matches!(
            e,
            StatusEvent::RetryScheduled { next_attempt: 2, delay } if *delay == RETRY_DELAY
        )));
    }

    #[tokio::test]
    async fn test_inpaint_sends_punched_image() {
        let api = FakeApi::default();
        api.content.borrow_mut().push_back(Ok(ContentResponse {
            image: Some(png(20, 20)),
            text: None,
        }));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::BlockOnlyHigh);

        let mut mask = RgbaImage::new(20, 20);
        mask.put_pixel(2, 3, Rgba([255, 255, 255, 255]));
        let request = GenerationRequest::InpaintEdit {
            prompt: "a wooden door".into(),
            source: source(20, 20),
            mask,
        };
        orchestrator.run(&request, |_| {}).await.unwrap();

        let requests = api.content_requests.borrow();
        assert_eq!(requests[0].safety, SafetyThreshold::BlockOnlyHigh);
        let Part::InlineImage(sent) = &requests[0].parts[0] else {
            panic!("image part expected first");
        };
        let pixels = sent.decode().unwrap();
        assert_eq!(pixels.get_pixel(2, 3).0[3], 0);
        assert_eq!(pixels.get_pixel(10, 10).0[3], 255);
        let Part::Text(text) = &requests[0].parts[1] else {
            panic!("text part expected second");
        };
        assert!(text.contains("a wooden door"));
    }

    #[tokio::test]
    async fn test_upscale_resizes_to_exact_target() {
        let api = FakeApi::default();
        api.content.borrow_mut().push_back(Ok(ContentResponse {
            image: Some(png(33, 17)),
            text: None,
        }));
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());

        let request = GenerationRequest::Upscale {
            source: source(15, 7),
            factor: UpscaleFactor::Percent150,
            creativity: Creativity::High,
        };
        let output = orchestrator.run(&request, |_| {}).await.unwrap();

        let pixels = output.outputs[0].decode().unwrap();
        assert_eq!(pixels.dimensions(), (23, 11));
    }

    #[tokio::test]
    async fn test_text_only_reply_counts_as_empty() {
        let api = FakeApi::default();
        api.content.borrow_mut().extend([
            Ok(ContentResponse {
                image: None,
                text: Some("I can't help with that.".into()),
            }),
            Ok(ContentResponse {
                image: Some(png(3, 3)),
                text: None,
            }),
        ]);
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());
        let mut failures = Vec::new();

        let request = GenerationRequest::GenerativeEdit {
            prompt: "make it night".into(),
            source: source(3, 3),
        };
        orchestrator
            .run(&request, |e| {
                if let StatusEvent::AttemptFailed { message, .. } = e {
                    failures.push(message);
                }
            })
            .await
            .unwrap();
        assert_eq!(failures, vec!["The model returned no image: I can't help with that.".to_string()]);
    }

    #[tokio::test]
    async fn test_reference_image_generation_repeats_content_calls() {
        let api = FakeApi::default();
        api.content.borrow_mut().extend([
            Ok(ContentResponse {
                image: Some(png(2, 2)),
                text: None,
            }),
            Ok(ContentResponse {
                image: Some(png(2, 2)),
                text: None,
            }),
            Ok(ContentResponse {
                image: Some(png(2, 2)),
                text: None,
            }),
        ]);
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());

        let request = GenerationRequest::ImageGen {
            prompt: "same style, but a cat".into(),
            count: 3,
            aspect_ratio: AspectRatio::Portrait3x4,
            reference: Some(source(4, 4)),
        };
        let output = orchestrator.run(&request, |_| {}).await.unwrap();
        assert_eq!(output.outputs.len(), 3);
        assert_eq!(api.image_calls.get(), 0);
        assert_eq!(api.content_requests.borrow().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_rejected_before_any_call() {
        let api = FakeApi::default();
        let delay = RecordingDelay::default();
        let orchestrator = Orchestrator::new(&api, &delay, SafetyThreshold::default());

        let request = GenerationRequest::GenerativeEdit {
            prompt: "   ".into(),
            source: source(2, 2),
        };
        let result = orchestrator.run(&request, |_| {}).await;
        assert!(matches!(result, Err(GenerationError::EmptyPrompt)));
        assert!(api.content_requests.borrow().is_empty());
        assert!(delay.sleeps.borrow().is_empty());
    }

    #[test]
    fn test_status_messages() {
        let first = StatusEvent::Attempt {
            attempt: 1,
            max_attempts: 10,
        };
        assert_eq!(first.message(), "Generating...");
        let retry = StatusEvent::Attempt {
            attempt: 4,
            max_attempts: 10,
        };
        assert_eq!(retry.message(), "Retrying (attempt 4 of 10)...");
    }
}
