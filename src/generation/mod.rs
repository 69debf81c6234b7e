// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Request orchestration: payload preparation, retries and video polling.

pub mod orchestrator;
pub mod retry;

pub use orchestrator::{GenerationOutput, Orchestrator, StatusEvent, TokioDelay};

use crate::ops::compositing::CompositeError;
use thiserror::Error;

/// Terminal outcome of a generation that did not produce output.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("No API key is set. Enter your key in Settings and save it.")]
    MissingCredential,
    #[error("Wait for the current image or generation to finish.")]
    Busy,
    #[error("Load an image first.")]
    MissingSource,
    #[error("Paint over the area to change and save the mask first.")]
    EmptyMask,
    #[error("Enter a prompt first.")]
    EmptyPrompt,
    #[error("Could not prepare the image: {0}")]
    Composite(#[from] CompositeError),
    #[error("Could not start the request: {0}")]
    Startup(String),
    #[error("Generation failed after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },
}
