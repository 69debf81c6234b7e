// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Raster compositing used to prepare request payloads.
//!
//! All three operations are pure: they take decoded pixels and return a new
//! PNG-encoded image. Computed dimensions are rounded half-up before a canvas
//! is allocated.

use crate::models::image::{EncodedImage, PNG_MIME};
use crate::models::request::VideoAspectRatio;
use crate::util::geometry::round_half_up;
use image::{imageops, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("cannot allocate a {width}x{height} canvas")]
    EmptyCanvas { width: u32, height: u32 },
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

const LETTERBOX_FILL: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Pad `image` with opaque black bars so it fits `target` without cropping.
pub fn letterbox(image: &RgbaImage, target: VideoAspectRatio) -> Result<EncodedImage, CompositeError> {
    encode_png(&letterbox_pixels(image, target)?)
}

/// Erase every pixel of `source` where `mask` is painted.
pub fn punch_hole(source: &RgbaImage, mask: &RgbaImage) -> Result<EncodedImage, CompositeError> {
    encode_png(&punch_hole_pixels(source, mask)?)
}

/// Stretch `image` to exactly `width` x `height`.
pub fn resize_exact(image: &RgbaImage, width: u32, height: u32) -> Result<EncodedImage, CompositeError> {
    encode_png(&resize_exact_pixels(image, width, height)?)
}

pub fn letterbox_pixels(image: &RgbaImage, target: VideoAspectRatio) -> Result<RgbaImage, CompositeError> {
    let (img_w, img_h) = image.dimensions();
    ensure_canvas(img_w, img_h)?;

    let ratio = target.ratio();
    let mut canvas_w = img_w as f64;
    let mut canvas_h = canvas_w / ratio;
    if canvas_h < img_h as f64 {
        canvas_h = img_h as f64;
        canvas_w = canvas_h * ratio;
    }
    let (canvas_w, canvas_h) = (round_half_up(canvas_w), round_half_up(canvas_h));
    ensure_canvas(canvas_w, canvas_h)?;

    let scale = (canvas_w as f64 / img_w as f64).min(canvas_h as f64 / img_h as f64);
    let draw_w = round_half_up(img_w as f64 * scale).clamp(1, canvas_w);
    let draw_h = round_half_up(img_h as f64 * scale).clamp(1, canvas_h);

    let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, LETTERBOX_FILL);
    let x = ((canvas_w - draw_w) as f64 / 2.0).round() as i64;
    let y = ((canvas_h - draw_h) as f64 / 2.0).round() as i64;
    if (draw_w, draw_h) == (img_w, img_h) {
        imageops::overlay(&mut canvas, image, x, y);
    } else {
        let scaled = imageops::resize(image, draw_w, draw_h, imageops::FilterType::Triangle);
        imageops::overlay(&mut canvas, &scaled, x, y);
    }

    log::debug!(
        "Letterboxed {}x{} into {}x{} ({})",
        img_w,
        img_h,
        canvas_w,
        canvas_h,
        target.as_str()
    );
    Ok(canvas)
}

/// "Destination-out" composite: the result keeps `source` only where the
/// mask is transparent. A mask of a different size is stretched to fit.
pub fn punch_hole_pixels(source: &RgbaImage, mask: &RgbaImage) -> Result<RgbaImage, CompositeError> {
    let (width, height) = source.dimensions();
    ensure_canvas(width, height)?;

    let resized;
    let mask = if mask.dimensions() == (width, height) {
        mask
    } else {
        resized = imageops::resize(mask, width, height, imageops::FilterType::Nearest);
        &resized
    };

    let mut out = source.clone();
    for (dst, m) in out.pixels_mut().zip(mask.pixels()) {
        let keep = 255 - m.0[3] as u32;
        let alpha = (dst.0[3] as u32 * keep + 127) / 255;
        *dst = if alpha == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            Rgba([dst.0[0], dst.0[1], dst.0[2], alpha as u8])
        };
    }
    Ok(out)
}

pub fn resize_exact_pixels(image: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage, CompositeError> {
    ensure_canvas(width, height)?;
    let (src_w, src_h) = image.dimensions();
    ensure_canvas(src_w, src_h)?;
    if (src_w, src_h) == (width, height) {
        return Ok(image.clone());
    }
    Ok(imageops::resize(image, width, height, imageops::FilterType::Lanczos3))
}

pub fn encode_png(image: &RgbaImage) -> Result<EncodedImage, CompositeError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(EncodedImage::new(bytes, PNG_MIME))
}

fn ensure_canvas(width: u32, height: u32) -> Result<(), CompositeError> {
    if width == 0 || height == 0 {
        return Err(CompositeError::EmptyCanvas { width, height });
    }
    Ok(())
}
