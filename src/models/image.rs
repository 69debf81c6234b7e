// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Source images and encoded image payloads.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{ImageFormat, RgbaImage};

pub const PNG_MIME: &str = "image/png";

/// An encoded raster (or video) payload with its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self, base64::DecodeError> {
        Ok(Self::new(BASE64.decode(data)?, mime_type))
    }

    /// Decode into RGBA pixels.
    pub fn decode(&self) -> image::ImageResult<RgbaImage> {
        Ok(image::load_from_memory(&self.bytes)?.to_rgba8())
    }
}

/// The image currently being edited. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct SourceImage {
    /// File stem of the upload, used in output names.
    pub name: Option<String>,
    pub encoded: EncodedImage,
    pub pixels: RgbaImage,
}

impl SourceImage {
    /// Decode an uploaded file's bytes.
    pub fn from_bytes(bytes: Vec<u8>, name: Option<String>) -> image::ImageResult<Self> {
        let format = image::guess_format(&bytes)?;
        let pixels = image::load_from_memory_with_format(&bytes, format)?.to_rgba8();
        let mime_type = format.to_mime_type();
        Ok(Self {
            name,
            encoded: EncodedImage::new(bytes, mime_type),
            pixels,
        })
    }

    /// Wrap already-decoded pixels, storing a PNG encoding alongside them.
    pub fn from_pixels(pixels: RgbaImage, name: Option<String>) -> image::ImageResult<Self> {
        let mut bytes = Vec::new();
        pixels.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Self {
            name,
            encoded: EncodedImage::new(bytes, PNG_MIME),
            pixels,
        })
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn mime_type(&self) -> &str {
        &self.encoded.mime_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_from_pixels_roundtrips_through_png() {
        let pixels = RgbaImage::from_pixel(7, 3, Rgba([10, 20, 30, 255]));
        let source = SourceImage::from_pixels(pixels.clone(), Some("cat".into())).unwrap();

        assert_eq!(source.mime_type(), PNG_MIME);
        assert_eq!((source.natural_width(), source.natural_height()), (7, 3));

        let reloaded = SourceImage::from_bytes(source.encoded.bytes.clone(), None).unwrap();
        assert_eq!(reloaded.pixels, pixels);
        assert_eq!(reloaded.mime_type(), PNG_MIME);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(SourceImage::from_bytes(b"not an image".to_vec(), None).is_err());
    }

    #[test]
    fn test_base64_payload() {
        let encoded = EncodedImage::new(vec![1, 2, 3], PNG_MIME);
        let text = encoded.to_base64();
        assert_eq!(text, "AQID");
        assert_eq!(EncodedImage::from_base64(&text, PNG_MIME).unwrap(), encoded);
    }
}
