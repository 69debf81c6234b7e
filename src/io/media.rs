// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading and saving.
//!
//! Source images are read from disk and decoded; generated artifacts are
//! written under their assigned names.

use crate::models::image::SourceImage;
use crate::models::session::Artifact;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "webp", "bmp", "gif"];

/// Read and decode an image file. The file stem becomes the image name.
pub fn load_image(path: &Path) -> Result<SourceImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    let image = SourceImage::from_bytes(bytes, name)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(image)
}

/// Downloads folder, falling back to the home directory.
pub fn default_output_dir() -> PathBuf {
    dirs_next::download_dir()
        .or_else(dirs_next::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Give up looking for a free name after this many candidates.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// `name` for the first candidate, then `<stem>-<n>.<ext>` from 2 upwards.
fn candidate_name(file_name: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}-{}.{}", stem, attempt, ext),
        None => format!("{}-{}", file_name, attempt),
    }
}

/// Write an artifact into `dir`, creating it if needed.
///
/// Existing files are never replaced: if the assigned name is taken, a
/// numeric suffix is added. Returns the path actually written.
pub fn save_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(candidate_name(&artifact.file_name, attempt));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e).with_context(|| format!("Failed to create {}", path.display())),
        };
        file.write_all(&artifact.data.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Saved {} ({} bytes)", path.display(), artifact.data.bytes.len());
        return Ok(path);
    }
    anyhow::bail!("No free file name for {} in {}", artifact.file_name, dir.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::image::EncodedImage;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_load_image_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harbor.png");
        RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let image = load_image(&path).unwrap();
        assert_eq!(image.name.as_deref(), Some("harbor"));
        assert_eq!((image.natural_width(), image.natural_height()), (3, 2));
        assert_eq!(image.mime_type(), "image/png");
    }

    #[test]
    fn test_load_image_rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.png");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(load_image(&path).is_err());
    }

    #[test]
    fn test_save_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = Artifact {
            file_name: "maskforge-video(1).mp4".into(),
            data: EncodedImage::new(vec![0, 1, 2], "video/mp4"),
        };
        let path = save_artifact(&dir.path().join("out"), &artifact).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_reused_name_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let first = Artifact {
            file_name: "maskforge-edit-cat(1).png".into(),
            data: EncodedImage::new(vec![1], "image/png"),
        };
        let second = Artifact {
            data: EncodedImage::new(vec![2], "image/png"),
            ..first.clone()
        };

        let first_path = save_artifact(dir.path(), &first).unwrap();
        let second_path = save_artifact(dir.path(), &second).unwrap();
        let third_path = save_artifact(dir.path(), &second).unwrap();

        assert_eq!(first_path, dir.path().join("maskforge-edit-cat(1).png"));
        assert_eq!(second_path, dir.path().join("maskforge-edit-cat(1)-2.png"));
        assert_eq!(third_path, dir.path().join("maskforge-edit-cat(1)-3.png"));
        assert_eq!(std::fs::read(first_path).unwrap(), vec![1]);
        assert_eq!(std::fs::read(second_path).unwrap(), vec![2]);
    }

    #[test]
    fn test_candidate_names() {
        assert_eq!(candidate_name("a(1).mp4", 1), "a(1).mp4");
        assert_eq!(candidate_name("a(1).mp4", 4), "a(1)-4.mp4");
        assert_eq!(candidate_name("noext", 2), "noext-2");
    }
}
