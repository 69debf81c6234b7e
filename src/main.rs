// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! MaskForge - AI image studio
//!
//! A cross-platform desktop application for generating, editing, inpainting,
//! upscaling and animating images with a hosted generative model.

mod api;
mod app;
mod generation;
mod io;
mod models;
mod ops;
mod ui;
mod util;

use anyhow::Result;
use app::MaskForgeApp;
use io::storage::LocalStorage;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = match io::serialization::default_config_path() {
        Some(path) => io::serialization::load_config(&path)?,
        None => Default::default(),
    };
    let storage_path = io::storage::default_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine a data directory"))?;
    let storage = LocalStorage::open(storage_path);
    log::info!("Using models {} / {} / {}", config.image_model, config.content_model, config.video_model);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("MaskForge"),
        ..Default::default()
    };

    eframe::run_native(
        "MaskForge",
        options,
        Box::new(move |_cc| Ok(Box::new(MaskForgeApp::new(config, storage)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
