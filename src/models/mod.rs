// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Core state: images, masks, the view transform and the editing session.

pub mod config;
pub mod image;
pub mod mask;
pub mod pointer;
pub mod request;
pub mod session;
pub mod stroke;
pub mod view;
