// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Raster operations applied before and after remote calls.

pub mod compositing;
