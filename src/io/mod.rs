// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! File I/O: source images, saved artifacts, configuration and the
//! persisted credential.

pub mod media;
pub mod serialization;
pub mod storage;
