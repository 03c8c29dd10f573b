// SPDX-License-Identifier: GPL-3.0-only

//! Platform capabilities: camera and clipboard

pub mod camera;
pub mod clipboard;
