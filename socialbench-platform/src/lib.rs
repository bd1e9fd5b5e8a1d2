/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Process-level memory readings.
//!
//! Rust has no collector to force between phases, so comparable memory readings are
//! obtained by optionally returning freed heap pages to the OS ([`trim_heap`]) and then
//! sampling the resident set size directly.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::*;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "macos")]
pub use macos::*;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod unsupported;

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub use unsupported::*;
