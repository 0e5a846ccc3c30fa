// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Tag Localizer library
//!
//! Estimates the pose of a camera from the AprilTags it sees and publishes it
//! to a remote controller as Modbus/TCP holding registers.
//!
//! Per frame: detections → [`localization::TagPoseTransformer`] →
//! [`localization::PoseFuser`] → [`codec::RegisterCodec`] →
//! [`registers::RegisterBank`] → Modbus client → decode.

pub mod acquisition;
pub mod client;
pub mod codec;
pub mod config;
pub mod daemon;
pub mod link;
pub mod localization;
pub mod modbus;
pub mod producer;
pub mod registers;
pub mod reporting;
pub mod retry;
pub mod transport;
