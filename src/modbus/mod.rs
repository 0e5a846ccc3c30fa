// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module provides the Modbus TCP server exposing the camera pose to a
//! remote controller, and receiving its acknowledgement flag.
//!
//! ## Key Components
//!
//! - `LocalizerModbusServer`: The per-connection service answering register
//!   and coil requests from the shared `RegisterBank`.
//! - `serve`: Accept loop binding services to incoming TCP connections.
//!
//! ## Usage
//!
//! The Modbus server is normally started by the daemon:
//!
//! ```no_run
//! use rust_tag_localizer::modbus::serve;
//! use rust_tag_localizer::registers::RegisterBank;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> std::io::Result<()> {
//! let listener = TcpListener::bind("0.0.0.0:1502").await?;
//! serve(listener, RegisterBank::new(100)).await
//! # }
//! ```

pub mod modbus_server;
pub use modbus_server::{serve, LocalizerModbusServer};
