// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Register transports
//!
//! The producer, the link monitor and the consumer only see registers through
//! the [`RegisterTransport`] capability:
//!
//! - [`LocalRegisterTransport`] writes straight into the in-process
//!   [`RegisterBank`](crate::registers::RegisterBank) served over Modbus.
//! - [`ModbusClientTransport`] talks to a remote server over Modbus/TCP.

pub mod local;
pub mod modbus_client;

use async_trait::async_trait;

use crate::reporting::LocalizerError;

pub use local::LocalRegisterTransport;
pub use modbus_client::ModbusClientTransport;

/// Block-level access to holding registers and coils
#[async_trait]
pub trait RegisterTransport: Send + Sync {
    /// Read `count` holding registers starting at `address`
    async fn read_block(&self, address: u16, count: u16) -> Result<Vec<u16>, LocalizerError>;

    /// Write a whole block of holding registers in one request
    async fn write_block(&self, address: u16, words: &[u16]) -> Result<(), LocalizerError>;

    async fn read_coil(&self, address: u16) -> Result<bool, LocalizerError>;

    async fn write_coil(&self, address: u16, value: bool) -> Result<(), LocalizerError>;
}
