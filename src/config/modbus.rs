// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP configuration
//!
//! This module defines the structures for configuring the Modbus TCP server
//! that publishes the camera pose, and the register layout shared with the
//! consumer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::RegisterEncoding;

/// Configuration for the Modbus TCP server and the pose register block.
///
/// # Example
///
/// ```
/// use rust_tag_localizer::codec::RegisterEncoding;
/// use rust_tag_localizer::config::ModbusConfig;
///
/// let modbus_config = ModbusConfig {
///     port: 1503,
///     encoding: RegisterEncoding::ScaledInteger,
///     ..ModbusConfig::default()
/// };
/// assert_eq!(modbus_config.base_address, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModbusConfig {
    /// Flag to enable or disable the Modbus server.
    ///
    /// When disabled the pose is still computed but nothing is published.
    pub enabled: bool,

    /// The TCP port the Modbus server will listen on.
    ///
    /// Valid range is 1-65534. Default is 1502, which does not need root
    /// privileges.
    pub port: u16,

    /// The network address the Modbus server will bind to.
    ///
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    pub address: String,

    /// First holding register of the pose block
    #[serde(default)]
    pub base_address: u16,

    /// Number of holding registers and coils exposed by the server
    #[serde(default = "default_capacity")]
    pub capacity: u16,

    /// Coil carrying the acknowledgement flag
    #[serde(default)]
    pub ack_coil: u16,

    /// Wire encoding of the pose block
    #[serde(default)]
    pub encoding: RegisterEncoding,

    /// Request timeout used by Modbus clients, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ModbusConfig {
    /// Request timeout of Modbus clients
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_capacity() -> u16 {
    100
}

fn default_timeout_ms() -> u64 {
    1000
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 1502,
            address: "127.0.0.1".to_string(), // Localhost for security
            base_address: 0,
            capacity: default_capacity(),
            ack_coil: 0,
            encoding: RegisterEncoding::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}
