// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::debug;

use super::Config;
use crate::acquisition::{MAX_FRAME_DIMENSION, SUPPORTED_TAG_FAMILIES};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_tag_localizer --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema_str = include_str!("../../resources/config.schema.json");

    let schema: serde_json::Value =
        serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Accepts IPv4/IPv6 literals and the special value "localhost".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost")
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Port Range**: the Modbus port is within 1-65534
/// - **Register Layout**: the pose block fits in the served registers and the
///   acknowledgement coil exists
/// - **Known Tags**: at least one tag anchor, with finite coordinates
/// - **Camera**: frame edges of at most `MAX_FRAME_DIMENSION` pixels and a
///   supported tag family
/// - **Simulation**: noise is non-negative and the dropout probability is in [0, 1]
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let modbus = &config.modbus;
    if modbus.port < 1 || modbus.port > 65534 {
        anyhow::bail!("Invalid port number: {}", modbus.port);
    }

    if !is_valid_ip_address(&modbus.address) {
        // Hostnames are resolved at bind time
        debug!("Potentially invalid address format: {}", modbus.address);
    }

    let block_end = usize::from(modbus.base_address) + modbus.encoding.block_len();
    if block_end > usize::from(modbus.capacity) {
        anyhow::bail!(
            "Pose block [{}, {}) does not fit in {} holding registers",
            modbus.base_address,
            block_end,
            modbus.capacity
        );
    }
    if modbus.ack_coil >= modbus.capacity {
        anyhow::bail!(
            "Acknowledgement coil {} is outside the {} served coils",
            modbus.ack_coil,
            modbus.capacity
        );
    }

    let localization = &config.localization;
    if localization.known_tags.is_empty() {
        anyhow::bail!("At least one known tag is required");
    }
    for (id, position) in &localization.known_tags {
        if position.iter().any(|v| !v.is_finite()) {
            anyhow::bail!("Known tag {} has a non-finite position", id);
        }
    }

    let camera = &localization.camera;
    if camera.width > MAX_FRAME_DIMENSION || camera.height > MAX_FRAME_DIMENSION {
        anyhow::bail!(
            "Frame size {}x{} exceeds {} pixels per edge",
            camera.width,
            camera.height,
            MAX_FRAME_DIMENSION
        );
    }
    if !SUPPORTED_TAG_FAMILIES.contains(&localization.tag_family.as_str()) {
        anyhow::bail!("Unsupported tag family '{}'", localization.tag_family);
    }

    let acquisition = &config.acquisition;
    if acquisition.noise_stddev.is_nan() || acquisition.noise_stddev < 0.0 {
        anyhow::bail!("Noise standard deviation must be non-negative");
    }
    if !(0.0..=1.0).contains(&acquisition.dropout_probability) {
        anyhow::bail!(
            "Dropout probability {} is outside [0, 1]",
            acquisition.dropout_probability
        );
    }
    for id in &acquisition.visible_tags {
        if !localization.known_tags.contains_key(id) {
            debug!("Visible tag {} has no known anchor and will be ignored", id);
        }
    }

    if config.producer.interval_ms == 0 || config.link.interval_ms == 0 {
        anyhow::bail!("Loop intervals must be greater than zero");
    }

    Ok(())
}
