// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the tag localizer
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema before it is deserialized.
//!
//! ## Configuration Structure
//!
//! - `modbus`: Modbus TCP server and pose register layout
//! - `localization`: Known tag anchors, yaw averaging and camera parameters
//! - `acquisition`: Frame source and detector backend
//! - `producer`: Cadence and failure budget of the pose loop
//! - `link`: Cadence of the acknowledgement link monitor
//!
//! ## Usage
//!
//! ```no_run
//! use rust_tag_localizer::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(true),                  // Enable Modbus
//!     Some("0.0.0.0".to_string()), // Modbus address
//!     Some(1502),                  // Modbus port
//!     None,                        // Register encoding
//! );
//!
//! println!("Modbus port: {}", config.modbus.port);
//! ```

pub mod acquisition;
pub mod localization;
pub mod loops;
pub mod modbus;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::codec::RegisterEncoding;

pub use acquisition::{AcquisitionConfig, FrameSourceKind};
pub use localization::{CameraConfig, LocalizationConfig};
pub use loops::{LinkConfig, ProducerConfig};
pub use modbus::ModbusConfig;
pub use utils::{is_valid_ip_address, output_config_schema};

/// Root configuration structure.
///
/// Each section falls back to its default values when it is missing from the
/// file, so a minimal configuration only lists what differs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Modbus TCP server and register layout.
    #[serde(default)]
    pub modbus: ModbusConfig,

    /// Known tags and camera parameters.
    #[serde(default)]
    pub localization: LocalizationConfig,

    /// Frame source and detector backend.
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub producer: ProducerConfig,

    #[serde(default)]
    pub link: LinkConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Validate a YAML document against the embedded schema
    pub fn validate_yaml(contents: &str) -> Result<()> {
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema_str = include_str!("../../resources/config.schema.json");
        let schema: serde_json::Value =
            serde_json::from_str(schema_str).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is created with default values. An invalid file leaves a
    /// `<name>.sample.yaml` with defaults next to it and fails.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(err) = Self::validate_yaml(&contents) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            return Err(err.context(format!("Invalid configuration in {}", path.display())));
        }

        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were given override the loaded values.
    pub fn apply_args(
        &mut self,
        modbus_enabled: Option<bool>,
        modbus_address: Option<String>,
        modbus_port: Option<u16>,
        encoding: Option<RegisterEncoding>,
    ) {
        if let Some(enabled) = modbus_enabled {
            debug!("Overriding Modbus enabled from command line: {}", enabled);
            self.modbus.enabled = enabled;
        }
        if let Some(port) = modbus_port {
            debug!("Overriding Modbus port from command line: {}", port);
            self.modbus.port = port;
        }
        if let Some(address) = modbus_address {
            debug!("Overriding Modbus address from command line: {}", address);
            self.modbus.address = address;
        }
        if let Some(encoding) = encoding {
            debug!("Overriding register encoding from command line: {:?}", encoding);
            self.modbus.encoding = encoding;
        }
    }
}
