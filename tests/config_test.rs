// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;

use anyhow::Result;
use rust_tag_localizer::codec::RegisterEncoding;
use rust_tag_localizer::config::{self, Config, ModbusConfig};
use rust_tag_localizer::localization::YawAveraging;
use tempfile::tempdir;

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let mut config = Config {
        modbus: ModbusConfig {
            port: 1503,
            address: "192.168.1.1".to_string(),
            base_address: 20,
            encoding: RegisterEncoding::ScaledInteger,
            ..ModbusConfig::default()
        },
        ..Config::default()
    };
    config.localization.known_tags.insert(7, [2.0, 0.5, -0.25]);
    config.localization.yaw_averaging = YawAveraging::Circular;
    config.producer.max_consecutive_failures = Some(25);

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;

    assert_eq!(loaded_config, config);
    assert_eq!(loaded_config.localization.known_tags[&7], [2.0, 0.5, -0.25]);

    // Test loading default config for non-existent file
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;

    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(default_config.modbus.port, 1502);
    assert_eq!(default_config.localization.known_tags.len(), 4);

    Ok(())
}

#[test]
fn test_partial_config_uses_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("partial.yaml");
    fs::write(
        &config_path,
        r#"
modbus:
  enabled: true
  port: 5020
  address: "0.0.0.0"
localization:
  known_tags:
    4: [0.0, 1.0, 0.0]
    5: [0.5, 1.0, 0.0]
link:
  enabled: false
  interval_ms: 1000
"#,
    )?;

    let config = Config::from_file(&config_path)?;

    assert_eq!(config.modbus.port, 5020);
    assert_eq!(config.modbus.capacity, 100);
    assert_eq!(config.modbus.encoding, RegisterEncoding::FloatPair);
    assert_eq!(config.localization.known_tags.keys().copied().collect::<Vec<_>>(), vec![4, 5]);
    assert_eq!(config.localization.tag_family, "tag36h11");
    assert_eq!(config.localization.yaw_averaging, YawAveraging::Arithmetic);
    assert_eq!(config.producer.interval_ms, 200);
    assert_eq!(config.link.stale_after, 3);
    assert!(!config.link.enabled);

    Ok(())
}

#[test]
fn test_apply_args() {
    let mut config = Config::default();

    config.apply_args(None, None, None, None);
    assert_eq!(config, Config::default());

    config.apply_args(
        Some(false),
        Some("10.0.0.2".to_string()),
        Some(15020),
        Some(RegisterEncoding::ScaledInteger),
    );

    assert!(!config.modbus.enabled);
    assert_eq!(config.modbus.address, "10.0.0.2");
    assert_eq!(config.modbus.port, 15020);
    assert_eq!(config.modbus.encoding, RegisterEncoding::ScaledInteger);
}

#[test]
fn test_config_schema_output() -> Result<()> {
    config::output_config_schema()?;
    Ok(())
}
