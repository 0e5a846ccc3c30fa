// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-tag-localizer project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::path::Path;
use std::sync::Once;

use anyhow::Result;
use rust_tag_localizer::config::Config;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

/// Load `contents` from a fresh directory and check that loading fails and
/// leaves a loadable sample next to the file
fn assert_rejected_with_sample(contents: &str) -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_config_validation_error_creates_sample_file() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
modbus:
  enabled: true
  port: 99999  # Port out of range (valid range is 1-65534)
  address: "127.0.0.1"
"#,
    )
}

#[test]
fn test_unknown_encoding_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
modbus:
  enabled: true
  port: 1502
  address: "127.0.0.1"
  encoding: hexadecimal
"#,
    )
}

#[test]
fn test_malformed_tag_anchor_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
localization:
  known_tags:
    0: [0.0, 0.0]
"#,
    )
}

#[test]
fn test_config_deserialization_error_creates_sample_file() -> Result<()> {
    setup();
    // Passes the schema, but does not fit a u32 tag identity
    assert_rejected_with_sample(
        r#"
acquisition:
  enabled: true
  visible_tags: [5000000000]
"#,
    )
}

#[test]
fn test_specific_rule_violation_creates_sample_file() -> Result<()> {
    setup();
    // The 6-word block starting at 98 runs past the 100 served registers
    assert_rejected_with_sample(
        r#"
modbus:
  enabled: true
  port: 1502
  address: "127.0.0.1"
  base_address: 98
"#,
    )
}

#[test]
fn test_oversized_frame_is_rejected() -> Result<()> {
    setup();
    assert_rejected_with_sample(
        r#"
localization:
  known_tags:
    0: [0.0, 0.0, 0.0]
  camera:
    fx: 1428.6
    fy: 1420.1
    cx: 647.95
    cy: 328.6
    distortion: [0.0, 0.0, 0.0, 0.0, 0.0]
    width: 70000
    height: 70000
"#,
    )
}

#[test]
fn test_invalid_yaml_is_an_error() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "modbus: [unterminated")?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}
