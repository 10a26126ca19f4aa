//! Configuration acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - A TOML file on disk selects the clock and drift threshold
//! - Generators built from configuration honour the selected clock
//! - Statistics serialize for external reporting

use super::common::{collect, first_ordering_violation};
use std::io::Write;
use std::time::Duration;
use tick_common::config::{ClockKind, ConfigError, OutputFormat, TickConfig};
use tick_source::TickGenerator;

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[generator]
clock = "coarse"
drift_warn_threshold = "5s"

[output]
format = "json"
civil = true
"#
    )
    .unwrap();

    let config = TickConfig::from_file(file.path()).unwrap();
    assert_eq!(config.generator.clock, ClockKind::Coarse);
    assert_eq!(config.generator.drift_warn_threshold, Duration::from_secs(5));
    assert_eq!(config.output.format, OutputFormat::Json);

    let generator = TickGenerator::from_config(&config.generator);
    assert_eq!(generator.clock().name(), "coarse");
    let values = collect(&generator, 1_000);
    assert_eq!(first_ordering_violation(&values), None);
}

#[test]
fn test_invalid_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[generator]\ndrift_warn_threshold = \"soon\"").unwrap();

    let result = TickConfig::from_file(file.path());
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_written_config_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tickgen.toml");

    let mut config = TickConfig::default();
    config.generator.clock = ClockKind::System;
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    let reloaded = TickConfig::from_file(&path).unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_stats_serialize() {
    let generator = TickGenerator::from_config(&TickConfig::default().generator);
    collect(&generator, 10);

    let json = serde_json::to_value(generator.stats()).unwrap();
    assert_eq!(json["issued"], 10);
    assert!(json["last_tick"].as_i64().unwrap() > 0);
}
