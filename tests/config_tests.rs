//! Configuration loading integration tests.

mod support;

use std::io::Write;

use rust_decimal_macros::dec;

use pairtaker::app::Config;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const MINIMAL: &str = r#"
[venue_a]
id = "alpha"
ws_url = "wss://alpha.example/ws"
api_url = "https://alpha.example/api/"

[venue_b]
id = "beta"
ws_url = "wss://beta.example/ws"
api_url = "https://beta.example/api/"
"#;

#[test]
fn load_minimal_file_with_defaults() {
    let file = write_config(MINIMAL);
    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.venue_a.id, "alpha");
    assert_eq!(config.risk.min_net_edge_cents, dec!(2.5));
    assert_eq!(config.execution.hedge_timeout_ms, 250);
    assert_eq!(config.signal.xcorr_window_bars, 120);
    assert!(!config.dry_run);
}

#[test]
fn load_with_overrides() {
    let file = write_config(&format!(
        "{MINIMAL}
dry_run = true
bus_capacity = 64

[risk]
min_net_edge_cents = 4.0
pairs_max = 2

[execution]
hedge_timeout_ms = 500

[signal]
intended_qty = 25
"
    ));
    let config = Config::load(file.path()).unwrap();
    assert!(config.dry_run);
    assert_eq!(config.bus_capacity, 64);
    assert_eq!(config.risk.min_net_edge_cents, dec!(4.0));
    assert_eq!(config.risk.pairs_max, 2);
    assert_eq!(config.execution.hedge_timeout_ms, 500);
    assert_eq!(config.signal.intended_qty, 25);
}

#[test]
fn missing_file_is_a_config_error() {
    let err = Config::load("/nonexistent/pairtaker.toml").unwrap_err();
    assert!(matches!(
        err,
        pairtaker::error::Error::Config(pairtaker::error::ConfigError::ReadFile(_))
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("this is not toml [");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        pairtaker::error::Error::Config(pairtaker::error::ConfigError::Parse(_))
    ));
}

#[test]
fn zero_qty_fails_validation() {
    let file = write_config(&format!(
        "{MINIMAL}
[signal]
intended_qty = 0
"
    ));
    assert!(Config::load(file.path()).is_err());
}
