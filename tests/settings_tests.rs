//! Settings file parsing tests

#![cfg(feature = "json")]

use rs_pulseclock::{ClockSettings, Config, ConfigError, WifiConfig};

const SHIPPED: &str = include_str!("../settings/clock.json");

// ============================================================================
// Shipped settings
// ============================================================================

#[test]
fn shipped_settings_are_valid() {
    let settings = ClockSettings::from_json_str(SHIPPED).unwrap();
    let config = Config::from_settings(&settings).unwrap();

    assert_eq!(config.pins.plus, 26);
    assert_eq!(config.pins.minus, 27);
    assert_eq!(config.pins.enable, 25);
    assert_eq!(config.pins.sense, Some(33));
    assert_eq!(config.pulse.pulse_count, 2);
    assert!(config.pulse.step_duration_ms() <= 1000);
    assert!(config.pulse.fast_step_duration_ms() < config.pulse.step_duration_ms());
}

#[test]
fn shipped_wifi_example_parses() {
    let wifi = WifiConfig::from_json_str(include_str!("../settings/wifi.example.json")).unwrap();

    assert!(wifi.is_configured());
    assert_eq!(wifi.hostname.as_str(), "pulseclock");
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn keys_are_pascal_case() {
    let settings = ClockSettings::from_json_str(
        r#"{"Plus": 4, "Minus": 5, "Enable": 6, "PulseCount": 3, "FastPulse1": 40}"#,
    )
    .unwrap();

    assert_eq!(settings.plus, Some(4));
    assert_eq!(settings.pulse_count, Some(3));
    assert_eq!(settings.fast_pulse1, Some(40));
    assert_eq!(settings.sense, None);
    assert_eq!(settings.pulse, None);
}

#[test]
fn missing_keys_surface_at_validation() {
    let settings = ClockSettings::from_json_str(r#"{"Plus": 4, "Minus": 5}"#).unwrap();

    assert_eq!(settings.validate(), Err(ConfigError::MissingKey("Enable")));
}

#[test]
fn unknown_keys_are_ignored() {
    let json = SHIPPED.replacen('{', r#"{"Comment": "bench movement","#, 1);
    let settings = ClockSettings::from_json_str(&json).unwrap();

    assert!(settings.validate().is_ok());
}

#[test]
fn malformed_documents_rejected() {
    assert_eq!(
        ClockSettings::from_json_str("{\"Plus\": 26,"),
        Err(ConfigError::Malformed)
    );
    assert_eq!(
        ClockSettings::from_json_str(r#"{"Plus": "twenty-six"}"#),
        Err(ConfigError::Malformed)
    );
    // Pins are u8
    assert_eq!(
        ClockSettings::from_json_str(r#"{"Plus": 300}"#),
        Err(ConfigError::Malformed)
    );
}

#[test]
fn sensorless_movement_configures() {
    let json = SHIPPED.replace("\"Sense\": 33,", "");
    let config = Config::from_settings(&ClockSettings::from_json_str(&json).unwrap()).unwrap();

    assert!(!config.pins.has_sensor());
}

#[test]
fn overlong_step_reported_with_duration() {
    let json = SHIPPED.replace("\"Recover\": 100", "\"Recover\": 700");
    let settings = ClockSettings::from_json_str(&json).unwrap();

    let err = Config::from_settings(&settings).unwrap_err();
    assert_eq!(err, ConfigError::StepTooLong { duration_ms: 1050 });
    assert_eq!(err.to_string(), "step sequence takes 1050ms (limit 1000ms)");
}

#[test]
fn overflowing_step_is_too_long() {
    let json = SHIPPED
        .replace("\"PulseCount\": 2", "\"PulseCount\": 2147483648")
        .replace("\"Pulse\": 100", "\"Pulse\": 1")
        .replace("\"Dwell\": 50", "\"Dwell\": 1");
    let settings = ClockSettings::from_json_str(&json).unwrap();

    assert_eq!(
        Config::from_settings(&settings).unwrap_err(),
        ConfigError::StepTooLong { duration_ms: u32::MAX }
    );
}

#[test]
fn overflowing_fast_step_saturates() {
    let json = SHIPPED.replace("\"FastStop\": 60", "\"FastStop\": 4294967295");
    let config = Config::from_settings(&ClockSettings::from_json_str(&json).unwrap()).unwrap();

    assert_eq!(config.pulse.fast_step_duration_ms(), u32::MAX);
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn load_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("pulseclock-settings-{}.json", std::process::id()));
    std::fs::write(&path, SHIPPED).unwrap();

    let settings = ClockSettings::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(settings, ClockSettings::from_json_str(SHIPPED).unwrap());
}

#[test]
fn load_missing_file_is_unreadable() {
    let path = std::env::temp_dir().join("pulseclock-settings-does-not-exist.json");

    assert_eq!(ClockSettings::load(&path), Err(ConfigError::Unreadable));
}

// ============================================================================
// WiFi
// ============================================================================

#[test]
fn wifi_hostname_defaults_when_omitted() {
    let wifi = WifiConfig::from_json_str(r#"{"SSID": "shed", "Password": "hunter2"}"#).unwrap();

    assert_eq!(wifi.ssid.as_str(), "shed");
    assert_eq!(wifi.password.as_str(), "hunter2");
    assert_eq!(wifi.hostname.as_str(), "pulseclock");
}

#[test]
fn wifi_requires_credentials() {
    assert_eq!(
        WifiConfig::from_json_str(r#"{"Hostname": "hall-clock"}"#).map(|_| ()),
        Err(ConfigError::Malformed)
    );
}
