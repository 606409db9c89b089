//! Shared configuration system for desktop and ESP32.
//!
//! Pulse timings and pin assignments arrive as a flat key/value settings
//! file (see [`ClockSettings`]) and are validated once at start-up into
//! [`PinConfig`] and [`PulseConfig`]. Everything else uses `Default` plus
//! `with_*` builders. Strings are `heapless::String` for `no_std`
//! compatibility.
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::config::{ClockSettings, Config, NtpConfig};
//!
//! let settings = ClockSettings {
//!     plus: Some(26),
//!     minus: Some(27),
//!     enable: Some(25),
//!     sense: Some(33),
//!     pulse: Some(100),
//!     dwell: Some(50),
//!     stop: Some(50),
//!     recover: Some(100),
//!     pulse_count: Some(2),
//!     fast_pulse1: Some(60),
//!     fast_dwell: Some(30),
//!     fast_pulse2: Some(30),
//!     fast_stop: Some(60),
//! };
//!
//! let config = Config::from_settings(&settings)
//!     .unwrap()
//!     .with_ntp(NtpConfig::default().with_utc_offset_secs(3600));
//!
//! assert_eq!(config.pulse.step_duration_ms(), 450);
//! assert_eq!(config.pins.sense, Some(33));
//! ```

use heapless::String as HString;
use heapless::Vec as HVec;

use crate::error::ConfigError;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum number of NTP servers tried per sync attempt
pub const MAX_NTP_SERVERS: usize = 4;

/// Longest acceptable normal step. Anything slower cannot keep up with
/// one step per second.
pub const MAX_STEP_DURATION_MS: u32 = 1000;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let mut end = s.len().min(MAX_SHORT_STRING);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    let _ = hs.push_str(&s[..end]);
    hs
}

// ============================================================================
// Raw settings (key/value file)
// ============================================================================

/// The clock settings file as loaded, before validation.
///
/// Keys are PascalCase in the JSON document:
///
/// ```json
/// {
///     "Plus": 26, "Minus": 27, "Enable": 25, "Sense": 33,
///     "Pulse": 100, "Dwell": 50, "Stop": 50, "Recover": 100, "PulseCount": 2,
///     "FastPulse1": 60, "FastDwell": 30, "FastPulse2": 30, "FastStop": 60
/// }
/// ```
///
/// `Sense` may be omitted for a movement without an optical sensor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "PascalCase", default))]
pub struct ClockSettings {
    /// Pin driving the motor "+" terminal
    pub plus: Option<u8>,
    /// Pin driving the motor "-" terminal
    pub minus: Option<u8>,
    /// Pin gating driver power
    pub enable: Option<u8>,
    /// Optical sense input pin
    pub sense: Option<u8>,
    /// Drive time per sub-pulse (ms)
    pub pulse: Option<u32>,
    /// Brake time after each sub-pulse (ms)
    pub dwell: Option<u32>,
    /// Settling time with the driver enabled (ms)
    pub stop: Option<u32>,
    /// Power-down recovery before the next pulse (ms)
    pub recover: Option<u32>,
    /// Sub-pulses per step
    pub pulse_count: Option<u32>,
    /// First drive phase of a fast step (ms)
    pub fast_pulse1: Option<u32>,
    /// Brake between the fast drive phases (ms)
    pub fast_dwell: Option<u32>,
    /// Second drive phase of a fast step (ms)
    pub fast_pulse2: Option<u32>,
    /// Final brake of a fast step (ms)
    pub fast_stop: Option<u32>,
}

fn required<T: Copy>(value: Option<T>, key: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingKey(key))
}

impl ClockSettings {
    /// Validate into pin and pulse configuration.
    pub fn validate(&self) -> Result<(PinConfig, PulseConfig), ConfigError> {
        let pins = PinConfig {
            plus: required(self.plus, "Plus")?,
            minus: required(self.minus, "Minus")?,
            enable: required(self.enable, "Enable")?,
            sense: self.sense,
        };
        pins.validate()?;

        let pulse = PulseConfig {
            pulse_ms: required(self.pulse, "Pulse")?,
            dwell_ms: required(self.dwell, "Dwell")?,
            stop_ms: required(self.stop, "Stop")?,
            recover_ms: required(self.recover, "Recover")?,
            pulse_count: required(self.pulse_count, "PulseCount")?,
            fast_pulse1_ms: required(self.fast_pulse1, "FastPulse1")?,
            fast_dwell_ms: required(self.fast_dwell, "FastDwell")?,
            fast_pulse2_ms: required(self.fast_pulse2, "FastPulse2")?,
            fast_stop_ms: required(self.fast_stop, "FastStop")?,
        };
        pulse.validate()?;

        Ok((pins, pulse))
    }

    /// Parse a settings document with `serde_json`.
    #[cfg(feature = "json")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| {
            log::error!("settings parse error: {}", e);
            ConfigError::Malformed
        })
    }

    /// Read and parse a settings file.
    #[cfg(feature = "json")]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            log::error!("{}: read error: {}", path.display(), e);
            ConfigError::Unreadable
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a settings document without allocation (`no_std`).
    #[cfg(feature = "serde-json-core")]
    pub fn from_json_slice(json: &[u8]) -> Result<Self, ConfigError> {
        serde_json_core::from_slice(json)
            .map(|(settings, _)| settings)
            .map_err(|_| ConfigError::Malformed)
    }
}

// ============================================================================
// Pins
// ============================================================================

/// GPIO assignments for the drive and sense lines
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PinConfig {
    /// Motor "+" terminal
    pub plus: u8,
    /// Motor "-" terminal
    pub minus: u8,
    /// Driver enable
    pub enable: u8,
    /// Optical sense input, if fitted
    pub sense: Option<u8>,
}

impl PinConfig {
    /// Reject configurations that map two lines to one pin.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut pins: [Option<u8>; 4] = [Some(self.plus), Some(self.minus), Some(self.enable), self.sense];
        pins.sort_unstable();
        for pair in pins.windows(2) {
            if let [Some(a), Some(b)] = pair {
                if a == b {
                    return Err(ConfigError::DuplicatePin(*a));
                }
            }
        }
        Ok(())
    }

    /// True if an optical sensor is wired.
    pub fn has_sensor(&self) -> bool {
        self.sense.is_some()
    }
}

// ============================================================================
// Pulse timing
// ============================================================================

/// Pulse timing for one movement, in milliseconds.
///
/// No `Default`: every movement needs its own measured timings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulseConfig {
    /// Drive time per sub-pulse
    pub pulse_ms: u32,
    /// Brake time after each sub-pulse
    pub dwell_ms: u32,
    /// Settling time with the driver enabled
    pub stop_ms: u32,
    /// Power-down recovery before the next pulse
    pub recover_ms: u32,
    /// Sub-pulses per step
    pub pulse_count: u32,
    /// First drive phase of a fast step
    pub fast_pulse1_ms: u32,
    /// Brake between the fast drive phases
    pub fast_dwell_ms: u32,
    /// Second drive phase of a fast step
    pub fast_pulse2_ms: u32,
    /// Final brake of a fast step
    pub fast_stop_ms: u32,
}

impl PulseConfig {
    /// Total time of one normal step. Saturates at `u32::MAX`.
    pub const fn step_duration_ms(&self) -> u32 {
        self.pulse_count
            .saturating_mul(self.pulse_ms.saturating_add(self.dwell_ms))
            .saturating_add(self.stop_ms)
            .saturating_add(self.recover_ms)
    }

    /// Total time of one fast step. Saturates at `u32::MAX`.
    pub const fn fast_step_duration_ms(&self) -> u32 {
        self.fast_pulse1_ms
            .saturating_add(self.fast_dwell_ms)
            .saturating_add(self.fast_pulse2_ms)
            .saturating_add(self.fast_stop_ms)
    }

    /// Check the timings can actually move the hands in real time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_count == 0 {
            return Err(ConfigError::ZeroPulseCount);
        }
        if self.pulse_ms == 0 {
            return Err(ConfigError::ZeroDuration("Pulse"));
        }
        if self.fast_pulse1_ms == 0 {
            return Err(ConfigError::ZeroDuration("FastPulse1"));
        }
        let duration_ms = self.step_duration_ms();
        if duration_ms > MAX_STEP_DURATION_MS {
            return Err(ConfigError::StepTooLong { duration_ms });
        }
        Ok(())
    }
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Drive and sense pins
    pub pins: PinConfig,
    /// Pulse timing
    pub pulse: PulseConfig,
    /// Stepping engine behaviour
    pub engine: EngineConfig,
    /// Network time configuration
    pub ntp: NtpConfig,
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Build from validated pins and timings, defaults elsewhere
    pub fn new(pins: PinConfig, pulse: PulseConfig) -> Self {
        Self {
            pins,
            pulse,
            engine: EngineConfig::default(),
            ntp: NtpConfig::default(),
            wifi: WifiConfig::default(),
            device: DeviceConfig::default(),
        }
    }

    /// Validate a settings file and build a config from it
    pub fn from_settings(settings: &ClockSettings) -> Result<Self, ConfigError> {
        let (pins, pulse) = settings.validate()?;
        Ok(Self::new(pins, pulse))
    }

    /// Set engine configuration
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Set NTP configuration
    pub fn with_ntp(mut self, ntp: NtpConfig) -> Self {
        self.ntp = ntp;
        self
    }

    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Engine Config
// ============================================================================

/// Stepping engine configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Park instead of lapping when the hands are ahead by less than this
    /// many seconds (and the second hand is at 12)
    pub max_lead_secs: u32,
    /// Consecutive zero-edge steps after which the movement is reported jammed
    pub stall_limit: u32,
    /// Sleep between ticks when no step was needed (ms)
    pub idle_interval_ms: u32,
    /// Issue one step at start-up to settle a half-moved mechanism
    pub align_on_start: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lead_secs: 7200,
            stall_limit: 20,
            idle_interval_ms: 100,
            align_on_start: true,
        }
    }
}

impl EngineConfig {
    /// Set the park threshold
    pub fn with_max_lead_secs(mut self, secs: u32) -> Self {
        self.max_lead_secs = secs.min(crate::position::HALF_DAY_SECS);
        self
    }

    /// Set the jam threshold
    pub fn with_stall_limit(mut self, limit: u32) -> Self {
        self.stall_limit = limit;
        self
    }

    /// Set the idle tick interval
    pub fn with_idle_interval_ms(mut self, ms: u32) -> Self {
        self.idle_interval_ms = ms;
        self
    }

    /// Enable or disable the start-up alignment step
    pub fn with_align_on_start(mut self, align: bool) -> Self {
        self.align_on_start = align;
        self
    }
}

// ============================================================================
// NTP Config
// ============================================================================

/// Network time configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NtpConfig {
    /// Servers tried in order until one answers
    pub servers: HVec<ShortString, MAX_NTP_SERVERS>,
    /// Interval after a successful sync (seconds)
    pub success_interval_secs: u32,
    /// Interval after a failed sync (seconds)
    pub retry_interval_secs: u32,
    /// How long a successful sync keeps the clock "synced" (seconds)
    pub sync_validity_secs: u32,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u32,
    /// Local time offset from UTC in seconds
    pub utc_offset_secs: i32,
    /// Whether network time is used at all
    pub enabled: bool,
}

impl Default for NtpConfig {
    fn default() -> Self {
        let mut servers = HVec::new();
        let _ = servers.push(short_string("pool.ntp.org"));
        Self {
            servers,
            success_interval_secs: 3600,
            retry_interval_secs: 300,
            sync_validity_secs: 7200,
            timeout_ms: 1000,
            utc_offset_secs: 0,
            enabled: true,
        }
    }
}

impl NtpConfig {
    /// Replace the server list. Servers beyond [`MAX_NTP_SERVERS`] are dropped.
    pub fn with_servers(mut self, servers: &[&str]) -> Self {
        self.servers.clear();
        for server in servers.iter().take(MAX_NTP_SERVERS) {
            let _ = self.servers.push(short_string(server));
        }
        self
    }

    /// Set the retry intervals
    pub fn with_intervals(mut self, success_secs: u32, retry_secs: u32) -> Self {
        self.success_interval_secs = success_secs;
        self.retry_interval_secs = retry_secs;
        self
    }

    /// Set how long a sync stays valid
    pub fn with_sync_validity_secs(mut self, secs: u32) -> Self {
        self.sync_validity_secs = secs;
        self
    }

    /// Set the request timeout
    pub fn with_timeout_ms(mut self, ms: u32) -> Self {
        self.timeout_ms = ms;
        self
    }

    /// Set the local UTC offset
    pub fn with_utc_offset_secs(mut self, secs: i32) -> Self {
        self.utc_offset_secs = secs;
        self
    }

    /// Enable or disable network time
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// DHCP hostname
    pub hostname: ShortString,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u32,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            hostname: short_string("pulseclock"),
            connect_timeout_ms: 30_000,
            enabled: true,
        }
    }
}

#[cfg(feature = "json")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WifiSettings {
    #[serde(rename = "SSID")]
    ssid: std::string::String,
    password: std::string::String,
    #[serde(default)]
    hostname: Option<std::string::String>,
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set the DHCP hostname
    pub fn with_hostname(mut self, hostname: &str) -> Self {
        self.hostname = short_string(hostname);
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout_ms(mut self, ms: u32) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }

    /// Parse a `{"SSID": .., "Password": .., "Hostname": ..}` document
    #[cfg(feature = "json")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: WifiSettings = serde_json::from_str(json).map_err(|e| {
            log::error!("wifi settings parse error: {}", e);
            ConfigError::Malformed
        })?;
        let mut config = Self::default()
            .with_ssid(&raw.ssid)
            .with_password(&raw.password);
        if let Some(hostname) = raw.hostname {
            config = config.with_hostname(&hostname);
        }
        Ok(config)
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Human-readable device name
    pub name: ShortString,
    /// Device ID (for multi-clock setups)
    pub id: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("rs-pulseclock"),
            id: short_string("clock1"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the device ID
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = short_string(id);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_settings() -> ClockSettings {
        ClockSettings {
            plus: Some(26),
            minus: Some(27),
            enable: Some(25),
            sense: Some(33),
            pulse: Some(100),
            dwell: Some(50),
            stop: Some(50),
            recover: Some(100),
            pulse_count: Some(2),
            fast_pulse1: Some(60),
            fast_dwell: Some(30),
            fast_pulse2: Some(30),
            fast_stop: Some(60),
        }
    }

    #[test]
    fn valid_settings() {
        let (pins, pulse) = full_settings().validate().unwrap();
        assert_eq!(pins.plus, 26);
        assert_eq!(pins.minus, 27);
        assert_eq!(pins.enable, 25);
        assert!(pins.has_sensor());
        assert_eq!(pulse.step_duration_ms(), 2 * 150 + 50 + 100);
        assert_eq!(pulse.fast_step_duration_ms(), 180);
    }

    #[test]
    fn missing_key_is_named() {
        let mut settings = full_settings();
        settings.fast_stop = None;
        assert_eq!(settings.validate(), Err(ConfigError::MissingKey("FastStop")));

        let mut settings = full_settings();
        settings.enable = None;
        assert_eq!(settings.validate(), Err(ConfigError::MissingKey("Enable")));
    }

    #[test]
    fn sense_is_optional() {
        let mut settings = full_settings();
        settings.sense = None;
        let (pins, _) = settings.validate().unwrap();
        assert!(!pins.has_sensor());
    }

    #[test]
    fn duplicate_pins_rejected() {
        let mut settings = full_settings();
        settings.sense = Some(25);
        assert_eq!(settings.validate(), Err(ConfigError::DuplicatePin(25)));

        let mut settings = full_settings();
        settings.minus = Some(26);
        assert_eq!(settings.validate(), Err(ConfigError::DuplicatePin(26)));
    }

    #[test]
    fn zero_values_rejected() {
        let mut settings = full_settings();
        settings.pulse_count = Some(0);
        assert_eq!(settings.validate(), Err(ConfigError::ZeroPulseCount));

        let mut settings = full_settings();
        settings.pulse = Some(0);
        assert_eq!(settings.validate(), Err(ConfigError::ZeroDuration("Pulse")));

        let mut settings = full_settings();
        settings.fast_pulse1 = Some(0);
        assert_eq!(settings.validate(), Err(ConfigError::ZeroDuration("FastPulse1")));
    }

    #[test]
    fn slow_step_rejected() {
        let mut settings = full_settings();
        settings.pulse_count = Some(5);
        settings.pulse = Some(200);
        assert_eq!(
            settings.validate(),
            Err(ConfigError::StepTooLong { duration_ms: 5 * 250 + 150 })
        );
    }

    #[test]
    fn exactly_one_second_allowed() {
        let mut settings = full_settings();
        settings.pulse_count = Some(1);
        settings.pulse = Some(500);
        settings.dwell = Some(200);
        settings.stop = Some(200);
        settings.recover = Some(100);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn config_from_settings_uses_defaults() {
        let config = Config::from_settings(&full_settings()).unwrap();
        assert_eq!(config.engine.max_lead_secs, 7200);
        assert_eq!(config.engine.stall_limit, 20);
        assert_eq!(config.ntp.servers.len(), 1);
        assert_eq!(config.ntp.servers[0].as_str(), "pool.ntp.org");
        assert_eq!(config.device.name.as_str(), "rs-pulseclock");
    }

    // =========================================================================
    // EngineConfig Tests
    // =========================================================================

    #[test]
    fn engine_config_default() {
        let engine = EngineConfig::default();
        assert_eq!(engine.max_lead_secs, 7200);
        assert_eq!(engine.stall_limit, 20);
        assert_eq!(engine.idle_interval_ms, 100);
        assert!(engine.align_on_start);
    }

    #[test]
    fn engine_config_builder() {
        let engine = EngineConfig::default()
            .with_max_lead_secs(36_000)
            .with_stall_limit(8)
            .with_idle_interval_ms(50)
            .with_align_on_start(false);

        assert_eq!(engine.max_lead_secs, 36_000);
        assert_eq!(engine.stall_limit, 8);
        assert_eq!(engine.idle_interval_ms, 50);
        assert!(!engine.align_on_start);
    }

    #[test]
    fn engine_lead_clamped_to_dial() {
        let engine = EngineConfig::default().with_max_lead_secs(100_000);
        assert_eq!(engine.max_lead_secs, 43_200);
    }

    // =========================================================================
    // NtpConfig Tests
    // =========================================================================

    #[test]
    fn ntp_config_default() {
        let ntp = NtpConfig::default();
        assert_eq!(ntp.success_interval_secs, 3600);
        assert_eq!(ntp.retry_interval_secs, 300);
        assert_eq!(ntp.timeout_ms, 1000);
        assert_eq!(ntp.utc_offset_secs, 0);
        assert!(ntp.enabled);
    }

    #[test]
    fn ntp_servers_truncated_to_capacity() {
        let ntp = NtpConfig::default().with_servers(&["a", "b", "c", "d", "e"]);
        assert_eq!(ntp.servers.len(), MAX_NTP_SERVERS);
        assert_eq!(ntp.servers[0].as_str(), "a");
        assert_eq!(ntp.servers[3].as_str(), "d");
    }

    // =========================================================================
    // WifiConfig Tests
    // =========================================================================

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("MyNetwork").is_configured());
        assert!(!WifiConfig::default().with_ssid("").is_configured());
    }

    #[test]
    fn wifi_config_builder() {
        let wifi = WifiConfig::default()
            .with_ssid("TestNetwork")
            .with_password("secret123")
            .with_hostname("clock.local")
            .with_connect_timeout_ms(15_000)
            .with_enabled(false);

        assert_eq!(wifi.ssid.as_str(), "TestNetwork");
        assert_eq!(wifi.password.as_str(), "secret123");
        assert_eq!(wifi.hostname.as_str(), "clock.local");
        assert_eq!(wifi.connect_timeout_ms, 15_000);
        assert!(!wifi.enabled);
    }

    #[cfg(feature = "json")]
    #[test]
    fn wifi_config_from_json() {
        let wifi = WifiConfig::from_json_str(
            r#"{"SSID": "IOT", "Password": "hunter2", "Hostname": "esp32-3.home"}"#,
        )
        .unwrap();
        assert_eq!(wifi.ssid.as_str(), "IOT");
        assert_eq!(wifi.password.as_str(), "hunter2");
        assert_eq!(wifi.hostname.as_str(), "esp32-3.home");

        let wifi = WifiConfig::from_json_str(r#"{"SSID": "IOT", "Password": ""}"#).unwrap();
        assert_eq!(wifi.hostname.as_str(), "pulseclock");
    }

    // =========================================================================
    // JSON Settings Tests
    // =========================================================================

    #[cfg(feature = "json")]
    #[test]
    fn settings_from_json() {
        let settings = ClockSettings::from_json_str(
            r#"{
                "Plus": 26, "Minus": 27, "Enable": 25, "Sense": 33,
                "Pulse": 100, "Dwell": 50, "Stop": 50, "Recover": 100, "PulseCount": 2,
                "FastPulse1": 60, "FastDwell": 30, "FastPulse2": 30, "FastStop": 60
            }"#,
        )
        .unwrap();
        assert_eq!(settings, full_settings());
    }

    #[cfg(feature = "json")]
    #[test]
    fn settings_from_json_ignores_unknown_keys() {
        let settings = ClockSettings::from_json_str(r#"{"Plus": 1, "Comment": "spare"}"#).unwrap();
        assert_eq!(settings.plus, Some(1));
        assert_eq!(settings.validate(), Err(ConfigError::MissingKey("Minus")));
    }

    #[cfg(feature = "json")]
    #[test]
    fn settings_from_malformed_json() {
        assert_eq!(
            ClockSettings::from_json_str("{\"Plus\": "),
            Err(ConfigError::Malformed)
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn settings_load_missing_file() {
        assert_eq!(
            ClockSettings::load("/nonexistent/clock.json"),
            Err(ConfigError::Unreadable)
        );
    }

    #[cfg(feature = "serde-json-core")]
    #[test]
    fn settings_from_json_slice() {
        let settings =
            ClockSettings::from_json_slice(br#"{"Plus": 26, "Minus": 27, "Pulse": 100}"#).unwrap();
        assert_eq!(settings.plus, Some(26));
        assert_eq!(settings.pulse, Some(100));
        assert_eq!(settings.sense, None);
    }

    // =========================================================================
    // String Helper Tests
    // =========================================================================

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        // 63 ASCII bytes followed by a 2-byte character straddling the limit
        let input = format!("{}é", "a".repeat(63));
        let s = short_string(&input);
        assert_eq!(s.len(), 63);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
