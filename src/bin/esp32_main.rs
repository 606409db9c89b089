//! ESP32 pulse clock firmware.
//!
//! This is the main entry point for the physical clock. It:
//! - Loads pin assignments and pulse timings from `settings/clock.json`
//! - Restores the hand position from NVS
//! - Steps the movement once per second, catching up or parking as needed
//! - Corrects the system clock from NTP between ticks (with `wifi`)
//!
//! # Build
//!
//! ```bash
//! # Offline (RTC only)
//! cargo build --release --features esp32
//!
//! # With network time
//! WIFI_SSID=... WIFI_PASSWORD=... UTC_OFFSET_SECS=3600 \
//!     cargo build --release --features wifi
//! ```

use esp_idf_hal::delay::Delay as EspDelay;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, Output, PinDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{info, warn};
use rs_pulseclock::hal::embedded::{HalDelay, HalDriveLines};
use rs_pulseclock::hal::esp32::{Esp32Clock, Esp32Rtc, Esp32SenseLine};
use rs_pulseclock::ntp::StdNtpClient;
use rs_pulseclock::{
    Clock, ClockEngine, ClockSettings, Config, CountedSenseLine, EdgeCounter, HandTracker, NtpConfig,
    OpenLoopTracker, PositionSensor, PositionTracker, PulseDriver, SyncScheduler,
    SyncedTimeSource, WifiConfig,
};

type Lines = HalDriveLines<PinDriver<'static, AnyOutputPin, Output>>;
type Engine<S, K> = ClockEngine<Lines, HalDelay<EspDelay>, S, K>;
type Time = SyncedTimeSource<Esp32Rtc, Esp32Clock>;
type Ntp = StdNtpClient<Esp32Clock>;

#[cfg(feature = "wifi")]
type Link = rs_pulseclock::hal::esp32::Esp32Wifi<'static>;
#[cfg(not(feature = "wifi"))]
type Link = ();

static EDGES: EdgeCounter = EdgeCounter::new();

fn main() -> anyhow::Result<()> {
    esp_idf_hal::sys::link_patches();
    EspLogger::initialize_default();

    info!("rs-pulseclock {}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Configuration
    // =========================================================================
    let settings = ClockSettings::from_json_str(include_str!("../../settings/clock.json"))?;
    let utc_offset_secs = option_env!("UTC_OFFSET_SECS")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let config = Config::from_settings(&settings)?
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or(""))
                .with_hostname(option_env!("WIFI_HOSTNAME").unwrap_or("pulseclock")),
        )
        .with_ntp(NtpConfig::default().with_utc_offset_secs(utc_offset_secs));

    info!("{} ({})", config.device.name, config.device.id);
    info!(
        "pins +{} -{} en{} sense {:?}; step {}ms, fast step {}ms",
        config.pins.plus,
        config.pins.minus,
        config.pins.enable,
        config.pins.sense,
        config.pulse.step_duration_ms(),
        config.pulse.fast_step_duration_ms()
    );

    // =========================================================================
    // Hardware
    // =========================================================================
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // SAFETY: pin numbers come from validated settings (distinct), and no
    // other driver in this firmware claims GPIOs
    let lines = unsafe {
        HalDriveLines::new(
            PinDriver::output(AnyOutputPin::new(config.pins.plus as i32))?,
            PinDriver::output(AnyOutputPin::new(config.pins.minus as i32))?,
            PinDriver::output(AnyOutputPin::new(config.pins.enable as i32))?,
        )
    };
    let delay = HalDelay::new(EspDelay::new_default());

    let rtc = Esp32Rtc::new(nvs.clone(), config.ntp.utc_offset_secs)?;
    let time = SyncedTimeSource::new(rtc, Esp32Clock::new(), &config.ntp);

    // =========================================================================
    // Network (optional)
    // =========================================================================
    #[cfg(feature = "wifi")]
    let net: Option<(Link, Ntp)> = if config.wifi.enabled && config.wifi.is_configured() {
        match rs_pulseclock::hal::esp32::Esp32Wifi::new(
            peripherals.modem,
            sysloop.clone(),
            Some(nvs),
            &config.wifi,
        ) {
            Ok(wifi) => Some((wifi, StdNtpClient::new(Esp32Clock::new(), config.ntp.timeout_ms))),
            Err(e) => {
                warn!("WiFi unavailable, running from RTC: {}", e);
                None
            }
        }
    } else {
        None
    };

    #[cfg(not(feature = "wifi"))]
    let net: Option<(Link, Ntp)> = {
        let _ = (peripherals, sysloop);
        None
    };

    // =========================================================================
    // Engine
    // =========================================================================
    match config.pins.sense {
        Some(pin) => {
            // SAFETY: see drive lines above
            let sensor = Esp32SenseLine::new(unsafe { AnyIOPin::new(pin as i32) }, &EDGES)?;
            let driver = PulseDriver::new(lines, delay, sensor, config.pulse);
            let tracker = HandTracker::new(config.engine.stall_limit);
            run(ClockEngine::new(driver, tracker, config.engine.clone()), time, &config, net)
        }
        None => {
            warn!("no sense pin configured, running open loop");
            let sensor = CountedSenseLine::new(&EDGES, || false);
            let driver = PulseDriver::new(lines, delay, sensor, config.pulse);
            run(
                ClockEngine::new(driver, OpenLoopTracker::new(), config.engine.clone()),
                time,
                &config,
                net,
            )
        }
    }
}

fn run<S, K>(
    mut engine: Engine<S, K>,
    mut time: Time,
    config: &Config,
    mut net: Option<(Link, Ntp)>,
) -> anyhow::Result<()>
where
    S: PositionSensor,
    K: PositionTracker,
{
    let mut scheduler = SyncScheduler::new(&config.ntp);

    // Settle the clock before the first decision
    if let Some((_, client)) = net.as_mut() {
        time.poll_sync(client, &config.ntp, &mut scheduler);
    }
    engine.start(&mut time)?;

    loop {
        match engine.tick(&mut time) {
            Ok(outcome) if outcome.stepped() => continue,
            Ok(_) => {}
            Err(e) => warn!("tick failed: {}", e),
        }

        // Never during a pulse: only reached on idle ticks
        if let Some((link, client)) = net.as_mut() {
            if scheduler.is_due(time.clock().now_ms()) {
                ensure_link(link);
            }
            time.poll_sync(client, &config.ntp, &mut scheduler);
        }
        engine.idle();
    }
}

/// Re-associate before a due sync if the access point dropped us.
#[cfg(feature = "wifi")]
fn ensure_link(wifi: &mut Link) {
    if !wifi.is_connected() {
        if let Err(e) = wifi.reconnect() {
            warn!("WiFi reconnect failed: {}", e);
        }
    }
}

#[cfg(not(feature = "wifi"))]
fn ensure_link(_: &mut Link) {}
