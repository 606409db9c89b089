//! WiFi station for network time.
//!
//! Provides a synchronous station-mode connection using esp-idf-svc. The
//! clock keeps running from the RTC if the connection fails or drops, so
//! callers treat every error here as non-fatal.
//!
//! # Example
//!
//! ```ignore
//! use rs_pulseclock::hal::esp32::Esp32Wifi;
//! use rs_pulseclock::config::WifiConfig;
//!
//! let config = WifiConfig::from_json_str(include_str!("../settings/wifi.json"))?;
//! let wifi = Esp32Wifi::new(modem, sysloop, nvs, &config)?;
//! log::info!("IP: {:?}", wifi.ip_addr());
//! ```

use crate::config::WifiConfig;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::net::Ipv4Addr;

/// WiFi connection manager for ESP32.
///
/// The connection is established during construction and maintained for
/// the lifetime of this struct.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
    connect_timeout_ms: u32,
}

const ASSOCIATE_POLL_MS: u32 = 100;

impl<'a> Esp32Wifi<'a> {
    /// Connect to the configured access point and wait for DHCP.
    ///
    /// # Errors
    ///
    /// Returns an error if driver setup, association or DHCP fails.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let mut esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        if let Err(e) = esp_wifi.sta_netif_mut().set_hostname(config.hostname.as_str()) {
            warn!("[WiFi] hostname '{}' rejected: {}", config.hostname, e);
        }
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());

        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            ..Default::default()
        }))?;

        wifi.start()?;
        info!("[WiFi] connecting to '{}'", config.ssid);
        let mut this = Self {
            wifi,
            connect_timeout_ms: config.connect_timeout_ms,
        };
        this.associate()?;

        if let Some(ip) = this.ip_addr() {
            info!("[WiFi] connected as {} ({})", config.hostname, ip);
        }

        Ok(this)
    }

    /// Join the access point, giving up after `connect_timeout_ms`, then wait
    /// for DHCP.
    fn associate(&mut self) -> anyhow::Result<()> {
        self.wifi.wifi_mut().connect()?;
        let mut waited_ms = 0;
        while !self.wifi.is_connected()? {
            if waited_ms >= self.connect_timeout_ms {
                anyhow::bail!("association timed out after {}ms", self.connect_timeout_ms);
            }
            FreeRtos::delay_ms(ASSOCIATE_POLL_MS);
            waited_ms += ASSOCIATE_POLL_MS;
        }
        self.wifi.wait_netif_up()?;
        Ok(())
    }

    /// Get the current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    /// Check if WiFi is connected.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    /// Try to re-associate after a drop.
    pub fn reconnect(&mut self) -> anyhow::Result<()> {
        info!("[WiFi] link down, reconnecting");
        self.associate()
    }
}
