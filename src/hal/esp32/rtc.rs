//! ESP32 system clock as the RTC, with the hand position kept in NVS.
//!
//! The system clock survives resets and deep sleep but not power loss; on
//! a cold start it reads as 1970 until the first network sync. The hand
//! position is stored as seconds-of-day under one NVS key.
//!
//! NVS wear-levels across its pages, but a write every second is still
//! heavy use for flash. Boards with a DS3231 should implement
//! [`RtcChip`] over I2C and keep the hands in its alarm registers instead.

use std::time::{SystemTime, UNIX_EPOCH};

use esp_idf_hal::sys::{settimeofday, timeval, EspError, ESP_FAIL};
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use log::{info, warn};

use crate::position::HmsTriple;
use crate::traits::RtcChip;

const NAMESPACE: &str = "pulseclock";
const HANDS_KEY: &str = "hands";
const DAY_SECS: i64 = 86_400;

fn fail() -> EspError {
    EspError::from_infallible::<ESP_FAIL>()
}

/// System-time RTC with NVS hand storage.
pub struct Esp32Rtc {
    nvs: EspNvs<NvsDefault>,
    utc_offset_secs: i32,
    last_hands: Option<u32>,
}

impl Esp32Rtc {
    /// Open the NVS namespace. `utc_offset_secs` converts between the
    /// UTC system clock and local time of day.
    pub fn new(partition: EspDefaultNvsPartition, utc_offset_secs: i32) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, NAMESPACE, true)?;
        Ok(Self {
            nvs,
            utc_offset_secs,
            last_hands: None,
        })
    }

    fn epoch_secs() -> Result<i64, EspError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .map_err(|_| fail())
    }
}

impl RtcChip for Esp32Rtc {
    type Error = EspError;

    fn read_time(&mut self) -> Result<HmsTriple, EspError> {
        Ok(HmsTriple::from_epoch_secs(
            Self::epoch_secs()? as u64,
            self.utc_offset_secs,
        ))
    }

    fn write_time(&mut self, time: HmsTriple) -> Result<(), EspError> {
        let now = Self::epoch_secs()?;
        let local = now + self.utc_offset_secs as i64;
        let mut target = local - local.rem_euclid(DAY_SECS) + time.seconds_of_day() as i64;
        // Stay on the nearest day when the correction crosses midnight
        if target - local > DAY_SECS / 2 {
            target -= DAY_SECS;
        } else if local - target > DAY_SECS / 2 {
            target += DAY_SECS;
        }
        let epoch = target - self.utc_offset_secs as i64;

        let tv = timeval {
            tv_sec: epoch as _,
            tv_usec: 0,
        };
        // SAFETY: `tv` is a valid timeval and the timezone argument may be null
        if unsafe { settimeofday(&tv, core::ptr::null()) } != 0 {
            warn!("settimeofday failed");
            return Err(fail());
        }
        info!("system clock set to {}", time);
        Ok(())
    }

    fn read_hands(&mut self) -> Result<HmsTriple, EspError> {
        let secs = match self.nvs.get_u32(HANDS_KEY)? {
            Some(secs) => secs,
            None => {
                warn!("no stored hand position, assuming 12:00:00");
                0
            }
        };
        self.last_hands = Some(secs);
        Ok(HmsTriple::from_epoch_secs(secs as u64, 0))
    }

    fn write_hands(&mut self, hands: HmsTriple) -> Result<(), EspError> {
        let secs = hands.seconds_of_day();
        if self.last_hands == Some(secs) {
            return Ok(());
        }
        self.nvs.set_u32(HANDS_KEY, secs)?;
        self.last_hands = Some(secs);
        Ok(())
    }
}
