//! Minimal SNTP codec and a blocking client.
//!
//! Only the server transmit timestamp is used: this is drift correction
//! for a clock with one-second hands, not precision timekeeping. Half the
//! round-trip time is credited to the reply so the sample lines up with
//! the moment the server stamped it.
//!
//! # Packet layout (48 bytes)
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0 | LI (2 bits), version (3 bits), mode (3 bits) |
//! | 1 | Stratum |
//! | 40..44 | Transmit timestamp, seconds since 1900 |
//! | 44..48 | Transmit timestamp, binary fraction |
//!
//! # Example
//!
//! ```rust
//! use rs_pulseclock::ntp::{build_request, parse_response, NTP_PACKET_LEN};
//!
//! let request = build_request();
//! assert_eq!(request[0], 0x1B);
//!
//! let mut reply = [0u8; NTP_PACKET_LEN];
//! reply[0] = 0x24; // version 4, server mode
//! reply[1] = 2;
//! reply[40..44].copy_from_slice(&(2_208_988_800u32 + 60).to_be_bytes());
//! reply[44..48].copy_from_slice(&0x8000_0000u32.to_be_bytes());
//!
//! let sample = parse_response(&reply, 1234).unwrap();
//! assert_eq!(sample.epoch_secs, 60);
//! assert_eq!(sample.millis, 500);
//! assert_eq!(sample.local_ms, 1234);
//! ```

use crate::error::NtpError;
use crate::traits::NtpSample;

/// Length of an NTP packet without extensions.
pub const NTP_PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970).
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// UDP port NTP servers listen on.
pub const NTP_PORT: u16 = 123;

/// LI=0, VN=3, Mode=3 (client).
const CLIENT_HEADER: u8 = 0x1B;

const MODE_SERVER: u8 = 4;
const MODE_BROADCAST: u8 = 5;
const MAX_STRATUM: u8 = 15;

/// Build a client request.
pub fn build_request() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet
}

/// Converts an NTP binary fraction to milliseconds.
pub const fn fraction_to_millis(frac: u32) -> u16 {
    (frac / 4_294_967) as u16
}

/// Decode a server reply received at `local_ms`.
pub fn parse_response(packet: &[u8], local_ms: u64) -> Result<NtpSample, NtpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(NtpError::ShortResponse);
    }

    let mode = packet[0] & 0x07;
    if mode != MODE_SERVER && mode != MODE_BROADCAST {
        return Err(NtpError::BadMode);
    }

    let stratum = packet[1];
    if stratum == 0 || stratum > MAX_STRATUM {
        return Err(NtpError::BadStratum(stratum));
    }

    let secs = u32::from_be_bytes([packet[40], packet[41], packet[42], packet[43]]) as u64;
    let frac = u32::from_be_bytes([packet[44], packet[45], packet[46], packet[47]]);

    // Era 0 ends in 2036; a small raw value means era 1
    let secs = if secs < NTP_UNIX_OFFSET {
        secs + (1u64 << 32)
    } else {
        secs
    };

    Ok(NtpSample::new(
        secs - NTP_UNIX_OFFSET,
        fraction_to_millis(frac).min(999),
        local_ms,
    ))
}

#[cfg(feature = "std")]
pub use client::StdNtpClient;

#[cfg(feature = "std")]
mod client {
    use std::net::{ToSocketAddrs, UdpSocket};
    use std::time::Duration;

    use log::{debug, warn};

    use super::{build_request, parse_response, NTP_PACKET_LEN, NTP_PORT};
    use crate::error::NtpError;
    use crate::traits::{Clock, NetworkTimeSource, NtpSample};

    /// Blocking NTP client over `std::net::UdpSocket`.
    ///
    /// `C` must be the same monotonic clock the caller later passes to
    /// [`NtpSample::epoch_secs_at`].
    pub struct StdNtpClient<C: Clock> {
        clock: C,
        timeout: Duration,
    }

    impl<C: Clock> StdNtpClient<C> {
        /// Create a client with a per-request timeout.
        pub fn new(clock: C, timeout_ms: u32) -> Self {
            Self {
                clock,
                timeout: Duration::from_millis(timeout_ms.max(1) as u64),
            }
        }

        /// The monotonic clock samples are stamped with.
        pub fn clock(&self) -> &C {
            &self.clock
        }
    }

    impl<C: Clock> NetworkTimeSource for StdNtpClient<C> {
        fn query(&mut self, server: &str) -> Result<NtpSample, NtpError> {
            let addr = (server, NTP_PORT)
                .to_socket_addrs()
                .map_err(|e| {
                    warn!("resolving {} failed: {}", server, e);
                    NtpError::Resolve
                })?
                .find(|a| a.is_ipv4())
                .ok_or(NtpError::Resolve)?;

            let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| NtpError::Socket)?;
            socket
                .set_read_timeout(Some(self.timeout))
                .map_err(|_| NtpError::Socket)?;

            let sent_ms = self.clock.now_ms();
            socket
                .send_to(&build_request(), addr)
                .map_err(|_| NtpError::Socket)?;

            let mut reply = [0u8; NTP_PACKET_LEN];
            let (len, from) = socket.recv_from(&mut reply).map_err(|e| match e.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => NtpError::Timeout,
                _ => NtpError::Socket,
            })?;
            let received_ms = self.clock.now_ms();

            if from.ip() != addr.ip() {
                return Err(NtpError::Socket);
            }

            let rtt_ms = received_ms.saturating_sub(sent_ms);
            let sample = parse_response(&reply[..len], received_ms - rtt_ms / 2)?;
            debug!(
                "{} ({}) epoch={} ms={} rtt={}ms",
                server, addr, sample.epoch_secs, sample.millis, rtt_ms
            );
            Ok(sample)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(header: u8, stratum: u8, secs: u32, frac: u32) -> [u8; NTP_PACKET_LEN] {
        let mut packet = [0u8; NTP_PACKET_LEN];
        packet[0] = header;
        packet[1] = stratum;
        packet[40..44].copy_from_slice(&secs.to_be_bytes());
        packet[44..48].copy_from_slice(&frac.to_be_bytes());
        packet
    }

    #[test]
    fn request_header() {
        let request = build_request();
        assert_eq!(request.len(), 48);
        assert_eq!(request[0] >> 6, 0); // LI
        assert_eq!((request[0] >> 3) & 0x07, 3); // version
        assert_eq!(request[0] & 0x07, 3); // client
        assert!(request[1..].iter().all(|&b| b == 0));
    }

    #[test]
    fn parses_transmit_timestamp() {
        // 2021-01-01T00:00:00Z
        let ntp_secs = (1_609_459_200 + NTP_UNIX_OFFSET) as u32;
        let sample = parse_response(&reply(0x24, 1, ntp_secs, 0), 42).unwrap();
        assert_eq!(sample, NtpSample::new(1_609_459_200, 0, 42));
    }

    #[test]
    fn fraction_conversion() {
        assert_eq!(fraction_to_millis(0), 0);
        assert_eq!(fraction_to_millis(0x4000_0000), 250);
        assert_eq!(fraction_to_millis(u32::MAX), 1000);

        let sample = parse_response(&reply(0x24, 2, NTP_UNIX_OFFSET as u32, u32::MAX), 0).unwrap();
        assert_eq!(sample.millis, 999);
    }

    #[test]
    fn broadcast_mode_accepted() {
        assert!(parse_response(&reply(0x25, 3, NTP_UNIX_OFFSET as u32, 0), 0).is_ok());
    }

    #[test]
    fn rejects_short_packets() {
        let packet = reply(0x24, 1, NTP_UNIX_OFFSET as u32, 0);
        assert_eq!(parse_response(&packet[..47], 0), Err(NtpError::ShortResponse));
        assert_eq!(parse_response(&[], 0), Err(NtpError::ShortResponse));
    }

    #[test]
    fn rejects_client_mode_echo() {
        let packet = reply(0x1B, 1, NTP_UNIX_OFFSET as u32, 0);
        assert_eq!(parse_response(&packet, 0), Err(NtpError::BadMode));
    }

    #[test]
    fn rejects_kiss_of_death_and_unsynchronised() {
        let secs = NTP_UNIX_OFFSET as u32;
        assert_eq!(parse_response(&reply(0x24, 0, secs, 0), 0), Err(NtpError::BadStratum(0)));
        assert_eq!(parse_response(&reply(0x24, 16, secs, 0), 0), Err(NtpError::BadStratum(16)));
    }

    #[test]
    fn era_rollover() {
        // Raw seconds wrap to small values after 2036-02-07
        let sample = parse_response(&reply(0x24, 1, 10, 0), 0).unwrap();
        assert_eq!(sample.epoch_secs, (1u64 << 32) + 10 - NTP_UNIX_OFFSET);
    }
}
