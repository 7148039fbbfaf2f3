//! Host logging and telemetry transport
//!
//! The transport (serial link to a PC or a field-test host) is owned by the
//! board crate. The supervisor only decides what is stored and when it is
//! flushed; the helpers in this module build the text lines it stores.
//!
//! One line is stored per Wi-Fi result:
//!
//! ```text
//! 01:23:45:67:89:ab, CHANNEL_6, TYPE_B, -70, 100, 200, 50, 10
//! ```
//!
//! followed by the demodulation, capture, correlation and detection timings
//! (microseconds) of the whole scan.

use core::fmt::Write;
use heapless::String;

use crate::demo::gnss::GnssResults;
use crate::demo::wifi::{WifiScanResults, WifiScanSingleResult};
use crate::supervisor::VersionInfo;
use crate::wifi::{WifiCumulativeTimings, WifiMacAddress};

/// Capacity of one stored Wi-Fi line
pub const WIFI_LINE_MAX_LENGTH: usize = 96;

/// Capacity of the reverse geocoding text ("street,city,country")
pub const GEO_CODING_MAX_LENGTH: usize = 64;

/// Length of a formatted MAC address
pub const MAC_STRING_LENGTH: usize = 17;

/// What is connected on the host side of the transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum HostType {
    NoHost,
    UnknownHost,
    /// Host probing the link; answered with a connection test response
    ConnectionTestHost,
    /// Demo companion application
    DemoHost,
    /// Field-test tooling driving the device through the HCI
    FieldTestHost,
}

impl HostType {
    /// Host type still unresolved; probing continues
    pub fn is_undetermined(self) -> bool {
        matches!(
            self,
            HostType::NoHost | HostType::UnknownHost | HostType::ConnectionTestHost
        )
    }
}

/// Failure of a transport request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LoggingStatus {
    Timeout,
    BadResponse,
    NoHost,
}

/// Position solved by the server, with its reverse geocoding
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ServerResults {
    pub latitude: f32,
    pub longitude: f32,
    pub altitude: f32,
    pub accuracy: f32,
    /// "street,city,country"
    pub geo_coding: String<GEO_CODING_MAX_LENGTH>,
}

/// Logging/telemetry link to the host.
pub trait LogTransport {
    /// Probe the link and report what answered
    fn test_host_connected(&mut self) -> HostType;

    fn send_connection_test_response(&mut self);

    fn enable_logging(&mut self);

    fn disable_logging(&mut self);

    fn set_version(&mut self, version: &VersionInfo);

    fn erase_data_stored(&mut self);

    fn send_version_information(&mut self);

    /// Queue one text line
    fn store_line(&mut self, line: &str);

    /// Queue one GNSS navigation message record
    fn store_nav_message(&mut self, message: &[u8], delay_capture_s: u32, radio_ms: u32, computation_ms: u32);

    /// Flush everything stored so far
    fn send_data_stored_to_server(&mut self);

    /// Fetch the position solved by the server from the last flush
    fn get_results(&mut self) -> Result<ServerResults, LoggingStatus>;
}

/// Format a MAC address as `xx:xx:xx:xx:xx:xx`
pub fn format_mac(mac: &WifiMacAddress) -> String<MAC_STRING_LENGTH> {
    let mut out = String::new();
    for (index, byte) in mac.iter().enumerate() {
        if index > 0 {
            let _ = out.push(':');
        }
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// Build the stored line of one Wi-Fi result
pub fn format_wifi_line(
    result: &WifiScanSingleResult,
    timings: &WifiCumulativeTimings,
) -> String<WIFI_LINE_MAX_LENGTH> {
    let mut line = String::new();
    let channel = result.channel.number().unwrap_or(0);
    // Capacity covers the longest line
    let _ = write!(
        line,
        "{}, CHANNEL_{}, {}, {}, {}, {}, {}, {}\n",
        format_mac(&result.mac_address),
        channel,
        result.signal_type.as_str(),
        result.rssi,
        timings.demodulation_us,
        timings.rx_capture_us,
        timings.rx_correlation_us,
        timings.rx_detection_us
    );
    line
}

/// Store one line per Wi-Fi result
pub fn store_wifi_results<L: LogTransport>(log: &mut L, results: &WifiScanResults) {
    for result in results.results.iter() {
        log.store_line(&format_wifi_line(result, &results.timings));
    }
}

/// Store the navigation message of a GNSS run
pub fn store_gnss_results<L: LogTransport>(log: &mut L, results: &GnssResults, delay_capture_s: u32) {
    log.store_nav_message(
        &results.nav_message,
        delay_capture_s,
        results.timings.radio_ms,
        results.timings.computation_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLog;
    use crate::wifi::{WifiChannel, WifiSignalTypeResult};

    fn single(mac: WifiMacAddress, channel: WifiChannel, rssi: i8) -> WifiScanSingleResult {
        WifiScanSingleResult {
            mac_address: mac,
            channel,
            signal_type: WifiSignalTypeResult::TypeB,
            rssi,
            country_code: [0, 0],
        }
    }

    #[test]
    fn test_format_mac() {
        assert_eq!(
            format_mac(&[0x01, 0x23, 0x45, 0x67, 0x89, 0xAB]).as_str(),
            "01:23:45:67:89:ab"
        );
    }

    #[test]
    fn test_format_wifi_line() {
        let timings = WifiCumulativeTimings {
            rx_detection_us: 10,
            rx_correlation_us: 50,
            rx_capture_us: 200,
            demodulation_us: 100,
        };
        let line = format_wifi_line(&single([0xFF; 6], WifiChannel::Channel11, -85), &timings);
        assert_eq!(
            line.as_str(),
            "ff:ff:ff:ff:ff:ff, CHANNEL_11, TYPE_B, -85, 100, 200, 50, 10\n"
        );
    }

    #[test]
    fn test_one_line_per_wifi_result() {
        let mut results = WifiScanResults::default();
        for index in 0..3u8 {
            let _ = results.results.push(single([index; 6], WifiChannel::Channel1, -60));
        }
        results.nbr_results = 3;

        let mut log = MockLog::new();
        store_wifi_results(&mut log, &results);
        assert_eq!(log.lines.len(), 3);
        assert!(log.lines[2].starts_with("02:02:02:02:02:02, CHANNEL_1"));
    }

    #[test]
    fn test_host_type_undetermined() {
        assert!(HostType::NoHost.is_undetermined());
        assert!(HostType::ConnectionTestHost.is_undetermined());
        assert!(!HostType::DemoHost.is_undetermined());
        assert!(!HostType::FieldTestHost.is_undetermined());
    }
}
