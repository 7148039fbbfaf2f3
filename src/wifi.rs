//! Wi-Fi passive scanning interface of the LR1110
//!
//! Types and commands needed by the Wi-Fi demonstrations: launching a passive
//! scan or a country-code search, then reading back the results and the
//! cumulative radio timings once `IRQ_WIFI_SCAN_DONE` is raised.
//!
//! # Example
//!
//! ```ignore
//! use lr1110_demo::wifi::{WifiExt, WifiSignalTypeScan, WifiScanMode, WIFI_ALL_CHANNELS_MASK};
//!
//! radio.wifi_scan(
//!     WifiSignalTypeScan::TypeBGN,
//!     WIFI_ALL_CHANNELS_MASK,
//!     WifiScanMode::Beacon,
//!     32,  // max results
//!     10,  // scans per channel
//!     90,  // timeout per scan (ms)
//!     true,
//! ).await?;
//!
//! // Wait for IRQ_WIFI_SCAN_DONE, then read results
//! let nb_results = radio.wifi_get_nb_results().await?;
//! ```

use lora_phy::mod_params::RadioError;

/// Bit mask of Wi-Fi channels (bit 0 = channel 1)
pub type WifiChannelMask = u16;

/// Length of a MAC address
pub const WIFI_MAC_ADDRESS_LENGTH: usize = 6;

/// Maximum number of results the chip can hold
pub const WIFI_MAX_RESULTS: usize = 32;

/// Length of a country code
pub const WIFI_STR_COUNTRY_CODE_SIZE: usize = 2;

/// Number of 2.4 GHz channels
pub const WIFI_CHANNEL_COUNT: usize = 14;

/// All channels 1-14
pub const WIFI_ALL_CHANNELS_MASK: WifiChannelMask = 0x3FFF;

/// MAC address
pub type WifiMacAddress = [u8; WIFI_MAC_ADDRESS_LENGTH];

/// Wi-Fi channel index
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiChannel {
    NoChannel = 0x00,
    Channel1 = 0x01,
    Channel2 = 0x02,
    Channel3 = 0x03,
    Channel4 = 0x04,
    Channel5 = 0x05,
    Channel6 = 0x06,
    Channel7 = 0x07,
    Channel8 = 0x08,
    Channel9 = 0x09,
    Channel10 = 0x0A,
    Channel11 = 0x0B,
    Channel12 = 0x0C,
    Channel13 = 0x0D,
    Channel14 = 0x0E,
    AllChannels = 0x0F,
}

impl WifiChannel {
    /// Channel number (1-14) for a real channel
    pub fn number(self) -> Option<u8> {
        match self {
            WifiChannel::NoChannel | WifiChannel::AllChannels => None,
            other => Some(other as u8),
        }
    }
}

impl From<u8> for WifiChannel {
    fn from(value: u8) -> Self {
        match value {
            0x01 => WifiChannel::Channel1,
            0x02 => WifiChannel::Channel2,
            0x03 => WifiChannel::Channel3,
            0x04 => WifiChannel::Channel4,
            0x05 => WifiChannel::Channel5,
            0x06 => WifiChannel::Channel6,
            0x07 => WifiChannel::Channel7,
            0x08 => WifiChannel::Channel8,
            0x09 => WifiChannel::Channel9,
            0x0A => WifiChannel::Channel10,
            0x0B => WifiChannel::Channel11,
            0x0C => WifiChannel::Channel12,
            0x0D => WifiChannel::Channel13,
            0x0E => WifiChannel::Channel14,
            0x0F => WifiChannel::AllChannels,
            _ => WifiChannel::NoChannel,
        }
    }
}

/// Wi-Fi signal type for scan configuration
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiSignalTypeScan {
    /// 802.11b only
    TypeB = 0x01,
    /// 802.11g only
    TypeG = 0x02,
    /// 802.11n only (mixed mode)
    TypeN = 0x03,
    /// 802.11b, g and n
    TypeBGN = 0x04,
}

/// Wi-Fi signal type in scan results
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiSignalTypeResult {
    TypeB = 0x01,
    TypeG = 0x02,
    TypeN = 0x03,
}

impl WifiSignalTypeResult {
    /// Label used in the host log lines
    pub fn as_str(self) -> &'static str {
        match self {
            WifiSignalTypeResult::TypeB => "TYPE_B",
            WifiSignalTypeResult::TypeG => "TYPE_G",
            WifiSignalTypeResult::TypeN => "TYPE_N",
        }
    }
}

impl From<u8> for WifiSignalTypeResult {
    fn from(value: u8) -> Self {
        match value {
            0x02 => WifiSignalTypeResult::TypeG,
            0x03 => WifiSignalTypeResult::TypeN,
            _ => WifiSignalTypeResult::TypeB,
        }
    }
}

/// Wi-Fi scan mode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiScanMode {
    /// Beacons and probe responses
    Beacon = 1,
    /// Beacons, probe responses and other packets
    BeaconAndPacket = 2,
}

/// Cumulative time the chip spent in each scan phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WifiCumulativeTimings {
    /// NFE or TOA (microseconds)
    pub rx_detection_us: u32,
    /// Preamble detection (microseconds)
    pub rx_correlation_us: u32,
    /// Signal acquisition (microseconds)
    pub rx_capture_us: u32,
    /// Software demodulation (microseconds)
    pub demodulation_us: u32,
}

impl WifiCumulativeTimings {
    /// Sum of all phases in microseconds
    pub fn total_us(&self) -> u32 {
        self.demodulation_us
            .saturating_add(self.rx_capture_us)
            .saturating_add(self.rx_correlation_us)
            .saturating_add(self.rx_detection_us)
    }
}

/// Basic MAC/type/channel Wi-Fi result (9 bytes on the wire)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WifiBasicMacTypeChannelResult {
    /// Data rate info byte (contains signal type)
    pub data_rate_info_byte: u8,
    /// Channel info byte (contains channel and RSSI validity)
    pub channel_info_byte: u8,
    /// RSSI in dBm
    pub rssi: i8,
    pub mac_address: WifiMacAddress,
}

impl WifiBasicMacTypeChannelResult {
    pub fn signal_type(&self) -> WifiSignalTypeResult {
        WifiSignalTypeResult::from(self.data_rate_info_byte & 0x03)
    }

    pub fn channel(&self) -> WifiChannel {
        WifiChannel::from(self.channel_info_byte & 0x0F)
    }
}

/// Country code result of a country-code search
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WifiCountryCodeResult {
    pub country_code: [u8; WIFI_STR_COUNTRY_CODE_SIZE],
    pub io_regulation: u8,
    pub channel_info_byte: u8,
    pub mac_address: WifiMacAddress,
}

impl WifiCountryCodeResult {
    pub fn channel(&self) -> WifiChannel {
        WifiChannel::from(self.channel_info_byte & 0x0F)
    }
}

// =============================================================================
// Wi-Fi Extension Trait
// =============================================================================

/// Wi-Fi commands needed by the demo framework.
#[allow(async_fn_in_trait)]
pub trait WifiExt {
    /// Start a passive scan; completion is signalled by `IRQ_WIFI_SCAN_DONE`
    async fn wifi_scan(
        &mut self,
        signal_type: WifiSignalTypeScan,
        channel_mask: WifiChannelMask,
        scan_mode: WifiScanMode,
        max_results: u8,
        nb_scan_per_channel: u8,
        timeout_per_scan_ms: u16,
        abort_on_timeout: bool,
    ) -> Result<(), RadioError>;

    /// Start a country-code search; completion is signalled by `IRQ_WIFI_SCAN_DONE`
    async fn wifi_search_country_code(
        &mut self,
        channel_mask: WifiChannelMask,
        nb_max_results: u8,
        nb_scan_per_channel: u8,
        timeout_per_scan_ms: u16,
        abort_on_timeout: bool,
    ) -> Result<(), RadioError>;

    /// Number of scan results available
    async fn wifi_get_nb_results(&mut self) -> Result<u8, RadioError>;

    /// Read scan results in basic MAC/type/channel format
    async fn wifi_read_basic_mac_type_channel_results(
        &mut self,
        results: &mut [WifiBasicMacTypeChannelResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError>;

    /// Number of country-code results available
    async fn wifi_get_nb_country_code_results(&mut self) -> Result<u8, RadioError>;

    /// Read country-code results
    async fn wifi_read_country_code_results(
        &mut self,
        results: &mut [WifiCountryCodeResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError>;

    /// Read cumulative scan timings
    async fn wifi_read_cumulative_timing(&mut self) -> Result<WifiCumulativeTimings, RadioError>;

    /// Reset cumulative scan timings
    async fn wifi_reset_cumulative_timing(&mut self) -> Result<(), RadioError>;
}

// =============================================================================
// LR1110 binding
// =============================================================================

/// Bytes per result in basic MAC/type/channel format
#[cfg(any(feature = "lr1110", test))]
const WIFI_BASIC_MAC_TYPE_CHANNEL_RESULT_SIZE: usize = 9;

/// Bytes per country-code result
#[cfg(any(feature = "lr1110", test))]
const WIFI_COUNTRY_CODE_RESULT_SIZE: usize = 10;

/// `ReadResult` format selector for basic MAC/type/channel results
#[cfg(any(feature = "lr1110", test))]
const WIFI_RESULT_FORMAT_BASIC_MAC_TYPE_CHANNEL: u8 = 0x04;

#[cfg(any(feature = "lr1110", test))]
#[derive(Clone, Copy)]
#[allow(dead_code)]
enum WifiOpCode {
    Scan = 0x0300,
    SearchCountryCode = 0x0302,
    GetResultSize = 0x0305,
    ReadResult = 0x0306,
    ResetCumulTiming = 0x0307,
    ReadCumulTiming = 0x0308,
    GetSizeCountryResult = 0x0309,
    ReadCountryCode = 0x030A,
}

#[cfg(any(feature = "lr1110", test))]
impl WifiOpCode {
    fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

#[cfg(any(feature = "lr1110", test))]
fn wifi_scan_cmd(
    signal_type: WifiSignalTypeScan,
    channel_mask: WifiChannelMask,
    scan_mode: WifiScanMode,
    max_results: u8,
    nb_scan_per_channel: u8,
    timeout_per_scan_ms: u16,
    abort_on_timeout: bool,
) -> [u8; 11] {
    let opcode = WifiOpCode::Scan.bytes();
    let mask = channel_mask.to_be_bytes();
    let timeout = timeout_per_scan_ms.to_be_bytes();
    [
        opcode[0],
        opcode[1],
        signal_type as u8,
        mask[0],
        mask[1],
        scan_mode as u8,
        max_results,
        nb_scan_per_channel,
        timeout[0],
        timeout[1],
        abort_on_timeout as u8,
    ]
}

#[cfg(any(feature = "lr1110", test))]
fn wifi_search_country_code_cmd(
    channel_mask: WifiChannelMask,
    nb_max_results: u8,
    nb_scan_per_channel: u8,
    timeout_per_scan_ms: u16,
    abort_on_timeout: bool,
) -> [u8; 9] {
    let opcode = WifiOpCode::SearchCountryCode.bytes();
    let mask = channel_mask.to_be_bytes();
    let timeout = timeout_per_scan_ms.to_be_bytes();
    [
        opcode[0],
        opcode[1],
        mask[0],
        mask[1],
        nb_max_results,
        nb_scan_per_channel,
        timeout[0],
        timeout[1],
        abort_on_timeout as u8,
    ]
}

#[cfg(any(feature = "lr1110", test))]
fn parse_basic_mac_type_channel_result(raw: &[u8]) -> WifiBasicMacTypeChannelResult {
    let mut mac_address = [0u8; WIFI_MAC_ADDRESS_LENGTH];
    mac_address.copy_from_slice(&raw[3..3 + WIFI_MAC_ADDRESS_LENGTH]);
    WifiBasicMacTypeChannelResult {
        data_rate_info_byte: raw[0],
        channel_info_byte: raw[1],
        rssi: raw[2] as i8,
        mac_address,
    }
}

#[cfg(any(feature = "lr1110", test))]
fn parse_country_code_result(raw: &[u8]) -> WifiCountryCodeResult {
    let mut mac_address = [0u8; WIFI_MAC_ADDRESS_LENGTH];
    mac_address.copy_from_slice(&raw[4..4 + WIFI_MAC_ADDRESS_LENGTH]);
    WifiCountryCodeResult {
        country_code: [raw[0], raw[1]],
        io_regulation: raw[2],
        channel_info_byte: raw[3],
        mac_address,
    }
}

#[cfg(any(feature = "lr1110", test))]
fn parse_cumulative_timings(rbuffer: &[u8; 16]) -> WifiCumulativeTimings {
    let word = |index: usize| {
        u32::from_be_bytes([
            rbuffer[index * 4],
            rbuffer[index * 4 + 1],
            rbuffer[index * 4 + 2],
            rbuffer[index * 4 + 3],
        ])
    };
    WifiCumulativeTimings {
        rx_detection_us: word(0),
        rx_correlation_us: word(1),
        rx_capture_us: word(2),
        demodulation_us: word(3),
    }
}

#[cfg(feature = "lr1110")]
impl<SPI, IV, C> WifiExt for lora_phy::lr1110::Lr1110<SPI, IV, C>
where
    SPI: embedded_hal_async::spi::SpiDevice<u8>,
    IV: lora_phy::mod_traits::InterfaceVariant,
    C: lora_phy::lr1110::variant::Lr1110Variant,
{
    async fn wifi_scan(
        &mut self,
        signal_type: WifiSignalTypeScan,
        channel_mask: WifiChannelMask,
        scan_mode: WifiScanMode,
        max_results: u8,
        nb_scan_per_channel: u8,
        timeout_per_scan_ms: u16,
        abort_on_timeout: bool,
    ) -> Result<(), RadioError> {
        let cmd = wifi_scan_cmd(
            signal_type,
            channel_mask,
            scan_mode,
            max_results,
            nb_scan_per_channel,
            timeout_per_scan_ms,
            abort_on_timeout,
        );
        self.execute_command(&cmd).await
    }

    async fn wifi_search_country_code(
        &mut self,
        channel_mask: WifiChannelMask,
        nb_max_results: u8,
        nb_scan_per_channel: u8,
        timeout_per_scan_ms: u16,
        abort_on_timeout: bool,
    ) -> Result<(), RadioError> {
        let cmd = wifi_search_country_code_cmd(
            channel_mask,
            nb_max_results,
            nb_scan_per_channel,
            timeout_per_scan_ms,
            abort_on_timeout,
        );
        self.execute_command(&cmd).await
    }

    async fn wifi_get_nb_results(&mut self) -> Result<u8, RadioError> {
        let opcode = WifiOpCode::GetResultSize.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 1];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(rbuffer[0])
    }

    async fn wifi_read_basic_mac_type_channel_results(
        &mut self,
        results: &mut [WifiBasicMacTypeChannelResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError> {
        let n = (nb_results as usize).min(results.len()).min(WIFI_MAX_RESULTS);
        let opcode = WifiOpCode::ReadResult.bytes();
        let cmd = [
            opcode[0],
            opcode[1],
            start_index,
            n as u8,
            WIFI_RESULT_FORMAT_BASIC_MAC_TYPE_CHANNEL,
        ];
        let mut rbuffer = [0u8; WIFI_MAX_RESULTS * WIFI_BASIC_MAC_TYPE_CHANNEL_RESULT_SIZE];
        let rbuffer = &mut rbuffer[..n * WIFI_BASIC_MAC_TYPE_CHANNEL_RESULT_SIZE];
        self.execute_command_with_response(&cmd, rbuffer).await?;

        for (result, raw) in results
            .iter_mut()
            .zip(rbuffer.chunks_exact(WIFI_BASIC_MAC_TYPE_CHANNEL_RESULT_SIZE))
        {
            *result = parse_basic_mac_type_channel_result(raw);
        }
        Ok(n as u8)
    }

    async fn wifi_get_nb_country_code_results(&mut self) -> Result<u8, RadioError> {
        let opcode = WifiOpCode::GetSizeCountryResult.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 1];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(rbuffer[0])
    }

    async fn wifi_read_country_code_results(
        &mut self,
        results: &mut [WifiCountryCodeResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError> {
        let n = (nb_results as usize).min(results.len()).min(WIFI_MAX_RESULTS);
        let opcode = WifiOpCode::ReadCountryCode.bytes();
        let cmd = [opcode[0], opcode[1], start_index, n as u8];
        let mut rbuffer = [0u8; WIFI_MAX_RESULTS * WIFI_COUNTRY_CODE_RESULT_SIZE];
        let rbuffer = &mut rbuffer[..n * WIFI_COUNTRY_CODE_RESULT_SIZE];
        self.execute_command_with_response(&cmd, rbuffer).await?;

        for (result, raw) in results.iter_mut().zip(rbuffer.chunks_exact(WIFI_COUNTRY_CODE_RESULT_SIZE)) {
            *result = parse_country_code_result(raw);
        }
        Ok(n as u8)
    }

    async fn wifi_read_cumulative_timing(&mut self) -> Result<WifiCumulativeTimings, RadioError> {
        let opcode = WifiOpCode::ReadCumulTiming.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 16];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(parse_cumulative_timings(&rbuffer))
    }

    async fn wifi_reset_cumulative_timing(&mut self) -> Result<(), RadioError> {
        let opcode = WifiOpCode::ResetCumulTiming.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command(&cmd).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_command_layout() {
        let cmd = wifi_scan_cmd(
            WifiSignalTypeScan::TypeBGN,
            WIFI_ALL_CHANNELS_MASK,
            WifiScanMode::Beacon,
            32,
            10,
            90,
            true,
        );
        assert_eq!(cmd, [0x03, 0x00, 0x04, 0x3F, 0xFF, 0x01, 32, 10, 0x00, 90, 0x01]);

        let cmd = wifi_search_country_code_cmd(0x0421, 5, 3, 300, false);
        assert_eq!(cmd, [0x03, 0x02, 0x04, 0x21, 5, 3, 0x01, 0x2C, 0x00]);
    }

    #[test]
    fn test_parse_raw_results() {
        let raw = [0x02, 0x36, 0xB5, 1, 2, 3, 4, 5, 6];
        let result = parse_basic_mac_type_channel_result(&raw);
        assert_eq!(result.rssi, -75);
        assert_eq!(result.channel(), WifiChannel::Channel6);
        assert_eq!(result.mac_address, [1, 2, 3, 4, 5, 6]);

        let raw = [b'F', b'R', 0x00, 0x0B, 0xA0, 0xB1, 0xC2, 0xD3, 0xE4, 0xF5];
        let country = parse_country_code_result(&raw);
        assert_eq!(&country.country_code, b"FR");
        assert_eq!(country.channel(), WifiChannel::Channel11);
        assert_eq!(country.mac_address[5], 0xF5);
    }

    #[test]
    fn test_parse_cumulative_timings() {
        let mut raw = [0u8; 16];
        raw[3] = 0x10;
        raw[6] = 0x01;
        raw[15] = 0x2A;
        let timings = parse_cumulative_timings(&raw);
        assert_eq!(timings.rx_detection_us, 0x10);
        assert_eq!(timings.rx_correlation_us, 0x100);
        assert_eq!(timings.rx_capture_us, 0);
        assert_eq!(timings.demodulation_us, 0x2A);
    }

    #[test]
    fn test_basic_result_decoding() {
        let result = WifiBasicMacTypeChannelResult {
            data_rate_info_byte: 0x02,
            channel_info_byte: 0x36,
            rssi: -70,
            mac_address: [1, 2, 3, 4, 5, 6],
        };
        assert_eq!(result.signal_type(), WifiSignalTypeResult::TypeG);
        assert_eq!(result.channel(), WifiChannel::Channel6);
        assert_eq!(result.channel().number(), Some(6));
    }

    #[test]
    fn test_channel_numbers() {
        assert_eq!(WifiChannel::from(0x0E).number(), Some(14));
        assert_eq!(WifiChannel::NoChannel.number(), None);
        assert_eq!(WifiChannel::AllChannels.number(), None);
        assert_eq!(WifiChannel::from(0x20), WifiChannel::NoChannel);
    }

    #[test]
    fn test_timings_total_saturates() {
        let timings = WifiCumulativeTimings {
            rx_detection_us: u32::MAX,
            rx_correlation_us: 1,
            rx_capture_us: 0,
            demodulation_us: 0,
        };
        assert_eq!(timings.total_us(), u32::MAX);
    }
}
