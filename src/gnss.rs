//! GNSS scanning interface of the LR1110
//!
//! Autonomous and assisted GPS/BeiDou scans as used by the GNSS demos. A scan
//! is launched, `IRQ_GNSS_SCAN_DONE` is raised on completion (twice in dual
//! capture mode, with [`GnssExt::gnss_scan_continue`] in between) and the
//! navigation message, the detected satellites and the timings are read back.
//!
//! # Example
//!
//! ```ignore
//! use lr1110_demo::gnss::{GnssExt, GnssOption, GNSS_GPS_MASK, GNSS_BEIDOU_MASK};
//!
//! radio.gnss_set_constellation(GNSS_GPS_MASK | GNSS_BEIDOU_MASK).await?;
//! radio.gnss_scan_autonomous(gps_time_s, GnssOption::Default, GNSS_RESULTS_DEFAULT_MASK, 10).await?;
//!
//! // Wait for IRQ_GNSS_SCAN_DONE
//! let size = radio.gnss_get_result_size().await?;
//! ```

use lora_phy::mod_params::RadioError;

/// Constellation bit mask
pub type GnssConstellationMask = u8;

/// GPS constellation
pub const GNSS_GPS_MASK: GnssConstellationMask = 0x01;

/// BeiDou constellation
pub const GNSS_BEIDOU_MASK: GnssConstellationMask = 0x02;

/// GNSS date (seconds since January 6, 1980, 00:00:00 with leap seconds)
pub type GnssDate = u32;

/// Result fields requested from the solver (pseudo-range, Doppler, bit change)
pub const GNSS_RESULTS_DEFAULT_MASK: u8 = 0x07;

/// Maximal GNSS result buffer size on the chip
pub const GNSS_MAX_RESULT_SIZE: usize = 2820;

/// Maximum number of satellites reported by one scan
pub const GNSS_MAX_SATELLITES: usize = 32;

/// Number of GPS satellites (ids 0-31)
pub const GPS_NUM_SATELLITES: u8 = 32;

/// First BeiDou satellite id
pub const BEIDOU_FIRST_SATELLITE_ID: u8 = 64;

/// Constellation of a detected satellite
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssConstellation {
    Gps,
    BeiDou,
}

impl GnssConstellation {
    /// Constellation owning the given satellite id
    pub fn from_satellite_id(satellite_id: u8) -> Option<Self> {
        if satellite_id < GPS_NUM_SATELLITES {
            Some(GnssConstellation::Gps)
        } else if satellite_id >= BEIDOU_FIRST_SATELLITE_ID && satellite_id < 128 {
            Some(GnssConstellation::BeiDou)
        } else {
            None
        }
    }
}

/// Search effort
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssOption {
    Default = 0x00,
    BestEffort = 0x01,
}

/// Capture mode
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssCaptureMode {
    /// One capture per scan
    Single = 0x00,
    /// Two captures, the second launched with `gnss_scan_continue`
    Double = 0x01,
}

/// Assistance position for GNSS
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssAssistancePosition {
    /// Latitude in degrees (-90 to +90)
    pub latitude: f32,
    /// Longitude in degrees (-180 to +180)
    pub longitude: f32,
}

/// Detected satellite information
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssDetectedSatellite {
    pub satellite_id: u8,
    /// Carrier-to-noise ratio (C/N) in dB
    pub cnr: i8,
    /// SV doppler in Hz
    pub doppler: i16,
}

/// Time spent by the last scan
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssTimings {
    /// Radio capture time (milliseconds)
    pub radio_ms: u32,
    /// Solver computation time (milliseconds)
    pub computation_ms: u32,
}

/// GNSS context status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssContextStatus {
    pub firmware_version: u8,
    pub global_almanac_crc: u32,
}

// =============================================================================
// GNSS Extension Trait
// =============================================================================

/// GNSS commands needed by the demo framework.
#[allow(async_fn_in_trait)]
pub trait GnssExt {
    /// Select the constellations to search
    async fn gnss_set_constellation(&mut self, constellation_mask: GnssConstellationMask) -> Result<(), RadioError>;

    /// Select single or double capture
    async fn gnss_set_scan_mode(&mut self, capture_mode: GnssCaptureMode) -> Result<(), RadioError>;

    /// Provide the assistance position for assisted scans
    async fn gnss_set_assistance_position(&mut self, position: &GnssAssistancePosition) -> Result<(), RadioError>;

    /// Launch an autonomous scan
    async fn gnss_scan_autonomous(
        &mut self,
        date: GnssDate,
        option: GnssOption,
        result_mask: u8,
        nb_sv_max: u8,
    ) -> Result<(), RadioError>;

    /// Launch an assisted scan
    async fn gnss_scan_assisted(
        &mut self,
        date: GnssDate,
        option: GnssOption,
        result_mask: u8,
        nb_sv_max: u8,
    ) -> Result<(), RadioError>;

    /// Launch the second capture of a double scan
    async fn gnss_scan_continue(&mut self) -> Result<(), RadioError>;

    /// Size in bytes of the navigation message
    async fn gnss_get_result_size(&mut self) -> Result<u16, RadioError>;

    /// Read the navigation message
    async fn gnss_read_results(&mut self, result_buffer: &mut [u8]) -> Result<(), RadioError>;

    /// Number of satellites detected by the last scan
    async fn gnss_get_nb_satellites(&mut self) -> Result<u8, RadioError>;

    /// Detected satellites of the last scan
    async fn gnss_get_satellites(
        &mut self,
        satellites: &mut [GnssDetectedSatellite],
        nb_satellites: u8,
    ) -> Result<u8, RadioError>;

    /// Radio and computation time of the last scan
    async fn gnss_get_timings(&mut self) -> Result<GnssTimings, RadioError>;

    /// Firmware version and almanac CRC
    async fn gnss_get_context_status(&mut self) -> Result<GnssContextStatus, RadioError>;

    /// Almanac date of one satellite, in days since the GNSS epoch
    async fn gnss_read_almanac_date(&mut self, sv_id: u8) -> Result<u16, RadioError>;

    /// Write one almanac update block
    async fn gnss_almanac_update(&mut self, block: &[u8]) -> Result<(), RadioError>;
}

// =============================================================================
// LR1110 binding
// =============================================================================

/// Bytes of one `GetContextStatus` response
#[cfg(any(feature = "lr1110", test))]
const GNSS_CONTEXT_STATUS_LENGTH: usize = 9;

/// Bytes of one satellite almanac as read back from the chip
#[cfg(any(feature = "lr1110", test))]
const GNSS_SINGLE_ALMANAC_READ_SIZE: usize = 22;

/// The chip reports SNR; C/N is SNR plus this offset
#[cfg(any(feature = "lr1110", test))]
const GNSS_SNR_TO_CNR_OFFSET: i8 = 31;

#[cfg(any(feature = "lr1110", test))]
const GNSS_SCALING_LATITUDE: f32 = 90.0;

#[cfg(any(feature = "lr1110", test))]
const GNSS_SCALING_LONGITUDE: f32 = 180.0;

#[cfg(any(feature = "lr1110", test))]
#[derive(Clone, Copy)]
#[allow(dead_code)]
enum GnssOpCode {
    SetConstellation = 0x0400,
    SetScanMode = 0x0408,
    ScanAutonomous = 0x0409,
    ScanAssisted = 0x040A,
    ScanContinue = 0x040B,
    GetResultSize = 0x040C,
    ReadResults = 0x040D,
    AlmanacUpdate = 0x040E,
    SetAssistancePosition = 0x0410,
    GetContextStatus = 0x0416,
    GetNbSatellites = 0x0417,
    GetSatellites = 0x0418,
    GetTimings = 0x0419,
    ReadAlmanacPerSatellite = 0x041A,
}

#[cfg(any(feature = "lr1110", test))]
impl GnssOpCode {
    fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

/// Autonomous or assisted scan launch
#[cfg(any(feature = "lr1110", test))]
fn gnss_scan_cmd(opcode: GnssOpCode, date: GnssDate, option: GnssOption, result_mask: u8, nb_sv_max: u8) -> [u8; 9] {
    let op = opcode.bytes();
    let date = date.to_be_bytes();
    [op[0], op[1], date[0], date[1], date[2], date[3], option as u8, result_mask, nb_sv_max]
}

#[cfg(any(feature = "lr1110", test))]
fn gnss_assistance_position_cmd(position: &GnssAssistancePosition) -> [u8; 6] {
    let latitude = ((position.latitude * 2048.0) / GNSS_SCALING_LATITUDE) as i16;
    let longitude = ((position.longitude * 2048.0) / GNSS_SCALING_LONGITUDE) as i16;
    let op = GnssOpCode::SetAssistancePosition.bytes();
    let latitude = latitude.to_be_bytes();
    let longitude = longitude.to_be_bytes();
    [op[0], op[1], latitude[0], latitude[1], longitude[0], longitude[1]]
}

/// One 4-byte satellite entry: id, SNR, Doppler
#[cfg(any(feature = "lr1110", test))]
fn parse_detected_satellite(raw: &[u8]) -> GnssDetectedSatellite {
    GnssDetectedSatellite {
        satellite_id: raw[0],
        cnr: (raw[1] as i8).saturating_add(GNSS_SNR_TO_CNR_OFFSET),
        doppler: i16::from_be_bytes([raw[2], raw[3]]),
    }
}

/// Timings are reported in microseconds, computation first
#[cfg(any(feature = "lr1110", test))]
fn parse_timings(rbuffer: &[u8; 8]) -> GnssTimings {
    let computation_us = u32::from_be_bytes([rbuffer[0], rbuffer[1], rbuffer[2], rbuffer[3]]);
    let radio_us = u32::from_be_bytes([rbuffer[4], rbuffer[5], rbuffer[6], rbuffer[7]]);
    GnssTimings {
        radio_ms: radio_us / 1000,
        computation_ms: computation_us / 1000,
    }
}

#[cfg(any(feature = "lr1110", test))]
fn parse_context_status(rbuffer: &[u8; GNSS_CONTEXT_STATUS_LENGTH]) -> GnssContextStatus {
    GnssContextStatus {
        firmware_version: rbuffer[0],
        global_almanac_crc: u32::from_be_bytes([rbuffer[1], rbuffer[2], rbuffer[3], rbuffer[4]]),
    }
}

/// Almanac date (little endian) follows the satellite id
#[cfg(any(feature = "lr1110", test))]
fn parse_almanac_date(almanac: &[u8; GNSS_SINGLE_ALMANAC_READ_SIZE]) -> u16 {
    u16::from_le_bytes([almanac[1], almanac[2]])
}

#[cfg(feature = "lr1110")]
impl<SPI, IV, C> GnssExt for lora_phy::lr1110::Lr1110<SPI, IV, C>
where
    SPI: embedded_hal_async::spi::SpiDevice<u8>,
    IV: lora_phy::mod_traits::InterfaceVariant,
    C: lora_phy::lr1110::variant::Lr1110Variant,
{
    async fn gnss_set_constellation(&mut self, constellation_mask: GnssConstellationMask) -> Result<(), RadioError> {
        let opcode = GnssOpCode::SetConstellation.bytes();
        let cmd = [opcode[0], opcode[1], constellation_mask];
        self.execute_command(&cmd).await
    }

    async fn gnss_set_scan_mode(&mut self, capture_mode: GnssCaptureMode) -> Result<(), RadioError> {
        let opcode = GnssOpCode::SetScanMode.bytes();
        let cmd = [opcode[0], opcode[1], capture_mode as u8];
        self.execute_command(&cmd).await
    }

    async fn gnss_set_assistance_position(&mut self, position: &GnssAssistancePosition) -> Result<(), RadioError> {
        self.execute_command(&gnss_assistance_position_cmd(position)).await
    }

    async fn gnss_scan_autonomous(
        &mut self,
        date: GnssDate,
        option: GnssOption,
        result_mask: u8,
        nb_sv_max: u8,
    ) -> Result<(), RadioError> {
        let cmd = gnss_scan_cmd(GnssOpCode::ScanAutonomous, date, option, result_mask, nb_sv_max);
        self.execute_command(&cmd).await
    }

    async fn gnss_scan_assisted(
        &mut self,
        date: GnssDate,
        option: GnssOption,
        result_mask: u8,
        nb_sv_max: u8,
    ) -> Result<(), RadioError> {
        let cmd = gnss_scan_cmd(GnssOpCode::ScanAssisted, date, option, result_mask, nb_sv_max);
        self.execute_command(&cmd).await
    }

    async fn gnss_scan_continue(&mut self) -> Result<(), RadioError> {
        let opcode = GnssOpCode::ScanContinue.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command(&cmd).await
    }

    async fn gnss_get_result_size(&mut self) -> Result<u16, RadioError> {
        let opcode = GnssOpCode::GetResultSize.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 2];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(u16::from_be_bytes(rbuffer))
    }

    async fn gnss_read_results(&mut self, result_buffer: &mut [u8]) -> Result<(), RadioError> {
        let opcode = GnssOpCode::ReadResults.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command_with_response(&cmd, result_buffer).await
    }

    async fn gnss_get_nb_satellites(&mut self) -> Result<u8, RadioError> {
        let opcode = GnssOpCode::GetNbSatellites.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 1];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(rbuffer[0])
    }

    async fn gnss_get_satellites(
        &mut self,
        satellites: &mut [GnssDetectedSatellite],
        nb_satellites: u8,
    ) -> Result<u8, RadioError> {
        let opcode = GnssOpCode::GetSatellites.bytes();
        let cmd = [opcode[0], opcode[1]];

        let n = (nb_satellites as usize).min(satellites.len()).min(GNSS_MAX_SATELLITES);
        let mut rbuffer = [0u8; GNSS_MAX_SATELLITES * 4];
        self.execute_command_with_response(&cmd, &mut rbuffer[..n * 4]).await?;

        for (satellite, raw) in satellites.iter_mut().zip(rbuffer[..n * 4].chunks_exact(4)) {
            *satellite = parse_detected_satellite(raw);
        }
        Ok(n as u8)
    }

    async fn gnss_get_timings(&mut self) -> Result<GnssTimings, RadioError> {
        let opcode = GnssOpCode::GetTimings.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 8];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(parse_timings(&rbuffer))
    }

    async fn gnss_get_context_status(&mut self) -> Result<GnssContextStatus, RadioError> {
        let opcode = GnssOpCode::GetContextStatus.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; GNSS_CONTEXT_STATUS_LENGTH];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(parse_context_status(&rbuffer))
    }

    async fn gnss_read_almanac_date(&mut self, sv_id: u8) -> Result<u16, RadioError> {
        let opcode = GnssOpCode::ReadAlmanacPerSatellite.bytes();
        let cmd = [opcode[0], opcode[1], sv_id, 1];
        let mut almanac = [0u8; GNSS_SINGLE_ALMANAC_READ_SIZE];
        self.execute_command_with_response(&cmd, &mut almanac).await?;
        Ok(parse_almanac_date(&almanac))
    }

    async fn gnss_almanac_update(&mut self, block: &[u8]) -> Result<(), RadioError> {
        let opcode = GnssOpCode::AlmanacUpdate.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command_with_payload(&cmd, block).await
    }
}
