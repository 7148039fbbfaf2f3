//! GNSS almanac age and update helpers
//!
//! The almanac describes the satellite orbits. Assisted scans are only
//! meaningful while it is recent, so the GNSS demos compare its date with the
//! current GNSS date and refuse to scan once it is older than
//! [`GNSS_ALMANAC_MAX_AGE_DAYS`].
//!
//! Almanac dates are counted in days since the GNSS epoch (January 6, 1980),
//! GNSS dates in seconds since the same epoch.
//!
//! ## Update
//!
//! The host pushes almanac images in chunks of [`ALMANAC_BLOCK_SIZE`]-byte
//! blocks; [`update_almanac`] forwards each block to the chip and
//! [`check_almanac_update`] compares the resulting CRC with the expected one.
//!
//! # Example Usage
//!
//! ```ignore
//! use lr1110_demo::almanac::{almanac_age_days, read_almanac_info};
//!
//! let info = read_almanac_info(&mut radio).await?;
//! let age = almanac_age_days(info.date, gnss_date);
//! ```

use heapless::Vec;
use lora_phy::mod_params::RadioError;

use crate::gnss::{GnssDate, GnssExt, BEIDOU_FIRST_SATELLITE_ID, GPS_NUM_SATELLITES};

// =============================================================================
// Constants
// =============================================================================

/// Almanac age above which GNSS demos fail with `AlmanacTooOld` (days)
pub const GNSS_ALMANAC_MAX_AGE_DAYS: u16 = 90;

/// Satellite whose almanac date is reported as the almanac date
pub const ALMANAC_REFERENCE_SV_ID: u8 = 0;

/// Size of one almanac update block
pub const ALMANAC_BLOCK_SIZE: usize = 20;

/// Number of BeiDou satellites (ids 64-127)
pub const BEIDOU_NUM_SATELLITES: u8 = 64;

/// Number of satellites carrying an almanac entry
pub const ALMANAC_SATELLITE_COUNT: usize = (GPS_NUM_SATELLITES + BEIDOU_NUM_SATELLITES) as usize;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

// =============================================================================
// Types
// =============================================================================

/// Almanac date and integrity checksum as reported by the chip
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct AlmanacInfo {
    /// Days since the GNSS epoch
    pub date: u16,
    pub crc: u32,
}

/// Almanac date of one satellite
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SatelliteAlmanacDate {
    pub satellite_id: u8,
    pub date: u16,
}

/// Failure of an almanac update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum AlmanacUpdateError {
    /// Chunk is empty or not a whole number of blocks
    InvalidLength,
    /// The chip rejected a block
    Radio,
}

// =============================================================================
// Age
// =============================================================================

/// Age in days of an almanac dated `almanac_date` at GNSS date `now`.
///
/// An almanac dated in the future has age 0.
pub fn almanac_age_days(almanac_date: u16, now: GnssDate) -> u16 {
    let today = now / SECONDS_PER_DAY;
    today.saturating_sub(almanac_date as u32).min(u16::MAX as u32) as u16
}

/// True when the almanac can no longer be used for a scan
pub fn is_almanac_too_old(age_days: u16) -> bool {
    age_days > GNSS_ALMANAC_MAX_AGE_DAYS
}

/// Satellite ids carrying an almanac entry: GPS 0-31 then BeiDou 64-127
pub fn almanac_satellite_ids() -> impl Iterator<Item = u8> {
    (0..GPS_NUM_SATELLITES).chain(BEIDOU_FIRST_SATELLITE_ID..BEIDOU_FIRST_SATELLITE_ID + BEIDOU_NUM_SATELLITES)
}

// =============================================================================
// Chip access
// =============================================================================

/// Read the reference almanac date and the global almanac CRC
pub async fn read_almanac_info<R: GnssExt>(radio: &mut R) -> Result<AlmanacInfo, RadioError> {
    let date = radio.gnss_read_almanac_date(ALMANAC_REFERENCE_SV_ID).await?;
    let status = radio.gnss_get_context_status().await?;
    Ok(AlmanacInfo {
        date,
        crc: status.global_almanac_crc,
    })
}

/// Read the almanac date of every satellite
pub async fn read_almanac_dates<R: GnssExt>(
    radio: &mut R,
) -> Result<Vec<SatelliteAlmanacDate, ALMANAC_SATELLITE_COUNT>, RadioError> {
    let mut dates = Vec::new();
    for satellite_id in almanac_satellite_ids() {
        let date = radio.gnss_read_almanac_date(satellite_id).await?;
        // Capacity matches the id range
        let _ = dates.push(SatelliteAlmanacDate { satellite_id, date });
    }
    Ok(dates)
}

/// Write an almanac chunk to the chip, block by block.
///
/// Returns the number of blocks written.
pub async fn update_almanac<R: GnssExt>(radio: &mut R, chunk: &[u8]) -> Result<usize, AlmanacUpdateError> {
    if chunk.is_empty() || chunk.len() % ALMANAC_BLOCK_SIZE != 0 {
        return Err(AlmanacUpdateError::InvalidLength);
    }

    let mut written = 0;
    for block in chunk.chunks(ALMANAC_BLOCK_SIZE) {
        if radio.gnss_almanac_update(block).await.is_err() {
            warn!("almanac block {} rejected", written);
            return Err(AlmanacUpdateError::Radio);
        }
        written += 1;
    }
    debug!("almanac update: {} blocks written", written);
    Ok(written)
}

/// True when the almanac on the chip has the expected CRC
pub async fn check_almanac_update<R: GnssExt>(radio: &mut R, expected_crc: u32) -> Result<bool, RadioError> {
    let status = radio.gnss_get_context_status().await?;
    Ok(status.global_almanac_crc == expected_crc)
}
