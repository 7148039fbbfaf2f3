//! Touchscreen GUI collaborator
//!
//! The widget tree is owned by the board crate. The supervisor pulls at most
//! one [`GuiEvent`] per iteration, reads the settings pages back when the
//! user edits them, and pushes results in the GUI's own representation
//! (MAC strings grouped per channel, satellite lists, counters).

use core::array;
use core::fmt::Write;
use heapless::{String, Vec};

use crate::demo::gnss::{DemoGnssError, GnssResults};
use crate::demo::per::PerResults;
use crate::demo::ping_pong::PingPongResults;
use crate::demo::wifi::WifiScanResults;
use crate::gnss::GnssConstellation;
use crate::logging::{format_mac, ServerResults, MAC_STRING_LENGTH};
use crate::settings::{GuiDemoSettings, GuiGnssSettings, GuiRadioSettings, GuiWifiSettings};
use crate::supervisor::VersionInfo;
use crate::wifi::{WifiSignalTypeResult, WIFI_CHANNEL_COUNT, WIFI_STR_COUNTRY_CODE_SIZE};

/// MAC addresses shown per channel and signal type
pub const GUI_MAX_WIFI_MAC_ADDRESSES: usize = 5;

/// Satellites shown on the GNSS result page
pub const GUI_MAX_GNSS_SATELLITES: usize = 32;

/// Capacity of the street/city/country labels
pub const GUI_GEO_LOC_TEXT_LENGTH: usize = 32;

/// Capacity of the latitude/longitude labels
pub const GUI_GEO_LOC_COORD_LENGTH: usize = 16;

/// Event produced by the GUI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GuiEvent {
    None,
    StartDemoWifi,
    StartDemoWifiCountryCode,
    StartDemoGnssAutonomous,
    StartDemoGnssAssisted,
    StartDemoTxCw,
    StartDemoPerTx,
    StartDemoPerRx,
    StartDemoPingPong,
    StopDemo,
    Send,
    UpdateDemoRadio,
    UpdateDemoWifi,
    UpdateDemoGnssAutonomous,
    UpdateDemoGnssAssisted,
}

/// Status displayed on a result page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GuiDemoStatus {
    Ok,
    KoHostNotConnected,
    KoAlmanacTooOld,
    KoNavMessageTooLong,
    KoUnknown,
}

impl From<DemoGnssError> for GuiDemoStatus {
    fn from(error: DemoGnssError) -> Self {
        match error {
            DemoGnssError::NoError => GuiDemoStatus::Ok,
            DemoGnssError::NoDate | DemoGnssError::NoLocation => GuiDemoStatus::KoHostNotConnected,
            DemoGnssError::AlmanacTooOld => GuiDemoStatus::KoAlmanacTooOld,
            DemoGnssError::NavMessageTooLong => GuiDemoStatus::KoNavMessageTooLong,
            // An empty sky is a valid outcome
            DemoGnssError::NoSatellite => GuiDemoStatus::Ok,
            DemoGnssError::Unknown => GuiDemoStatus::KoUnknown,
        }
    }
}

// =============================================================================
// Wi-Fi result page
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiWifiMacEntry {
    pub mac_addr: String<MAC_STRING_LENGTH>,
    pub country_code: String<WIFI_STR_COUNTRY_CODE_SIZE>,
    pub rssi: i8,
}

/// Access points seen on one channel
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiWifiResultChannel {
    pub entries: Vec<GuiWifiMacEntry, GUI_MAX_WIFI_MAC_ADDRESSES>,
}

/// Per-channel table for one signal type, index 0 is channel 1
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiWifiResultType {
    pub channels: [GuiWifiResultChannel; WIFI_CHANNEL_COUNT],
}

impl Default for GuiWifiResultType {
    fn default() -> Self {
        Self {
            channels: array::from_fn(|_| GuiWifiResultChannel::default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiWifiResult {
    pub status: GuiDemoStatus,
    pub power_cons_total_uas: u32,
    pub nb_mac_addr_total: u8,
    pub timing_total_ms: u32,
    pub error: bool,
    pub type_b: GuiWifiResultType,
    /// Type G and type N results
    pub type_g: GuiWifiResultType,
}

impl From<&WifiScanResults> for GuiWifiResult {
    fn from(results: &WifiScanResults) -> Self {
        let mut gui = GuiWifiResult {
            status: GuiDemoStatus::Ok,
            power_cons_total_uas: results.global_consumption_uas,
            nb_mac_addr_total: results.nbr_results,
            timing_total_ms: results.timings.total_us() / 1000,
            error: results.error,
            type_b: GuiWifiResultType::default(),
            type_g: GuiWifiResultType::default(),
        };

        for result in results.results.iter() {
            let Some(channel) = result.channel.number() else {
                debug!("dropping Wi-Fi result without channel");
                continue;
            };

            let table = match result.signal_type {
                WifiSignalTypeResult::TypeB => &mut gui.type_b,
                _ => &mut gui.type_g,
            };
            let slot = &mut table.channels[(channel - 1) as usize];

            let mut country_code = String::new();
            for &c in result.country_code.iter() {
                if c.is_ascii_graphic() {
                    let _ = country_code.push(c as char);
                }
            }

            // Full channels keep their first entries
            let _ = slot.entries.push(GuiWifiMacEntry {
                mac_addr: format_mac(&result.mac_address),
                country_code,
                rssi: result.rssi,
            });
        }

        gui
    }
}

// =============================================================================
// GNSS result page
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiGnssSatellite {
    pub constellation: GnssConstellation,
    pub satellite_id: u8,
    pub snr: i8,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiGnssResult {
    pub status: GuiDemoStatus,
    pub power_cons_total_uas: u32,
    pub timing_total_ms: u32,
    pub nb_satellites: u8,
    pub almanac_age_days: u16,
    pub almanac_too_old: bool,
    pub satellites: Vec<GuiGnssSatellite, GUI_MAX_GNSS_SATELLITES>,
}

impl From<&GnssResults> for GuiGnssResult {
    fn from(results: &GnssResults) -> Self {
        let mut satellites = Vec::new();
        for satellite in results.satellites.iter() {
            let _ = satellites.push(GuiGnssSatellite {
                constellation: satellite.constellation,
                satellite_id: satellite.satellite_id,
                snr: satellite.snr,
            });
        }

        GuiGnssResult {
            status: GuiDemoStatus::from(results.error),
            power_cons_total_uas: results.consumption_uas,
            timing_total_ms: results.timings.radio_ms.saturating_add(results.timings.computation_ms),
            nb_satellites: results.nb_result,
            almanac_age_days: results.almanac_age_days,
            almanac_too_old: results.almanac_too_old,
            satellites,
        }
    }
}

// =============================================================================
// Radio test pages
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiRadioPerResult {
    pub count_tx: u32,
    pub count_rx_correct_packet: u32,
    pub count_rx_wrong_packet: u32,
    pub count_rx_timeout: u32,
}

impl From<&PerResults> for GuiRadioPerResult {
    fn from(results: &PerResults) -> Self {
        Self {
            count_tx: results.count_tx,
            count_rx_correct_packet: results.count_rx_correct_packet,
            count_rx_wrong_packet: results.count_rx_wrong_packet,
            count_rx_timeout: results.count_rx_timeout,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiRadioPingPongResult {
    pub count_tx: u32,
    pub count_rx_correct_packet: u32,
    pub count_rx_wrong_packet: u32,
    pub count_rx_timeout: u32,
}

impl From<&PingPongResults> for GuiRadioPingPongResult {
    fn from(results: &PingPongResults) -> Self {
        Self {
            count_tx: results.count_tx,
            count_rx_correct_packet: results.count_rx_correct_packet,
            count_rx_wrong_packet: results.count_rx_wrong_packet,
            count_rx_timeout: results.count_rx_timeout,
        }
    }
}

// =============================================================================
// Reverse geocoding
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiReverseGeoCoding {
    pub street: String<GUI_GEO_LOC_TEXT_LENGTH>,
    pub city: String<GUI_GEO_LOC_TEXT_LENGTH>,
    pub country: String<GUI_GEO_LOC_TEXT_LENGTH>,
    pub latitude: String<GUI_GEO_LOC_COORD_LENGTH>,
    pub longitude: String<GUI_GEO_LOC_COORD_LENGTH>,
}

impl From<&ServerResults> for GuiReverseGeoCoding {
    /// Split "street,city,country"; the country takes the remainder
    fn from(results: &ServerResults) -> Self {
        let mut parts = results.geo_coding.as_str().splitn(3, ',');
        let mut geo = GuiReverseGeoCoding {
            street: truncated(parts.next().unwrap_or("")),
            city: truncated(parts.next().unwrap_or("")),
            country: truncated(parts.next().unwrap_or("").trim_end()),
            ..Default::default()
        };
        let _ = write!(geo.latitude, "{:.5}", results.latitude);
        let _ = write!(geo.longitude, "{:.5}", results.longitude);
        geo
    }
}

fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// =============================================================================
// GUI trait
// =============================================================================

/// Touchscreen GUI driven by the supervisor.
pub trait Gui {
    fn init(&mut self, settings: &GuiDemoSettings, default_settings: &GuiDemoSettings, version: &VersionInfo);

    /// Process touch input and redraw
    fn runtime(&mut self);

    /// Take the last event, [`GuiEvent::None`] when there is none
    fn get_last_event(&mut self) -> GuiEvent;

    fn host_connectivity_change(&mut self, is_connected: bool);

    fn get_radio_settings(&self) -> GuiRadioSettings;

    fn get_wifi_settings(&self) -> GuiWifiSettings;

    fn get_gnss_autonomous_settings(&self) -> GuiGnssSettings;

    fn get_gnss_assisted_settings(&self) -> GuiGnssSettings;

    fn update_wifi_demo_result(&mut self, result: &GuiWifiResult);

    fn update_gnss_demo_result(&mut self, result: &GuiGnssResult);

    fn update_radio_per_result(&mut self, result: &GuiRadioPerResult);

    fn update_radio_ping_pong_result(&mut self, result: &GuiRadioPingPongResult);

    fn update_reverse_geo_coding(&mut self, geo: &GuiReverseGeoCoding);

    /// A redraw is still scheduled
    fn has_refresh_pending(&self) -> bool;
}
