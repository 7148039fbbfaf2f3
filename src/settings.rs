//! Demo settings and their GUI representation
//!
//! Every demo reads its parameters from a `Demo*Settings` struct held by the
//! demo container. The GUI edits the same parameters in its own flattened
//! representation (`Gui*Settings`, indices and booleans instead of chip
//! enums); the conversions in both directions live here.

use crate::gnss::{
    GnssCaptureMode, GnssConstellationMask, GnssOption, GNSS_BEIDOU_MASK, GNSS_GPS_MASK,
};
use crate::radio::{
    GfskCrcType, GfskDcFree, GfskHeaderType, GfskModParams, GfskPktParams, LoraBandwidth, LoraCodingRate,
    LoraHeaderType, LoraModParams, LoraPktParams, LoraSf, Modulation, PaConfig, PaRegSupply, PaSel, PacketType,
    RadioConfig, RampTime,
};
use crate::wifi::{WifiChannelMask, WifiScanMode, WifiSignalTypeScan, WIFI_ALL_CHANNELS_MASK, WIFI_MAX_RESULTS};

/// Private network LoRa sync word
pub const LORA_PRIVATE_SYNC_WORD: u8 = 0x12;

// =============================================================================
// Demo-side settings
// =============================================================================

/// Wi-Fi scan parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DemoWifiSettings {
    pub channels: WifiChannelMask,
    pub types: WifiSignalTypeScan,
    pub scan_mode: WifiScanMode,
    pub nb_scan_per_channel: u8,
    pub timeout_per_scan_ms: u16,
    pub max_results: u8,
    pub abort_on_timeout: bool,
    /// Time allowed for the chip to raise `IRQ_WIFI_SCAN_DONE`
    pub scan_timeout_s: u32,
}

impl Default for DemoWifiSettings {
    fn default() -> Self {
        Self {
            channels: WIFI_ALL_CHANNELS_MASK,
            types: WifiSignalTypeScan::TypeBGN,
            scan_mode: WifiScanMode::Beacon,
            nb_scan_per_channel: 10,
            timeout_per_scan_ms: 90,
            max_results: WIFI_MAX_RESULTS as u8,
            abort_on_timeout: true,
            scan_timeout_s: 10,
        }
    }
}

/// GNSS scan parameters (one instance per GNSS mode)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DemoGnssSettings {
    pub constellation_mask: GnssConstellationMask,
    pub capture_mode: GnssCaptureMode,
    pub option: GnssOption,
    pub nb_sv_max: u8,
    /// Time allowed per capture for the chip to raise `IRQ_GNSS_SCAN_DONE`
    pub scan_timeout_s: u32,
}

impl Default for DemoGnssSettings {
    fn default() -> Self {
        Self {
            constellation_mask: GNSS_GPS_MASK | GNSS_BEIDOU_MASK,
            capture_mode: GnssCaptureMode::Single,
            option: GnssOption::Default,
            nb_sv_max: 10,
            scan_timeout_s: 20,
        }
    }
}

/// Radio test parameters shared by TX CW, PER and ping-pong
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DemoRadioSettings {
    pub pkt_type: PacketType,
    pub rf_frequency: u32,
    pub tx_power: i8,
    pub pa_configuration: PaConfig,
    pub modulation_lora: LoraModParams,
    pub packet_lora: LoraPktParams,
    pub modulation_gfsk: GfskModParams,
    pub packet_gfsk: GfskPktParams,
    pub nb_of_packets: u32,
    pub payload_length: u8,
    /// Reception window of PER RX and ping-pong
    pub rx_timeout_ms: u32,
}

impl Default for DemoRadioSettings {
    fn default() -> Self {
        Self {
            pkt_type: PacketType::Lora,
            rf_frequency: 868_100_000,
            tx_power: 14,
            pa_configuration: PaConfig {
                pa_sel: PaSel::Lp,
                reg_supply: PaRegSupply::Dcdc,
                duty_cycle: 4,
                hp_sel: 0,
            },
            modulation_lora: LoraModParams::default(),
            packet_lora: LoraPktParams::default(),
            modulation_gfsk: GfskModParams::default(),
            packet_gfsk: GfskPktParams::default(),
            nb_of_packets: 100,
            payload_length: 10,
            rx_timeout_ms: 1000,
        }
    }
}

impl DemoRadioSettings {
    /// Chip configuration for these settings
    pub fn radio_config(&self) -> RadioConfig {
        let modulation = match self.pkt_type {
            PacketType::Lora => {
                let mut modulation = self.modulation_lora;
                modulation.ldro = needs_ldro(modulation.sf, modulation.bw);
                Modulation::Lora {
                    modulation,
                    packet: self.packet_lora,
                }
            }
            PacketType::Gfsk => Modulation::Gfsk {
                modulation: self.modulation_gfsk,
                packet: self.packet_gfsk,
            },
        };

        RadioConfig {
            frequency_hz: self.rf_frequency,
            tx_power_dbm: self.tx_power,
            ramp_time: RampTime::Ramp48Us,
            pa: self.pa_configuration,
            modulation: modulation.with_payload_len(self.payload_length),
            lora_sync_word: LORA_PRIVATE_SYNC_WORD,
        }
    }
}

/// Low data rate optimization is required once a symbol lasts 16 ms or more
fn needs_ldro(sf: LoraSf, bw: LoraBandwidth) -> bool {
    match bw {
        LoraBandwidth::Bw125 => sf >= LoraSf::Sf11,
        LoraBandwidth::Bw250 => sf == LoraSf::Sf12,
        LoraBandwidth::Bw500 => false,
    }
}

/// Settings of every demo
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct DemoAllSettings {
    pub wifi: DemoWifiSettings,
    pub gnss_autonomous: DemoGnssSettings,
    pub gnss_assisted: DemoGnssSettings,
    pub radio: DemoRadioSettings,
}

// =============================================================================
// GUI-side settings
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiWifiSettings {
    pub channel_mask: WifiChannelMask,
    pub is_type_b: bool,
    pub is_type_g: bool,
    pub is_type_n: bool,
    pub is_type_all: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiGnssSettings {
    pub is_gps_enabled: bool,
    pub is_beidou_enabled: bool,
    pub is_dual_scan_activated: bool,
    pub is_best_effort_activated: bool,
}

/// LoRa parameters as GUI indices
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiLoraSettings {
    /// Spreading factor minus 5
    pub sf: u8,
    /// 0: 125 kHz, 1: 250 kHz, 2: 500 kHz
    pub bw: u8,
    /// 0: 4/5 up to 3: 4/8
    pub cr: u8,
    pub is_iq_inverted: bool,
    pub is_crc_activated: bool,
    pub is_hdr_implicit: bool,
}

/// GFSK parameters as GUI indices
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiGfskSettings {
    pub br_in_bps: u32,
    pub fdev_in_hz: u32,
    /// 0: off, 1: 1 byte, 2: 2 bytes, 3: 1 byte inverted, 4: 2 bytes inverted
    pub crc: u8,
    pub is_dcfree_enabled: bool,
    pub is_hdr_implicit: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiRadioSettings {
    pub rf_freq_in_hz: u32,
    pub pwr_in_dbm: i8,
    pub nb_of_packets: u32,
    pub payload_length: u8,
    pub is_lora: bool,
    pub is_hp_pa_enabled: bool,
    pub lora: GuiLoraSettings,
    pub gfsk: GuiGfskSettings,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GuiDemoSettings {
    pub wifi: GuiWifiSettings,
    pub gnss_autonomous: GuiGnssSettings,
    pub gnss_assisted: GuiGnssSettings,
    pub radio: GuiRadioSettings,
}

// =============================================================================
// Demo → GUI
// =============================================================================

impl From<&DemoWifiSettings> for GuiWifiSettings {
    fn from(settings: &DemoWifiSettings) -> Self {
        Self {
            channel_mask: settings.channels,
            is_type_b: settings.types == WifiSignalTypeScan::TypeB,
            is_type_g: settings.types == WifiSignalTypeScan::TypeG,
            is_type_n: settings.types == WifiSignalTypeScan::TypeN,
            is_type_all: settings.types == WifiSignalTypeScan::TypeBGN,
        }
    }
}

impl From<&DemoGnssSettings> for GuiGnssSettings {
    fn from(settings: &DemoGnssSettings) -> Self {
        Self {
            is_gps_enabled: settings.constellation_mask & GNSS_GPS_MASK != 0,
            is_beidou_enabled: settings.constellation_mask & GNSS_BEIDOU_MASK != 0,
            is_dual_scan_activated: settings.capture_mode == GnssCaptureMode::Double,
            is_best_effort_activated: settings.option == GnssOption::BestEffort,
        }
    }
}

impl From<&DemoRadioSettings> for GuiRadioSettings {
    fn from(settings: &DemoRadioSettings) -> Self {
        let lora = GuiLoraSettings {
            sf: settings.modulation_lora.sf.value() - 5,
            bw: match settings.modulation_lora.bw {
                LoraBandwidth::Bw125 => 0,
                LoraBandwidth::Bw250 => 1,
                LoraBandwidth::Bw500 => 2,
            },
            cr: match settings.modulation_lora.cr {
                LoraCodingRate::Cr4_5 => 0,
                LoraCodingRate::Cr4_6 => 1,
                LoraCodingRate::Cr4_7 => 2,
                LoraCodingRate::Cr4_8 => 3,
            },
            is_iq_inverted: settings.packet_lora.iq_inverted,
            is_crc_activated: settings.packet_lora.crc_on,
            is_hdr_implicit: settings.packet_lora.header_type == LoraHeaderType::Implicit,
        };

        let gfsk = GuiGfskSettings {
            br_in_bps: settings.modulation_gfsk.bitrate_bps,
            fdev_in_hz: settings.modulation_gfsk.fdev_hz,
            crc: match settings.packet_gfsk.crc_type {
                GfskCrcType::Off => 0,
                GfskCrcType::OneByte => 1,
                GfskCrcType::TwoBytes => 2,
                GfskCrcType::OneByteInv => 3,
                GfskCrcType::TwoBytesInv => 4,
            },
            is_dcfree_enabled: settings.packet_gfsk.dc_free == GfskDcFree::Whitening,
            is_hdr_implicit: settings.packet_gfsk.header_type == GfskHeaderType::FixedLength,
        };

        Self {
            rf_freq_in_hz: settings.rf_frequency,
            pwr_in_dbm: settings.tx_power,
            nb_of_packets: settings.nb_of_packets,
            payload_length: settings.payload_length,
            is_lora: settings.pkt_type == PacketType::Lora,
            is_hp_pa_enabled: settings.pa_configuration.pa_sel == PaSel::Hp,
            lora,
            gfsk,
        }
    }
}

impl From<&DemoAllSettings> for GuiDemoSettings {
    fn from(settings: &DemoAllSettings) -> Self {
        Self {
            wifi: GuiWifiSettings::from(&settings.wifi),
            gnss_autonomous: GuiGnssSettings::from(&settings.gnss_autonomous),
            gnss_assisted: GuiGnssSettings::from(&settings.gnss_assisted),
            radio: GuiRadioSettings::from(&settings.radio),
        }
    }
}

// =============================================================================
// GUI → Demo
// =============================================================================

impl DemoWifiSettings {
    /// Apply the GUI selection; an empty type selection keeps the current types
    pub fn update_from_gui(&mut self, gui: &GuiWifiSettings) {
        self.channels = gui.channel_mask;

        if gui.is_type_b {
            self.types = WifiSignalTypeScan::TypeB;
        } else if gui.is_type_g {
            self.types = WifiSignalTypeScan::TypeG;
        } else if gui.is_type_n {
            self.types = WifiSignalTypeScan::TypeN;
        } else if gui.is_type_all {
            self.types = WifiSignalTypeScan::TypeBGN;
        }
    }
}

impl DemoGnssSettings {
    pub fn update_from_gui(&mut self, gui: &GuiGnssSettings) {
        self.constellation_mask = 0;
        if gui.is_beidou_enabled {
            self.constellation_mask |= GNSS_BEIDOU_MASK;
        }
        if gui.is_gps_enabled {
            self.constellation_mask |= GNSS_GPS_MASK;
        }

        self.capture_mode = if gui.is_dual_scan_activated {
            GnssCaptureMode::Double
        } else {
            GnssCaptureMode::Single
        };

        self.option = if gui.is_best_effort_activated {
            GnssOption::BestEffort
        } else {
            GnssOption::Default
        };
    }
}

impl DemoRadioSettings {
    /// Apply the GUI radio settings.
    ///
    /// Output powers with a dedicated PA setting get the matching PA
    /// configuration (and the power actually programmed on that PA); other
    /// values keep the current PA tuning. Out-of-range indices keep the
    /// current value.
    pub fn update_from_gui(&mut self, gui: &GuiRadioSettings) {
        self.rf_frequency = gui.rf_freq_in_hz;
        self.tx_power = gui.pwr_in_dbm;
        self.nb_of_packets = gui.nb_of_packets;
        self.payload_length = gui.payload_length;
        self.pkt_type = if gui.is_lora { PacketType::Lora } else { PacketType::Gfsk };
        self.pa_configuration.pa_sel = if gui.is_hp_pa_enabled { PaSel::Hp } else { PaSel::Lp };

        if let Some((power, duty_cycle, hp_sel, reg_supply)) = pa_table(gui.pwr_in_dbm, self.pa_configuration.pa_sel) {
            self.tx_power = power;
            self.pa_configuration.duty_cycle = duty_cycle;
            self.pa_configuration.hp_sel = hp_sel;
            self.pa_configuration.reg_supply = reg_supply;
        }

        if let Some(sf) = LoraSf::from_value(gui.lora.sf.saturating_add(5)) {
            self.modulation_lora.sf = sf;
        }

        self.modulation_lora.bw = match gui.lora.bw {
            1 => LoraBandwidth::Bw250,
            2 => LoraBandwidth::Bw500,
            _ => LoraBandwidth::Bw125,
        };

        match gui.lora.cr {
            0 => self.modulation_lora.cr = LoraCodingRate::Cr4_5,
            1 => self.modulation_lora.cr = LoraCodingRate::Cr4_6,
            2 => self.modulation_lora.cr = LoraCodingRate::Cr4_7,
            3 => self.modulation_lora.cr = LoraCodingRate::Cr4_8,
            _ => {}
        }

        self.packet_lora.iq_inverted = gui.lora.is_iq_inverted;
        self.packet_lora.crc_on = gui.lora.is_crc_activated;
        self.packet_lora.header_type = if gui.lora.is_hdr_implicit {
            LoraHeaderType::Implicit
        } else {
            LoraHeaderType::Explicit
        };

        self.modulation_gfsk.bitrate_bps = gui.gfsk.br_in_bps;
        self.modulation_gfsk.fdev_hz = gui.gfsk.fdev_in_hz;

        match gui.gfsk.crc {
            0 => self.packet_gfsk.crc_type = GfskCrcType::Off,
            1 => self.packet_gfsk.crc_type = GfskCrcType::OneByte,
            2 => self.packet_gfsk.crc_type = GfskCrcType::TwoBytes,
            3 => self.packet_gfsk.crc_type = GfskCrcType::OneByteInv,
            4 => self.packet_gfsk.crc_type = GfskCrcType::TwoBytesInv,
            _ => {}
        }

        self.packet_gfsk.dc_free = if gui.gfsk.is_dcfree_enabled {
            GfskDcFree::Whitening
        } else {
            GfskDcFree::Off
        };
        self.packet_gfsk.header_type = if gui.gfsk.is_hdr_implicit {
            GfskHeaderType::FixedLength
        } else {
            GfskHeaderType::VariableLength
        };
    }
}

/// PA tuning for the output powers offered by the GUI:
/// (programmed power, duty cycle, HP selection, regulator supply)
fn pa_table(pwr_in_dbm: i8, pa_sel: PaSel) -> Option<(i8, u8, u8, PaRegSupply)> {
    match (pwr_in_dbm, pa_sel) {
        (10, _) => Some((14, 0, 0, PaRegSupply::Dcdc)),
        (14, PaSel::Lp) => Some((14, 4, 0, PaRegSupply::Dcdc)),
        (14, PaSel::Hp) => Some((22, 2, 2, PaRegSupply::Vbat)),
        (15, _) => Some((14, 7, 0, PaRegSupply::Dcdc)),
        (17, _) => Some((22, 1, 5, PaRegSupply::Vbat)),
        (20, _) => Some((22, 2, 7, PaRegSupply::Vbat)),
        (22, _) => Some((22, 4, 7, PaRegSupply::Vbat)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trip_through_gui() {
        let demo = DemoAllSettings::default();
        let gui = GuiDemoSettings::from(&demo);

        let mut back = demo;
        back.wifi.update_from_gui(&gui.wifi);
        back.gnss_autonomous.update_from_gui(&gui.gnss_autonomous);
        back.gnss_assisted.update_from_gui(&gui.gnss_assisted);
        back.radio.update_from_gui(&gui.radio);
        assert_eq!(back, demo);
    }

    #[test]
    fn test_lora_header_and_crc_are_independent() {
        let mut radio = DemoRadioSettings::default();
        let mut gui = GuiRadioSettings::from(&radio);

        gui.lora.is_crc_activated = true;
        gui.lora.is_hdr_implicit = false;
        radio.update_from_gui(&gui);
        assert!(radio.packet_lora.crc_on);
        assert_eq!(radio.packet_lora.header_type, LoraHeaderType::Explicit);

        gui.lora.is_crc_activated = false;
        gui.lora.is_hdr_implicit = true;
        radio.update_from_gui(&gui);
        assert!(!radio.packet_lora.crc_on);
        assert_eq!(radio.packet_lora.header_type, LoraHeaderType::Implicit);

        let gui = GuiRadioSettings::from(&radio);
        assert!(!gui.lora.is_crc_activated);
        assert!(gui.lora.is_hdr_implicit);
    }

    #[test]
    fn test_payload_length_not_taken_from_packet_count() {
        let mut radio = DemoRadioSettings::default();
        radio.nb_of_packets = 250;
        radio.payload_length = 12;
        let gui = GuiRadioSettings::from(&radio);
        assert_eq!(gui.payload_length, 12);
        assert_eq!(gui.nb_of_packets, 250);
    }

    #[test]
    fn test_pa_table() {
        let mut radio = DemoRadioSettings::default();
        let mut gui = GuiRadioSettings::from(&radio);

        gui.pwr_in_dbm = 14;
        gui.is_hp_pa_enabled = true;
        radio.update_from_gui(&gui);
        assert_eq!(radio.tx_power, 22);
        assert_eq!(
            radio.pa_configuration,
            PaConfig {
                pa_sel: PaSel::Hp,
                reg_supply: PaRegSupply::Vbat,
                duty_cycle: 2,
                hp_sel: 2,
            }
        );

        gui.pwr_in_dbm = 10;
        gui.is_hp_pa_enabled = false;
        radio.update_from_gui(&gui);
        assert_eq!(radio.tx_power, 14);
        assert_eq!(radio.pa_configuration.duty_cycle, 0);
        assert_eq!(radio.pa_configuration.reg_supply, PaRegSupply::Dcdc);

        // No dedicated PA tuning: power kept as requested, tuning unchanged
        gui.pwr_in_dbm = 5;
        radio.update_from_gui(&gui);
        assert_eq!(radio.tx_power, 5);
        assert_eq!(radio.pa_configuration.duty_cycle, 0);
    }

    #[test]
    fn test_lora_indices() {
        let mut radio = DemoRadioSettings::default();
        let mut gui = GuiRadioSettings::from(&radio);
        gui.lora.sf = 7;
        gui.lora.bw = 2;
        gui.lora.cr = 3;
        radio.update_from_gui(&gui);
        assert_eq!(radio.modulation_lora.sf, LoraSf::Sf12);
        assert_eq!(radio.modulation_lora.bw, LoraBandwidth::Bw500);
        assert_eq!(radio.modulation_lora.cr, LoraCodingRate::Cr4_8);

        gui.lora.sf = 9;
        gui.lora.bw = 7;
        gui.lora.cr = 9;
        radio.update_from_gui(&gui);
        assert_eq!(radio.modulation_lora.sf, LoraSf::Sf12);
        assert_eq!(radio.modulation_lora.bw, LoraBandwidth::Bw125);
        assert_eq!(radio.modulation_lora.cr, LoraCodingRate::Cr4_8);
    }

    #[test]
    fn test_wifi_type_selection() {
        let mut wifi = DemoWifiSettings::default();
        let gui = GuiWifiSettings {
            channel_mask: 0x0421,
            is_type_g: true,
            is_type_all: true,
            ..Default::default()
        };
        wifi.update_from_gui(&gui);
        assert_eq!(wifi.channels, 0x0421);
        assert_eq!(wifi.types, WifiSignalTypeScan::TypeG);

        wifi.update_from_gui(&GuiWifiSettings::default());
        assert_eq!(wifi.types, WifiSignalTypeScan::TypeG);
    }

    #[test]
    fn test_gnss_from_gui() {
        let mut gnss = DemoGnssSettings::default();
        gnss.update_from_gui(&GuiGnssSettings {
            is_gps_enabled: true,
            is_beidou_enabled: false,
            is_dual_scan_activated: true,
            is_best_effort_activated: true,
        });
        assert_eq!(gnss.constellation_mask, GNSS_GPS_MASK);
        assert_eq!(gnss.capture_mode, GnssCaptureMode::Double);
        assert_eq!(gnss.option, GnssOption::BestEffort);
    }

    #[test]
    fn test_radio_config_ldro_and_payload() {
        let mut radio = DemoRadioSettings::default();
        radio.modulation_lora.sf = LoraSf::Sf12;
        radio.payload_length = 42;
        let config = radio.radio_config();
        match config.modulation {
            Modulation::Lora { modulation, packet } => {
                assert!(modulation.ldro);
                assert_eq!(packet.payload_len, 42);
            }
            Modulation::Gfsk { .. } => panic!("expected LoRa"),
        }
    }
}
