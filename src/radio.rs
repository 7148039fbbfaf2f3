//! Radio control functions for the LR1110
//!
//! Packet-type selection, modulation and packet parameters, power amplifier
//! setup and the TX/RX/CW operations used by the radio test demos (PER,
//! ping-pong and continuous wave).

use lora_phy::mod_params::RadioError;

/// RX continuous mode (no timeout)
pub const RX_CONTINUOUS: u32 = 0xFF_FFFF;

/// Largest timeout accepted by `set_tx`/`set_rx`
pub const RTC_STEPS_MAX: u32 = 0xFF_FFFE;

/// Convert milliseconds to RTC steps (32.768 kHz), saturating at the chip maximum
pub fn ms_to_rtc_steps(ms: u32) -> u32 {
    let steps = (ms as u64 * 32_768) / 1000;
    steps.min(RTC_STEPS_MAX as u64) as u32
}

// =============================================================================
// Types
// =============================================================================

/// Packet type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PacketType {
    Gfsk = 0x01,
    Lora = 0x02,
}

/// LoRa spreading factor
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LoraSf {
    Sf5 = 0x05,
    Sf6 = 0x06,
    Sf7 = 0x07,
    Sf8 = 0x08,
    Sf9 = 0x09,
    Sf10 = 0x0A,
    Sf11 = 0x0B,
    Sf12 = 0x0C,
}

impl LoraSf {
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0x05 => Some(LoraSf::Sf5),
            0x06 => Some(LoraSf::Sf6),
            0x07 => Some(LoraSf::Sf7),
            0x08 => Some(LoraSf::Sf8),
            0x09 => Some(LoraSf::Sf9),
            0x0A => Some(LoraSf::Sf10),
            0x0B => Some(LoraSf::Sf11),
            0x0C => Some(LoraSf::Sf12),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

/// LoRa bandwidth
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LoraBandwidth {
    Bw125 = 0x04,
    Bw250 = 0x05,
    Bw500 = 0x06,
}

/// LoRa coding rate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LoraCodingRate {
    Cr4_5 = 0x01,
    Cr4_6 = 0x02,
    Cr4_7 = 0x03,
    Cr4_8 = 0x04,
}

/// LoRa header mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum LoraHeaderType {
    Explicit = 0x00,
    Implicit = 0x01,
}

/// LoRa modulation parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct LoraModParams {
    pub sf: LoraSf,
    pub bw: LoraBandwidth,
    pub cr: LoraCodingRate,
    /// Low data rate optimization
    pub ldro: bool,
}

impl Default for LoraModParams {
    fn default() -> Self {
        Self {
            sf: LoraSf::Sf7,
            bw: LoraBandwidth::Bw125,
            cr: LoraCodingRate::Cr4_5,
            ldro: false,
        }
    }
}

/// LoRa packet parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct LoraPktParams {
    /// Preamble length in symbols
    pub preamble_len: u16,
    pub header_type: LoraHeaderType,
    pub payload_len: u8,
    pub crc_on: bool,
    pub iq_inverted: bool,
}

impl Default for LoraPktParams {
    fn default() -> Self {
        Self {
            preamble_len: 8,
            header_type: LoraHeaderType::Explicit,
            payload_len: 10,
            crc_on: true,
            iq_inverted: false,
        }
    }
}

/// GFSK pulse shaping filter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GfskPulseShape {
    Off = 0x00,
    Bt03 = 0x08,
    Bt05 = 0x09,
    Bt07 = 0x0A,
    Bt1 = 0x0B,
}

/// GFSK CRC configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GfskCrcType {
    Off = 0x01,
    OneByte = 0x00,
    TwoBytes = 0x02,
    OneByteInv = 0x04,
    TwoBytesInv = 0x06,
}

/// GFSK header (length) mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GfskHeaderType {
    /// Fixed length, no header
    FixedLength = 0x00,
    /// Variable length, length byte in header
    VariableLength = 0x01,
}

/// GFSK DC-free encoding
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GfskDcFree {
    Off = 0x00,
    Whitening = 0x01,
}

/// GFSK modulation parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GfskModParams {
    pub bitrate_bps: u32,
    pub pulse_shape: GfskPulseShape,
    /// Receiver bandwidth register value (0x0B = 117.3 kHz DSB)
    pub bandwidth: u8,
    pub fdev_hz: u32,
}

impl Default for GfskModParams {
    fn default() -> Self {
        Self {
            bitrate_bps: 50_000,
            pulse_shape: GfskPulseShape::Bt1,
            bandwidth: 0x0B,
            fdev_hz: 25_000,
        }
    }
}

/// GFSK packet parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GfskPktParams {
    pub preamble_len_bits: u16,
    /// Preamble detector register value (0x05 = 16 bits)
    pub preamble_detector: u8,
    pub sync_word_len_bits: u8,
    pub header_type: GfskHeaderType,
    pub payload_len: u8,
    pub crc_type: GfskCrcType,
    pub dc_free: GfskDcFree,
}

impl Default for GfskPktParams {
    fn default() -> Self {
        Self {
            preamble_len_bits: 40,
            preamble_detector: 0x05,
            sync_word_len_bits: 32,
            header_type: GfskHeaderType::VariableLength,
            payload_len: 10,
            crc_type: GfskCrcType::TwoBytes,
            dc_free: GfskDcFree::Whitening,
        }
    }
}

/// Power amplifier selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PaSel {
    /// Low-power PA (up to +15 dBm)
    Lp = 0x00,
    /// High-power PA (up to +22 dBm)
    Hp = 0x01,
}

/// PA regulator supply
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PaRegSupply {
    /// Internal regulator (DC-DC/LDO)
    Dcdc = 0x00,
    /// Battery
    Vbat = 0x01,
}

/// Power amplifier configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PaConfig {
    pub pa_sel: PaSel,
    pub reg_supply: PaRegSupply,
    pub duty_cycle: u8,
    pub hp_sel: u8,
}

impl Default for PaConfig {
    fn default() -> Self {
        Self {
            pa_sel: PaSel::Lp,
            reg_supply: PaRegSupply::Dcdc,
            duty_cycle: 4,
            hp_sel: 0,
        }
    }
}

/// PA ramp time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RampTime {
    Ramp16Us = 0x00,
    Ramp32Us = 0x01,
    Ramp48Us = 0x02,
    Ramp64Us = 0x03,
    Ramp208Us = 0x08,
}

/// Status of the last received packet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PacketStatus {
    pub rssi_pkt_dbm: i16,
    /// Only meaningful for LoRa packets
    pub snr_pkt_db: i8,
}

/// Modulation and packet parameters for one packet type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Modulation {
    Lora { modulation: LoraModParams, packet: LoraPktParams },
    Gfsk { modulation: GfskModParams, packet: GfskPktParams },
}

impl Modulation {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Modulation::Lora { .. } => PacketType::Lora,
            Modulation::Gfsk { .. } => PacketType::Gfsk,
        }
    }

    /// Time needed to transmit one packet, in microseconds
    pub fn time_on_air_us(&self) -> u64 {
        match self {
            Modulation::Lora { modulation, packet } => lora_time_on_air_us(modulation, packet),
            Modulation::Gfsk { modulation, packet } => gfsk_time_on_air_us(modulation, packet),
        }
    }

    /// Same modulation with a different payload length
    pub fn with_payload_len(self, payload_len: u8) -> Self {
        match self {
            Modulation::Lora { modulation, mut packet } => {
                packet.payload_len = payload_len;
                Modulation::Lora { modulation, packet }
            }
            Modulation::Gfsk { modulation, mut packet } => {
                packet.payload_len = payload_len;
                Modulation::Gfsk { modulation, packet }
            }
        }
    }
}

impl LoraBandwidth {
    pub fn hz(self) -> u32 {
        match self {
            LoraBandwidth::Bw125 => 125_000,
            LoraBandwidth::Bw250 => 250_000,
            LoraBandwidth::Bw500 => 500_000,
        }
    }
}

// Symbol counts are kept in quarter symbols so the 4.25/6.25 preamble tail stays exact.
fn lora_time_on_air_us(modulation: &LoraModParams, packet: &LoraPktParams) -> u64 {
    let sf = modulation.sf.value() as i64;
    let short_sf = sf <= 6;
    let crc_bits = if packet.crc_on { 16 } else { 0 };
    let header_bits = match packet.header_type {
        LoraHeaderType::Explicit => 20,
        LoraHeaderType::Implicit => 0,
    };
    let sync_bits = if short_sf { 8 } else { 28 };
    let bits_per_symbol = if modulation.ldro && !short_sf { sf - 2 } else { sf };

    let numerator = 8 * packet.payload_len as i64 - 4 * sf + sync_bits + crc_bits + header_bits;
    let denominator = 4 * bits_per_symbol;
    let blocks = if numerator > 0 {
        (numerator + denominator - 1) / denominator
    } else {
        0
    };
    let payload_symbols = 8 + blocks * (modulation.cr as i64 + 4);
    let preamble_quarters = packet.preamble_len as i64 * 4 + if short_sf { 25 } else { 17 };
    let quarters = (preamble_quarters + payload_symbols * 4) as u64;

    let symbol_chips = 1u64 << sf;
    (quarters * symbol_chips * 1_000_000).div_ceil(4 * modulation.bw.hz() as u64)
}

fn gfsk_time_on_air_us(modulation: &GfskModParams, packet: &GfskPktParams) -> u64 {
    let header_bits = match packet.header_type {
        GfskHeaderType::FixedLength => 0,
        GfskHeaderType::VariableLength => 8,
    };
    let crc_bits = match packet.crc_type {
        GfskCrcType::Off => 0,
        GfskCrcType::OneByte | GfskCrcType::OneByteInv => 8,
        GfskCrcType::TwoBytes | GfskCrcType::TwoBytesInv => 16,
    };
    let bits = packet.preamble_len_bits as u64
        + packet.sync_word_len_bits as u64
        + header_bits
        + 8 * packet.payload_len as u64
        + crc_bits;
    (bits * 1_000_000).div_ceil(modulation.bitrate_bps.max(1) as u64)
}

/// Full radio configuration applied before a radio test
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct RadioConfig {
    pub frequency_hz: u32,
    pub tx_power_dbm: i8,
    pub ramp_time: RampTime,
    pub pa: PaConfig,
    pub modulation: Modulation,
    /// LoRa sync word (0x12 private, 0x34 public)
    pub lora_sync_word: u8,
}

// =============================================================================
// Radio Control Extension Trait
// =============================================================================

/// Radio commands needed by the radio test demos.
#[allow(async_fn_in_trait)]
pub trait RadioControlExt {
    /// Set the packet type
    async fn set_packet_type(&mut self, packet_type: PacketType) -> Result<(), RadioError>;

    /// Set the RF frequency in Hz
    async fn set_rf_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError>;

    /// Select and configure the power amplifier
    async fn set_pa_config(&mut self, config: &PaConfig) -> Result<(), RadioError>;

    /// Set output power and ramp time
    async fn set_tx_params(&mut self, power_dbm: i8, ramp_time: RampTime) -> Result<(), RadioError>;

    async fn set_lora_mod_params(&mut self, params: &LoraModParams) -> Result<(), RadioError>;

    async fn set_lora_pkt_params(&mut self, params: &LoraPktParams) -> Result<(), RadioError>;

    /// Set LoRa sync word
    async fn set_lora_sync_word(&mut self, sync_word: u8) -> Result<(), RadioError>;

    async fn set_gfsk_mod_params(&mut self, params: &GfskModParams) -> Result<(), RadioError>;

    async fn set_gfsk_pkt_params(&mut self, params: &GfskPktParams) -> Result<(), RadioError>;

    /// Write data to the TX buffer
    async fn write_buffer(&mut self, data: &[u8]) -> Result<(), RadioError>;

    /// Read data from the RX buffer
    async fn read_buffer(&mut self, offset: u8, buffer: &mut [u8]) -> Result<(), RadioError>;

    /// Get RX buffer status
    ///
    /// # Returns
    /// (payload_length, rx_start_buffer_pointer)
    async fn get_rx_buffer_status(&mut self) -> Result<(u8, u8), RadioError>;

    /// RSSI and SNR of the last received packet
    async fn get_packet_status(&mut self) -> Result<PacketStatus, RadioError>;

    /// Start transmission
    ///
    /// # Arguments
    /// * `timeout_rtc_steps` - Timeout in RTC steps, 0 for none
    async fn set_tx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError>;

    /// Start reception
    ///
    /// # Arguments
    /// * `timeout_rtc_steps` - Timeout in RTC steps, [`RX_CONTINUOUS`] for continuous mode
    async fn set_rx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError>;

    /// Start an unmodulated continuous wave
    async fn set_tx_cw(&mut self) -> Result<(), RadioError>;
}

/// Apply a complete radio configuration.
pub async fn configure<R: RadioControlExt>(radio: &mut R, config: &RadioConfig) -> Result<(), RadioError> {
    radio.set_packet_type(config.modulation.packet_type()).await?;
    radio.set_rf_frequency(config.frequency_hz).await?;
    radio.set_pa_config(&config.pa).await?;
    radio.set_tx_params(config.tx_power_dbm, config.ramp_time).await?;

    match &config.modulation {
        Modulation::Lora { modulation, packet } => {
            radio.set_lora_mod_params(modulation).await?;
            radio.set_lora_pkt_params(packet).await?;
            radio.set_lora_sync_word(config.lora_sync_word).await
        }
        Modulation::Gfsk { modulation, packet } => {
            radio.set_gfsk_mod_params(modulation).await?;
            radio.set_gfsk_pkt_params(packet).await
        }
    }
}

// =============================================================================
// LR1110 binding
// =============================================================================

#[cfg(any(feature = "lr1110", test))]
const LR1110_XTAL_FREQ: u32 = 32_000_000;

#[cfg(any(feature = "lr1110", test))]
#[derive(Clone, Copy)]
#[allow(dead_code)]
enum RadioOpCode {
    WriteBuffer8 = 0x0109,
    ReadBuffer8 = 0x010A,
    GetRxBufferStatus = 0x0203,
    GetPktStatus = 0x0204,
    SetRx = 0x0209,
    SetTx = 0x020A,
    SetRfFrequency = 0x020B,
    SetPktType = 0x020E,
    SetModulationParam = 0x020F,
    SetPktParam = 0x0210,
    SetTxParams = 0x0211,
    SetPaCfg = 0x0215,
    SetTxCw = 0x0219,
    SetLoraSyncWord = 0x022B,
}

#[cfg(any(feature = "lr1110", test))]
impl RadioOpCode {
    fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

/// Opcode followed by a 24-bit big-endian RTC step count
#[cfg(any(feature = "lr1110", test))]
fn timeout_cmd(opcode: RadioOpCode, timeout_rtc_steps: u32) -> [u8; 5] {
    let op = opcode.bytes();
    let steps = timeout_rtc_steps.min(RX_CONTINUOUS);
    [op[0], op[1], (steps >> 16) as u8, (steps >> 8) as u8, steps as u8]
}

#[cfg(any(feature = "lr1110", test))]
fn lora_mod_params_cmd(params: &LoraModParams) -> [u8; 6] {
    let op = RadioOpCode::SetModulationParam.bytes();
    [
        op[0],
        op[1],
        params.sf.value(),
        params.bw as u8,
        params.cr as u8,
        params.ldro as u8,
    ]
}

#[cfg(any(feature = "lr1110", test))]
fn lora_pkt_params_cmd(params: &LoraPktParams) -> [u8; 8] {
    let op = RadioOpCode::SetPktParam.bytes();
    let preamble = params.preamble_len.to_be_bytes();
    [
        op[0],
        op[1],
        preamble[0],
        preamble[1],
        params.header_type as u8,
        params.payload_len,
        params.crc_on as u8,
        params.iq_inverted as u8,
    ]
}

/// Bitrate and deviation in chip units: `32 * fxtal / br` and `fdev * 2^25 / fxtal`
#[cfg(any(feature = "lr1110", test))]
fn gfsk_mod_params_cmd(params: &GfskModParams) -> [u8; 12] {
    let op = RadioOpCode::SetModulationParam.bytes();
    let br = ((32u64 * LR1110_XTAL_FREQ as u64) / params.bitrate_bps.max(1) as u64) as u32;
    let fdev = (((params.fdev_hz as u64) << 25) / LR1110_XTAL_FREQ as u64) as u32;
    let br = br.to_be_bytes();
    let fdev = fdev.to_be_bytes();
    [
        op[0],
        op[1],
        br[0],
        br[1],
        br[2],
        br[3],
        params.pulse_shape as u8,
        params.bandwidth,
        fdev[0],
        fdev[1],
        fdev[2],
        fdev[3],
    ]
}

/// Address filtering is always off
#[cfg(any(feature = "lr1110", test))]
fn gfsk_pkt_params_cmd(params: &GfskPktParams) -> [u8; 11] {
    let op = RadioOpCode::SetPktParam.bytes();
    let preamble = params.preamble_len_bits.to_be_bytes();
    [
        op[0],
        op[1],
        preamble[0],
        preamble[1],
        params.preamble_detector,
        params.sync_word_len_bits,
        0x00,
        params.header_type as u8,
        params.payload_len,
        params.crc_type as u8,
        params.dc_free as u8,
    ]
}

/// RSSI is stored as `-2 * dBm`, SNR in quarter dB
#[cfg(any(feature = "lr1110", test))]
fn parse_packet_status(rbuffer: &[u8; 3]) -> PacketStatus {
    PacketStatus {
        rssi_pkt_dbm: -((rbuffer[0] as i16) >> 1),
        snr_pkt_db: ((rbuffer[1] as i8).saturating_add(2)) >> 2,
    }
}

#[cfg(feature = "lr1110")]
impl<SPI, IV, C> RadioControlExt for lora_phy::lr1110::Lr1110<SPI, IV, C>
where
    SPI: embedded_hal_async::spi::SpiDevice<u8>,
    IV: lora_phy::mod_traits::InterfaceVariant,
    C: lora_phy::lr1110::variant::Lr1110Variant,
{
    async fn set_packet_type(&mut self, packet_type: PacketType) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetPktType.bytes();
        let cmd = [opcode[0], opcode[1], packet_type as u8];
        self.execute_command(&cmd).await
    }

    async fn set_rf_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetRfFrequency.bytes();
        let freq = frequency_hz.to_be_bytes();
        let cmd = [opcode[0], opcode[1], freq[0], freq[1], freq[2], freq[3]];
        self.execute_command(&cmd).await
    }

    async fn set_pa_config(&mut self, config: &PaConfig) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetPaCfg.bytes();
        let cmd = [
            opcode[0],
            opcode[1],
            config.pa_sel as u8,
            config.reg_supply as u8,
            config.duty_cycle,
            config.hp_sel,
        ];
        self.execute_command(&cmd).await
    }

    async fn set_tx_params(&mut self, power_dbm: i8, ramp_time: RampTime) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetTxParams.bytes();
        let cmd = [opcode[0], opcode[1], power_dbm as u8, ramp_time as u8];
        self.execute_command(&cmd).await
    }

    async fn set_lora_mod_params(&mut self, params: &LoraModParams) -> Result<(), RadioError> {
        self.execute_command(&lora_mod_params_cmd(params)).await
    }

    async fn set_lora_pkt_params(&mut self, params: &LoraPktParams) -> Result<(), RadioError> {
        self.execute_command(&lora_pkt_params_cmd(params)).await
    }

    async fn set_lora_sync_word(&mut self, sync_word: u8) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetLoraSyncWord.bytes();
        let cmd = [opcode[0], opcode[1], sync_word];
        self.execute_command(&cmd).await
    }

    async fn set_gfsk_mod_params(&mut self, params: &GfskModParams) -> Result<(), RadioError> {
        self.execute_command(&gfsk_mod_params_cmd(params)).await
    }

    async fn set_gfsk_pkt_params(&mut self, params: &GfskPktParams) -> Result<(), RadioError> {
        self.execute_command(&gfsk_pkt_params_cmd(params)).await
    }

    async fn write_buffer(&mut self, data: &[u8]) -> Result<(), RadioError> {
        let opcode = RadioOpCode::WriteBuffer8.bytes();
        let cmd = [opcode[0], opcode[1]];
        self.execute_command_with_payload(&cmd, data).await
    }

    async fn read_buffer(&mut self, offset: u8, buffer: &mut [u8]) -> Result<(), RadioError> {
        let opcode = RadioOpCode::ReadBuffer8.bytes();
        let cmd = [opcode[0], opcode[1], offset, buffer.len() as u8];
        self.execute_command_with_response(&cmd, buffer).await
    }

    async fn get_rx_buffer_status(&mut self) -> Result<(u8, u8), RadioError> {
        let opcode = RadioOpCode::GetRxBufferStatus.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 2];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok((rbuffer[0], rbuffer[1]))
    }

    async fn get_packet_status(&mut self) -> Result<PacketStatus, RadioError> {
        let opcode = RadioOpCode::GetPktStatus.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 3];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(parse_packet_status(&rbuffer))
    }

    async fn set_tx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError> {
        self.execute_command(&timeout_cmd(RadioOpCode::SetTx, timeout_rtc_steps)).await
    }

    async fn set_rx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError> {
        self.execute_command(&timeout_cmd(RadioOpCode::SetRx, timeout_rtc_steps)).await
    }

    async fn set_tx_cw(&mut self) -> Result<(), RadioError> {
        let opcode = RadioOpCode::SetTxCw.bytes();
        self.execute_command(&opcode).await
    }
}
