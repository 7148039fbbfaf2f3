//! Recording fakes for the radio and every collaborator

use std::collections::VecDeque;
use std::string::{String, ToString};
use std::vec::Vec;

use embassy_futures::block_on;
use embassy_time::{Duration, Instant};
use lora_phy::mod_params::RadioError;

use crate::demo::{Demo, DemoContext, DemoStatus, DemoType};
use crate::environment::{Environment, Location};
use crate::gnss::*;
use crate::gui::*;
use crate::hci::{CommandError, CommandResponse, Hci, HostCommand};
use crate::interrupt::DemoInterrupt;
use crate::logging::{HostType, LogTransport, LoggingStatus, ServerResults};
use crate::radio::*;
use crate::settings::{
    DemoAllSettings, DemoRadioSettings, GuiDemoSettings, GuiGnssSettings, GuiRadioSettings, GuiWifiSettings,
};
use crate::supervisor::VersionInfo;
use crate::system::*;
use crate::wifi::*;

fn mock_error() -> RadioError {
    RadioError::PayloadSizeMismatch(0, 0)
}

// =============================================================================
// Radio
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum RadioCall {
    SystemReset,
    SetRegMode(RegMode),
    Calibrate(CalibrationParam),
    SetStandby(StandbyConfig),
    GetVersion,
    ReadUid,
    SetDioIrqParams(IrqMask),
    ClearIrqStatus(IrqMask),
    GetAndClearIrqStatus,
    WifiScan { channel_mask: WifiChannelMask, max_results: u8 },
    WifiSearchCountryCode,
    WifiResetCumulativeTiming,
    GnssSetConstellation(GnssConstellationMask),
    GnssSetScanMode(GnssCaptureMode),
    GnssSetAssistancePosition,
    GnssScanAutonomous(GnssDate),
    GnssScanAssisted(GnssDate),
    GnssScanContinue,
    GnssReadAlmanacDate(u8),
    GnssAlmanacUpdate(usize),
    SetPacketType(PacketType),
    SetRfFrequency(u32),
    SetPaConfig(PaConfig),
    SetTxParams(i8, RampTime),
    SetLoraModParams(LoraModParams),
    SetLoraPktParams(LoraPktParams),
    SetLoraSyncWord(u8),
    SetGfskModParams(GfskModParams),
    SetGfskPktParams(GfskPktParams),
    WriteBuffer(Vec<u8>),
    SetTx(u32),
    SetRx(u32),
    SetTxCw,
}

pub struct MockRadio {
    pub calls: Vec<RadioCall>,
    pub fail_next_reset: bool,
    pub fail_wifi_scan: bool,
    pub fail_get_version: bool,
    /// Returned by successive IRQ status reads, 0 once empty
    pub irq_queue: VecDeque<IrqMask>,
    pub wifi_results: Vec<WifiBasicMacTypeChannelResult>,
    pub country_code_results: Vec<WifiCountryCodeResult>,
    pub wifi_timings: WifiCumulativeTimings,
    pub gnss_nav_message: Vec<u8>,
    pub gnss_satellites: Vec<GnssDetectedSatellite>,
    pub gnss_timings: GnssTimings,
    pub almanac_date: u16,
    pub almanac_crc: u32,
    pub rx_payload: Vec<u8>,
    pub packet_status: PacketStatus,
    pub version: Version,
    pub uid: ChipUid,
}

impl MockRadio {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            fail_next_reset: false,
            fail_wifi_scan: false,
            fail_get_version: false,
            irq_queue: VecDeque::new(),
            wifi_results: Vec::new(),
            country_code_results: Vec::new(),
            wifi_timings: WifiCumulativeTimings::default(),
            gnss_nav_message: Vec::new(),
            gnss_satellites: Vec::new(),
            gnss_timings: GnssTimings::default(),
            almanac_date: 0,
            almanac_crc: 0,
            rx_payload: Vec::new(),
            packet_status: PacketStatus::default(),
            version: Version {
                hw: 0x22,
                chip_type: ChipType::LR1110,
                fw: 0x0401,
            },
            uid: [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08],
        }
    }
}

impl SystemExt for MockRadio {
    async fn system_reset(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SystemReset);
        if self.fail_next_reset {
            self.fail_next_reset = false;
            return Err(mock_error());
        }
        Ok(())
    }

    async fn set_reg_mode(&mut self, mode: RegMode) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetRegMode(mode));
        Ok(())
    }

    async fn calibrate(&mut self, param: CalibrationParam) -> Result<(), RadioError> {
        self.calls.push(RadioCall::Calibrate(param));
        Ok(())
    }

    async fn set_standby(&mut self, cfg: StandbyConfig) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetStandby(cfg));
        Ok(())
    }

    async fn get_version(&mut self) -> Result<Version, RadioError> {
        self.calls.push(RadioCall::GetVersion);
        if self.fail_get_version {
            return Err(mock_error());
        }
        Ok(self.version)
    }

    async fn read_uid(&mut self) -> Result<ChipUid, RadioError> {
        self.calls.push(RadioCall::ReadUid);
        Ok(self.uid)
    }

    async fn set_dio_irq_params(&mut self, irq_mask: IrqMask) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetDioIrqParams(irq_mask));
        Ok(())
    }

    async fn clear_irq_status(&mut self, irqs: IrqMask) -> Result<(), RadioError> {
        self.calls.push(RadioCall::ClearIrqStatus(irqs));
        Ok(())
    }

    async fn get_and_clear_irq_status(&mut self) -> Result<IrqMask, RadioError> {
        self.calls.push(RadioCall::GetAndClearIrqStatus);
        Ok(self.irq_queue.pop_front().unwrap_or(IRQ_NONE))
    }
}

impl WifiExt for MockRadio {
    async fn wifi_scan(
        &mut self,
        _signal_type: WifiSignalTypeScan,
        channel_mask: WifiChannelMask,
        _scan_mode: WifiScanMode,
        max_results: u8,
        _nb_scan_per_channel: u8,
        _timeout_per_scan_ms: u16,
        _abort_on_timeout: bool,
    ) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WifiScan {
            channel_mask,
            max_results,
        });
        if self.fail_wifi_scan {
            return Err(mock_error());
        }
        Ok(())
    }

    async fn wifi_search_country_code(
        &mut self,
        _channel_mask: WifiChannelMask,
        _nb_max_results: u8,
        _nb_scan_per_channel: u8,
        _timeout_per_scan_ms: u16,
        _abort_on_timeout: bool,
    ) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WifiSearchCountryCode);
        if self.fail_wifi_scan {
            return Err(mock_error());
        }
        Ok(())
    }

    async fn wifi_get_nb_results(&mut self) -> Result<u8, RadioError> {
        Ok(self.wifi_results.len() as u8)
    }

    async fn wifi_read_basic_mac_type_channel_results(
        &mut self,
        results: &mut [WifiBasicMacTypeChannelResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError> {
        let source = self.wifi_results.iter().skip(start_index as usize).take(nb_results as usize);
        let mut count = 0;
        for (slot, result) in results.iter_mut().zip(source) {
            *slot = *result;
            count += 1;
        }
        Ok(count)
    }

    async fn wifi_get_nb_country_code_results(&mut self) -> Result<u8, RadioError> {
        Ok(self.country_code_results.len() as u8)
    }

    async fn wifi_read_country_code_results(
        &mut self,
        results: &mut [WifiCountryCodeResult],
        start_index: u8,
        nb_results: u8,
    ) -> Result<u8, RadioError> {
        let source = self
            .country_code_results
            .iter()
            .skip(start_index as usize)
            .take(nb_results as usize);
        let mut count = 0;
        for (slot, result) in results.iter_mut().zip(source) {
            *slot = *result;
            count += 1;
        }
        Ok(count)
    }

    async fn wifi_read_cumulative_timing(&mut self) -> Result<WifiCumulativeTimings, RadioError> {
        Ok(self.wifi_timings)
    }

    async fn wifi_reset_cumulative_timing(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WifiResetCumulativeTiming);
        Ok(())
    }
}

impl GnssExt for MockRadio {
    async fn gnss_set_constellation(&mut self, constellation_mask: GnssConstellationMask) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssSetConstellation(constellation_mask));
        Ok(())
    }

    async fn gnss_set_scan_mode(&mut self, capture_mode: GnssCaptureMode) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssSetScanMode(capture_mode));
        Ok(())
    }

    async fn gnss_set_assistance_position(&mut self, _position: &GnssAssistancePosition) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssSetAssistancePosition);
        Ok(())
    }

    async fn gnss_scan_autonomous(
        &mut self,
        date: GnssDate,
        _option: GnssOption,
        _result_mask: u8,
        _nb_sv_max: u8,
    ) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssScanAutonomous(date));
        Ok(())
    }

    async fn gnss_scan_assisted(
        &mut self,
        date: GnssDate,
        _option: GnssOption,
        _result_mask: u8,
        _nb_sv_max: u8,
    ) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssScanAssisted(date));
        Ok(())
    }

    async fn gnss_scan_continue(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssScanContinue);
        Ok(())
    }

    async fn gnss_get_result_size(&mut self) -> Result<u16, RadioError> {
        Ok(self.gnss_nav_message.len() as u16)
    }

    async fn gnss_read_results(&mut self, result_buffer: &mut [u8]) -> Result<(), RadioError> {
        for (slot, byte) in result_buffer.iter_mut().zip(self.gnss_nav_message.iter()) {
            *slot = *byte;
        }
        Ok(())
    }

    async fn gnss_get_nb_satellites(&mut self) -> Result<u8, RadioError> {
        Ok(self.gnss_satellites.len() as u8)
    }

    async fn gnss_get_satellites(
        &mut self,
        satellites: &mut [GnssDetectedSatellite],
        nb_satellites: u8,
    ) -> Result<u8, RadioError> {
        let mut count = 0;
        for (slot, satellite) in satellites
            .iter_mut()
            .zip(self.gnss_satellites.iter().take(nb_satellites as usize))
        {
            *slot = *satellite;
            count += 1;
        }
        Ok(count)
    }

    async fn gnss_get_timings(&mut self) -> Result<GnssTimings, RadioError> {
        Ok(self.gnss_timings)
    }

    async fn gnss_get_context_status(&mut self) -> Result<GnssContextStatus, RadioError> {
        Ok(GnssContextStatus {
            firmware_version: 0x18,
            global_almanac_crc: self.almanac_crc,
        })
    }

    async fn gnss_read_almanac_date(&mut self, sv_id: u8) -> Result<u16, RadioError> {
        self.calls.push(RadioCall::GnssReadAlmanacDate(sv_id));
        Ok(self.almanac_date)
    }

    async fn gnss_almanac_update(&mut self, block: &[u8]) -> Result<(), RadioError> {
        self.calls.push(RadioCall::GnssAlmanacUpdate(block.len()));
        Ok(())
    }
}

impl RadioControlExt for MockRadio {
    async fn set_packet_type(&mut self, packet_type: PacketType) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetPacketType(packet_type));
        Ok(())
    }

    async fn set_rf_frequency(&mut self, frequency_hz: u32) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetRfFrequency(frequency_hz));
        Ok(())
    }

    async fn set_pa_config(&mut self, config: &PaConfig) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetPaConfig(*config));
        Ok(())
    }

    async fn set_tx_params(&mut self, power_dbm: i8, ramp_time: RampTime) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetTxParams(power_dbm, ramp_time));
        Ok(())
    }

    async fn set_lora_mod_params(&mut self, params: &LoraModParams) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetLoraModParams(*params));
        Ok(())
    }

    async fn set_lora_pkt_params(&mut self, params: &LoraPktParams) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetLoraPktParams(*params));
        Ok(())
    }

    async fn set_lora_sync_word(&mut self, sync_word: u8) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetLoraSyncWord(sync_word));
        Ok(())
    }

    async fn set_gfsk_mod_params(&mut self, params: &GfskModParams) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetGfskModParams(*params));
        Ok(())
    }

    async fn set_gfsk_pkt_params(&mut self, params: &GfskPktParams) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetGfskPktParams(*params));
        Ok(())
    }

    async fn write_buffer(&mut self, data: &[u8]) -> Result<(), RadioError> {
        self.calls.push(RadioCall::WriteBuffer(data.to_vec()));
        Ok(())
    }

    async fn read_buffer(&mut self, offset: u8, buffer: &mut [u8]) -> Result<(), RadioError> {
        for (slot, byte) in buffer.iter_mut().zip(self.rx_payload.iter().skip(offset as usize)) {
            *slot = *byte;
        }
        Ok(())
    }

    async fn get_rx_buffer_status(&mut self) -> Result<(u8, u8), RadioError> {
        Ok((self.rx_payload.len() as u8, 0))
    }

    async fn get_packet_status(&mut self) -> Result<PacketStatus, RadioError> {
        Ok(self.packet_status)
    }

    async fn set_tx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetTx(timeout_rtc_steps));
        Ok(())
    }

    async fn set_rx(&mut self, timeout_rtc_steps: u32) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetRx(timeout_rtc_steps));
        Ok(())
    }

    async fn set_tx_cw(&mut self) -> Result<(), RadioError> {
        self.calls.push(RadioCall::SetTxCw);
        Ok(())
    }
}

// =============================================================================
// Environment
// =============================================================================

pub struct MockEnvironment {
    pub now: Instant,
    pub gnss_date: Option<GnssDate>,
    pub location: Option<Location>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            now: Instant::from_secs(1_000),
            gnss_date: None,
            location: None,
        }
    }

    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }
}

/// One demo driven through its lifecycle against the fakes
pub struct DemoBench {
    pub radio: MockRadio,
    pub env: MockEnvironment,
    pub irq: DemoInterrupt,
    pub demo: Demo,
}

impl DemoBench {
    /// Started demo of `demo_type` using `radio` settings
    pub fn start(demo_type: DemoType, radio: DemoRadioSettings) -> Self {
        let mut bench = Self {
            radio: MockRadio::new(),
            env: MockEnvironment::new(),
            irq: DemoInterrupt::new(),
            demo: Demo::new(demo_type).unwrap(),
        };
        bench.demo.apply_settings(&DemoAllSettings {
            radio,
            ..DemoAllSettings::default()
        });
        let mut ctx = DemoContext::new(&mut bench.radio, &bench.env, &bench.irq, RegMode::Dcdc);
        block_on(bench.demo.start(&mut ctx));
        bench
    }

    pub fn runtime(&mut self) -> DemoStatus {
        let mut ctx = DemoContext::new(&mut self.radio, &self.env, &self.irq, RegMode::Dcdc);
        block_on(self.demo.runtime(&mut ctx))
    }

    /// Step until the demo holds for an interrupt
    pub fn run_until_waiting(&mut self) {
        for _ in 0..8 {
            if self.demo.is_waiting_for_interrupt() {
                return;
            }
            self.runtime();
        }
        panic!("demo never waited for an interrupt");
    }

    /// Raise DIO1 with `irq` pending on the chip and step once
    pub fn interrupt(&mut self, irq: IrqMask) -> DemoStatus {
        self.radio.irq_queue.push_back(irq);
        self.irq.handle_irq();
        self.runtime()
    }

    pub fn sent(&self) -> usize {
        self.radio
            .calls
            .iter()
            .filter(|call| matches!(call, RadioCall::SetTx(_)))
            .count()
    }
}

impl Environment for MockEnvironment {
    fn now(&self) -> Instant {
        self.now
    }

    fn gnss_date(&self) -> Option<GnssDate> {
        self.gnss_date
    }

    fn location(&self) -> Option<Location> {
        self.location
    }

    fn set_gnss_date(&mut self, date: GnssDate) {
        self.gnss_date = Some(date);
    }

    fn set_location(&mut self, location: Location) {
        self.location = Some(location);
    }
}

// =============================================================================
// GUI
// =============================================================================

#[derive(Default)]
pub struct MockGui {
    pub events: VecDeque<GuiEvent>,
    pub runtime_calls: usize,
    pub initialized: bool,
    pub connectivity: Vec<bool>,
    pub refresh_pending: bool,
    pub radio_settings: GuiRadioSettings,
    pub wifi_settings: GuiWifiSettings,
    pub gnss_autonomous_settings: GuiGnssSettings,
    pub gnss_assisted_settings: GuiGnssSettings,
    pub wifi_results: Vec<GuiWifiResult>,
    pub gnss_results: Vec<GuiGnssResult>,
    pub per_results: Vec<GuiRadioPerResult>,
    pub ping_pong_results: Vec<GuiRadioPingPongResult>,
    pub geo_codings: Vec<GuiReverseGeoCoding>,
}

impl MockGui {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Gui for MockGui {
    fn init(&mut self, settings: &GuiDemoSettings, _default_settings: &GuiDemoSettings, _version: &VersionInfo) {
        self.initialized = true;
        self.radio_settings = settings.radio;
        self.wifi_settings = settings.wifi;
        self.gnss_autonomous_settings = settings.gnss_autonomous;
        self.gnss_assisted_settings = settings.gnss_assisted;
    }

    fn runtime(&mut self) {
        self.runtime_calls += 1;
    }

    fn get_last_event(&mut self) -> GuiEvent {
        self.events.pop_front().unwrap_or(GuiEvent::None)
    }

    fn host_connectivity_change(&mut self, is_connected: bool) {
        self.connectivity.push(is_connected);
    }

    fn get_radio_settings(&self) -> GuiRadioSettings {
        self.radio_settings
    }

    fn get_wifi_settings(&self) -> GuiWifiSettings {
        self.wifi_settings
    }

    fn get_gnss_autonomous_settings(&self) -> GuiGnssSettings {
        self.gnss_autonomous_settings
    }

    fn get_gnss_assisted_settings(&self) -> GuiGnssSettings {
        self.gnss_assisted_settings
    }

    fn update_wifi_demo_result(&mut self, result: &GuiWifiResult) {
        self.wifi_results.push(result.clone());
    }

    fn update_gnss_demo_result(&mut self, result: &GuiGnssResult) {
        self.gnss_results.push(result.clone());
    }

    fn update_radio_per_result(&mut self, result: &GuiRadioPerResult) {
        self.per_results.push(*result);
    }

    fn update_radio_ping_pong_result(&mut self, result: &GuiRadioPingPongResult) {
        self.ping_pong_results.push(*result);
    }

    fn update_reverse_geo_coding(&mut self, geo: &GuiReverseGeoCoding) {
        self.geo_codings.push(geo.clone());
    }

    fn has_refresh_pending(&self) -> bool {
        self.refresh_pending
    }
}

// =============================================================================
// HCI
// =============================================================================

/// Owned summary of a [`CommandResponse`]
#[derive(Clone, Debug, PartialEq)]
pub enum SentResponse {
    Ok,
    Error(CommandError),
    Version(VersionInfo),
    AlmanacDates(usize),
    Results(DemoType),
    AlmanacCrcMatch(bool),
}

#[derive(Default)]
pub struct MockHci {
    pub commands: VecDeque<HostCommand>,
    pub responses: Vec<SentResponse>,
    pub runtime_calls: usize,
    pub notifications: usize,
    pub started: bool,
}

impl MockHci {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hci for MockHci {
    fn runtime(&mut self) {
        self.runtime_calls += 1;
    }

    fn has_new_command(&self) -> bool {
        !self.commands.is_empty()
    }

    fn fetch_command(&mut self) -> Option<HostCommand> {
        self.commands.pop_front()
    }

    fn send_response(&mut self, response: CommandResponse<'_>) {
        let sent = match response {
            CommandResponse::Ok => SentResponse::Ok,
            CommandResponse::Error(error) => SentResponse::Error(error),
            CommandResponse::Version(version) => SentResponse::Version(*version),
            CommandResponse::AlmanacDates(dates) => SentResponse::AlmanacDates(dates.len()),
            CommandResponse::Results { demo_type, .. } => SentResponse::Results(demo_type),
            CommandResponse::AlmanacCrcMatch(matches) => SentResponse::AlmanacCrcMatch(matches),
        };
        self.responses.push(sent);
    }

    fn event_notify(&mut self) {
        self.notifications += 1;
    }

    fn start(&mut self) {
        self.started = true;
    }

    fn stop(&mut self) {
        self.started = false;
    }
}

// =============================================================================
// Log transport
// =============================================================================

pub struct MockLog {
    /// Answers of successive probes; the last one repeats
    pub host_types: VecDeque<HostType>,
    pub probes: usize,
    pub connection_test_responses: usize,
    pub logging_enabled: bool,
    pub version_set: bool,
    pub erases: usize,
    pub versions_sent: usize,
    pub lines: Vec<String>,
    pub nav_messages: Vec<Vec<u8>>,
    pub flushes: usize,
    /// Answers of successive `get_results`, `Timeout` once empty
    pub server_results: VecDeque<Result<ServerResults, LoggingStatus>>,
    pub get_results_calls: usize,
    last_host: HostType,
}

impl MockLog {
    pub fn new() -> Self {
        Self {
            host_types: VecDeque::new(),
            probes: 0,
            connection_test_responses: 0,
            logging_enabled: false,
            version_set: false,
            erases: 0,
            versions_sent: 0,
            lines: Vec::new(),
            nav_messages: Vec::new(),
            flushes: 0,
            server_results: VecDeque::new(),
            get_results_calls: 0,
            last_host: HostType::NoHost,
        }
    }
}

impl LogTransport for MockLog {
    fn test_host_connected(&mut self) -> HostType {
        self.probes += 1;
        if let Some(host) = self.host_types.pop_front() {
            self.last_host = host;
        }
        self.last_host
    }

    fn send_connection_test_response(&mut self) {
        self.connection_test_responses += 1;
    }

    fn enable_logging(&mut self) {
        self.logging_enabled = true;
    }

    fn disable_logging(&mut self) {
        self.logging_enabled = false;
    }

    fn set_version(&mut self, _version: &VersionInfo) {
        self.version_set = true;
    }

    fn erase_data_stored(&mut self) {
        self.erases += 1;
        self.lines.clear();
        self.nav_messages.clear();
    }

    fn send_version_information(&mut self) {
        self.versions_sent += 1;
    }

    fn store_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn store_nav_message(&mut self, message: &[u8], _delay_capture_s: u32, _radio_ms: u32, _computation_ms: u32) {
        self.nav_messages.push(message.to_vec());
    }

    fn send_data_stored_to_server(&mut self) {
        self.flushes += 1;
    }

    fn get_results(&mut self) -> Result<ServerResults, LoggingStatus> {
        self.get_results_calls += 1;
        self.server_results.pop_front().unwrap_or(Err(LoggingStatus::Timeout))
    }
}
