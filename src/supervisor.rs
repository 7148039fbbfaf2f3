//! Main loop of the demonstration firmware
//!
//! The [`Supervisor`] owns the radio, the demo container and every
//! collaborator. One call to [`Supervisor::runtime`] is one loop iteration:
//!
//! ```text
//! 1. host probe       → resolve what is connected on the log transport
//! 2. GUI              → at most one event (start/stop/send/update settings)
//! 3. HCI              → at most one host command
//! 4. selected demo    → one step, results pushed to the GUI when ready
//! ```
//!
//! Nothing in an iteration blocks; the board crate awaits `runtime()` in a
//! loop and may sleep when [`Supervisor::can_enter_low_power`] says so.
//!
//! # Example
//!
//! ```ignore
//! use lr1110_demo::interrupt::Interrupts;
//! use lr1110_demo::supervisor::{Supervisor, SupervisorConfig};
//!
//! static IRQS: Interrupts = Interrupts::new();
//!
//! let mut supervisor = Supervisor::new(radio, gui, hci, log, rtc, &IRQS, SupervisorConfig::default());
//! supervisor.init().await;
//! loop {
//!     supervisor.runtime().await;
//!     if supervisor.can_enter_low_power() {
//!         cortex_m::asm::wfi();
//!     }
//! }
//! ```

use embassy_time::{Duration, Instant};

use crate::almanac::{
    check_almanac_update, read_almanac_dates, read_almanac_info, update_almanac, AlmanacUpdateError,
};
use crate::demo::{DemoContainer, DemoContext, DemoResults, DemoStatus, DemoType};
use crate::environment::Environment;
use crate::gui::{
    Gui, GuiEvent, GuiGnssResult, GuiRadioPerResult, GuiRadioPingPongResult, GuiReverseGeoCoding, GuiWifiResult,
};
use crate::hci::{CommandError, CommandEvent, CommandResponse, Hci, HostCommand};
use crate::interrupt::Interrupts;
use crate::logging::{store_gnss_results, store_wifi_results, HostType, LogTransport};
use crate::settings::{DemoAllSettings, GuiDemoSettings};
use crate::system::{reset_and_init, ChipConfig, ChipUid, SystemExt, Version};
use crate::DemoRadio;

/// Versions reported to the GUI, the host and the log transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct VersionInfo {
    pub version_sw: &'static str,
    pub version_driver: &'static str,
    pub chip: Version,
    pub uid: ChipUid,
    /// Reference almanac date, days since the GNSS epoch
    pub almanac_date: u16,
    pub almanac_crc: u32,
}

/// Supervisor configuration
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SupervisorConfig {
    /// Minimum time between two host probes while the host is unknown (seconds)
    pub host_probe_period_s: u64,
    /// Reverse geocoding requests per send sequence
    pub reverse_geocoding_attempts: u8,
    /// Demos cycled by the automatic mode, the first one starts first
    pub auto_sequence: &'static [DemoType],
    /// Pause between the send of a result and the next automatic demo (seconds)
    pub auto_restart_delay_s: u64,
    pub version_sw: &'static str,
    pub version_driver: &'static str,
    pub chip: ChipConfig,
    pub demo_settings: DemoAllSettings,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            host_probe_period_s: 1,
            reverse_geocoding_attempts: 1,
            auto_sequence: &[DemoType::Wifi, DemoType::GnssAssisted],
            auto_restart_delay_s: 5,
            version_sw: env!("CARGO_PKG_VERSION"),
            version_driver: env!("CARGO_PKG_VERSION"),
            chip: ChipConfig::default(),
            demo_settings: DemoAllSettings::default(),
        }
    }
}

/// Progress of the automatic demo cycle
#[derive(Clone, Copy, Debug)]
struct AutoState {
    next_index: usize,
    has_been_sent: bool,
    last_send: Instant,
}

/// Demo context over the supervisor fields, borrowed disjointly
macro_rules! demo_ctx {
    ($self:ident) => {
        DemoContext::new(
            &mut $self.radio,
            &$self.environment,
            &$self.interrupts.demo,
            $self.config.chip.reg_mode,
        )
    };
}

pub struct Supervisor<'a, R, G, H, L, E> {
    radio: R,
    gui: G,
    hci: H,
    log: L,
    environment: E,
    interrupts: &'a Interrupts,
    demos: DemoContainer,
    config: SupervisorConfig,
    version: VersionInfo,
    host_type: HostType,
    run_demo: bool,
    last_host_probe: Option<Instant>,
    auto: AutoState,
}

impl<'a, R, G, H, L, E> Supervisor<'a, R, G, H, L, E>
where
    R: DemoRadio,
    G: Gui,
    H: Hci,
    L: LogTransport,
    E: Environment,
{
    /// Logging starts enabled and the HCI stopped until a field-test host shows up
    pub fn new(
        radio: R,
        gui: G,
        hci: H,
        log: L,
        environment: E,
        interrupts: &'a Interrupts,
        config: SupervisorConfig,
    ) -> Self {
        let auto = AutoState {
            next_index: if config.auto_sequence.is_empty() { 0 } else { 1 % config.auto_sequence.len() },
            has_been_sent: false,
            last_send: environment.now(),
        };
        let mut supervisor = Self {
            radio,
            gui,
            hci,
            log,
            environment,
            interrupts,
            demos: DemoContainer::new(config.demo_settings),
            config,
            version: VersionInfo {
                version_sw: config.version_sw,
                version_driver: config.version_driver,
                chip: Version::default(),
                uid: [0; 8],
                almanac_date: 0,
                almanac_crc: 0,
            },
            host_type: HostType::NoHost,
            run_demo: false,
            last_host_probe: None,
            auto,
        };
        supervisor.log.enable_logging();
        supervisor.hci.stop();
        supervisor
    }

    /// Chip bring-up, version collection and GUI start
    pub async fn init(&mut self) {
        if let Err(error) = self.demos.init(&mut self.radio, &self.config.chip).await {
            error!("chip init failed: {:?}", error);
        }

        let settings = GuiDemoSettings::from(self.demos.settings());
        let default_settings = GuiDemoSettings::from(self.demos.default_settings());

        self.get_and_propagate_version().await;
        self.gui.init(&settings, &default_settings, &self.version);

        match self.radio.read_uid().await {
            Ok(uid) => self.version.uid = uid,
            Err(error) => warn!("uid read failed: {:?}", error),
        }
        self.log.set_version(&self.version);
    }

    async fn get_and_propagate_version(&mut self) {
        match self.radio.get_version().await {
            Ok(version) => self.version.chip = version,
            Err(error) => warn!("version read failed: {:?}", error),
        }
        match read_almanac_info(&mut self.radio).await {
            Ok(info) => {
                self.version.almanac_date = info.date;
                self.version.almanac_crc = info.crc;
            }
            Err(error) => warn!("almanac read failed: {:?}", error),
        }
    }

    pub fn version(&self) -> &VersionInfo {
        &self.version
    }

    pub fn host_type(&self) -> HostType {
        self.host_type
    }

    /// A demo was started and has not completed yet
    pub fn is_demo_running(&self) -> bool {
        self.run_demo
    }

    pub fn demos(&self) -> &DemoContainer {
        &self.demos
    }

    // =========================================================================
    // Loop iterations
    // =========================================================================

    /// One iteration driven by the touchscreen GUI
    pub async fn runtime(&mut self) {
        self.test_host_runtime();
        self.gui_runtime_and_process().await;
        self.hci_runtime_and_process().await;

        if self.run_demo {
            self.demo_runtime_and_process().await;
        }
    }

    /// One iteration of the unattended mode; demos are cycled automatically
    /// once a demo host is connected
    pub async fn runtime_auto(&mut self) {
        self.test_host_runtime();

        if self.host_type == HostType::DemoHost {
            self.gui_runtime_and_process_auto().await;
        }

        self.hci_runtime_and_process().await;

        if self.run_demo {
            self.demo_runtime_and_process().await;
        }
    }

    /// The board may sleep until the next interrupt
    pub fn can_enter_low_power(&self) -> bool {
        !self.interrupts.wake.is_raised()
            && !self.gui.has_refresh_pending()
            && (!self.demos.is_started() || self.demos.is_waiting_for_interrupt())
    }

    // =========================================================================
    // Host detection
    // =========================================================================

    fn test_host_runtime(&mut self) {
        let last_type = self.host_type;

        if self.host_type.is_undetermined() {
            let now = self.environment.now();
            let period = Duration::from_secs(self.config.host_probe_period_s);
            let due = self
                .last_host_probe
                .map_or(true, |last| now.saturating_duration_since(last) >= period);

            if due {
                self.last_host_probe = Some(now);
                self.host_type = self.log.test_host_connected();
                if self.host_type == HostType::ConnectionTestHost {
                    self.log.send_connection_test_response();
                }
            }
        }

        if self.host_type != last_type {
            info!("host: {:?}", self.host_type);
            match self.host_type {
                HostType::FieldTestHost => {
                    self.switch_in_field_test_mode();
                    self.gui.host_connectivity_change(true);
                }
                HostType::DemoHost => self.gui.host_connectivity_change(true),
                _ => {}
            }
        }
    }

    fn switch_in_field_test_mode(&mut self) {
        self.log.disable_logging();
        self.hci.start();
    }

    // =========================================================================
    // GUI
    // =========================================================================

    async fn gui_runtime_and_process(&mut self) {
        self.gui.runtime();
        self.interrupts.wake.clear();

        match self.gui.get_last_event() {
            GuiEvent::None => {}
            GuiEvent::StartDemoWifi => self.start_demo(DemoType::Wifi).await,
            GuiEvent::StartDemoWifiCountryCode => self.start_demo(DemoType::WifiCountryCode).await,
            GuiEvent::StartDemoGnssAutonomous => self.start_demo(DemoType::GnssAutonomous).await,
            GuiEvent::StartDemoGnssAssisted => self.start_demo(DemoType::GnssAssisted).await,
            GuiEvent::StartDemoTxCw => self.start_demo(DemoType::TxCw).await,
            GuiEvent::StartDemoPerTx => self.start_demo(DemoType::RadioPerTx).await,
            GuiEvent::StartDemoPerRx => self.start_demo(DemoType::RadioPerRx).await,
            GuiEvent::StartDemoPingPong => self.start_demo(DemoType::RadioPingPong).await,
            GuiEvent::StopDemo => self.stop_demo().await,
            GuiEvent::Send => self.send_results(true),
            GuiEvent::UpdateDemoRadio => {
                let gui = self.gui.get_radio_settings();
                self.demos.update_radio_settings(&gui);
            }
            GuiEvent::UpdateDemoWifi => {
                let gui = self.gui.get_wifi_settings();
                self.demos.update_wifi_settings(&gui);
            }
            GuiEvent::UpdateDemoGnssAutonomous => {
                let gui = self.gui.get_gnss_autonomous_settings();
                self.demos.update_gnss_autonomous_settings(&gui);
            }
            GuiEvent::UpdateDemoGnssAssisted => {
                let gui = self.gui.get_gnss_assisted_settings();
                self.demos.update_gnss_assisted_settings(&gui);
            }
        }
    }

    async fn gui_runtime_and_process_auto(&mut self) {
        let now = self.environment.now();

        if self.demos.get_type() == DemoType::None {
            let Some(&first) = self.config.auto_sequence.first() else {
                return;
            };
            self.auto.has_been_sent = false;
            self.start_demo(first).await;
            return;
        }

        if self.run_demo {
            return;
        }

        if !self.auto.has_been_sent {
            self.auto.last_send = now;
            self.auto.has_been_sent = true;
            self.send_results(false);
            return;
        }

        let delay = Duration::from_secs(self.config.auto_restart_delay_s);
        if now.saturating_duration_since(self.auto.last_send) > delay {
            let Some(&next) = self.config.auto_sequence.get(self.auto.next_index) else {
                return;
            };
            self.auto.next_index = (self.auto.next_index + 1) % self.config.auto_sequence.len();
            self.auto.has_been_sent = false;
            self.start_demo(next).await;
        }
    }

    async fn start_demo(&mut self, demo_type: DemoType) {
        match self.demos.start(demo_type, &mut demo_ctx!(self)).await {
            Ok(()) => self.run_demo = true,
            Err(error) => warn!("cannot start {:?}: {:?}", demo_type, error),
        }
    }

    async fn stop_demo(&mut self) {
        self.demos.stop(&mut demo_ctx!(self)).await;
        self.run_demo = false;
    }

    /// Push the results of the selected demo to the server
    fn send_results(&mut self, with_reverse_geocoding: bool) {
        self.log.erase_data_stored();
        self.log.send_version_information();

        match self.demos.results() {
            DemoResults::Wifi(results) => store_wifi_results(&mut self.log, results),
            DemoResults::Gnss(results) => {
                let delay_capture_s = results
                    .measurement_instant
                    .map_or(0, |instant| self.environment.now().saturating_duration_since(instant).as_secs())
                    as u32;
                store_gnss_results(&mut self.log, results, delay_capture_s);
            }
            _ => debug!("no results to send for {:?}", self.demos.get_type()),
        }

        self.log.send_data_stored_to_server();

        if with_reverse_geocoding {
            self.fetch_reverse_geocoding();
        }
    }

    fn fetch_reverse_geocoding(&mut self) {
        let attempts = self.config.reverse_geocoding_attempts.max(1);
        for attempt in 1..=attempts {
            match self.log.get_results() {
                Ok(results) => {
                    self.gui.update_reverse_geo_coding(&GuiReverseGeoCoding::from(&results));
                    return;
                }
                Err(status) => debug!("get results attempt {}: {:?}", attempt, status),
            }
        }
    }

    // =========================================================================
    // Host commands
    // =========================================================================

    async fn hci_runtime_and_process(&mut self) {
        self.hci.runtime();
        if !self.hci.has_new_command() {
            return;
        }
        let Some(command) = self.hci.fetch_command() else {
            return;
        };

        match self.execute_command(command).await {
            CommandEvent::NoEvent => {}
            CommandEvent::StartDemo => {
                if self.demos.start_next_enabled(&mut demo_ctx!(self)).await.is_some() {
                    self.run_demo = true;
                }
            }
            CommandEvent::StopDemo => self.stop_demo().await,
            CommandEvent::ResetDemo => self.reset_demos().await,
        }
    }

    async fn execute_command(&mut self, command: HostCommand) -> CommandEvent {
        debug!("host command {:?}", command);
        match command {
            HostCommand::GetVersion => {
                self.hci.send_response(CommandResponse::Version(&self.version));
                CommandEvent::NoEvent
            }
            HostCommand::GetAlmanacDates => {
                match read_almanac_dates(&mut self.radio).await {
                    Ok(dates) => self.hci.send_response(CommandResponse::AlmanacDates(&dates)),
                    Err(_) => self.hci.send_response(CommandResponse::Error(CommandError::Radio)),
                }
                CommandEvent::NoEvent
            }
            HostCommand::Configure(configuration) => {
                match self.demos.configure(&configuration) {
                    Ok(()) => self.hci.send_response(CommandResponse::Ok),
                    Err(_) => self
                        .hci
                        .send_response(CommandResponse::Error(CommandError::InvalidDemoType)),
                }
                CommandEvent::NoEvent
            }
            HostCommand::Start => {
                self.hci.send_response(CommandResponse::Ok);
                CommandEvent::StartDemo
            }
            HostCommand::Stop => {
                self.hci.send_response(CommandResponse::Ok);
                CommandEvent::StopDemo
            }
            HostCommand::FetchResult => {
                self.hci.send_response(CommandResponse::Results {
                    demo_type: self.demos.get_type(),
                    results: self.demos.results(),
                });
                CommandEvent::NoEvent
            }
            HostCommand::SetDateLoc { date, location } => {
                self.environment.set_gnss_date(date);
                self.environment.set_location(location);
                self.hci.send_response(CommandResponse::Ok);
                CommandEvent::NoEvent
            }
            HostCommand::Reset => {
                self.hci.send_response(CommandResponse::Ok);
                CommandEvent::ResetDemo
            }
            HostCommand::UpdateAlmanac(chunk) => {
                let response = match update_almanac(&mut self.radio, &chunk).await {
                    Ok(_) => CommandResponse::Ok,
                    Err(AlmanacUpdateError::InvalidLength) => CommandResponse::Error(CommandError::InvalidAlmanacChunk),
                    Err(AlmanacUpdateError::Radio) => CommandResponse::Error(CommandError::Radio),
                };
                self.hci.send_response(response);
                CommandEvent::NoEvent
            }
            HostCommand::CheckAlmanacUpdate { expected_crc } => {
                match check_almanac_update(&mut self.radio, expected_crc).await {
                    Ok(matches) => {
                        if matches {
                            self.get_and_propagate_version().await;
                            self.log.set_version(&self.version);
                        }
                        self.hci.send_response(CommandResponse::AlmanacCrcMatch(matches));
                    }
                    Err(_) => self.hci.send_response(CommandResponse::Error(CommandError::Radio)),
                }
                CommandEvent::NoEvent
            }
        }
    }

    async fn reset_demos(&mut self) {
        self.demos.stop(&mut demo_ctx!(self)).await;
        self.run_demo = false;
        // No interrupt may reach a demo while the chip restarts
        self.interrupts.demo.invalidate();
        if let Err(error) = reset_and_init(&mut self.radio, &self.config.chip).await {
            error!("chip reset failed: {:?}", error);
        }
        self.demos.reset(&mut demo_ctx!(self));
    }

    // =========================================================================
    // Demo
    // =========================================================================

    async fn demo_runtime_and_process(&mut self) {
        match self.demos.runtime(&mut demo_ctx!(self)).await {
            DemoStatus::Running => {
                if self.demos.take_intermediate_results() {
                    self.transfer_results_to_gui();
                }
            }
            DemoStatus::Terminated => {
                self.demos.stop(&mut demo_ctx!(self)).await;
                self.run_demo = false;
                self.transfer_results_to_gui();
                self.hci.event_notify();
            }
            status => debug!("demo status {:?} ignored", status),
        }
    }

    fn transfer_results_to_gui(&mut self) {
        match self.demos.results() {
            DemoResults::Wifi(results) => self.gui.update_wifi_demo_result(&GuiWifiResult::from(results)),
            DemoResults::Gnss(results) => self.gui.update_gnss_demo_result(&GuiGnssResult::from(results)),
            DemoResults::Per(results) => self.gui.update_radio_per_result(&GuiRadioPerResult::from(results)),
            DemoResults::PingPong(results) => self
                .gui
                .update_radio_ping_pong_result(&GuiRadioPingPongResult::from(results)),
            DemoResults::None => debug!("no results for {:?}", self.demos.get_type()),
        }
    }
}
