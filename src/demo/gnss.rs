//! GNSS autonomous and assisted scans
//!
//! ```text
//! Init ──▶ Scan ──▶ WaitForScan ──▶ GetResults ──▶ Terminated
//!                     │    ▲
//!      (double capture)▼    │
//!                   ScanContinue
//! ```
//!
//! Both modes need the GNSS date; the assisted mode also needs an assistance
//! position and an almanac younger than [`GNSS_ALMANAC_MAX_AGE_DAYS`].

use embassy_time::{Duration, Instant};
use heapless::Vec;
use lora_phy::mod_params::RadioError;

use super::{DemoContext, Progress};
use crate::almanac::{almanac_age_days, is_almanac_too_old, ALMANAC_REFERENCE_SV_ID, GNSS_ALMANAC_MAX_AGE_DAYS};
use crate::environment::Environment;
use crate::gnss::{
    GnssAssistancePosition, GnssCaptureMode, GnssConstellation, GnssDate, GnssDetectedSatellite, GnssExt,
    GnssTimings, GNSS_MAX_SATELLITES, GNSS_RESULTS_DEFAULT_MASK,
};
use crate::settings::DemoGnssSettings;
use crate::system::{IrqMask, RegMode, SystemExt, IRQ_ALL, IRQ_GNSS_SCAN_DONE};
use crate::DemoRadio;

/// Largest navigation message kept for the host
pub const GNSS_NAV_MESSAGE_MAX_SIZE: usize = 255;

const GNSS_RADIO_CURRENT_DCDC_UA: u64 = 11_000;
const GNSS_COMPUTATION_CURRENT_DCDC_UA: u64 = 3_500;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssMode {
    Autonomous,
    Assisted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum GnssState {
    Init,
    Scan,
    WaitForScan,
    ScanContinue,
    GetResults,
    Terminated,
}

/// Outcome of a GNSS run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DemoGnssError {
    #[default]
    NoError,
    /// No GNSS date was provided
    NoDate,
    /// Assisted scan without assistance position
    NoLocation,
    AlmanacTooOld,
    NavMessageTooLong,
    NoSatellite,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssSatelliteResult {
    pub satellite_id: u8,
    pub constellation: GnssConstellation,
    /// C/N in dB
    pub snr: i8,
    pub doppler: i16,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct GnssResults {
    pub error: DemoGnssError,
    pub nav_message: Vec<u8, GNSS_NAV_MESSAGE_MAX_SIZE>,
    pub nb_result: u8,
    pub satellites: Vec<GnssSatelliteResult, GNSS_MAX_SATELLITES>,
    pub timings: GnssTimings,
    /// Estimated charge drawn by the scan (µA·s)
    pub consumption_uas: u32,
    pub almanac_age_days: u16,
    pub almanac_too_old: bool,
    /// Local time of the (first) capture
    pub measurement_instant: Option<Instant>,
}

/// Charge drawn by a scan in µA·s, from the GNSS timings
pub fn compute_consumption(reg_mode: RegMode, timings: &GnssTimings) -> u32 {
    let factor = match reg_mode {
        RegMode::Dcdc => 1,
        RegMode::Ldo => 2,
    };
    let ua_ms = timings.radio_ms as u64 * GNSS_RADIO_CURRENT_DCDC_UA
        + timings.computation_ms as u64 * GNSS_COMPUTATION_CURRENT_DCDC_UA;
    (ua_ms * factor / 1_000).min(u32::MAX as u64) as u32
}

pub struct GnssDemo {
    mode: GnssMode,
    state: GnssState,
    pub settings: DemoGnssSettings,
    pub(crate) irq_status: IrqMask,
    date: GnssDate,
    second_capture_done: bool,
    results: GnssResults,
}

impl GnssDemo {
    pub fn new(mode: GnssMode) -> Self {
        Self {
            mode,
            state: GnssState::Init,
            settings: DemoGnssSettings::default(),
            irq_status: 0,
            date: 0,
            second_capture_done: false,
            results: GnssResults::default(),
        }
    }

    pub fn mode(&self) -> GnssMode {
        self.mode
    }

    pub fn state(&self) -> GnssState {
        self.state
    }

    pub fn results(&self) -> &GnssResults {
        &self.results
    }

    pub(crate) fn reset(&mut self) {
        self.state = GnssState::Init;
        self.irq_status = 0;
        self.date = 0;
        self.second_capture_done = false;
        self.results = GnssResults::default();
    }

    pub(crate) fn fail(&mut self) {
        self.results.error = DemoGnssError::Unknown;
        self.state = GnssState::Terminated;
    }

    fn stop_with(&mut self, error: DemoGnssError) -> Progress {
        warn!("gnss: {:?}", error);
        self.results.error = error;
        self.state = GnssState::Terminated;
        Progress::Done
    }

    fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.scan_timeout_s as u64)
    }

    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        match self.state {
            GnssState::Init => self.init(ctx).await,
            GnssState::Scan => {
                let s = self.settings;
                self.results.measurement_instant = Some(ctx.environment.now());
                match self.mode {
                    GnssMode::Autonomous => {
                        ctx.radio
                            .gnss_scan_autonomous(self.date, s.option, GNSS_RESULTS_DEFAULT_MASK, s.nb_sv_max)
                            .await?
                    }
                    GnssMode::Assisted => {
                        ctx.radio
                            .gnss_scan_assisted(self.date, s.option, GNSS_RESULTS_DEFAULT_MASK, s.nb_sv_max)
                            .await?
                    }
                }
                self.state = GnssState::WaitForScan;
                Ok(Progress::WaitForInterrupt(Some(self.scan_timeout())))
            }
            GnssState::WaitForScan => {
                if self.irq_status & IRQ_GNSS_SCAN_DONE == 0 {
                    trace!("gnss: unexpected irq {:#x}", self.irq_status);
                    return Ok(Progress::KeepWaiting);
                }
                if self.settings.capture_mode == GnssCaptureMode::Double && !self.second_capture_done {
                    self.state = GnssState::ScanContinue;
                } else {
                    self.state = GnssState::GetResults;
                }
                Ok(Progress::Continue)
            }
            GnssState::ScanContinue => {
                debug!("gnss: second capture");
                ctx.radio.gnss_scan_continue().await?;
                self.second_capture_done = true;
                self.state = GnssState::WaitForScan;
                Ok(Progress::WaitForInterrupt(Some(self.scan_timeout())))
            }
            GnssState::GetResults => self.get_results(ctx).await,
            GnssState::Terminated => Ok(Progress::Done),
        }
    }

    async fn init<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        self.results = GnssResults::default();
        self.second_capture_done = false;

        let Some(date) = ctx.environment.gnss_date() else {
            return Ok(self.stop_with(DemoGnssError::NoDate));
        };
        self.date = date;

        let location = ctx.environment.location();
        if self.mode == GnssMode::Assisted && location.is_none() {
            return Ok(self.stop_with(DemoGnssError::NoLocation));
        }

        let almanac_date = ctx.radio.gnss_read_almanac_date(ALMANAC_REFERENCE_SV_ID).await?;
        self.results.almanac_age_days = almanac_age_days(almanac_date, date);
        self.results.almanac_too_old = is_almanac_too_old(self.results.almanac_age_days);
        if self.results.almanac_too_old {
            warn!(
                "gnss: almanac is {} days old (max {})",
                self.results.almanac_age_days, GNSS_ALMANAC_MAX_AGE_DAYS
            );
            // Autonomous scans do not use the almanac
            if self.mode == GnssMode::Assisted {
                return Ok(self.stop_with(DemoGnssError::AlmanacTooOld));
            }
        }

        ctx.radio.gnss_set_constellation(self.settings.constellation_mask).await?;
        ctx.radio.gnss_set_scan_mode(self.settings.capture_mode).await?;
        if let (GnssMode::Assisted, Some(location)) = (self.mode, location) {
            ctx.radio
                .gnss_set_assistance_position(&GnssAssistancePosition {
                    latitude: location.latitude,
                    longitude: location.longitude,
                })
                .await?;
        }
        ctx.radio.clear_irq_status(IRQ_ALL).await?;
        ctx.radio.set_dio_irq_params(IRQ_GNSS_SCAN_DONE).await?;

        self.state = GnssState::Scan;
        Ok(Progress::Continue)
    }

    async fn get_results<R: DemoRadio, E>(&mut self, ctx: &mut DemoContext<'_, R, E>) -> Result<Progress, RadioError> {
        self.results.timings = ctx.radio.gnss_get_timings().await?;
        self.results.consumption_uas = compute_consumption(ctx.reg_mode, &self.results.timings);

        let mut detected = [GnssDetectedSatellite::default(); GNSS_MAX_SATELLITES];
        let available = ctx.radio.gnss_get_nb_satellites().await?.min(GNSS_MAX_SATELLITES as u8);
        let read = ctx.radio.gnss_get_satellites(&mut detected, available).await?.min(available);
        for satellite in detected.iter().take(read as usize) {
            let Some(constellation) = GnssConstellation::from_satellite_id(satellite.satellite_id) else {
                debug!("gnss: unknown satellite id {}", satellite.satellite_id);
                continue;
            };
            let _ = self.results.satellites.push(GnssSatelliteResult {
                satellite_id: satellite.satellite_id,
                constellation,
                snr: satellite.cnr,
                doppler: satellite.doppler,
            });
        }
        self.results.nb_result = self.results.satellites.len() as u8;

        let size = ctx.radio.gnss_get_result_size().await? as usize;
        if size > GNSS_NAV_MESSAGE_MAX_SIZE {
            return Ok(self.stop_with(DemoGnssError::NavMessageTooLong));
        }
        let mut buffer = [0u8; GNSS_NAV_MESSAGE_MAX_SIZE];
        ctx.radio.gnss_read_results(&mut buffer[..size]).await?;
        let _ = self.results.nav_message.extend_from_slice(&buffer[..size]);

        if self.results.nb_result == 0 {
            return Ok(self.stop_with(DemoGnssError::NoSatellite));
        }

        info!(
            "gnss: {} satellites, nav message {} bytes",
            self.results.nb_result,
            self.results.nav_message.len()
        );
        self.state = GnssState::Terminated;
        Ok(Progress::Done)
    }
}
