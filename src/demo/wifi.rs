//! Wi-Fi passive scan and country-code search
//!
//! ```text
//! Init ──▶ Scan ──▶ WaitForScan ──IRQ_WIFI_SCAN_DONE──▶ GetResults ──▶ Terminated
//! ```

use embassy_time::Duration;
use heapless::Vec;
use lora_phy::mod_params::RadioError;

use super::{DemoContext, Progress};
use crate::environment::Environment;
use crate::settings::DemoWifiSettings;
use crate::system::{IrqMask, RegMode, SystemExt, IRQ_ALL, IRQ_WIFI_SCAN_DONE};
use crate::wifi::{
    WifiBasicMacTypeChannelResult, WifiChannel, WifiCountryCodeResult, WifiCumulativeTimings, WifiExt,
    WifiMacAddress, WifiSignalTypeResult, WIFI_MAX_RESULTS, WIFI_STR_COUNTRY_CODE_SIZE,
};
use crate::DemoRadio;

// Scan phase currents in µA, DC-DC regulator
const WIFI_CAPTURE_CURRENT_DCDC_UA: u64 = 12_000;
const WIFI_CORRELATION_CURRENT_DCDC_UA: u64 = 12_000;
const WIFI_DEMODULATION_CURRENT_DCDC_UA: u64 = 4_000;

/// What the demo searches for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiMode {
    /// MAC/type/channel of the access points around
    Scan,
    /// Country code advertised by the access points around
    CountryCode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum WifiState {
    Init,
    Scan,
    WaitForScan,
    GetResults,
    Terminated,
}

/// One access point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WifiScanSingleResult {
    pub mac_address: WifiMacAddress,
    pub channel: WifiChannel,
    pub signal_type: WifiSignalTypeResult,
    pub rssi: i8,
    /// Only filled by country-code searches
    pub country_code: [u8; WIFI_STR_COUNTRY_CODE_SIZE],
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct WifiScanResults {
    pub results: Vec<WifiScanSingleResult, WIFI_MAX_RESULTS>,
    pub nbr_results: u8,
    pub timings: WifiCumulativeTimings,
    /// Estimated charge drawn by the scan (µA·s)
    pub global_consumption_uas: u32,
    /// Scan failed or never completed
    pub error: bool,
}

/// Charge drawn by a scan in µA·s, from the chip cumulative timings
pub fn compute_consumption(reg_mode: RegMode, timings: &WifiCumulativeTimings) -> u32 {
    let factor = match reg_mode {
        RegMode::Dcdc => 1,
        RegMode::Ldo => 2,
    };

    let capture = timings.rx_capture_us as u64 * WIFI_CAPTURE_CURRENT_DCDC_UA;
    let correlation =
        (timings.rx_correlation_us as u64 + timings.rx_detection_us as u64) * WIFI_CORRELATION_CURRENT_DCDC_UA;
    let demodulation = timings.demodulation_us as u64 * WIFI_DEMODULATION_CURRENT_DCDC_UA;

    let uas = (capture + correlation + demodulation) * factor / 1_000_000;
    uas.min(u32::MAX as u64) as u32
}

pub struct WifiDemo {
    mode: WifiMode,
    state: WifiState,
    pub settings: DemoWifiSettings,
    pub(crate) irq_status: IrqMask,
    results: WifiScanResults,
}

impl WifiDemo {
    pub fn new(mode: WifiMode) -> Self {
        Self {
            mode,
            state: WifiState::Init,
            settings: DemoWifiSettings::default(),
            irq_status: 0,
            results: WifiScanResults::default(),
        }
    }

    pub fn mode(&self) -> WifiMode {
        self.mode
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn results(&self) -> &WifiScanResults {
        &self.results
    }

    pub(crate) fn reset(&mut self) {
        self.state = WifiState::Init;
        self.irq_status = 0;
        self.results = WifiScanResults::default();
    }

    pub(crate) fn fail(&mut self) {
        self.results.error = true;
        self.state = WifiState::Terminated;
    }

    fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.scan_timeout_s as u64)
    }

    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        match self.state {
            WifiState::Init => {
                self.results = WifiScanResults::default();
                ctx.radio.wifi_reset_cumulative_timing().await?;
                ctx.radio.clear_irq_status(IRQ_ALL).await?;
                ctx.radio.set_dio_irq_params(IRQ_WIFI_SCAN_DONE).await?;
                self.state = WifiState::Scan;
                Ok(Progress::Continue)
            }
            WifiState::Scan => {
                let s = &self.settings;
                match self.mode {
                    WifiMode::Scan => {
                        debug!("wifi: scan channels {:#x}", s.channels);
                        ctx.radio
                            .wifi_scan(
                                s.types,
                                s.channels,
                                s.scan_mode,
                                s.max_results,
                                s.nb_scan_per_channel,
                                s.timeout_per_scan_ms,
                                s.abort_on_timeout,
                            )
                            .await?;
                    }
                    WifiMode::CountryCode => {
                        debug!("wifi: country code search channels {:#x}", s.channels);
                        ctx.radio
                            .wifi_search_country_code(
                                s.channels,
                                s.max_results,
                                s.nb_scan_per_channel,
                                s.timeout_per_scan_ms,
                                s.abort_on_timeout,
                            )
                            .await?;
                    }
                }
                self.state = WifiState::WaitForScan;
                Ok(Progress::WaitForInterrupt(Some(self.scan_timeout())))
            }
            WifiState::WaitForScan => {
                if self.irq_status & IRQ_WIFI_SCAN_DONE != 0 {
                    self.state = WifiState::GetResults;
                    Ok(Progress::Continue)
                } else {
                    trace!("wifi: unexpected irq {:#x}", self.irq_status);
                    Ok(Progress::KeepWaiting)
                }
            }
            WifiState::GetResults => {
                match self.mode {
                    WifiMode::Scan => self.read_scan_results(ctx).await?,
                    WifiMode::CountryCode => self.read_country_code_results(ctx).await?,
                }
                self.results.nbr_results = self.results.results.len() as u8;
                self.results.timings = ctx.radio.wifi_read_cumulative_timing().await?;
                self.results.global_consumption_uas = compute_consumption(ctx.reg_mode, &self.results.timings);
                info!(
                    "wifi: {} results, {} uAs",
                    self.results.nbr_results, self.results.global_consumption_uas
                );
                self.state = WifiState::Terminated;
                Ok(Progress::Done)
            }
            WifiState::Terminated => Ok(Progress::Done),
        }
    }

    async fn read_scan_results<R: DemoRadio, E>(&mut self, ctx: &mut DemoContext<'_, R, E>) -> Result<(), RadioError> {
        let available = ctx.radio.wifi_get_nb_results().await?.min(WIFI_MAX_RESULTS as u8);
        let mut raw = [WifiBasicMacTypeChannelResult::default(); WIFI_MAX_RESULTS];
        let read = ctx
            .radio
            .wifi_read_basic_mac_type_channel_results(&mut raw, 0, available)
            .await?
            .min(available);

        for result in raw.iter().take(read as usize) {
            let _ = self.results.results.push(WifiScanSingleResult {
                mac_address: result.mac_address,
                channel: result.channel(),
                signal_type: result.signal_type(),
                rssi: result.rssi,
                country_code: [0; WIFI_STR_COUNTRY_CODE_SIZE],
            });
        }
        Ok(())
    }

    async fn read_country_code_results<R: DemoRadio, E>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<(), RadioError> {
        let available = ctx
            .radio
            .wifi_get_nb_country_code_results()
            .await?
            .min(WIFI_MAX_RESULTS as u8);
        let mut raw = [WifiCountryCodeResult::default(); WIFI_MAX_RESULTS];
        let read = ctx
            .radio
            .wifi_read_country_code_results(&mut raw, 0, available)
            .await?
            .min(available);

        for result in raw.iter().take(read as usize) {
            // Country-code frames carry no RSSI and are beacons of type B
            let _ = self.results.results.push(WifiScanSingleResult {
                mac_address: result.mac_address,
                channel: result.channel(),
                signal_type: WifiSignalTypeResult::TypeB,
                rssi: 0,
                country_code: result.country_code,
            });
        }
        Ok(())
    }
}
