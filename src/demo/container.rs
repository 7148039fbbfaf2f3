//! Table of every demo, with the selected one
//!
//! The container owns one [`Demo`] per [`DemoType`] and guarantees that at
//! most one of them is started: starting a demo stops the previous one first.

use heapless::Vec;
use lora_phy::mod_params::RadioError;

use super::{Demo, DemoContext, DemoError, DemoResults, DemoStatus, DemoType, DEMO_COUNT};
use crate::environment::Environment;
use crate::hci::{HostDemoConfiguration, HostDemoSettings};
use crate::settings::{DemoAllSettings, GuiGnssSettings, GuiRadioSettings, GuiWifiSettings};
use crate::system::{reset_and_init, ChipConfig};
use crate::DemoRadio;

/// Demos `start_next_enabled` picks from after boot
const DEFAULT_ENABLED: [DemoType; 3] = [DemoType::Wifi, DemoType::GnssAutonomous, DemoType::GnssAssisted];

pub struct DemoContainer {
    demos: Vec<Demo, DEMO_COUNT>,
    selected: DemoType,
    settings: DemoAllSettings,
    default_settings: DemoAllSettings,
}

impl DemoContainer {
    pub fn new(settings: DemoAllSettings) -> Self {
        let mut demos: Vec<Demo, DEMO_COUNT> = DemoType::ALL.iter().filter_map(|t| Demo::new(*t)).collect();
        for demo in demos.iter_mut() {
            if !DEFAULT_ENABLED.contains(&demo.demo_type()) {
                demo.base_mut().disable();
            }
        }

        Self {
            demos,
            selected: DemoType::None,
            settings,
            default_settings: settings,
        }
    }

    /// One-time chip bring-up, before any demo starts
    pub async fn init<R: DemoRadio>(&mut self, radio: &mut R, chip: &ChipConfig) -> Result<(), RadioError> {
        reset_and_init(radio, chip).await
    }

    fn demo(&self, demo_type: DemoType) -> Option<&Demo> {
        self.demos.get(demo_type.slot()? as usize)
    }

    fn demo_mut(&mut self, demo_type: DemoType) -> Option<&mut Demo> {
        self.demos.get_mut(demo_type.slot()? as usize)
    }

    /// Start `demo_type`, stopping the running demo first
    ///
    /// Starting the demo that is already running does nothing.
    pub async fn start<R: DemoRadio, E: Environment>(
        &mut self,
        demo_type: DemoType,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<(), DemoError> {
        if demo_type.slot().is_none() {
            return Err(DemoError::InvalidDemoType);
        }
        if self.selected == demo_type && self.is_started() {
            return Ok(());
        }

        self.stop(ctx).await;

        let settings = self.settings;
        let demo = self.demo_mut(demo_type).ok_or(DemoError::InvalidDemoType)?;
        demo.apply_settings(&settings);
        demo.start(ctx).await;
        self.selected = demo_type;
        Ok(())
    }

    /// Start the first enabled demo after the selected one, cycling
    ///
    /// Disabled demos passed over are marked skipped.
    pub async fn start_next_enabled<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Option<DemoType> {
        let first = match self.selected.slot() {
            Some(slot) => slot as usize + 1,
            None => 0,
        };

        let mut next = None;
        for offset in 0..DEMO_COUNT {
            let index = (first + offset) % DEMO_COUNT;
            let demo = self.demos.get_mut(index)?;
            if demo.base().is_enabled() {
                next = Some(demo.demo_type());
                break;
            }
            demo.base_mut().skip();
        }

        let Some(demo_type) = next else {
            warn!("no demo enabled");
            return None;
        };
        self.start(demo_type, ctx).await.ok()?;
        Some(demo_type)
    }

    /// Stop every started demo; the selection is kept for result fetches
    pub async fn stop<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) {
        for demo in self.demos.iter_mut() {
            if demo.is_started() {
                demo.stop(ctx).await;
            }
        }
    }

    /// Advance the selected demo by one step
    pub async fn runtime<R: DemoRadio, E: Environment>(&mut self, ctx: &mut DemoContext<'_, R, E>) -> DemoStatus {
        let selected = self.selected;
        match self.demo_mut(selected) {
            Some(demo) => demo.runtime(ctx).await,
            None => DemoStatus::Pending,
        }
    }

    /// Every demo back to `Pending`
    pub fn reset<R, E>(&mut self, ctx: &mut DemoContext<'_, R, E>) {
        for demo in self.demos.iter_mut() {
            demo.reset(ctx.irq);
        }
    }

    /// Type of the selected demo, kept after it stops
    pub fn get_type(&self) -> DemoType {
        self.selected
    }

    pub fn results(&self) -> DemoResults<'_> {
        match self.demo(self.selected) {
            Some(demo) => demo.results(),
            None => DemoResults::None,
        }
    }

    pub fn results_of(&self, demo_type: DemoType) -> DemoResults<'_> {
        match self.demo(demo_type) {
            Some(demo) => demo.results(),
            None => DemoResults::None,
        }
    }

    pub fn take_intermediate_results(&mut self) -> bool {
        let selected = self.selected;
        self.demo_mut(selected).is_some_and(|demo| demo.take_intermediate_results())
    }

    /// A demo is started
    pub fn is_started(&self) -> bool {
        self.demos.iter().any(|demo| demo.is_started())
    }

    pub fn is_waiting_for_interrupt(&self) -> bool {
        self.demos
            .iter()
            .any(|demo| demo.is_started() && demo.is_waiting_for_interrupt())
    }

    pub fn status(&self, demo_type: DemoType) -> Option<DemoStatus> {
        self.demo(demo_type).map(|demo| demo.status())
    }

    pub fn enable(&mut self, demo_type: DemoType) -> Result<(), DemoError> {
        self.demo_mut(demo_type)
            .ok_or(DemoError::InvalidDemoType)?
            .base_mut()
            .enable();
        Ok(())
    }

    pub fn disable(&mut self, demo_type: DemoType) -> Result<(), DemoError> {
        self.demo_mut(demo_type)
            .ok_or(DemoError::InvalidDemoType)?
            .base_mut()
            .disable();
        Ok(())
    }

    pub fn settings(&self) -> &DemoAllSettings {
        &self.settings
    }

    pub fn default_settings(&self) -> &DemoAllSettings {
        &self.default_settings
    }

    pub fn update_wifi_settings(&mut self, gui: &GuiWifiSettings) {
        self.settings.wifi.update_from_gui(gui);
    }

    pub fn update_gnss_autonomous_settings(&mut self, gui: &GuiGnssSettings) {
        self.settings.gnss_autonomous.update_from_gui(gui);
    }

    pub fn update_gnss_assisted_settings(&mut self, gui: &GuiGnssSettings) {
        self.settings.gnss_assisted.update_from_gui(gui);
    }

    pub fn update_radio_settings(&mut self, gui: &GuiRadioSettings) {
        self.settings.radio.update_from_gui(gui);
    }

    /// Apply a host demo configuration; takes effect on the next start
    pub fn configure(&mut self, configuration: &HostDemoConfiguration) -> Result<(), DemoError> {
        if configuration.enabled {
            self.enable(configuration.demo_type)?;
        } else {
            self.disable(configuration.demo_type)?;
        }

        match configuration.settings {
            Some(HostDemoSettings::Wifi(wifi)) => self.settings.wifi = wifi,
            Some(HostDemoSettings::GnssAutonomous(gnss)) => self.settings.gnss_autonomous = gnss,
            Some(HostDemoSettings::GnssAssisted(gnss)) => self.settings.gnss_assisted = gnss,
            Some(HostDemoSettings::Radio(radio)) => self.settings.radio = radio,
            None => {}
        }
        Ok(())
    }
}
