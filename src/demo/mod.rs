//! Demo state-machine framework
//!
//! Every demonstration (Wi-Fi scan, GNSS fix, radio tests) is a small state
//! machine advanced by exactly one step per `runtime()` call. Steps never
//! block: a step that needs the chip to finish something returns
//! [`Progress::WaitForInterrupt`], and the lifecycle in [`base`] holds the
//! demo until the DIO1 interrupt for its slot has been latched.
//!
//! ```text
//! Pending ──start──▶ Running ──Done/error/timeout──▶ Terminated
//!                       │
//!                       └──stop──▶ Stopped
//! (disabled demos bypassed by start_next_enabled) ──▶ Skipped
//! ```
//!
//! The variants are a closed set ([`DemoVariant`]) dispatched with an
//! exhaustive `match`; each owns its state enum, settings and results.

pub mod base;
pub mod container;
pub mod gnss;
pub mod per;
pub mod ping_pong;
pub mod tx_cw;
pub mod wifi;

use embassy_time::Duration;
use lora_phy::mod_params::RadioError;

pub use base::{Demo, DemoBase};
pub use container::DemoContainer;

use crate::environment::Environment;
use crate::interrupt::DemoInterrupt;
use crate::settings::DemoAllSettings;
use crate::system::{RegMode, StandbyConfig, SystemExt};
use crate::DemoRadio;

use gnss::{GnssDemo, GnssMode, GnssResults};
use per::{PerDemo, PerMode, PerResults};
use ping_pong::{PingPongDemo, PingPongResults};
use tx_cw::TxCwDemo;
use wifi::{WifiDemo, WifiMode, WifiScanResults};

/// Number of demos in the container table
pub const DEMO_COUNT: usize = 8;

/// Demo selector
///
/// Every type but `None` owns one slot of the container table; the slot is
/// the value registered in [`DemoInterrupt`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DemoType {
    None,
    Wifi,
    WifiCountryCode,
    GnssAutonomous,
    GnssAssisted,
    TxCw,
    RadioPerTx,
    RadioPerRx,
    RadioPingPong,
}

impl DemoType {
    /// Demo types in slot order
    pub const ALL: [DemoType; DEMO_COUNT] = [
        DemoType::Wifi,
        DemoType::WifiCountryCode,
        DemoType::GnssAutonomous,
        DemoType::GnssAssisted,
        DemoType::TxCw,
        DemoType::RadioPerTx,
        DemoType::RadioPerRx,
        DemoType::RadioPingPong,
    ];

    pub fn slot(self) -> Option<u8> {
        Self::ALL.iter().position(|t| *t == self).map(|index| index as u8)
    }

    pub fn from_slot(slot: u8) -> Option<Self> {
        Self::ALL.get(slot as usize).copied()
    }
}

/// Lifecycle status of a demo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DemoStatus {
    Pending,
    Running,
    Terminated,
    Stopped,
    Skipped,
}

/// Container-level failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DemoError {
    /// `DemoType::None` or a type without slot
    InvalidDemoType,
}

/// Outcome of one variant step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// Step again on the next `runtime()`
    Continue,
    /// Hold until the chip interrupt is latched, failing after the timeout
    WaitForInterrupt(Option<Duration>),
    /// The latched interrupt was not the awaited one; hold under the deadline already running
    KeepWaiting,
    /// The run is over
    Done,
}

/// Handles a demo needs for one call; never stored by the demo
pub struct DemoContext<'a, R, E> {
    pub radio: &'a mut R,
    pub environment: &'a E,
    pub irq: &'a DemoInterrupt,
    /// Regulator the chip runs on, for consumption estimates
    pub reg_mode: RegMode,
}

impl<'a, R, E> DemoContext<'a, R, E> {
    pub fn new(radio: &'a mut R, environment: &'a E, irq: &'a DemoInterrupt, reg_mode: RegMode) -> Self {
        Self {
            radio,
            environment,
            irq,
            reg_mode,
        }
    }
}

/// Results of the selected demo
#[derive(Clone, Copy, Debug)]
pub enum DemoResults<'a> {
    /// Demo without results (TX CW) or no demo selected
    None,
    Wifi(&'a WifiScanResults),
    Gnss(&'a GnssResults),
    Per(&'a PerResults),
    PingPong(&'a PingPongResults),
}

/// Closed set of demo implementations
pub enum DemoVariant {
    Wifi(WifiDemo),
    Gnss(GnssDemo),
    TxCw(TxCwDemo),
    Per(PerDemo),
    PingPong(PingPongDemo),
}

impl DemoVariant {
    pub fn for_type(demo_type: DemoType) -> Option<Self> {
        let variant = match demo_type {
            DemoType::None => return None,
            DemoType::Wifi => DemoVariant::Wifi(WifiDemo::new(WifiMode::Scan)),
            DemoType::WifiCountryCode => DemoVariant::Wifi(WifiDemo::new(WifiMode::CountryCode)),
            DemoType::GnssAutonomous => DemoVariant::Gnss(GnssDemo::new(GnssMode::Autonomous)),
            DemoType::GnssAssisted => DemoVariant::Gnss(GnssDemo::new(GnssMode::Assisted)),
            DemoType::TxCw => DemoVariant::TxCw(TxCwDemo::new()),
            DemoType::RadioPerTx => DemoVariant::Per(PerDemo::new(PerMode::Tx)),
            DemoType::RadioPerRx => DemoVariant::Per(PerDemo::new(PerMode::Rx)),
            DemoType::RadioPingPong => DemoVariant::PingPong(PingPongDemo::new()),
        };
        Some(variant)
    }

    /// Load the settings this variant uses
    pub fn apply_settings(&mut self, settings: &DemoAllSettings) {
        match self {
            DemoVariant::Wifi(demo) => demo.settings = settings.wifi,
            DemoVariant::Gnss(demo) => {
                demo.settings = match demo.mode() {
                    GnssMode::Autonomous => settings.gnss_autonomous,
                    GnssMode::Assisted => settings.gnss_assisted,
                }
            }
            DemoVariant::TxCw(demo) => demo.settings = settings.radio,
            DemoVariant::Per(demo) => demo.settings = settings.radio,
            DemoVariant::PingPong(demo) => demo.settings = settings.radio,
        }
    }

    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        match self {
            DemoVariant::Wifi(demo) => demo.step(ctx).await,
            DemoVariant::Gnss(demo) => demo.step(ctx).await,
            DemoVariant::TxCw(demo) => demo.step(ctx).await,
            DemoVariant::Per(demo) => demo.step(ctx).await,
            DemoVariant::PingPong(demo) => demo.step(ctx).await,
        }
    }

    /// Deferred interrupt handling: read and clear the chip IRQ status
    pub(crate) async fn on_interrupt<R: DemoRadio, E>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<(), RadioError> {
        let irq_status = ctx.radio.get_and_clear_irq_status().await?;
        trace!("irq status {:#x}", irq_status);
        match self {
            DemoVariant::Wifi(demo) => demo.irq_status = irq_status,
            DemoVariant::Gnss(demo) => demo.irq_status = irq_status,
            DemoVariant::TxCw(demo) => demo.irq_status = irq_status,
            DemoVariant::Per(demo) => demo.irq_status = irq_status,
            DemoVariant::PingPong(demo) => demo.irq_status = irq_status,
        }
        Ok(())
    }

    /// Put the chip back in standby
    pub(crate) async fn stop<R: DemoRadio, E>(&mut self, ctx: &mut DemoContext<'_, R, E>) -> Result<(), RadioError> {
        ctx.radio.set_standby(StandbyConfig::Rc).await
    }

    /// The expected interrupt never came; `true` when the demo carries on
    pub(crate) fn on_wait_timeout(&mut self) -> bool {
        match self {
            DemoVariant::PingPong(demo) => {
                demo.on_missed_interrupt();
                true
            }
            _ => {
                self.fail();
                false
            }
        }
    }

    pub(crate) fn on_error(&mut self, _error: RadioError) {
        self.fail();
    }

    fn fail(&mut self) {
        match self {
            DemoVariant::Wifi(demo) => demo.fail(),
            DemoVariant::Gnss(demo) => demo.fail(),
            DemoVariant::TxCw(_) => {}
            DemoVariant::Per(demo) => demo.fail(),
            DemoVariant::PingPong(demo) => demo.fail(),
        }
    }

    /// Back to the initial state, results cleared
    pub fn reset(&mut self) {
        match self {
            DemoVariant::Wifi(demo) => demo.reset(),
            DemoVariant::Gnss(demo) => demo.reset(),
            DemoVariant::TxCw(demo) => demo.reset(),
            DemoVariant::Per(demo) => demo.reset(),
            DemoVariant::PingPong(demo) => demo.reset(),
        }
    }

    pub fn results(&self) -> DemoResults<'_> {
        match self {
            DemoVariant::Wifi(demo) => DemoResults::Wifi(demo.results()),
            DemoVariant::Gnss(demo) => DemoResults::Gnss(demo.results()),
            DemoVariant::TxCw(_) => DemoResults::None,
            DemoVariant::Per(demo) => DemoResults::Per(demo.results()),
            DemoVariant::PingPong(demo) => DemoResults::PingPong(demo.results()),
        }
    }

    /// True once per batch of new intermediate results
    pub fn take_intermediate_results(&mut self) -> bool {
        match self {
            DemoVariant::Per(demo) => core::mem::take(&mut demo.intermediate),
            DemoVariant::PingPong(demo) => core::mem::take(&mut demo.intermediate),
            DemoVariant::Wifi(_) | DemoVariant::Gnss(_) | DemoVariant::TxCw(_) => false,
        }
    }

    pub fn has_intermediate_results(&self) -> bool {
        match self {
            DemoVariant::Per(demo) => demo.intermediate,
            DemoVariant::PingPong(demo) => demo.intermediate,
            DemoVariant::Wifi(_) | DemoVariant::Gnss(_) | DemoVariant::TxCw(_) => false,
        }
    }
}
