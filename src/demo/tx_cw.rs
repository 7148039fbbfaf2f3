//! Continuous wave transmission, for RF bench measurements

use lora_phy::mod_params::RadioError;

use super::{DemoContext, Progress};
use crate::environment::Environment;
use crate::radio::{configure, RadioControlExt};
use crate::settings::DemoRadioSettings;
use crate::system::IrqMask;
use crate::DemoRadio;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum TxCwState {
    Init,
    /// Carrier on until the demo is stopped
    Transmitting,
}

pub struct TxCwDemo {
    state: TxCwState,
    pub settings: DemoRadioSettings,
    pub(crate) irq_status: IrqMask,
}

impl TxCwDemo {
    pub fn new() -> Self {
        Self {
            state: TxCwState::Init,
            settings: DemoRadioSettings::default(),
            irq_status: 0,
        }
    }

    pub fn state(&self) -> TxCwState {
        self.state
    }

    pub(crate) fn reset(&mut self) {
        self.state = TxCwState::Init;
        self.irq_status = 0;
    }

    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        if self.state == TxCwState::Init {
            info!(
                "tx cw: {} Hz, {} dBm",
                self.settings.rf_frequency, self.settings.tx_power
            );
            configure(&mut *ctx.radio, &self.settings.radio_config()).await?;
            ctx.radio.set_tx_cw().await?;
            self.state = TxCwState::Transmitting;
        }
        // No interrupt ends a carrier
        Ok(Progress::WaitForInterrupt(None))
    }
}

impl Default for TxCwDemo {
    fn default() -> Self {
        Self::new()
    }
}
