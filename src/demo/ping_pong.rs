//! Ping-pong between two boards
//!
//! A master sends `PING` and listens for `PONG`; a slave listens for `PING`
//! and answers `PONG`. Every board starts as master, becomes slave when it
//! hears a `PING` and falls back to master when a reception window times out.
//! A TX or RX interrupt that never comes is counted and the exchange restarts.
//! The demo runs until stopped.

use embassy_time::Duration;
use lora_phy::mod_params::RadioError;

use super::per::{radio_rx_timeout, radio_tx_timeout, read_rx_payload, setup_radio, RADIO_MAX_PAYLOAD_LENGTH};
use super::{DemoContext, Progress};
use crate::environment::Environment;
use crate::radio::{ms_to_rtc_steps, RadioControlExt};
use crate::settings::DemoRadioSettings;
use crate::system::{IrqMask, IRQ_CRC_ERROR, IRQ_HEADER_ERROR, IRQ_RX_DONE, IRQ_TIMEOUT, IRQ_TX_DONE};
use crate::DemoRadio;

const PING: &[u8; 4] = b"PING";
const PONG: &[u8; 4] = b"PONG";
const PING_PONG_PAYLOAD_LENGTH: u8 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PingPongRole {
    Master,
    Slave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PingPongState {
    Init,
    Send,
    WaitTx,
    Receive,
    WaitRx,
    Terminated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PingPongResults {
    pub count_tx: u32,
    pub count_rx_correct_packet: u32,
    pub count_rx_wrong_packet: u32,
    pub count_rx_timeout: u32,
    /// Transmissions whose TX done never came
    pub count_tx_timeout: u32,
}

pub struct PingPongDemo {
    role: PingPongRole,
    state: PingPongState,
    pub settings: DemoRadioSettings,
    pub(crate) irq_status: IrqMask,
    pub(crate) intermediate: bool,
    tx_timeout: Duration,
    results: PingPongResults,
}

impl PingPongDemo {
    pub fn new() -> Self {
        Self {
            role: PingPongRole::Master,
            state: PingPongState::Init,
            settings: DemoRadioSettings::default(),
            irq_status: 0,
            intermediate: false,
            tx_timeout: Duration::from_secs(1),
            results: PingPongResults::default(),
        }
    }

    pub fn role(&self) -> PingPongRole {
        self.role
    }

    pub fn state(&self) -> PingPongState {
        self.state
    }

    pub fn results(&self) -> &PingPongResults {
        &self.results
    }

    pub(crate) fn reset(&mut self) {
        self.role = PingPongRole::Master;
        self.state = PingPongState::Init;
        self.irq_status = 0;
        self.intermediate = false;
        self.results = PingPongResults::default();
    }

    pub(crate) fn fail(&mut self) {
        self.state = PingPongState::Terminated;
    }

    /// The TX or RX interrupt never came: count the miss and restart the exchange
    pub(crate) fn on_missed_interrupt(&mut self) {
        match self.state {
            PingPongState::WaitTx => self.results.count_tx_timeout += 1,
            _ => self.results.count_rx_timeout += 1,
        }
        warn!("ping-pong: missed {:?} as {:?}", self.state, self.role);
        self.irq_status = 0;
        self.intermediate = true;
        self.state = match self.role {
            PingPongRole::Master => PingPongState::Send,
            PingPongRole::Slave => PingPongState::Receive,
        };
    }

    fn next_after_rx(&self) -> PingPongState {
        match self.role {
            PingPongRole::Master => PingPongState::Send,
            PingPongRole::Slave => PingPongState::Receive,
        }
    }

    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        match self.state {
            PingPongState::Init => {
                self.results = PingPongResults::default();
                self.role = PingPongRole::Master;
                let mut config = self.settings.radio_config();
                config.modulation = config.modulation.with_payload_len(PING_PONG_PAYLOAD_LENGTH);
                self.tx_timeout = radio_tx_timeout(&config);
                setup_radio(&mut *ctx.radio, &config).await?;
                self.state = PingPongState::Send;
                Ok(Progress::Continue)
            }
            PingPongState::Send => {
                let payload = match self.role {
                    PingPongRole::Master => PING,
                    PingPongRole::Slave => PONG,
                };
                ctx.radio.write_buffer(payload).await?;
                ctx.radio.set_tx(0).await?;
                self.state = PingPongState::WaitTx;
                Ok(Progress::WaitForInterrupt(Some(self.tx_timeout)))
            }
            PingPongState::WaitTx => {
                if self.irq_status & IRQ_TX_DONE == 0 {
                    return Ok(Progress::KeepWaiting);
                }
                self.results.count_tx += 1;
                self.intermediate = true;
                self.state = PingPongState::Receive;
                Ok(Progress::Continue)
            }
            PingPongState::Receive => {
                ctx.radio.set_rx(ms_to_rtc_steps(self.settings.rx_timeout_ms)).await?;
                self.state = PingPongState::WaitRx;
                Ok(Progress::WaitForInterrupt(Some(radio_rx_timeout(&self.settings))))
            }
            PingPongState::WaitRx => {
                let irq = self.irq_status;
                if irq & IRQ_TIMEOUT != 0 {
                    self.results.count_rx_timeout += 1;
                    if self.role == PingPongRole::Slave {
                        debug!("ping-pong: no ping, back to master");
                    }
                    self.role = PingPongRole::Master;
                    self.state = PingPongState::Send;
                } else if irq & (IRQ_CRC_ERROR | IRQ_HEADER_ERROR) != 0 {
                    self.results.count_rx_wrong_packet += 1;
                    self.state = self.next_after_rx();
                } else if irq & IRQ_RX_DONE != 0 {
                    self.state = self.on_received(ctx).await?;
                } else {
                    return Ok(Progress::KeepWaiting);
                }
                self.intermediate = true;
                Ok(Progress::Continue)
            }
            PingPongState::Terminated => Ok(Progress::Done),
        }
    }

    async fn on_received<R: RadioControlExt, E>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<PingPongState, RadioError> {
        let mut buffer = [0u8; RADIO_MAX_PAYLOAD_LENGTH];
        let length = read_rx_payload(&mut *ctx.radio, &mut buffer).await?;
        let payload = &buffer[..length];

        if payload == PING {
            if self.role == PingPongRole::Master {
                debug!("ping-pong: ping heard, switching to slave");
            }
            self.role = PingPongRole::Slave;
            self.results.count_rx_correct_packet += 1;
            return Ok(PingPongState::Send);
        }
        if payload == PONG && self.role == PingPongRole::Master {
            self.results.count_rx_correct_packet += 1;
            return Ok(PingPongState::Send);
        }

        self.results.count_rx_wrong_packet += 1;
        Ok(self.next_after_rx())
    }
}

impl Default for PingPongDemo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::DemoInterrupt;
    use crate::demo::{DemoResults, DemoStatus, DemoType};
    use crate::mock::{DemoBench, MockEnvironment, MockRadio, RadioCall};
    use crate::radio::{LoraBandwidth, LoraModParams, LoraSf};
    use crate::system::RegMode;
    use embassy_futures::block_on;

    fn ping_pong_results(bench: &DemoBench) -> PingPongResults {
        match bench.demo.results() {
            DemoResults::PingPong(results) => *results,
            _ => panic!("expected ping-pong results"),
        }
    }

    /// Step until the demo waits for an interrupt, then feed it `irq`
    fn exchange(demo: &mut PingPongDemo, radio: &mut MockRadio, irq: IrqMask) {
        let env = MockEnvironment::new();
        let interrupt = DemoInterrupt::new();
        let mut ctx = DemoContext::new(radio, &env, &interrupt, RegMode::Dcdc);
        loop {
            match block_on(demo.step(&mut ctx)).unwrap() {
                Progress::Continue => {}
                Progress::WaitForInterrupt(_) | Progress::KeepWaiting => break,
                Progress::Done => panic!("ping-pong never ends on its own"),
            }
        }
        demo.irq_status = irq;
        // Consume the interrupt
        let _ = block_on(demo.step(&mut ctx)).unwrap();
    }

    #[test]
    fn test_master_exchange() {
        let mut radio = MockRadio::new();
        let mut demo = PingPongDemo::new();

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        assert!(radio.calls.contains(&RadioCall::WriteBuffer(PING.to_vec())));
        assert_eq!(demo.results().count_tx, 1);
        assert_eq!(demo.state(), PingPongState::Receive);

        radio.rx_payload = PONG.to_vec();
        exchange(&mut demo, &mut radio, IRQ_RX_DONE);
        assert_eq!(demo.results().count_rx_correct_packet, 1);
        assert_eq!(demo.role(), PingPongRole::Master);
        assert_eq!(demo.state(), PingPongState::Send);
        assert!(demo.intermediate);
    }

    #[test]
    fn test_ping_switches_to_slave() {
        let mut radio = MockRadio::new();
        let mut demo = PingPongDemo::new();

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        radio.rx_payload = PING.to_vec();
        exchange(&mut demo, &mut radio, IRQ_RX_DONE);
        assert_eq!(demo.role(), PingPongRole::Slave);

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        assert_eq!(radio.calls.iter().filter(|c| **c == RadioCall::WriteBuffer(PONG.to_vec())).count(), 1);
    }

    #[test]
    fn test_timeout_back_to_master() {
        let mut radio = MockRadio::new();
        let mut demo = PingPongDemo::new();

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        radio.rx_payload = PING.to_vec();
        exchange(&mut demo, &mut radio, IRQ_RX_DONE);
        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        exchange(&mut demo, &mut radio, IRQ_TIMEOUT);

        assert_eq!(demo.role(), PingPongRole::Master);
        assert_eq!(demo.results().count_rx_timeout, 1);
        assert_eq!(demo.state(), PingPongState::Send);
    }

    #[test]
    fn test_wrong_packet_counted() {
        let mut radio = MockRadio::new();
        let mut demo = PingPongDemo::new();

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        radio.rx_payload = b"PANG".to_vec();
        exchange(&mut demo, &mut radio, IRQ_RX_DONE);
        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        exchange(&mut demo, &mut radio, IRQ_CRC_ERROR);

        assert_eq!(demo.results().count_rx_wrong_packet, 2);
        assert_eq!(demo.results().count_tx, 2);
    }

    #[test]
    fn test_payload_length_forced() {
        let mut radio = MockRadio::new();
        let mut demo = PingPongDemo::new();
        demo.settings.payload_length = 64;

        exchange(&mut demo, &mut radio, IRQ_TX_DONE);
        let lengths: std::vec::Vec<u8> = radio
            .calls
            .iter()
            .filter_map(|call| match call {
                RadioCall::SetLoraPktParams(params) => Some(params.payload_len),
                _ => None,
            })
            .collect();
        assert_eq!(lengths, std::vec![PING_PONG_PAYLOAD_LENGTH]);
    }

    #[test]
    fn test_missed_tx_done_restarts_exchange() {
        let mut bench = DemoBench::start(DemoType::RadioPingPong, DemoRadioSettings::default());
        bench.run_until_waiting();
        assert_eq!(bench.sent(), 1);

        // SF7 PING lasts 36 ms; the bound is 536 ms
        bench.env.advance(Duration::from_secs(1));
        assert_eq!(bench.runtime(), DemoStatus::Running);
        assert!(bench.demo.is_started());
        assert_eq!(ping_pong_results(&bench).count_tx_timeout, 1);
        assert_eq!(ping_pong_results(&bench).count_tx, 0);

        bench.runtime();
        assert_eq!(bench.sent(), 2);
        assert!(bench.demo.is_waiting_for_interrupt());
    }

    #[test]
    fn test_missed_rx_window_back_to_master() {
        let mut bench = DemoBench::start(DemoType::RadioPingPong, DemoRadioSettings::default());
        bench.run_until_waiting();
        assert_eq!(bench.interrupt(IRQ_TX_DONE), DemoStatus::Running);
        bench.run_until_waiting();
        assert!(bench.radio.calls.contains(&RadioCall::SetRx(ms_to_rtc_steps(1000))));

        bench.env.advance(Duration::from_millis(1_500));
        assert_eq!(bench.runtime(), DemoStatus::Running);
        let results = ping_pong_results(&bench);
        assert_eq!(results.count_rx_timeout, 1);
        assert_eq!(results.count_tx, 1);

        bench.runtime();
        assert_eq!(bench.sent(), 2);
        let pings = bench
            .radio
            .calls
            .iter()
            .filter(|call| **call == RadioCall::WriteBuffer(PING.to_vec()))
            .count();
        assert_eq!(pings, 2);
    }

    #[test]
    fn test_slow_ping_outlives_short_rx_window() {
        let settings = DemoRadioSettings {
            modulation_lora: LoraModParams {
                sf: LoraSf::Sf12,
                bw: LoraBandwidth::Bw125,
                ..LoraModParams::default()
            },
            rx_timeout_ms: 200,
            ..DemoRadioSettings::default()
        };
        let mut bench = DemoBench::start(DemoType::RadioPingPong, settings);
        bench.run_until_waiting();

        // SF12 PING lasts 991 ms, well past the 700 ms reception bound
        bench.env.advance(Duration::from_secs(1));
        assert_eq!(bench.runtime(), DemoStatus::Running);
        assert!(bench.demo.is_waiting_for_interrupt());
        assert_eq!(ping_pong_results(&bench).count_tx_timeout, 0);

        assert_eq!(bench.interrupt(IRQ_TX_DONE), DemoStatus::Running);
        assert_eq!(ping_pong_results(&bench).count_tx, 1);

        // 200 ms window plus margin
        bench.run_until_waiting();
        bench.env.advance(Duration::from_millis(700));
        bench.runtime();
        assert_eq!(ping_pong_results(&bench).count_rx_timeout, 1);
        assert!(bench.demo.is_started());
    }
}
