//! Packet error rate test, transmitter or receiver side
//!
//! The transmitter sends `nb_of_packets` packets filled with a counting
//! pattern. The receiver classifies every reception window as a correct
//! packet, a wrong packet (CRC/header error or corrupted pattern) or a
//! timeout, until `nb_of_packets` windows have been accounted for.

use embassy_time::Duration;
use lora_phy::mod_params::RadioError;

use super::{DemoContext, Progress};
use crate::environment::Environment;
use crate::radio::{configure, ms_to_rtc_steps, RadioConfig, RadioControlExt};
use crate::settings::DemoRadioSettings;
use crate::system::{
    IrqMask, SystemExt, IRQ_ALL, IRQ_CRC_ERROR, IRQ_HEADER_ERROR, IRQ_RX_DONE, IRQ_TIMEOUT, IRQ_TX_DONE,
};
use crate::DemoRadio;

/// Largest radio payload
pub const RADIO_MAX_PAYLOAD_LENGTH: usize = 255;

/// Interrupts armed by the radio tests
pub(crate) const RADIO_TEST_IRQ_MASK: IrqMask =
    IRQ_TX_DONE | IRQ_RX_DONE | IRQ_TIMEOUT | IRQ_CRC_ERROR | IRQ_HEADER_ERROR;

/// Slack over the expected duration of a TX or RX operation before its interrupt counts as lost
const RADIO_IRQ_MARGIN_MS: u64 = 500;

/// Wait bound for one transmission: time on air plus margin
pub(crate) fn radio_tx_timeout(config: &RadioConfig) -> Duration {
    Duration::from_micros(config.modulation.time_on_air_us()) + Duration::from_millis(RADIO_IRQ_MARGIN_MS)
}

/// Wait bound for one reception window
pub(crate) fn radio_rx_timeout(settings: &DemoRadioSettings) -> Duration {
    Duration::from_millis(settings.rx_timeout_ms as u64 + RADIO_IRQ_MARGIN_MS)
}

/// Configure the chip and arm the radio test interrupts
pub(crate) async fn setup_radio<R: DemoRadio>(radio: &mut R, config: &RadioConfig) -> Result<(), RadioError> {
    configure(radio, config).await?;
    radio.clear_irq_status(IRQ_ALL).await?;
    radio.set_dio_irq_params(RADIO_TEST_IRQ_MASK).await
}

/// Copy the last received payload into `buffer`, returning its length
pub(crate) async fn read_rx_payload<R: RadioControlExt>(
    radio: &mut R,
    buffer: &mut [u8; RADIO_MAX_PAYLOAD_LENGTH],
) -> Result<usize, RadioError> {
    let (length, offset) = radio.get_rx_buffer_status().await?;
    let length = length as usize;
    radio.read_buffer(offset, &mut buffer[..length]).await?;
    Ok(length)
}

fn fill_pattern(buffer: &mut [u8]) {
    for (index, byte) in buffer.iter_mut().enumerate() {
        *byte = index as u8;
    }
}

fn is_pattern(payload: &[u8]) -> bool {
    payload.iter().enumerate().all(|(index, byte)| *byte == index as u8)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PerMode {
    Tx,
    Rx,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum PerState {
    Init,
    Send,
    WaitTx,
    Receive,
    WaitRx,
    Terminated,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct PerResults {
    pub count_tx: u32,
    pub count_rx_correct_packet: u32,
    pub count_rx_wrong_packet: u32,
    pub count_rx_timeout: u32,
    pub last_rssi_dbm: i16,
    pub last_snr_db: i8,
}

impl PerResults {
    /// Reception windows accounted for
    pub fn count_rx(&self) -> u32 {
        self.count_rx_correct_packet + self.count_rx_wrong_packet + self.count_rx_timeout
    }
}

pub struct PerDemo {
    mode: PerMode,
    state: PerState,
    pub settings: DemoRadioSettings,
    pub(crate) irq_status: IrqMask,
    pub(crate) intermediate: bool,
    tx_timeout: Duration,
    results: PerResults,
}

impl PerDemo {
    pub fn new(mode: PerMode) -> Self {
        Self {
            mode,
            state: PerState::Init,
            settings: DemoRadioSettings::default(),
            irq_status: 0,
            intermediate: false,
            tx_timeout: Duration::from_millis(RADIO_IRQ_MARGIN_MS),
            results: PerResults::default(),
        }
    }

    pub fn mode(&self) -> PerMode {
        self.mode
    }

    pub fn state(&self) -> PerState {
        self.state
    }

    pub fn results(&self) -> &PerResults {
        &self.results
    }

    pub(crate) fn reset(&mut self) {
        self.state = PerState::Init;
        self.irq_status = 0;
        self.intermediate = false;
        self.results = PerResults::default();
    }

    pub(crate) fn fail(&mut self) {
        self.state = PerState::Terminated;
    }


    pub(crate) async fn step<R: DemoRadio, E: Environment>(
        &mut self,
        ctx: &mut DemoContext<'_, R, E>,
    ) -> Result<Progress, RadioError> {
        match self.state {
            PerState::Init => {
                self.results = PerResults::default();
                let config = self.settings.radio_config();
                self.tx_timeout = radio_tx_timeout(&config);
                setup_radio(&mut *ctx.radio, &config).await?;
                self.state = match self.mode {
                    PerMode::Tx => PerState::Send,
                    PerMode::Rx => PerState::Receive,
                };
                Ok(Progress::Continue)
            }
            PerState::Send => {
                let length = self.settings.payload_length as usize;
                let mut payload = [0u8; RADIO_MAX_PAYLOAD_LENGTH];
                fill_pattern(&mut payload[..length]);
                ctx.radio.write_buffer(&payload[..length]).await?;
                ctx.radio.set_tx(0).await?;
                self.state = PerState::WaitTx;
                Ok(Progress::WaitForInterrupt(Some(self.tx_timeout)))
            }
            PerState::WaitTx => {
                if self.irq_status & IRQ_TX_DONE == 0 {
                    return Ok(Progress::KeepWaiting);
                }
                self.results.count_tx += 1;
                self.intermediate = true;
                trace!("per: tx {}", self.results.count_tx);
                if self.results.count_tx >= self.settings.nb_of_packets {
                    self.state = PerState::Terminated;
                    return Ok(Progress::Done);
                }
                self.state = PerState::Send;
                Ok(Progress::Continue)
            }
            PerState::Receive => {
                ctx.radio.set_rx(ms_to_rtc_steps(self.settings.rx_timeout_ms)).await?;
                self.state = PerState::WaitRx;
                Ok(Progress::WaitForInterrupt(Some(radio_rx_timeout(&self.settings))))
            }
            PerState::WaitRx => {
                let irq = self.irq_status;
                if irq & IRQ_TIMEOUT != 0 {
                    self.results.count_rx_timeout += 1;
                } else if irq & (IRQ_CRC_ERROR | IRQ_HEADER_ERROR) != 0 {
                    self.results.count_rx_wrong_packet += 1;
                } else if irq & IRQ_RX_DONE != 0 {
                    let mut buffer = [0u8; RADIO_MAX_PAYLOAD_LENGTH];
                    let length = read_rx_payload(&mut *ctx.radio, &mut buffer).await?;
                    let status = ctx.radio.get_packet_status().await?;
                    self.results.last_rssi_dbm = status.rssi_pkt_dbm;
                    self.results.last_snr_db = status.snr_pkt_db;
                    if length == self.settings.payload_length as usize && is_pattern(&buffer[..length]) {
                        self.results.count_rx_correct_packet += 1;
                    } else {
                        self.results.count_rx_wrong_packet += 1;
                    }
                } else {
                    return Ok(Progress::KeepWaiting);
                }

                self.intermediate = true;
                if self.results.count_rx() >= self.settings.nb_of_packets {
                    info!(
                        "per: {} ok, {} wrong, {} timeout",
                        self.results.count_rx_correct_packet,
                        self.results.count_rx_wrong_packet,
                        self.results.count_rx_timeout
                    );
                    self.state = PerState::Terminated;
                    return Ok(Progress::Done);
                }
                self.state = PerState::Receive;
                Ok(Progress::Continue)
            }
            PerState::Terminated => Ok(Progress::Done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::DemoInterrupt;
    use crate::demo::{DemoResults, DemoStatus, DemoType};
    use crate::mock::{DemoBench, MockEnvironment, MockRadio, RadioCall};
    use crate::radio::{GfskModParams, LoraBandwidth, LoraModParams, LoraSf, PacketType};
    use crate::system::RegMode;
    use embassy_futures::block_on;

    fn sf12_settings(payload_length: u8) -> DemoRadioSettings {
        DemoRadioSettings {
            modulation_lora: LoraModParams {
                sf: LoraSf::Sf12,
                bw: LoraBandwidth::Bw125,
                ..LoraModParams::default()
            },
            payload_length,
            ..DemoRadioSettings::default()
        }
    }

    fn per_results(bench: &DemoBench) -> PerResults {
        match bench.demo.results() {
            DemoResults::Per(results) => *results,
            _ => panic!("expected PER results"),
        }
    }

    fn run(demo: &mut PerDemo, radio: &mut MockRadio, irqs: &[IrqMask]) -> Progress {
        let env = MockEnvironment::new();
        let irq = DemoInterrupt::new();
        let mut ctx = DemoContext::new(radio, &env, &irq, RegMode::Dcdc);
        let mut irqs = irqs.iter();
        loop {
            match block_on(demo.step(&mut ctx)).unwrap() {
                Progress::Done => return Progress::Done,
                Progress::Continue => {}
                progress @ (Progress::WaitForInterrupt(_) | Progress::KeepWaiting) => match irqs.next() {
                    Some(irq) => demo.irq_status = *irq,
                    None => return progress,
                },
            }
        }
    }

    #[test]
    fn test_tx_sends_nb_of_packets() {
        let mut radio = MockRadio::new();
        let mut demo = PerDemo::new(PerMode::Tx);
        demo.settings.nb_of_packets = 3;
        demo.settings.payload_length = 4;

        let progress = run(&mut demo, &mut radio, &[IRQ_TX_DONE; 3]);
        assert_eq!(progress, Progress::Done);
        assert_eq!(demo.results().count_tx, 3);
        assert!(demo.intermediate);
        assert!(radio.calls.contains(&RadioCall::SetDioIrqParams(RADIO_TEST_IRQ_MASK)));
        assert!(radio.calls.contains(&RadioCall::WriteBuffer(std::vec![0, 1, 2, 3])));
        let sent = radio.calls.iter().filter(|call| **call == RadioCall::SetTx(0)).count();
        assert_eq!(sent, 3);
    }

    #[test]
    fn test_rx_classifies_windows() {
        let mut radio = MockRadio::new();
        radio.rx_payload = std::vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9];
        radio.packet_status.rssi_pkt_dbm = -42;
        let mut demo = PerDemo::new(PerMode::Rx);
        demo.settings.nb_of_packets = 4;

        let progress = run(
            &mut demo,
            &mut radio,
            &[IRQ_RX_DONE, IRQ_TIMEOUT, IRQ_RX_DONE | IRQ_CRC_ERROR, IRQ_RX_DONE],
        );
        assert_eq!(progress, Progress::Done);
        let results = demo.results();
        assert_eq!(results.count_rx_correct_packet, 2);
        assert_eq!(results.count_rx_timeout, 1);
        assert_eq!(results.count_rx_wrong_packet, 1);
        assert_eq!(results.last_rssi_dbm, -42);
        assert!(radio.calls.contains(&RadioCall::SetRx(ms_to_rtc_steps(1000))));
    }

    #[test]
    fn test_rx_corrupted_payload_is_wrong() {
        let mut radio = MockRadio::new();
        radio.rx_payload = std::vec![0, 1, 2, 0xFF, 4, 5, 6, 7, 8, 9];
        let mut demo = PerDemo::new(PerMode::Rx);
        demo.settings.nb_of_packets = 1;

        run(&mut demo, &mut radio, &[IRQ_RX_DONE]);
        assert_eq!(demo.results().count_rx_wrong_packet, 1);
        assert_eq!(demo.results().count_rx_correct_packet, 0);
    }

    #[test]
    fn test_unrelated_irq_keeps_waiting() {
        let mut radio = MockRadio::new();
        let mut demo = PerDemo::new(PerMode::Tx);

        let progress = run(&mut demo, &mut radio, &[crate::system::IRQ_PREAMBLE_DETECTED]);
        assert_eq!(progress, Progress::KeepWaiting);
        assert_eq!(demo.state(), PerState::WaitTx);
        assert_eq!(demo.results().count_tx, 0);
    }

    #[test]
    fn test_tx_and_rx_bounds_differ() {
        let mut radio = MockRadio::new();
        let mut tx = PerDemo::new(PerMode::Tx);
        tx.settings = sf12_settings(255);
        // 275.25 symbols of 32.768 ms plus margin
        assert_eq!(
            run(&mut tx, &mut radio, &[]),
            Progress::WaitForInterrupt(Some(Duration::from_micros(9_019_392 + 500_000)))
        );

        let mut rx = PerDemo::new(PerMode::Rx);
        rx.settings = sf12_settings(255);
        assert_eq!(
            run(&mut rx, &mut radio, &[]),
            Progress::WaitForInterrupt(Some(Duration::from_millis(1_500)))
        );
    }

    #[test]
    fn test_long_packet_outlives_rx_window() {
        let mut bench = DemoBench::start(DemoType::RadioPerTx, sf12_settings(255));
        for _ in 0..4 {
            assert_eq!(bench.runtime(), DemoStatus::Running);
        }
        assert!(bench.demo.is_waiting_for_interrupt());

        bench.env.advance(Duration::from_secs(2));
        assert_eq!(bench.runtime(), DemoStatus::Running);
        assert_eq!(per_results(&bench).count_tx, 0);

        bench.env.advance(Duration::from_secs(7));
        assert_eq!(bench.interrupt(IRQ_TX_DONE), DemoStatus::Running);
        assert_eq!(per_results(&bench).count_tx, 1);
        assert_eq!(bench.sent(), 1);
    }

    #[test]
    fn test_tx_deadline_terminates() {
        let settings = DemoRadioSettings {
            pkt_type: PacketType::Gfsk,
            modulation_gfsk: GfskModParams {
                bitrate_bps: 1_200,
                ..GfskModParams::default()
            },
            payload_length: 255,
            ..DemoRadioSettings::default()
        };
        let mut bench = DemoBench::start(DemoType::RadioPerTx, settings);
        bench.run_until_waiting();

        // 2136 bits at 1.2 kbit/s plus margin
        bench.env.advance(Duration::from_millis(2_279));
        assert_eq!(bench.runtime(), DemoStatus::Running);

        bench.env.advance(Duration::from_millis(1));
        assert_eq!(bench.runtime(), DemoStatus::Terminated);
        assert_eq!(per_results(&bench).count_tx, 0);
        assert!(!bench.demo.is_started());
    }

    #[test]
    fn test_stray_irq_keeps_rx_deadline() {
        let mut bench = DemoBench::start(DemoType::RadioPerRx, sf12_settings(32));
        bench.run_until_waiting();

        bench.env.advance(Duration::from_millis(750));
        assert_eq!(bench.interrupt(crate::system::IRQ_PREAMBLE_DETECTED), DemoStatus::Running);
        assert!(bench.demo.is_waiting_for_interrupt());

        bench.env.advance(Duration::from_millis(749));
        assert_eq!(bench.runtime(), DemoStatus::Running);
        bench.env.advance(Duration::from_millis(1));
        assert_eq!(bench.runtime(), DemoStatus::Terminated);
    }
}
