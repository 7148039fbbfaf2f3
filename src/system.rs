//! System-level chip control used by the demos
//!
//! Reset, regulator, calibration, standby and IRQ routing for the LR1110.
//! The demo framework only talks to the chip through this trait (and its
//! Wi-Fi, GNSS and radio siblings); the board crate binds it to the actual
//! SPI driver.
//!
//! # Example
//!
//! ```ignore
//! use lr1110_demo::system::{SystemExt, IRQ_WIFI_SCAN_DONE};
//!
//! radio.set_dio_irq_params(IRQ_WIFI_SCAN_DONE).await?;
//! // ... DIO1 fires ...
//! let irq = radio.get_and_clear_irq_status().await?;
//! if irq & IRQ_WIFI_SCAN_DONE != 0 {
//!     // results are ready
//! }
//! ```

use lora_phy::mod_params::RadioError;

/// Length of the LR1110 unique identifier in bytes
pub const LR11XX_SYSTEM_UID_LENGTH: usize = 8;

/// Chip unique identifier
pub type ChipUid = [u8; LR11XX_SYSTEM_UID_LENGTH];

// =============================================================================
// IRQ masks
// =============================================================================

/// IRQ mask type (bit field, see LR1110 user manual)
pub type IrqMask = u32;

pub const IRQ_NONE: IrqMask = 0;
pub const IRQ_TX_DONE: IrqMask = 1 << 2;
pub const IRQ_RX_DONE: IrqMask = 1 << 3;
pub const IRQ_PREAMBLE_DETECTED: IrqMask = 1 << 4;
pub const IRQ_SYNC_WORD_HEADER_VALID: IrqMask = 1 << 5;
pub const IRQ_HEADER_ERROR: IrqMask = 1 << 6;
pub const IRQ_CRC_ERROR: IrqMask = 1 << 7;
pub const IRQ_TIMEOUT: IrqMask = 1 << 10;
pub const IRQ_GNSS_SCAN_DONE: IrqMask = 1 << 19;
pub const IRQ_WIFI_SCAN_DONE: IrqMask = 1 << 20;
pub const IRQ_CMD_ERROR: IrqMask = 1 << 22;
pub const IRQ_ERROR: IrqMask = 1 << 23;
pub const IRQ_ALL: IrqMask = 0x0FFF_FFFF;

// =============================================================================
// Chip configuration types
// =============================================================================

/// Power regulator mode
///
/// Drives the per-phase current model used for consumption estimates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum RegMode {
    /// Linear regulator
    Ldo = 0x00,
    /// DC-DC converter
    Dcdc = 0x01,
}

/// Standby oscillator configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum StandbyConfig {
    /// RC oscillator (13 MHz)
    Rc = 0x00,
    /// Crystal oscillator (32 MHz)
    Xosc = 0x01,
}

/// Calibration parameter (bitmask of calibration blocks)
pub type CalibrationParam = u8;

pub const CALIB_LF_RC_MASK: CalibrationParam = 0x01;
pub const CALIB_HF_RC_MASK: CalibrationParam = 0x02;
pub const CALIB_PLL_MASK: CalibrationParam = 0x04;
pub const CALIB_ADC_MASK: CalibrationParam = 0x08;
pub const CALIB_IMG_MASK: CalibrationParam = 0x10;
pub const CALIB_PLL_TX_MASK: CalibrationParam = 0x20;
pub const CALIB_ALL: CalibrationParam = 0x3F;

/// Chip bring-up parameters applied after every reset
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChipConfig {
    /// Regulator the board is wired for
    pub reg_mode: RegMode,
    /// Blocks to calibrate after reset
    pub calibration: CalibrationParam,
    /// Oscillator kept running in standby
    pub standby: StandbyConfig,
}

impl Default for ChipConfig {
    fn default() -> Self {
        Self {
            reg_mode: RegMode::Dcdc,
            calibration: CALIB_ALL,
            standby: StandbyConfig::Rc,
        }
    }
}

// =============================================================================
// Version info
// =============================================================================

/// LR11xx chip type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ChipType {
    LR1110 = 0x01,
    LR1120 = 0x02,
    LR1121 = 0x03,
    Unknown = 0xFF,
}

impl From<u8> for ChipType {
    fn from(value: u8) -> Self {
        match value {
            0x01 => ChipType::LR1110,
            0x02 => ChipType::LR1120,
            0x03 => ChipType::LR1121,
            _ => ChipType::Unknown,
        }
    }
}

/// Chip version as reported by `GetVersion`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Version {
    pub hw: u8,
    pub chip_type: ChipType,
    pub fw: u16,
}

impl Default for Version {
    fn default() -> Self {
        Self {
            hw: 0,
            chip_type: ChipType::Unknown,
            fw: 0,
        }
    }
}

// =============================================================================
// System Extension Trait
// =============================================================================

/// System commands needed by the demo framework.
#[allow(async_fn_in_trait)]
pub trait SystemExt {
    /// Pulse the reset line and wait for the chip to come back up
    async fn system_reset(&mut self) -> Result<(), RadioError>;

    /// Select LDO or DC-DC regulation
    async fn set_reg_mode(&mut self, mode: RegMode) -> Result<(), RadioError>;

    /// Run the calibration of the given blocks
    async fn calibrate(&mut self, param: CalibrationParam) -> Result<(), RadioError>;

    /// Enter standby
    async fn set_standby(&mut self, cfg: StandbyConfig) -> Result<(), RadioError>;

    /// Read hardware/firmware version
    async fn get_version(&mut self) -> Result<Version, RadioError>;

    /// Read the factory unique identifier
    async fn read_uid(&mut self) -> Result<ChipUid, RadioError>;

    /// Route the given IRQ sources to DIO1
    async fn set_dio_irq_params(&mut self, irq_mask: IrqMask) -> Result<(), RadioError>;

    /// Clear the given IRQ sources
    async fn clear_irq_status(&mut self, irqs: IrqMask) -> Result<(), RadioError>;

    /// Read the IRQ status and clear every raised source
    async fn get_and_clear_irq_status(&mut self) -> Result<IrqMask, RadioError>;
}

/// Reset the chip and bring it back to a known standby state.
///
/// No IRQ source is routed to DIO1 afterwards; each demo arms its own.
pub async fn reset_and_init<R: SystemExt>(radio: &mut R, config: &ChipConfig) -> Result<(), RadioError> {
    radio.system_reset().await?;
    radio.set_reg_mode(config.reg_mode).await?;
    radio.calibrate(config.calibration).await?;
    radio.set_standby(config.standby).await?;
    radio.set_dio_irq_params(IRQ_NONE).await?;
    radio.clear_irq_status(IRQ_ALL).await
}

// =============================================================================
// LR1110 binding
// =============================================================================

#[cfg(any(feature = "lr1110", test))]
#[derive(Clone, Copy)]
#[allow(dead_code)]
enum SystemOpCode {
    GetStatus = 0x0100,
    GetVersion = 0x0101,
    Calibrate = 0x010F,
    SetRegMode = 0x0110,
    SetDioIrqParams = 0x0113,
    ClearIrq = 0x0114,
    Reboot = 0x0118,
    SetStandby = 0x011C,
    ReadUid = 0x0125,
}

#[cfg(any(feature = "lr1110", test))]
impl SystemOpCode {
    fn bytes(self) -> [u8; 2] {
        let val = self as u16;
        [(val >> 8) as u8, (val & 0xFF) as u8]
    }
}

/// Opcode followed by a big-endian IRQ mask
#[cfg(any(feature = "lr1110", test))]
fn irq_mask_cmd(opcode: SystemOpCode, irqs: IrqMask) -> [u8; 6] {
    let op = opcode.bytes();
    let mask = irqs.to_be_bytes();
    [op[0], op[1], mask[0], mask[1], mask[2], mask[3]]
}

/// DIO1 gets `irq_mask`, DIO2 nothing
#[cfg(any(feature = "lr1110", test))]
fn set_dio_irq_params_cmd(irq_mask: IrqMask) -> [u8; 10] {
    let mut cmd = [0u8; 10];
    cmd[..6].copy_from_slice(&irq_mask_cmd(SystemOpCode::SetDioIrqParams, irq_mask));
    cmd
}

#[cfg(any(feature = "lr1110", test))]
fn parse_version(rbuffer: &[u8; 4]) -> Version {
    Version {
        hw: rbuffer[0],
        chip_type: ChipType::from(rbuffer[1]),
        fw: u16::from_be_bytes([rbuffer[2], rbuffer[3]]),
    }
}

/// IRQ field of a `GetStatus` response (stat1, stat2, irq[4])
#[cfg(any(feature = "lr1110", test))]
fn parse_irq_status(rbuffer: &[u8; 6]) -> IrqMask {
    u32::from_be_bytes([rbuffer[2], rbuffer[3], rbuffer[4], rbuffer[5]])
}

#[cfg(feature = "lr1110")]
impl<SPI, IV, C> SystemExt for lora_phy::lr1110::Lr1110<SPI, IV, C>
where
    SPI: embedded_hal_async::spi::SpiDevice<u8>,
    IV: lora_phy::mod_traits::InterfaceVariant,
    C: lora_phy::lr1110::variant::Lr1110Variant,
{
    async fn system_reset(&mut self) -> Result<(), RadioError> {
        let opcode = SystemOpCode::Reboot.bytes();
        // Reboot into the application, not the bootloader
        let cmd = [opcode[0], opcode[1], 0x00];
        self.execute_command(&cmd).await
    }

    async fn set_reg_mode(&mut self, mode: RegMode) -> Result<(), RadioError> {
        let opcode = SystemOpCode::SetRegMode.bytes();
        let cmd = [opcode[0], opcode[1], mode as u8];
        self.execute_command(&cmd).await
    }

    async fn calibrate(&mut self, param: CalibrationParam) -> Result<(), RadioError> {
        let opcode = SystemOpCode::Calibrate.bytes();
        let cmd = [opcode[0], opcode[1], param];
        self.execute_command(&cmd).await
    }

    async fn set_standby(&mut self, cfg: StandbyConfig) -> Result<(), RadioError> {
        let opcode = SystemOpCode::SetStandby.bytes();
        let cmd = [opcode[0], opcode[1], cfg as u8];
        self.execute_command(&cmd).await
    }

    async fn get_version(&mut self) -> Result<Version, RadioError> {
        let opcode = SystemOpCode::GetVersion.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 4];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(parse_version(&rbuffer))
    }

    async fn read_uid(&mut self) -> Result<ChipUid, RadioError> {
        let opcode = SystemOpCode::ReadUid.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; LR11XX_SYSTEM_UID_LENGTH];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;
        Ok(rbuffer)
    }

    async fn set_dio_irq_params(&mut self, irq_mask: IrqMask) -> Result<(), RadioError> {
        self.execute_command(&set_dio_irq_params_cmd(irq_mask)).await
    }

    async fn clear_irq_status(&mut self, irqs: IrqMask) -> Result<(), RadioError> {
        self.execute_command(&irq_mask_cmd(SystemOpCode::ClearIrq, irqs)).await
    }

    async fn get_and_clear_irq_status(&mut self) -> Result<IrqMask, RadioError> {
        let opcode = SystemOpCode::GetStatus.bytes();
        let cmd = [opcode[0], opcode[1]];
        let mut rbuffer = [0u8; 6];
        self.execute_command_with_response(&cmd, &mut rbuffer).await?;

        let irq_status = parse_irq_status(&rbuffer);
        if irq_status != IRQ_NONE {
            self.clear_irq_status(irq_status).await?;
        }
        Ok(irq_status)
    }
}
