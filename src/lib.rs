//! Demonstration firmware core for the Semtech LR1110
//!
//! This crate drives the Wi-Fi scan, GNSS scan and radio test demos of an
//! LR1110 evaluation board. It holds no hardware driver: the board crate
//! implements the chip extension traits over its SPI link and plugs in the
//! GUI, the host command interface and the log transport.
//!
//! # Features
//!
//! - **Supervisor**: cooperative main loop, host detection, result routing
//! - **Demos**: Wi-Fi scan, Wi-Fi country code, GNSS autonomous/assisted,
//!   TX continuous wave, PER TX/RX, ping-pong
//! - **Almanac**: age check, per-satellite dates, chunked update
//! - **HCI**: host commands to configure, run and fetch demos
//!
//! # Usage
//!
//! ```ignore
//! use lr1110_demo::interrupt::Interrupts;
//! use lr1110_demo::supervisor::{Supervisor, SupervisorConfig};
//!
//! static IRQS: Interrupts = Interrupts::new();
//!
//! // DIO1 handler
//! IRQS.on_demo_irq();
//!
//! let mut supervisor = Supervisor::new(radio, gui, hci, log, rtc, &IRQS, SupervisorConfig::default());
//! supervisor.init().await;
//! loop {
//!     supervisor.runtime().await;
//! }
//! ```

#![no_std]
#![allow(async_fn_in_trait)]

#[cfg(test)]
extern crate std;

// This must go FIRST so that all the other modules see its macros.
#[macro_use]
mod fmt;

pub use lora_phy::mod_params::RadioError;

// =============================================================================
// Chip access
// =============================================================================

pub mod almanac;
pub mod gnss;
pub mod radio;
pub mod system;
pub mod wifi;

// =============================================================================
// Demo framework
// =============================================================================

pub mod demo;
pub mod environment;
pub mod interrupt;
pub mod settings;
pub mod supervisor;

// =============================================================================
// Collaborators
// =============================================================================

pub mod gui;
pub mod hci;
pub mod logging;

#[cfg(test)]
mod mock;

pub use gnss::GnssExt;
pub use radio::RadioControlExt;
pub use system::SystemExt;
pub use wifi::WifiExt;

/// Everything the demos need from the chip
pub trait DemoRadio: SystemExt + WifiExt + GnssExt + RadioControlExt {}

impl<T> DemoRadio for T where T: SystemExt + WifiExt + GnssExt + RadioControlExt {}
