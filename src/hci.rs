//! Host command interface
//!
//! The HCI decodes command frames coming from a field-test host. Framing and
//! transport belong to the board crate; it hands complete [`HostCommand`]s to
//! the supervisor, which executes them, answers with a [`CommandResponse`]
//! and turns them into a [`CommandEvent`] for the demo container.

use heapless::Vec;

use crate::almanac::SatelliteAlmanacDate;
use crate::demo::{DemoResults, DemoType};
use crate::environment::Location;
use crate::gnss::GnssDate;
use crate::settings::{DemoGnssSettings, DemoRadioSettings, DemoWifiSettings};
use crate::supervisor::VersionInfo;

/// Largest almanac chunk carried by one `UpdateAlmanac` command
pub const ALMANAC_CHUNK_MAX_SIZE: usize = 240;

/// New settings for one demo
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum HostDemoSettings {
    Wifi(DemoWifiSettings),
    GnssAutonomous(DemoGnssSettings),
    GnssAssisted(DemoGnssSettings),
    Radio(DemoRadioSettings),
}

/// Demo configuration pushed by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct HostDemoConfiguration {
    pub demo_type: DemoType,
    /// Whether `Start` may select this demo
    pub enabled: bool,
    pub settings: Option<HostDemoSettings>,
}

/// Decoded host command
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum HostCommand {
    GetVersion,
    GetAlmanacDates,
    Configure(HostDemoConfiguration),
    /// Start the next enabled demo
    Start,
    Stop,
    FetchResult,
    SetDateLoc { date: GnssDate, location: Location },
    /// Stop the demo, reset the chip and every demo
    Reset,
    UpdateAlmanac(Vec<u8, ALMANAC_CHUNK_MAX_SIZE>),
    CheckAlmanacUpdate { expected_crc: u32 },
}

/// Action requested from the demo container after a command
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CommandEvent {
    NoEvent,
    StartDemo,
    StopDemo,
    ResetDemo,
}

/// Reason a command was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum CommandError {
    InvalidDemoType,
    InvalidAlmanacChunk,
    /// The chip did not answer
    Radio,
}

/// Answer to a host command
#[derive(Debug)]
pub enum CommandResponse<'a> {
    Ok,
    Error(CommandError),
    Version(&'a VersionInfo),
    AlmanacDates(&'a [SatelliteAlmanacDate]),
    Results {
        demo_type: DemoType,
        results: DemoResults<'a>,
    },
    AlmanacCrcMatch(bool),
}

/// Host command link.
pub trait Hci {
    /// Process received bytes
    fn runtime(&mut self);

    fn has_new_command(&self) -> bool;

    /// Take the next complete command
    fn fetch_command(&mut self) -> Option<HostCommand>;

    fn send_response(&mut self, response: CommandResponse<'_>);

    /// Tell the host that a result is ready
    fn event_notify(&mut self);

    fn start(&mut self);

    fn stop(&mut self);
}
