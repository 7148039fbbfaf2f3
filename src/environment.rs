//! Time and position source of the board
//!
//! The GNSS demos need the current GNSS date and, for assisted scans, an
//! approximate position. Both are pushed by the host (`SetDateLoc`) or kept
//! by the board RTC; the demos only read them.

use embassy_time::Instant;

use crate::gnss::GnssDate;

/// Approximate position of the device
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Location {
    pub latitude: f32,
    pub longitude: f32,
    pub altitude: f32,
}

/// Clock and assistance data provider.
pub trait Environment {
    /// Monotonic local time
    fn now(&self) -> Instant;

    /// Current GNSS date, if known
    fn gnss_date(&self) -> Option<GnssDate>;

    /// Assistance position, if known
    fn location(&self) -> Option<Location>;

    fn set_gnss_date(&mut self, date: GnssDate);

    fn set_location(&mut self, location: Location);
}
