//! Logging shims
//!
//! Forward to `defmt` when the `defmt-03` feature is enabled and expand to
//! nothing otherwise, so the crate builds for hosts without a global logger.

#![allow(unused_macros)]

#[cfg(feature = "defmt-03")]
macro_rules! trace {
    ($($arg:tt)*) => { ::defmt::trace!($($arg)*) };
}

#[cfg(feature = "defmt-03")]
macro_rules! debug {
    ($($arg:tt)*) => { ::defmt::debug!($($arg)*) };
}

#[cfg(feature = "defmt-03")]
macro_rules! info {
    ($($arg:tt)*) => { ::defmt::info!($($arg)*) };
}

#[cfg(feature = "defmt-03")]
macro_rules! warn {
    ($($arg:tt)*) => { ::defmt::warn!($($arg)*) };
}

#[cfg(feature = "defmt-03")]
macro_rules! error {
    ($($arg:tt)*) => { ::defmt::error!($($arg)*) };
}

// Stub macros when defmt is not available. Arguments are still evaluated by
// reference so call sites do not trip unused-variable lints.
#[cfg(not(feature = "defmt-03"))]
macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
}

#[cfg(not(feature = "defmt-03"))]
macro_rules! error {
    ($s:literal $(, $x:expr)* $(,)?) => {{ $( let _ = &$x; )* }};
}
