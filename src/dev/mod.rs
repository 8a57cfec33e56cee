//! The device module contains the internals for each of the supported multiplexers.
//!
//! In most cases you will not need anything from here explicitly, the exposed types at the root of
//! the crate should be enough.

pub mod tca9546a;
pub mod tca9548a;

pub use crate::driver::Driver;
