//! I2C bus multiplexers and step/direction stepper motors on top of `embedded-hal`.
//!
//! **Multiplexers**: a [`Tca9548a`] or [`Tca9546a`] hands out one [`VirtualBus`] per downstream
//! channel.  Each of them implements [`embedded_hal::i2c::I2c`], so device drivers can be used
//! behind the switch as if they had the bus to themselves.  All channels of one chip share a
//! single lock; the channel is routed inside that lock right before each transaction and the
//! select write is skipped when the channel is routed already.
//!
//! **Steppers**: a [`Stepper`] issues timed pulses on a STEP line with a linear soft-start ramp
//! and keeps track of the shaft angle.  Motions can be stopped from another thread or cancelled
//! through any [`Cancel`] token.
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

#[macro_use]
mod fmt;

mod bus;
mod delay;
pub mod dev;
mod driver;
mod error;
mod mutex;
mod mux;
mod pin;
pub mod stepper;
mod virtual_bus;

pub use bus::I2cBus;
pub use delay::{SpinDelay, FALLBACK_LOOPS_PER_US};
pub use error::{Conflict, MuxError, StepperError};
pub use mutex::{BusMutex, LockTimeout};
pub use mux::{Multiplexer, DEFAULT_TIMEOUT};
pub use pin::NoPin;
pub use stepper::{Cancel, Direction, Stepper, StepperConfig, Steps};
pub use virtual_bus::VirtualBus;

pub(crate) use bus::I2cExt;
pub(crate) use driver::Driver;

pub use dev::tca9546a::Tca9546a;
pub use dev::tca9548a::Tca9548a;
