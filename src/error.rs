//! Error types.
//!
//! Both error types are allocation-free so they work in `no_std` environments.
use core::fmt;

/// Errors from a transaction on a multiplexed [`VirtualBus`][crate::VirtualBus].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxError<E> {
    /// The selector lock was not acquired in time.  Nothing was sent on the bus.
    Timeout,
    /// The upstream bus failed, either during channel selection or the transaction itself.
    Bus(E),
    /// The control register did not read back the routing that was just written.
    SelectMismatch {
        /// Routing mask that was written
        expected: u8,
        /// Routing mask that was read back
        actual: u8,
    },
    /// The multiplexer has no channel with this index.
    InvalidChannel(u8),
}

impl<E> From<crate::LockTimeout> for MuxError<E> {
    fn from(_: crate::LockTimeout) -> Self {
        MuxError::Timeout
    }
}

impl<E: fmt::Debug> fmt::Display for MuxError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for the multiplexer"),
            Self::Bus(e) => write!(f, "bus error: {e:?}"),
            Self::SelectMismatch { expected, actual } => write!(
                f,
                "channel select not applied: wrote {expected:#010b}, read back {actual:#010b}"
            ),
            Self::InvalidChannel(ch) => write!(f, "no such channel: {ch}"),
        }
    }
}

#[cfg(feature = "defmt")]
impl<E: defmt::Format> defmt::Format for MuxError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(f, "Timeout"),
            Self::Bus(e) => defmt::write!(f, "Bus({})", e),
            Self::SelectMismatch { expected, actual } => {
                defmt::write!(f, "SelectMismatch({=u8:#b} != {=u8:#b})", expected, actual)
            }
            Self::InvalidChannel(ch) => defmt::write!(f, "InvalidChannel({=u8})", ch),
        }
    }
}

impl<E: embedded_hal::i2c::Error> embedded_hal::i2c::Error for MuxError<E> {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        match self {
            Self::Bus(e) => e.kind(),
            _ => embedded_hal::i2c::ErrorKind::Other,
        }
    }
}

/// Why a motion request conflicts with the motor's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Conflict {
    /// A motion is already running.
    Moving,
}

/// Errors from the [`Stepper`][crate::Stepper] motion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// The requested pulse rate is not achievable.  No pin was touched.
    OutOfRange,
    /// The request conflicts with the motor's current state.
    InvalidOperation(Conflict),
    /// The pins could not be locked in time.
    Timeout,
    /// Driving one of the output pins failed.
    Pin(embedded_hal::digital::ErrorKind),
}

impl From<crate::LockTimeout> for StepperError {
    fn from(_: crate::LockTimeout) -> Self {
        StepperError::Timeout
    }
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "pulse rate out of range"),
            Self::InvalidOperation(Conflict::Moving) => {
                write!(f, "invalid operation: motor is moving")
            }
            Self::Timeout => write!(f, "timed out waiting for the motor"),
            Self::Pin(kind) => write!(f, "output pin error: {kind}"),
        }
    }
}

#[cfg(any(test, feature = "std"))]
impl<E: fmt::Debug> std::error::Error for MuxError<E> {}

#[cfg(any(test, feature = "std"))]
impl std::error::Error for StepperError {}
