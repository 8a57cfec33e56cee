//! Cooperative cancellation of a running motion.
//!
//! The pulse loop polls its token once per pulse, before starting the pulse.  A pulse that has
//! begun is always completed.

use core::sync::atomic::{AtomicBool, Ordering};

/// Source of a cancellation request.
pub trait Cancel {
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.  The motion ends when its pulses are done or on [`Stepper::stop`].
///
/// [`Stepper::stop`]: crate::Stepper::stop
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl Cancel for Never {
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl Cancel for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

impl<T: Cancel + ?Sized> Cancel for &T {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Cancelled as soon as either token is.
#[derive(Debug, Clone, Copy)]
pub struct Either<A, B>(pub A, pub B);

impl<A: Cancel, B: Cancel> Cancel for Either<A, B> {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled() || self.1.is_cancelled()
    }
}

/// Cancelled once a point in time has passed.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy)]
pub struct Deadline(pub std::time::Instant);

#[cfg(any(test, feature = "std"))]
impl Deadline {
    pub fn after(duration: core::time::Duration) -> Self {
        Self(std::time::Instant::now() + duration)
    }
}

#[cfg(any(test, feature = "std"))]
impl Cancel for Deadline {
    fn is_cancelled(&self) -> bool {
        std::time::Instant::now() >= self.0
    }
}

#[cfg(any(test, feature = "std"))]
impl<T: Cancel + ?Sized> Cancel for std::sync::Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}
