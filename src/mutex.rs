use core::time::Duration;

/// The lock could not be acquired within the allotted time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockTimeout;

/// Common interface for mutex implementations.
///
/// `mux-motion` needs a mutex to make sure only a single handle accesses a shared resource at
/// the same time: all [`VirtualBus`][crate::VirtualBus] handles of one multiplexer go through
/// the same lock, and a [`Stepper`][crate::Stepper] holds its pins behind one while a motion
/// runs.  This trait is already implemented for a number of existing mutex types.  Some are
/// guarded by a feature that needs to be enabled:
///
/// | Mutex | Feature Name | Notes |
/// | --- | --- | --- |
/// | [`core::cell::RefCell`] | _always available_ | For sharing within a single execution context. |
/// | [`std::sync::Mutex`][mutex-std] | `std` | For platforms where `std` is available. |
/// | [`critical_section::Mutex`][mutex-cs] | `critical-section` | Wrapping a `RefCell`. |
///
/// [mutex-std]: https://doc.rust-lang.org/std/sync/struct.Mutex.html
/// [mutex-cs]: https://docs.rs/critical-section/latest/critical_section/struct.Mutex.html
///
/// For other mutex types, a custom implementation is needed.  Due to the orphan rule, it might be
/// necessary to wrap it in a newtype.  As an example, this is what such a custom implementation
/// might look like:
///
/// ```
/// use core::time::Duration;
/// use mux_motion::{BusMutex, LockTimeout};
///
/// struct MyMutex<T>(std::sync::Mutex<T>);
///
/// impl<T> BusMutex for MyMutex<T> {
///     type Bus = T;
///
///     fn create(v: T) -> Self {
///         Self(std::sync::Mutex::new(v))
///     }
///
///     fn get_mut(&mut self) -> &mut T {
///         self.0.get_mut().unwrap()
///     }
///
///     fn into_inner(self) -> T {
///         self.0.into_inner().unwrap()
///     }
///
///     fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(
///         &self,
///         _timeout: Duration,
///         f: F,
///     ) -> Result<R, LockTimeout> {
///         let mut v = self.0.lock().map_err(|_| LockTimeout)?;
///         Ok(f(&mut v))
///     }
/// }
/// ```
pub trait BusMutex {
    /// The resource that is wrapped inside this mutex.
    type Bus;

    /// Create a new mutex of this type.
    fn create(v: Self::Bus) -> Self;

    /// Access the resource through an exclusive reference, no locking needed.
    fn get_mut(&mut self) -> &mut Self::Bus;

    /// Take the resource back out of the mutex.
    fn into_inner(self) -> Self::Bus;

    /// Lock the mutex and give a closure access to the resource inside.
    ///
    /// Blocks for at most `timeout` waiting for other holders.  The lock is released as soon as
    /// `f` returns, on every path.
    fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(
        &self,
        timeout: Duration,
        f: F,
    ) -> Result<R, LockTimeout>;
}

/// Single execution context: the only way to find the `RefCell` borrowed is re-entrant use,
/// which waiting would never resolve.  Reported as a timeout right away.
impl<T> BusMutex for core::cell::RefCell<T> {
    type Bus = T;

    fn create(v: Self::Bus) -> Self {
        core::cell::RefCell::new(v)
    }

    fn get_mut(&mut self) -> &mut Self::Bus {
        core::cell::RefCell::get_mut(self)
    }

    fn into_inner(self) -> Self::Bus {
        core::cell::RefCell::into_inner(self)
    }

    fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(
        &self,
        _timeout: Duration,
        f: F,
    ) -> Result<R, LockTimeout> {
        let mut v = self.try_borrow_mut().map_err(|_| LockTimeout)?;
        Ok(f(&mut v))
    }
}

#[cfg(any(test, feature = "std"))]
impl<T> BusMutex for std::sync::Mutex<T> {
    type Bus = T;

    fn create(v: Self::Bus) -> Self {
        std::sync::Mutex::new(v)
    }

    fn get_mut(&mut self) -> &mut Self::Bus {
        std::sync::Mutex::get_mut(self).unwrap_or_else(|p| p.into_inner())
    }

    fn into_inner(self) -> Self::Bus {
        std::sync::Mutex::into_inner(self).unwrap_or_else(|p| p.into_inner())
    }

    fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(
        &self,
        timeout: Duration,
        f: F,
    ) -> Result<R, LockTimeout> {
        use std::sync::TryLockError;

        // `None` means the deadline is beyond what `Instant` can represent: wait forever.
        let deadline = std::time::Instant::now().checked_add(timeout);
        loop {
            match self.try_lock() {
                Ok(mut v) => return Ok(f(&mut v)),
                // The guarded value is plain hardware state, a panicking holder does not make
                // it unusable.
                Err(TryLockError::Poisoned(p)) => return Ok(f(&mut p.into_inner())),
                Err(TryLockError::WouldBlock) => {}
            }
            if deadline.is_some_and(|d| std::time::Instant::now() >= d) {
                return Err(LockTimeout);
            }
            std::thread::yield_now();
        }
    }
}

#[cfg(feature = "critical-section")]
impl<T> BusMutex for critical_section::Mutex<core::cell::RefCell<T>> {
    type Bus = T;

    fn create(v: Self::Bus) -> Self {
        critical_section::Mutex::new(core::cell::RefCell::new(v))
    }

    fn get_mut(&mut self) -> &mut Self::Bus {
        critical_section::Mutex::get_mut(self).get_mut()
    }

    fn into_inner(self) -> Self::Bus {
        critical_section::Mutex::into_inner(self).into_inner()
    }

    fn lock<R, F: FnOnce(&mut Self::Bus) -> R>(
        &self,
        _timeout: Duration,
        f: F,
    ) -> Result<R, LockTimeout> {
        critical_section::with(|cs| {
            let mut v = self.borrow(cs).try_borrow_mut().map_err(|_| LockTimeout)?;
            Ok(f(&mut v))
        })
    }
}
