//! Busy-wait delay for targets without a timer fine enough for step pulses.
//!
//! The cost of one spin iteration differs between CPUs and clock settings, so it is either
//! given up front or measured once at startup.  Prefer a hardware timer's `DelayNs` where the
//! HAL offers one.
use embedded_hal::delay::DelayNs;

#[cfg(any(test, feature = "std"))]
use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(any(test, feature = "std"))]
use std::sync::Arc;

/// Iteration rate used when calibration fails.  High, so delays err on the long side.
pub const FALLBACK_LOOPS_PER_US: u32 = 1_000;

#[derive(Debug, Clone)]
enum Calibration {
    Fixed(u32),
    /// Published by the calibration thread; `0` until it is done.
    #[cfg(any(test, feature = "std"))]
    Shared(Arc<AtomicU32>),
}

/// [`DelayNs`] by counting spin-loop iterations.
///
/// Clones share one calibration.
#[derive(Debug, Clone)]
pub struct SpinDelay {
    calibration: Calibration,
}

impl SpinDelay {
    /// Use a known iteration rate.  `0` is treated as `1`.
    pub fn from_loops_per_us(loops_per_us: u32) -> Self {
        Self {
            calibration: Calibration::Fixed(loops_per_us.max(1)),
        }
    }

    /// Measure the iteration rate now, blocking for a few milliseconds.
    #[cfg(any(test, feature = "std"))]
    pub fn calibrate() -> Self {
        Self::from_loops_per_us(measure())
    }

    /// Measure the iteration rate on a separate thread and return right away.
    ///
    /// A delay requested before the measurement is done waits for it first, so no delay is
    /// ever computed from a missing rate.  If the measurement cannot finish, the rate falls
    /// back to [`FALLBACK_LOOPS_PER_US`].
    #[cfg(any(test, feature = "std"))]
    pub fn calibrate_in_background() -> Self {
        Self::spawn_calibration(measure)
    }

    #[cfg(any(test, feature = "std"))]
    fn spawn_calibration(measure: fn() -> u32) -> Self {
        let shared = Arc::new(AtomicU32::new(0));
        let publish = {
            let shared = shared.clone();
            move || {
                let rate = std::panic::catch_unwind(measure).unwrap_or_else(|_| {
                    warn!("delay: calibration failed, using the fallback rate");
                    FALLBACK_LOOPS_PER_US
                });
                shared.store(rate.max(1), Ordering::Release);
            }
        };
        let spawned = std::thread::Builder::new()
            .name("spin-calibration".into())
            .spawn(publish.clone());
        if spawned.is_err() {
            publish();
        }
        Self {
            calibration: Calibration::Shared(shared),
        }
    }

    /// Spin iterations per microsecond, or `None` while still calibrating.
    pub fn loops_per_us(&self) -> Option<u32> {
        match &self.calibration {
            Calibration::Fixed(n) => Some(*n),
            #[cfg(any(test, feature = "std"))]
            Calibration::Shared(shared) => match shared.load(Ordering::Acquire) {
                0 => None,
                n => Some(n),
            },
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.loops_per_us().is_some()
    }

    fn wait_calibrated(&self) -> u32 {
        loop {
            if let Some(n) = self.loops_per_us() {
                return n;
            }
            #[cfg(any(test, feature = "std"))]
            std::thread::yield_now();
        }
    }
}

fn spin(loops: u64) {
    let mut i = 0u64;
    while core::hint::black_box(i) < loops {
        core::hint::spin_loop();
        i += 1;
    }
}

#[cfg(any(test, feature = "std"))]
fn measure() -> u32 {
    use std::time::Instant;

    // Grow the sample until it is long enough to time reliably.
    let mut loops: u64 = 10_000;
    loop {
        let start = Instant::now();
        spin(loops);
        let elapsed = start.elapsed();
        if elapsed.as_micros() >= 5_000 || loops >= 1 << 36 {
            let per_us = loops / (elapsed.as_micros() as u64).max(1);
            let per_us = per_us.clamp(1, u32::MAX as u64) as u32;
            debug!("delay: calibrated to {=u32} loops/us", per_us);
            return per_us;
        }
        loops *= 4;
    }
}

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        let per_us = self.wait_calibrated() as u64;
        spin(per_us * ns as u64 / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        let per_us = self.wait_calibrated() as u64;
        spin(per_us * us as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::SpinDelay;
    use embedded_hal::delay::DelayNs;
    use std::time::{Duration, Instant};

    #[test]
    fn fixed_rate() {
        let mut delay = SpinDelay::from_loops_per_us(0);
        assert_eq!(delay.loops_per_us(), Some(1));
        assert!(delay.is_calibrated());
        delay.delay_us(10);
        delay.delay_ns(500);
    }

    #[test]
    fn calibrated_delay_is_in_the_right_range() {
        let mut delay = SpinDelay::calibrate();
        assert!(delay.loops_per_us().unwrap() >= 1);

        let start = Instant::now();
        delay.delay_ms(20);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");
    }

    #[test]
    fn failed_calibration_falls_back() {
        let mut delay = SpinDelay::spawn_calibration(|| panic!("no clock"));
        delay.delay_us(1);
        assert_eq!(delay.loops_per_us(), Some(super::FALLBACK_LOOPS_PER_US));
    }

    #[test]
    fn early_delay_waits_for_calibration() {
        let mut delay = SpinDelay::calibrate_in_background();
        let shared = delay.clone();

        delay.delay_us(100);
        assert!(delay.is_calibrated());
        assert_eq!(shared.loops_per_us(), delay.loops_per_us());
    }
}
