//! Timed step/direction motion for stepper-motor driver boards (A4988, DRV8825, TMC22xx in
//! STEP/DIR mode, ...).
//!
//! A [`Stepper`] turns motion requests into a train of symmetric pulses on the STEP line.  Every
//! motion starts slowly at the soft-start dwell and accelerates linearly towards the requested
//! rate.  The absolute position is tracked in pulses, wrapped to one revolution, and is exact even
//! when a motion is cancelled half-way.
//!
//! Only one motion runs per motor at a time.  The pins sit behind a [`BusMutex`] and the motion
//! state is kept in atomics, so with a thread-safe mutex [`Stepper::stop`] and the read-only
//! accessors work from any thread while another one is running a motion.
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::{BusMutex, StepperError};

#[cfg(feature = "async")]
mod asynch;
pub mod cancel;
mod config;
mod driver;
mod motion;
pub(crate) mod ramp;

pub use cancel::{Cancel, Either, Never};
#[cfg(any(test, feature = "std"))]
pub use cancel::Deadline;
pub use config::StepperConfig;
pub use driver::Driver;
pub use ramp::MIN_PULSE_WIDTH_US;

use motion::Motion;

/// Direction of rotation, seen from the shaft end.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// How many pulses a motion issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Steps {
    Count(u32),
    /// Until stopped or cancelled.
    Continuous,
}

/// A stepper motor on a STEP/DIR driver board.
pub struct Stepper<M> {
    driver: M,
    config: StepperConfig,
    motion: Motion,
}

impl<STEP, DIR, EN, D> Stepper<core::cell::RefCell<Driver<STEP, DIR, EN, D>>>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    pub fn new(
        driver: Driver<STEP, DIR, EN, D>,
        config: StepperConfig,
    ) -> Result<Self, StepperError> {
        Self::with_mutex(driver, config)
    }
}

impl<STEP, DIR, EN, D, M> Stepper<M>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    M: BusMutex<Bus = Driver<STEP, DIR, EN, D>>,
{
    /// Wrap `driver` in the mutex type `M`.
    ///
    /// Pulls STEP low and disables the driver board.  Fails with
    /// [`StepperError::OutOfRange`] for a motor with zero steps per revolution.
    pub fn with_mutex(
        mut driver: Driver<STEP, DIR, EN, D>,
        config: StepperConfig,
    ) -> Result<Self, StepperError> {
        if config.steps_per_revolution == 0 {
            return Err(StepperError::OutOfRange);
        }
        driver.step_low()?;
        driver.set_enabled(false, config.enable_active_low)?;

        Ok(Self {
            driver: BusMutex::create(driver),
            config,
            motion: Motion::new(),
        })
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Current shaft angle in degrees, within `[0, 360)`.
    pub fn position(&self) -> f32 {
        self.position_steps() as f32 * self.config.step_angle()
    }

    /// Current position in pulses, within `[0, steps_per_revolution)`.
    pub fn position_steps(&self) -> u32 {
        self.motion.position()
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_moving()
    }

    /// Direction of the current or most recent motion.
    pub fn direction(&self) -> Direction {
        self.motion.direction()
    }

    /// Ask a running motion to end after its current pulse.  Does nothing when idle.
    pub fn stop(&self) {
        self.motion.stop();
    }

    /// Declare the current shaft angle to be 0°.
    pub fn reset_position(&self) -> Result<(), StepperError> {
        self.motion.reset()
    }

    /// Give back the driver.
    pub fn release(self) -> Driver<STEP, DIR, EN, D> {
        self.driver.into_inner()
    }

    fn prepare(&self, steps: Steps, rate_hz: f32) -> Result<ramp::Ramp, StepperError> {
        let Some(target) = ramp::target_dwell_us(rate_hz) else {
            warn!("stepper: pulse rate out of range");
            return Err(StepperError::OutOfRange);
        };
        let ramp = ramp::Ramp::new(
            target,
            self.config.min_startup_dwell_us,
            self.config.acceleration_interval,
        );
        debug!(
            "stepper: {} at {=u32} us dwell, starting at {=u32} us",
            steps,
            target,
            target.max(self.config.min_startup_dwell_us)
        );
        Ok(ramp)
    }

    fn plan_go_to(
        &self,
        angle: f32,
        velocity: f32,
        direction: Option<Direction>,
    ) -> Result<(Steps, Direction, f32), StepperError> {
        if !angle.is_finite() {
            warn!("stepper: target angle is not a number");
            return Err(StepperError::OutOfRange);
        }
        let spr = self.config.steps_per_revolution;
        let target = ramp::angle_to_step(angle, spr);
        let (direction, steps) = ramp::plan(self.position_steps(), target, spr, direction);
        Ok((
            Steps::Count(steps),
            direction,
            self.config.rate_for_velocity(velocity),
        ))
    }
}

impl<STEP, DIR, EN, D, M> Stepper<M>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    M: BusMutex<Bus = Driver<STEP, DIR, EN, D>>,
{
    /// Issue `steps` pulses in `direction`, accelerating towards `rate_hz` pulses per second.
    ///
    /// Blocks until the pulses are done, [`stop()`][Self::stop] is called or `cancel` fires.
    /// The request is validated before any pin is touched: a rate whose period is shorter than
    /// [`MIN_PULSE_WIDTH_US`] fails with [`StepperError::OutOfRange`], and a motor that is
    /// already moving fails with [`StepperError::InvalidOperation`].
    ///
    /// The position is updated after every completed pulse, so on any exit it reflects exactly
    /// the pulses that were issued.
    pub fn rotate<C: Cancel>(
        &self,
        steps: Steps,
        direction: Direction,
        rate_hz: f32,
        cancel: C,
    ) -> Result<(), StepperError> {
        let mut ramp = self.prepare(steps, rate_hz)?;
        let _motion = self.motion.begin(direction)?;

        let config = &self.config;
        let res = self
            .driver
            .lock(config.lock_timeout, |drv| -> Result<(), StepperError> {
                let mut drv = drv.energize(direction, config)?;

                let mut done: u32 = 0;
                while !self.motion.should_halt(done, steps, &cancel) {
                    let cruising = ramp.is_cruising();
                    drv.pulse(ramp.next_dwell())?;
                    self.motion
                        .record_pulse(direction, config.steps_per_revolution);
                    done = done.wrapping_add(1);
                    if !cruising && ramp.is_cruising() {
                        trace!("stepper: reached cruise after {=u32} pulses", done);
                    }
                }
                drv.finish()
            });

        let res = res.map_err(StepperError::from).and_then(|r| r);
        debug!(
            "stepper: motion ended at step {=u32}",
            self.position_steps()
        );
        res
    }

    /// Turn to `angle` degrees at `velocity` degrees per second.
    ///
    /// Without an explicit `direction` the shorter way round is taken, clockwise at exactly
    /// half a revolution.  The target is rounded to the nearest step.  An angle that is not a
    /// finite number fails with [`StepperError::OutOfRange`].
    pub fn go_to<C: Cancel>(
        &self,
        angle: f32,
        velocity: f32,
        direction: Option<Direction>,
        cancel: C,
    ) -> Result<(), StepperError> {
        let (steps, direction, rate) = self.plan_go_to(angle, velocity, direction)?;
        self.rotate(steps, direction, rate, cancel)
    }

    /// Turn at `velocity` degrees per second until [`stop()`][Self::stop] is called or `cancel`
    /// fires.
    pub fn run<C: Cancel>(
        &self,
        direction: Direction,
        velocity: f32,
        cancel: C,
    ) -> Result<(), StepperError> {
        let rate = self.config.rate_for_velocity(velocity);
        self.rotate(Steps::Continuous, direction, rate, cancel)
    }

    /// Like [`run()`][Self::run], but the motion also ends once `duration` has elapsed.
    ///
    /// ```
    /// use core::time::Duration;
    /// use mux_motion::stepper::{Driver, Never};
    /// use mux_motion::{Direction, NoPin, SpinDelay, Stepper, StepperConfig};
    ///
    /// let driver = Driver::new(NoPin, NoPin, SpinDelay::calibrate());
    /// let stepper = Stepper::new(driver, StepperConfig::new()).unwrap();
    ///
    /// stepper
    ///     .run_for(Direction::Clockwise, 90.0, Duration::from_millis(20), Never)
    ///     .unwrap();
    /// assert!(!stepper.is_moving());
    /// ```
    #[cfg(any(test, feature = "std"))]
    pub fn run_for<C: Cancel>(
        &self,
        direction: Direction,
        velocity: f32,
        duration: core::time::Duration,
        cancel: C,
    ) -> Result<(), StepperError> {
        self.run(direction, velocity, Either(cancel, Deadline::after(duration)))
    }
}
