//! Non-blocking variants of the motion commands, for executors that must not be stalled for the
//! length of a motion.
//!
//! These take `&mut self`: the borrow already guarantees that nothing else drives the pins, so
//! no lock is taken.  A motion ends when its pulses are done or `cancel` fires.  Dropping the
//! future ends it too: STEP is pulled low and the driver board disabled on the way out.
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use super::{Cancel, Direction, Driver, Stepper, Steps};
use crate::{BusMutex, StepperError};

impl<STEP, DIR, EN, D, M> Stepper<M>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    M: BusMutex<Bus = Driver<STEP, DIR, EN, D>>,
{
    /// [`rotate()`][Stepper::rotate], awaiting the delay between pulse edges.
    pub async fn rotate_async<C: Cancel>(
        &mut self,
        steps: Steps,
        direction: Direction,
        rate_hz: f32,
        cancel: C,
    ) -> Result<(), StepperError> {
        let mut ramp = self.prepare(steps, rate_hz)?;
        let _motion = self.motion.begin(direction)?;

        let config = &self.config;
        let mut drv = self.driver.get_mut().energize(direction, config)?;

        let mut done: u32 = 0;
        while !self.motion.should_halt(done, steps, &cancel) {
            let dwell = ramp.next_dwell();
            drv.step_high()?;
            drv.delay_mut().delay_us(dwell).await;
            drv.step_low()?;
            drv.delay_mut().delay_us(dwell).await;

            self.motion
                .record_pulse(direction, config.steps_per_revolution);
            done = done.wrapping_add(1);
        }
        drv.finish()
    }

    /// [`go_to()`][Stepper::go_to], awaiting the delay between pulse edges.
    pub async fn go_to_async<C: Cancel>(
        &mut self,
        angle: f32,
        velocity: f32,
        direction: Option<Direction>,
        cancel: C,
    ) -> Result<(), StepperError> {
        let (steps, direction, rate) = self.plan_go_to(angle, velocity, direction)?;
        self.rotate_async(steps, direction, rate, cancel).await
    }

    /// [`run()`][Stepper::run], awaiting the delay between pulse edges.  Only `cancel` ends it.
    pub async fn run_async<C: Cancel>(
        &mut self,
        direction: Direction,
        velocity: f32,
        cancel: C,
    ) -> Result<(), StepperError> {
        let rate = self.config.rate_for_velocity(velocity);
        self.rotate_async(Steps::Continuous, direction, rate, cancel)
            .await
    }
}
