use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::{Direction, StepperConfig};
use crate::pin::drive;
use crate::{NoPin, StepperError};

/// The hardware side of a stepper: STEP, DIR and optional EN lines plus a microsecond delay.
pub struct Driver<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
}

impl<STEP, DIR, D> Driver<STEP, DIR, NoPin, D> {
    pub fn new(step: STEP, dir: DIR, delay: D) -> Self {
        Self::with_enable(step, dir, NoPin, delay)
    }
}

impl<STEP, DIR, EN, D> Driver<STEP, DIR, EN, D> {
    pub fn with_enable(step: STEP, dir: DIR, enable: EN, delay: D) -> Self {
        Self {
            step,
            dir,
            enable,
            delay,
        }
    }

    pub fn release(self) -> (STEP, DIR, EN, D) {
        (self.step, self.dir, self.enable, self.delay)
    }

    #[cfg(feature = "async")]
    pub(crate) fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }
}

impl<STEP, DIR, EN, D> Driver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    pub(crate) fn set_direction(
        &mut self,
        direction: Direction,
        inverse: bool,
    ) -> Result<(), StepperError> {
        drive(&mut self.dir, (direction == Direction::Clockwise) ^ inverse)
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool, active_low: bool) -> Result<(), StepperError> {
        drive(&mut self.enable, enabled ^ active_low)
    }

    pub(crate) fn step_high(&mut self) -> Result<(), StepperError> {
        drive(&mut self.step, true)
    }

    pub(crate) fn step_low(&mut self) -> Result<(), StepperError> {
        drive(&mut self.step, false)
    }

    /// Point DIR at `direction` and enable the driver board.
    ///
    /// The board stays enabled until the returned guard is finished or dropped, whichever way
    /// the motion exits.
    pub(crate) fn energize(
        &mut self,
        direction: Direction,
        config: &StepperConfig,
    ) -> Result<Energized<'_, STEP, DIR, EN, D>, StepperError> {
        let mut on = Energized {
            driver: self,
            active_low: config.enable_active_low,
            armed: true,
        };
        on.set_direction(direction, config.inverse_direction)?;
        on.set_enabled(true, config.enable_active_low)?;
        Ok(on)
    }
}

/// A driver board that is enabled for one motion.
pub(crate) struct Energized<'a, STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    driver: &'a mut Driver<STEP, DIR, EN, D>,
    active_low: bool,
    armed: bool,
}

impl<STEP, DIR, EN, D> Energized<'_, STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    /// Disable the board after a motion that ended normally, reporting a failure to do so.
    pub(crate) fn finish(mut self) -> Result<(), StepperError> {
        self.armed = false;
        self.driver.set_enabled(false, self.active_low)
    }
}

impl<STEP, DIR, EN, D> core::ops::Deref for Energized<'_, STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    type Target = Driver<STEP, DIR, EN, D>;

    fn deref(&self) -> &Self::Target {
        self.driver
    }
}

impl<STEP, DIR, EN, D> core::ops::DerefMut for Energized<'_, STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.driver
    }
}

/// Abandoned mid-motion (an error, a panic or a dropped future): STEP may still be high.
impl<STEP, DIR, EN, D> Drop for Energized<'_, STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
{
    fn drop(&mut self) {
        if self.armed {
            let _ = self.driver.step_low();
            let _ = self.driver.set_enabled(false, self.active_low);
        }
    }
}

impl<STEP, DIR, EN, D> Driver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// One symmetric pulse: `dwell_us` high, then `dwell_us` low.
    pub(crate) fn pulse(&mut self, dwell_us: u32) -> Result<(), StepperError> {
        self.step_high()?;
        self.delay.delay_us(dwell_us);
        self.step_low()?;
        self.delay.delay_us(dwell_us);
        Ok(())
    }
}
