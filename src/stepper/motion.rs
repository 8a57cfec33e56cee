use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use super::{ramp, Cancel, Direction, Steps};
use crate::{Conflict, StepperError};

const IDLE: u8 = 0;
const MOVING: u8 = 1;
/// Still moving, `stop()` was called.
const STOPPING: u8 = 2;
/// `reset_position()` is writing the position.  Not a motion.
const RESETTING: u8 = 3;

/// Motion state shared between the thread running a motion and everyone else.
///
/// One state word covers both "is a motion running" and "was it asked to stop", so a stop
/// request can only ever hit the motion that was running when it was made.
#[derive(Debug)]
pub(crate) struct Motion {
    state: AtomicU8,
    position: AtomicU32,
    clockwise: AtomicBool,
}

impl Motion {
    pub(crate) const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
            position: AtomicU32::new(0),
            clockwise: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_moving(&self) -> bool {
        matches!(self.state.load(Ordering::Acquire), MOVING | STOPPING)
    }

    pub(crate) fn position(&self) -> u32 {
        self.position.load(Ordering::Acquire)
    }

    pub(crate) fn direction(&self) -> Direction {
        if self.clockwise.load(Ordering::Relaxed) {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        }
    }

    /// Claim the motor for a motion in `direction`.  The claim ends when the guard is dropped,
    /// however the motion exits.
    pub(crate) fn begin(&self, direction: Direction) -> Result<Claim<'_>, StepperError> {
        loop {
            match self
                .state
                .compare_exchange(IDLE, MOVING, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(RESETTING) => core::hint::spin_loop(),
                Err(_) => {
                    warn!("stepper: rejected request, motor is moving");
                    return Err(StepperError::InvalidOperation(Conflict::Moving));
                }
            }
        }
        self.clockwise
            .store(direction == Direction::Clockwise, Ordering::Relaxed);
        Ok(Claim { state: &self.state })
    }

    pub(crate) fn stop(&self) {
        if self
            .state
            .compare_exchange(MOVING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("stepper: stop requested");
        }
    }

    pub(crate) fn reset(&self) -> Result<(), StepperError> {
        loop {
            match self
                .state
                .compare_exchange(IDLE, RESETTING, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(RESETTING) => core::hint::spin_loop(),
                Err(_) => {
                    warn!("stepper: cannot reset position while moving");
                    return Err(StepperError::InvalidOperation(Conflict::Moving));
                }
            }
        }
        self.position.store(0, Ordering::Release);
        self.state.store(IDLE, Ordering::Release);
        Ok(())
    }

    /// Whether the loop must end before pulse number `done`.
    pub(crate) fn should_halt<C: Cancel>(&self, done: u32, steps: Steps, cancel: &C) -> bool {
        if let Steps::Count(n) = steps {
            if done >= n {
                return true;
            }
        }
        if cancel.is_cancelled() || self.state.load(Ordering::Acquire) == STOPPING {
            debug!("stepper: motion halted after {=u32} pulses", done);
            return true;
        }
        false
    }

    pub(crate) fn record_pulse(&self, direction: Direction, steps_per_revolution: u32) {
        // Only the claim holder writes the position, so load and store cannot race.
        let next = ramp::advance(
            self.position.load(Ordering::Relaxed),
            direction,
            steps_per_revolution,
        );
        self.position.store(next, Ordering::Release);
    }
}

/// Returns the motor to idle when dropped.
pub(crate) struct Claim<'a> {
    state: &'a AtomicU8,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stepper::Never;

    #[test]
    fn stop_only_reaches_the_running_motion() {
        let motion = Motion::new();

        // idle: nothing to stop, and nothing left behind for the next motion
        motion.stop();
        let claim = motion.begin(Direction::Clockwise).unwrap();
        assert!(motion.is_moving());
        assert!(!motion.should_halt(0, Steps::Continuous, &Never));

        motion.stop();
        assert!(motion.is_moving());
        assert!(motion.should_halt(0, Steps::Continuous, &Never));

        drop(claim);
        assert!(!motion.is_moving());
        let _claim = motion.begin(Direction::CounterClockwise).unwrap();
        assert!(!motion.should_halt(0, Steps::Continuous, &Never));
        assert_eq!(motion.direction(), Direction::CounterClockwise);
    }

    #[test]
    fn reset_is_not_a_motion() {
        let motion = Motion::new();
        motion.record_pulse(Direction::CounterClockwise, 200);
        assert_eq!(motion.position(), 199);

        motion.reset().unwrap();
        assert_eq!(motion.position(), 0);
        assert!(!motion.is_moving());

        let _claim = motion.begin(Direction::Clockwise).unwrap();
        assert_eq!(
            motion.reset(),
            Err(StepperError::InvalidOperation(Conflict::Moving))
        );
        assert_eq!(
            motion.begin(Direction::Clockwise).err(),
            Some(StepperError::InvalidOperation(Conflict::Moving))
        );
    }
}
