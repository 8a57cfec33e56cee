//! Pulse timing and position arithmetic, free of any hardware access.

use super::Direction;

/// Shortest electrically valid dwell, in microseconds.
pub const MIN_PULSE_WIDTH_US: u32 = 5;

/// Dwell for a pulse rate of `rate_hz`, or `None` when the rate cannot be produced.
pub(crate) fn target_dwell_us(rate_hz: f32) -> Option<u32> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return None;
    }
    let period = 1_000_000.0 / rate_hz;
    if period < MIN_PULSE_WIDTH_US as f32 || period >= u32::MAX as f32 {
        return None;
    }
    Some(period as u32)
}

/// Linear acceleration: the dwell starts at the soft-start value and shrinks by 1 µs every
/// `interval` pulses until it reaches the target.
#[derive(Debug, Clone)]
pub(crate) struct Ramp {
    dwell: u32,
    target: u32,
    interval: u32,
    count: u32,
}

impl Ramp {
    pub(crate) fn new(target: u32, min_startup_dwell: u32, interval: u32) -> Self {
        Self {
            dwell: target.max(min_startup_dwell),
            target,
            interval: interval.max(1),
            count: 0,
        }
    }

    /// Dwell for the next pulse.
    pub(crate) fn next_dwell(&mut self) -> u32 {
        let dwell = self.dwell;
        if self.dwell > self.target {
            self.count += 1;
            if self.count == self.interval {
                self.count = 0;
                self.dwell -= 1;
            }
        }
        dwell
    }

    pub(crate) fn is_cruising(&self) -> bool {
        self.dwell == self.target
    }
}

/// Position after one pulse in `direction`, wrapped to one revolution.
pub(crate) fn advance(position: u32, direction: Direction, steps_per_revolution: u32) -> u32 {
    match direction {
        Direction::Clockwise => (position + 1) % steps_per_revolution,
        Direction::CounterClockwise => {
            (position + steps_per_revolution - 1) % steps_per_revolution
        }
    }
}

/// Nearest step to `degrees`, normalized into `[0, steps_per_revolution)`.
pub(crate) fn angle_to_step(degrees: f32, steps_per_revolution: u32) -> u32 {
    let mut degrees = degrees % 360.0;
    if degrees < 0.0 {
        degrees += 360.0;
    }
    let step = (degrees * steps_per_revolution as f32 / 360.0 + 0.5) as u32;
    step % steps_per_revolution
}

/// Direction and pulse count to get from `from` to `to`.
///
/// With an explicit direction the motor travels that way, however far it is.  Otherwise it
/// takes the shorter way round; at exactly half a revolution it goes clockwise.
pub(crate) fn plan(
    from: u32,
    to: u32,
    steps_per_revolution: u32,
    direction: Option<Direction>,
) -> (Direction, u32) {
    let forward = (to + steps_per_revolution - from) % steps_per_revolution;
    let backward = (steps_per_revolution - forward) % steps_per_revolution;
    match direction {
        Some(Direction::Clockwise) => (Direction::Clockwise, forward),
        Some(Direction::CounterClockwise) => (Direction::CounterClockwise, backward),
        None if forward * 2 <= steps_per_revolution => (Direction::Clockwise, forward),
        None => (Direction::CounterClockwise, backward),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dwell_from_rate() {
        assert_eq!(target_dwell_us(1000.0), Some(1000));
        assert_eq!(target_dwell_us(200_000.0), Some(5));
        assert_eq!(target_dwell_us(200_001.0), None);
        assert_eq!(target_dwell_us(0.0), None);
        assert_eq!(target_dwell_us(-10.0), None);
        assert_eq!(target_dwell_us(f32::NAN), None);
        assert_eq!(target_dwell_us(f32::INFINITY), None);
        assert_eq!(target_dwell_us(1e-9), None);
    }

    #[test]
    fn ramp_shrinks_linearly_to_target() {
        let mut ramp = Ramp::new(100, 103, 2);
        let dwells: Vec<u32> = (0..9).map(|_| ramp.next_dwell()).collect();
        assert_eq!(dwells, [103, 103, 102, 102, 101, 101, 100, 100, 100]);
        assert!(ramp.is_cruising());
    }

    #[test]
    fn ramp_starts_at_target_when_slow() {
        let mut ramp = Ramp::new(2000, 1000, 10);
        assert!(ramp.is_cruising());
        assert_eq!(ramp.next_dwell(), 2000);
        assert_eq!(ramp.next_dwell(), 2000);
    }

    #[test]
    fn ramp_zero_interval() {
        let mut ramp = Ramp::new(10, 12, 0);
        assert_eq!(ramp.next_dwell(), 12);
        assert_eq!(ramp.next_dwell(), 11);
        assert_eq!(ramp.next_dwell(), 10);
        assert_eq!(ramp.next_dwell(), 10);
    }

    #[test]
    fn position_wraps() {
        assert_eq!(advance(199, Direction::Clockwise, 200), 0);
        assert_eq!(advance(0, Direction::CounterClockwise, 200), 199);
        assert_eq!(advance(17, Direction::CounterClockwise, 200), 16);

        let mut pos = 42;
        for _ in 0..200 {
            pos = advance(pos, Direction::Clockwise, 200);
            assert!(pos < 200);
        }
        assert_eq!(pos, 42);
    }

    #[test]
    fn angles_to_steps() {
        assert_eq!(angle_to_step(0.0, 200), 0);
        assert_eq!(angle_to_step(90.0, 200), 50);
        assert_eq!(angle_to_step(360.0, 200), 0);
        assert_eq!(angle_to_step(-90.0, 200), 150);
        assert_eq!(angle_to_step(720.4, 200), 0);
        assert_eq!(angle_to_step(359.5, 200), 0);
    }

    #[test]
    fn shortest_path() {
        assert_eq!(plan(0, 50, 200, None), (Direction::Clockwise, 50));
        assert_eq!(plan(0, 150, 200, None), (Direction::CounterClockwise, 50));
        assert_eq!(plan(190, 10, 200, None), (Direction::Clockwise, 20));
        assert_eq!(plan(10, 190, 200, None), (Direction::CounterClockwise, 20));
        // exactly half a revolution goes clockwise
        assert_eq!(plan(30, 130, 200, None), (Direction::Clockwise, 100));
        assert_eq!(plan(130, 30, 200, None), (Direction::Clockwise, 100));
        assert_eq!(plan(70, 70, 200, None), (Direction::Clockwise, 0));
    }

    #[test]
    fn explicit_direction() {
        assert_eq!(
            plan(0, 150, 200, Some(Direction::Clockwise)),
            (Direction::Clockwise, 150)
        );
        assert_eq!(
            plan(0, 50, 200, Some(Direction::CounterClockwise)),
            (Direction::CounterClockwise, 150)
        );
        assert_eq!(
            plan(70, 70, 200, Some(Direction::CounterClockwise)),
            (Direction::CounterClockwise, 0)
        );
    }
}
