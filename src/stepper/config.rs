use core::time::Duration;

/// Static parameters of a stepper motor and its driver board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperConfig {
    /// Full pulses per mechanical revolution (200 for a 1.8° motor without microstepping).
    pub steps_per_revolution: u32,
    /// Dwell used for the first pulses after standstill, in microseconds.  Motors stall when
    /// asked to start at full speed.
    pub min_startup_dwell_us: u32,
    /// Number of pulses between two 1 µs reductions of the dwell while accelerating.
    ///
    /// `0` behaves like `1`.
    pub acceleration_interval: u32,
    /// Swap the meaning of the two DIR levels.
    pub inverse_direction: bool,
    /// The driver is enabled by pulling EN low.
    pub enable_active_low: bool,
    /// How long a motion command waits for the pins.
    pub lock_timeout: Duration,
}

impl StepperConfig {
    pub const fn new() -> Self {
        Self {
            steps_per_revolution: 200,
            min_startup_dwell_us: 1000,
            acceleration_interval: 10,
            inverse_direction: false,
            enable_active_low: false,
            lock_timeout: Duration::from_secs(10),
        }
    }

    pub const fn steps_per_revolution(mut self, steps: u32) -> Self {
        self.steps_per_revolution = steps;
        self
    }

    pub const fn min_startup_dwell_us(mut self, dwell_us: u32) -> Self {
        self.min_startup_dwell_us = dwell_us;
        self
    }

    pub const fn acceleration_interval(mut self, pulses: u32) -> Self {
        self.acceleration_interval = pulses;
        self
    }

    pub const fn inverse_direction(mut self, inverse: bool) -> Self {
        self.inverse_direction = inverse;
        self
    }

    pub const fn enable_active_low(mut self, active_low: bool) -> Self {
        self.enable_active_low = active_low;
        self
    }

    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Angle covered by one pulse, in degrees.
    pub fn step_angle(&self) -> f32 {
        360.0 / self.steps_per_revolution as f32
    }

    /// Pulse rate needed to turn at `velocity` degrees per second.
    pub fn rate_for_velocity(&self, velocity: f32) -> f32 {
        velocity / self.step_angle()
    }
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self::new()
    }
}
