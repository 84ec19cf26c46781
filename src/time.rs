use std::time::Duration;
use std::time::Instant;

/// # Timestep
///
/// Time elapsed between two frames, in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Timestep(f32);

impl Timestep {
    /// Returns a timestep of the given number of seconds.
    pub const fn from_seconds(seconds: f32) -> Self {
        Self(seconds)
    }

    /// Returns the timestep in seconds.
    pub const fn seconds(self) -> f32 {
        self.0
    }

    /// Returns the timestep in milliseconds.
    pub fn milliseconds(self) -> f32 {
        self.0 * 1000.0
    }
}

impl From<Duration> for Timestep {
    fn from(duration: Duration) -> Self {
        Self(duration.as_secs_f32())
    }
}

/// # Clock
///
/// Measures frame times. [Clock::update] is called once per frame.
#[derive(Clone, Debug)]
pub struct Clock {
    start: Instant,
    last_update: Instant,
    unscaled_delta: f32,
    time_scale: f32,
    elapsed: f32,
}

impl Clock {
    /// Returns a clock started now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_update: now,
            unscaled_delta: 0.0,
            time_scale: 1.0,
            elapsed: 0.0,
        }
    }

    /// Measures the time since the previous update and returns the scaled timestep.
    pub fn update(&mut self) -> Timestep {
        self.advance(Instant::now())
    }

    fn advance(&mut self, now: Instant) -> Timestep {
        self.unscaled_delta = now.saturating_duration_since(self.last_update).as_secs_f32();
        self.elapsed = now.saturating_duration_since(self.start).as_secs_f32();
        self.last_update = now;
        self.delta()
    }

    /// Returns the last frame time multiplied by the time scale.
    pub fn delta(&self) -> Timestep {
        Timestep(self.unscaled_delta * self.time_scale)
    }

    /// Returns the last frame time.
    pub fn unscaled_delta(&self) -> Timestep {
        Timestep(self.unscaled_delta)
    }

    /// Returns the time scale.
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Sets the multiplier applied to [Clock::delta]. Negative scales are clamped to zero.
    pub fn set_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale.max(0.0);
    }

    /// Returns the seconds elapsed between the clock start and the last update.
    pub fn time_since_start(&self) -> f32 {
        self.elapsed
    }

    /// Returns the frames per second of the last frame, or zero before the first measurable frame.
    pub fn framerate(&self) -> f32 {
        if self.unscaled_delta > 0.0 {
            1.0 / self.unscaled_delta
        } else {
            0.0
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestep_milliseconds_returns_seconds_times_thousand() {
        let timestep = Timestep::from_seconds(0.25);

        assert_eq!(timestep.milliseconds(), 250.0);
    }

    #[test]
    fn advance_returns_elapsed_time() {
        let mut clock = Clock::new();
        let start = clock.start;

        let delta = clock.advance(start + Duration::from_millis(500));

        assert_eq!(delta.seconds(), 0.5);
        assert_eq!(clock.framerate(), 2.0);
        assert_eq!(clock.time_since_start(), 0.5);
    }

    #[test]
    fn advance_with_time_scale_returns_scaled_delta() {
        let mut clock = Clock::new();
        let start = clock.start;
        clock.set_time_scale(2.0);

        let delta = clock.advance(start + Duration::from_millis(250));

        assert_eq!(delta.seconds(), 0.5);
        assert_eq!(clock.unscaled_delta().seconds(), 0.25);
    }

    #[test]
    fn set_negative_time_scale_clamps_to_zero() {
        let mut clock = Clock::new();

        clock.set_time_scale(-3.0);

        assert_eq!(clock.time_scale(), 0.0);
    }

    #[test]
    fn framerate_before_update_returns_zero() {
        let clock = Clock::new();

        assert_eq!(clock.framerate(), 0.0);
    }
}
