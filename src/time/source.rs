//! Time source abstraction for real, simulated and pinned clocks.
//!
//! The scheduler never reads the system clock directly. It is handed an
//! `Arc<dyn TimeSource>` at construction, which lets tests pin "now" to exact
//! boundary instants and lets `--simulate` run a day of schedule in seconds.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use std::time::{Duration as StdDuration, SystemTime};

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current instant
    fn now(&self) -> DateTime<Utc>;

    /// Get the current system time (for duration calculations)
    fn system_now(&self) -> SystemTime;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn system_now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated time source for time-accelerated runs of the driving loop.
///
/// Two modes are supported:
/// - Linear acceleration: time flows continuously at a constant multiplier rate
/// - Fast-forward: time jumps instantly through sleep periods (multiplier = 0.0)
pub struct SimulatedTimeSource {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// Time acceleration factor (e.g., 60.0 = 1 minute per second), 0.0 = fast-forward
    time_multiplier: f64,
    /// Simulated instant in fast-forward mode
    fast_forward_current: Mutex<Option<DateTime<Utc>>>,
    /// Simulated time that has elapsed through completed sleeps
    accumulated_sleep: Mutex<StdDuration>,
    /// In-progress sleep: (start instant, simulated duration being slept)
    sleep_in_progress: Mutex<Option<(std::time::Instant, StdDuration)>>,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source
    ///
    /// # Arguments
    /// * `start_time` - Starting instant for the simulation
    /// * `end_time` - Ending instant for the simulation
    /// * `multiplier` - Time acceleration (e.g., 60.0 = 1 simulated minute per real second),
    ///   0.0 means fast-forward, negative values fall back to 3600x
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, multiplier: f64) -> Self {
        let is_fast_forward = multiplier == 0.0;
        Self {
            start_time,
            end_time,
            time_multiplier: if is_fast_forward {
                0.0
            } else if multiplier < 0.0 {
                3600.0
            } else {
                multiplier
            },
            fast_forward_current: Mutex::new(if is_fast_forward {
                Some(start_time)
            } else {
                None
            }),
            accumulated_sleep: Mutex::new(StdDuration::ZERO),
            sleep_in_progress: Mutex::new(None),
        }
    }

    pub fn is_fast_forward(&self) -> bool {
        self.time_multiplier == 0.0
    }

    fn current_time(&self) -> DateTime<Utc> {
        if self.is_fast_forward() {
            let guard = self
                .fast_forward_current
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            return guard.unwrap_or(self.end_time);
        }

        let accumulated = *self
            .accumulated_sleep
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut total_secs = accumulated.as_secs_f64();

        // Add the elapsed portion of a sleep that is still running
        let in_progress = *self
            .sleep_in_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some((start_instant, simulated_duration)) = in_progress {
            let simulated_elapsed = start_instant.elapsed().as_secs_f64() * self.time_multiplier;
            total_secs += simulated_elapsed.min(simulated_duration.as_secs_f64());
        }

        let simulated = self.start_time + seconds_to_chrono(total_secs);
        simulated.min(self.end_time)
    }
}

fn seconds_to_chrono(secs: f64) -> ChronoDuration {
    ChronoDuration::seconds(secs as i64)
        + ChronoDuration::nanoseconds((secs.fract() * 1_000_000_000.0) as i64)
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.current_time()
    }

    fn system_now(&self) -> SystemTime {
        let current = self.current_time();
        SystemTime::UNIX_EPOCH + StdDuration::from_millis(current.timestamp_millis().max(0) as u64)
    }

    fn sleep(&self, duration: StdDuration) {
        if self.is_fast_forward() {
            let mut guard = self
                .fast_forward_current
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(current) = *guard {
                let advanced = current + ChronoDuration::milliseconds(duration.as_millis() as i64);
                *guard = Some(advanced.min(self.end_time));
            }
            drop(guard);
            // Let other threads (file logger, watcher) make progress
            std::thread::sleep(StdDuration::from_millis(1));
            return;
        }

        // Cap the sleep at the end of the simulation
        let duration_to_add = {
            let accumulated = *self
                .accumulated_sleep
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            let current_simulated = self.start_time + seconds_to_chrono(accumulated.as_secs_f64());
            if current_simulated >= self.end_time {
                StdDuration::ZERO
            } else {
                let remaining = (self.end_time - current_simulated)
                    .to_std()
                    .unwrap_or(StdDuration::ZERO);
                duration.min(remaining)
            }
        };

        if duration_to_add.is_zero() {
            return;
        }

        *self
            .sleep_in_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some((std::time::Instant::now(), duration_to_add));

        let real_sleep_secs = duration_to_add.as_secs_f64() / self.time_multiplier;
        if real_sleep_secs > 0.0 {
            std::thread::sleep(StdDuration::from_secs_f64(real_sleep_secs));
        }

        // Time only advances once the sleep has completed
        *self
            .sleep_in_progress
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
        *self
            .accumulated_sleep
            .lock()
            .unwrap_or_else(|e| e.into_inner()) += duration_to_add;
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

/// A clock pinned to an explicit instant.
///
/// `sleep` advances the pinned instant by exactly the requested duration without
/// blocking, so a driving loop over a `ManualTimeSource` is fully deterministic.
/// Used by `kenban status --at` and throughout the tests.
pub struct ManualTimeSource {
    current: Mutex<DateTime<Utc>>,
}

impl ManualTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Pin the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    /// Move the clock forward (or backward, for negative durations).
    pub fn advance(&self, by: ChronoDuration) {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn system_now(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + StdDuration::from_millis(self.now().timestamp_millis().max(0) as u64)
    }

    fn sleep(&self, duration: StdDuration) {
        self.advance(ChronoDuration::milliseconds(duration.as_millis() as i64));
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_manual_time_source_sleep_advances_exactly() {
        let clock = ManualTimeSource::new(instant(10, 0));
        clock.sleep(StdDuration::from_secs(90));
        assert_eq!(clock.now(), instant(10, 1) + ChronoDuration::seconds(30));
        assert!(!clock.is_ended());
    }

    #[test]
    fn test_manual_time_source_set_overrides() {
        let clock = ManualTimeSource::new(instant(10, 0));
        clock.set(instant(12, 0));
        assert_eq!(clock.now(), instant(12, 0));
    }

    #[test]
    fn test_fast_forward_caps_at_end_time() {
        let sim = SimulatedTimeSource::new(instant(10, 0), instant(10, 5), 0.0);
        assert!(sim.is_fast_forward());
        assert_eq!(sim.now(), instant(10, 0));

        sim.sleep(StdDuration::from_secs(120));
        assert_eq!(sim.now(), instant(10, 2));
        assert!(!sim.is_ended());

        sim.sleep(StdDuration::from_secs(3600));
        assert_eq!(sim.now(), instant(10, 5));
        assert!(sim.is_ended());
    }

    #[test]
    fn test_negative_multiplier_defaults_to_hour_per_second() {
        let sim = SimulatedTimeSource::new(instant(10, 0), instant(11, 0), -5.0);
        assert!(!sim.is_fast_forward());
        assert_eq!(sim.time_multiplier, 3600.0);
    }
}
