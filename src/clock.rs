//! Classification of the advance-pulse train arriving at the ADV jack.
//!
//! The tracker keeps the three most recent pulse timestamps and, on every loop
//! iteration, decides whether the module is being externally sequenced at all
//! (`is_advancing`) and whether the pulses are regular enough to count as a clock
//! (`is_clocked`). A clocked pulse train also yields an expected gate duration of half
//! the pulse interval, approximating a 50% duty-cycle gate synced to the incoming
//! clock.

use crate::config::ModuleConfig;
use embassy_time::{Duration, Instant};

/// Gate duration used for free-running (unclocked) pulses.
pub const DEFAULT_TRIGGER_LENGTH: Duration = Duration::from_millis(20);

/// Tracks advance pulses and derives clocking state and gate length.
#[derive(Clone, Debug)]
pub struct ClockTracker {
    /// Most recent pulse first.
    last_pulses: [Instant; 3],
    is_clocked: bool,
    is_advancing: bool,
    gate_length: Duration,
}

impl Default for ClockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockTracker {
    /// Constructs a tracker that has seen no pulses.
    pub fn new() -> Self {
        Self {
            last_pulses: [Instant::from_ticks(0); 3],
            is_clocked: false,
            is_advancing: false,
            gate_length: DEFAULT_TRIGGER_LENGTH,
        }
    }

    /// Whether pulses arrive regularly enough to count as a clock.
    pub fn is_clocked(&self) -> bool {
        self.is_clocked
    }

    /// Whether the module has received an advance pulse recently enough to count as
    /// being externally sequenced.
    pub fn is_advancing(&self) -> bool {
        self.is_advancing
    }

    /// Expected gate duration derived from the pulse train.
    pub fn gate_length(&self) -> Duration {
        self.gate_length
    }

    /// Whether a gate opened by the most recent pulse would still be high at `now`.
    pub fn gate_open(&self, now: Instant) -> bool {
        let last = self.last_pulses[0];
        now >= last && now - last < self.gate_length
    }

    /// Re-evaluates `is_advancing` and `is_clocked`. Called once per loop iteration,
    /// regardless of whether a pulse arrived.
    pub fn tick(&mut self, now: Instant, config: &ModuleConfig) {
        self.guard_timestamps(now);
        let [t0, t1, t2] = self.last_pulses;

        let last_interval = (now - t0).as_millis();
        self.is_advancing = last_interval < config.max_advance_interval.as_millis();

        let avg_interval = ((t0 - t1).as_millis() + (t1 - t2).as_millis()) / 2;
        let tolerance = (avg_interval as f32 * config.clock_tolerance) as u64;
        self.is_clocked = last_interval <= avg_interval + tolerance
            && last_interval >= avg_interval.saturating_sub(tolerance);
    }

    /// Registers an advance pulse: derives the gate length from the interval that just
    /// elapsed, then shifts the pulse history.
    pub fn on_advance_pulse(&mut self, now: Instant) {
        self.guard_timestamps(now);
        let t0 = self.last_pulses[0];

        if self.is_clocked {
            if now > t0 {
                self.gate_length = Duration::from_millis((now - t0).as_millis() / 2);
            }
        } else {
            self.gate_length = DEFAULT_TRIGGER_LENGTH;
        }

        self.last_pulses = [now, self.last_pulses[0], self.last_pulses[1]];
    }

    /// Reseeds the pulse history whenever it is not monotonic relative to `now`.
    ///
    /// This runs before the interval arithmetic on every call, not only on first use,
    /// because the timestamps start over whenever the monotonic clock wraps. The seeds
    /// sit 1-3 ms in the past (clamped away from the epoch) so no interval ever goes
    /// negative.
    fn guard_timestamps(&mut self, now: Instant) {
        let [t0, t1, t2] = self.last_pulses;
        if now >= t0 && t0 >= t1 && t1 >= t2 {
            return;
        }
        let base = now.max(Instant::from_millis(3));
        self.last_pulses = [
            base - Duration::from_millis(1),
            base - Duration::from_millis(2),
            base - Duration::from_millis(3),
        ];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u64) -> Instant {
        Instant::from_millis(millis)
    }

    /// Feeds three pulses spaced 1000 ms apart so the averaging window is warm.
    fn steadily_clocked() -> ClockTracker {
        let config = ModuleConfig::default();
        let mut clock = ClockTracker::new();
        for millis in [10_000, 11_000, 12_000] {
            clock.tick(at(millis), &config);
            clock.on_advance_pulse(at(millis));
        }
        clock
    }

    #[test]
    fn pulse_within_tolerance_keeps_clocked() {
        let config = ModuleConfig::default();
        let mut clock = steadily_clocked();
        clock.tick(at(13_050), &config);
        assert!(clock.is_clocked(), "A 1050 ms interval is within +/- 10% of 1000 ms");
    }

    #[test]
    fn pulse_outside_tolerance_clears_clocked() {
        let config = ModuleConfig::default();
        let mut clock = steadily_clocked();
        clock.tick(at(13_200), &config);
        assert!(
            !clock.is_clocked(),
            "A 1200 ms interval is outside +/- 10% of 1000 ms"
        );
    }

    #[test]
    fn gate_length_is_half_the_clocked_interval() {
        let config = ModuleConfig::default();
        let mut clock = steadily_clocked();
        clock.tick(at(13_000), &config);
        clock.on_advance_pulse(at(13_000));
        assert_eq!(
            Duration::from_millis(500),
            clock.gate_length(),
            "Expected left but got right"
        );
    }

    #[test]
    fn unclocked_pulses_fall_back_to_the_default_trigger_length() {
        let config = ModuleConfig::default();
        let mut clock = ClockTracker::new();
        clock.tick(at(5_000), &config);
        clock.on_advance_pulse(at(5_000));
        assert_eq!(
            DEFAULT_TRIGGER_LENGTH,
            clock.gate_length(),
            "Expected left but got right"
        );
    }

    #[test]
    fn advancing_expires_after_the_configured_interval() {
        let config = ModuleConfig::default();
        let mut clock = steadily_clocked();
        clock.tick(at(12_500), &config);
        assert!(clock.is_advancing(), "500 ms after a pulse is still advancing");
        clock.tick(at(15_000), &config);
        assert!(
            !clock.is_advancing(),
            "3000 ms after a pulse exceeds the 2000 ms default"
        );
    }

    #[test]
    fn first_pulse_near_the_epoch_does_not_underflow() {
        let config = ModuleConfig::default();
        let mut clock = ClockTracker::new();
        clock.tick(at(1), &config);
        clock.on_advance_pulse(at(1));
        clock.tick(at(2), &config);
        assert!(clock.is_advancing());
    }

    #[test]
    fn gate_open_tracks_time_since_the_last_pulse() {
        let mut clock = steadily_clocked();
        let config = ModuleConfig::default();
        clock.tick(at(13_000), &config);
        clock.on_advance_pulse(at(13_000));
        assert!(clock.gate_open(at(13_200)), "200 ms into a 500 ms gate");
        assert!(!clock.gate_open(at(13_600)), "600 ms is past a 500 ms gate");
    }
}
