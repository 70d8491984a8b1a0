//! Tracking of MOD-and-key chords.
//!
//! Holding the MOD button and repeatedly pressing the same key cycles through a small
//! ordered list of secondary effects; every editing screen reuses this mechanism to
//! pack several actions onto one key. The tracker only counts repeated presses of the
//! *first* key chosen while MOD is held: pressing a different key neither advances nor
//! resets the cycle, which lets the current effect be applied to several keys (this is
//! how paste targets accumulate).

use crate::memory::KeyIndex;
use num_traits::FromPrimitive;

/// State of the current MOD chord, reset whenever the MOD button is released.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChordTracker {
    initial_key: Option<KeyIndex>,
    press_count: u8,
    engaged: bool,
}

impl ChordTracker {
    /// Constructs an idle tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first key pressed while MOD was held, if any.
    pub fn initial_key(&self) -> Option<KeyIndex> {
        self.initial_key
    }

    /// How many times the initial key has been pressed since MOD was held down.
    pub fn press_count(&self) -> u8 {
        self.press_count
    }

    /// Whether anything consumed this MOD hold: a chord key was chosen, or a
    /// long-press fired. An engaged hold must not additionally navigate on release.
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Records `key` as the chord key without advancing the press count. Used by
    /// screens that treat the MOD hold as a plain modifier rather than a cycle.
    pub fn hold(&mut self, key: KeyIndex) {
        if self.initial_key.is_none() {
            self.initial_key = Some(key);
        }
        self.engaged = true;
    }

    /// Marks the hold as consumed without choosing a key (MOD long-press).
    pub fn engage(&mut self) {
        self.engaged = true;
    }

    /// Advances the cycle if `key` is the initial key; chooses it if none was chosen
    /// yet; otherwise does nothing.
    pub fn track(&mut self, key: KeyIndex) {
        self.engaged = true;
        match self.initial_key {
            None => {
                self.initial_key = Some(key);
                self.press_count = 1;
            }
            Some(initial) if initial == key => {
                // Bank selection tracks presses without a wrapping cycle, so the
                // count must not overflow no matter how long MOD stays held.
                self.press_count = self.press_count.saturating_add(1);
            }
            Some(_) => {}
        }
    }

    /// Returns the cycle to its starting point while MOD remains held. The initial key
    /// is kept, so the next press of it begins the cycle again at step 1.
    pub fn rewind(&mut self) {
        self.press_count = 0;
    }

    /// Clears the whole chord. Called only on MOD release.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Shared skeleton of every screen's chord cycle.
    ///
    /// When the cycle has not started yet (`press_count == 0`) and the caller reports
    /// that `key` was left in an alternate state by an earlier, unrelated cycle
    /// (`stale`), the cycle does not advance and `None` is returned: the caller must
    /// restore the key's default flags. Otherwise the press is tracked and the count is
    /// mapped onto the screen's effect enum, whose discriminants start at 1. The
    /// effect handling the wrap point is responsible for calling [`rewind`][Self::rewind].
    pub fn cycle_effect<E: FromPrimitive>(&mut self, key: KeyIndex, stale: bool) -> Option<E> {
        self.hold(key);
        if self.press_count == 0 && stale {
            return None;
        }
        self.track(key);
        E::from_u8(self.press_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_derive::FromPrimitive;

    #[derive(Debug, Clone, Copy, PartialEq, FromPrimitive)]
    enum Effect {
        First = 1,
        Second,
        Last,
    }

    #[test]
    fn repeated_presses_of_the_same_key_advance_the_cycle() {
        let mut chord = ChordTracker::new();
        assert_eq!(Some(Effect::First), chord.cycle_effect::<Effect>(4, false));
        assert_eq!(Some(Effect::Second), chord.cycle_effect::<Effect>(4, false));
        assert_eq!(Some(Effect::Last), chord.cycle_effect::<Effect>(4, false));
    }

    #[test]
    fn a_different_key_reapplies_the_current_effect() {
        let mut chord = ChordTracker::new();
        chord.cycle_effect::<Effect>(4, false);
        assert_eq!(
            Some(Effect::First),
            chord.cycle_effect::<Effect>(9, false),
            "A different key should not advance the cycle"
        );
        assert_eq!(Some(4), chord.initial_key(), "Expected left but got right");
    }

    #[test]
    fn stale_state_is_cleared_before_the_cycle_starts() {
        let mut chord = ChordTracker::new();
        assert_eq!(
            None,
            chord.cycle_effect::<Effect>(2, true),
            "A stale key should be cleared, not cycled"
        );
        assert_eq!(0, chord.press_count(), "Expected left but got right");
        assert!(chord.is_engaged(), "Clearing stale state still consumes the hold");
        assert_eq!(
            Some(Effect::First),
            chord.cycle_effect::<Effect>(2, false),
            "The next press should start the cycle"
        );
    }

    #[test]
    fn rewind_restarts_the_cycle_at_step_one() {
        let mut chord = ChordTracker::new();
        chord.cycle_effect::<Effect>(7, false);
        chord.cycle_effect::<Effect>(7, false);
        chord.cycle_effect::<Effect>(7, false);
        chord.rewind();
        assert_eq!(
            Some(Effect::First),
            chord.cycle_effect::<Effect>(7, false),
            "Expected left but got right"
        );
    }

    #[test]
    fn press_count_saturates_instead_of_overflowing() {
        let mut chord = ChordTracker::new();
        for _ in 0..=255 {
            chord.track(3);
        }
        assert_eq!(u8::MAX, chord.press_count(), "Expected left but got right");
        chord.track(3);
        assert_eq!(u8::MAX, chord.press_count(), "Expected left but got right");
    }

    #[test]
    fn reset_clears_everything() {
        let mut chord = ChordTracker::new();
        chord.track(3);
        chord.reset();
        assert_eq!(None, chord.initial_key());
        assert_eq!(0, chord.press_count());
        assert!(!chord.is_engaged());
    }
}
