//! Preset and bank advancement with wraparound and removed-preset skipping.
//!
//! The search for the next non-removed preset is a bounded loop rather than a
//! recursion: with a step size other than 1 it is possible for every *reachable* slot
//! to be removed even while addressable presets remain elsewhere, so the loop gives up
//! after one full lap and holds the current position for the tick.

use crate::memory::{BANK_COUNT, BankIndex, PRESET_COUNT, PresetIndex, RemovedPresets};

/// Wraps `value` into `0..len`.
pub fn wrap_index(value: i32, len: usize) -> usize {
    value.rem_euclid(len as i32) as usize
}

/// Returns `addend` if it is within the legal -15..=15 range, otherwise logs a warning
/// and falls back to a step of 1.
pub fn clamp_addend(addend: i8) -> i8 {
    if (-(PRESET_COUNT as i8 - 1)..=(PRESET_COUNT as i8 - 1)).contains(&addend) {
        addend
    } else {
        warn!("Advance addend {} out of range, resetting it to 1", addend);
        1
    }
}

/// The index of the next preset to play: steps by `addend`, wrapping modulo 16 and
/// skipping removed presets. When no non-removed preset is reachable within one full
/// lap, the current preset is returned and the sequence holds its position.
pub fn next_preset(current: PresetIndex, addend: i8, removed: &RemovedPresets) -> PresetIndex {
    let mut preset = current;
    for _ in 0..PRESET_COUNT {
        preset = wrap_index(preset as i32 + i32::from(addend), PRESET_COUNT);
        if !removed.is_removed(preset) {
            return preset;
        }
    }
    current
}

/// The index of the next bank: steps by `addend`, wrapping modulo 16. Banks cannot be
/// removed from the sequence.
pub fn next_bank(current: BankIndex, addend: i8) -> BankIndex {
    wrap_index(current as i32 + i32::from(addend), BANK_COUNT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_wraps_around_the_sequence() {
        let removed = RemovedPresets::new();
        assert_eq!(0, next_preset(15, 1, &removed), "Expected left but got right");
        assert_eq!(15, next_preset(0, -1, &removed), "Expected left but got right");
        assert_eq!(1, next_preset(14, 3, &removed), "Expected left but got right");
    }

    #[test]
    fn removed_presets_are_skipped() {
        let mut removed = RemovedPresets::new();
        removed.remove(1);
        removed.remove(2);
        assert_eq!(3, next_preset(0, 1, &removed), "Expected left but got right");
    }

    #[test]
    fn skipping_wraps_past_the_end_of_the_sequence() {
        let mut removed = RemovedPresets::new();
        removed.remove(15);
        removed.remove(0);
        assert_eq!(1, next_preset(14, 1, &removed), "Expected left but got right");
    }

    #[test]
    fn unreachable_lap_holds_the_current_position() {
        // With a step of 2 from preset 0, only even presets are reachable; removing
        // them all must not hang even though odd presets remain.
        let mut removed = RemovedPresets::new();
        for preset in [0, 2, 4, 6, 8, 10, 12, 14] {
            removed.remove(preset);
        }
        assert_eq!(0, next_preset(0, 2, &removed), "Expected left but got right");
    }

    #[test]
    fn out_of_range_addends_reset_to_one() {
        assert_eq!(1, clamp_addend(16));
        assert_eq!(1, clamp_addend(-16));
        assert_eq!(-15, clamp_addend(-15), "Expected left but got right");
        assert_eq!(3, clamp_addend(3), "Expected left but got right");
    }

    #[test]
    fn bank_advancement_wraps() {
        assert_eq!(0, next_bank(15, 1), "Expected left but got right");
        assert_eq!(15, next_bank(0, -1), "Expected left but got right");
    }
}
