//! Copy-paste of banks, channels and presets.
//!
//! A copy-paste operation is armed by pressing a source key, extended by toggling any
//! number of target keys, and committed by releasing the MOD button. The buffer only
//! records key indices; what those indices *mean* is decided at paste time by the
//! screen the user is on.

use tinyvec::ArrayVec;

use crate::memory::{CHANNEL_COUNT, KEY_COUNT, KeyIndex, ModuleState, PRESET_COUNT};

/// What the keys of a pending copy-paste operation refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PasteScope {
    /// Keys are banks; paste duplicates entire banks.
    Bank,
    /// Keys are output channels of the current bank.
    Channel,
    /// Keys are presets; paste copies the current channel's voltage.
    Preset,
    /// Keys are presets; paste copies the voltage of all channels.
    PresetAllChannels,
}

/// The pending copy-paste selection.
#[derive(Clone, Debug, Default)]
pub struct CopyPaste {
    source: Option<KeyIndex>,
    targets: ArrayVec<[u8; KEY_COUNT]>,
}

impl CopyPaste {
    /// Creates an empty buffer with no pending operation.
    pub const fn new() -> Self {
        Self {
            source: None,
            targets: ArrayVec::from_array_empty([0; KEY_COUNT]),
        }
    }

    /// Registers a key press while a copy-paste chord is held.
    ///
    /// The first key becomes the source and an (identity) paste target; later keys
    /// toggle target membership; pressing the source again abandons the operation.
    pub fn begin_or_toggle(&mut self, key: KeyIndex) {
        match self.source {
            Some(source) if source == key => {
                self.cancel();
            }
            Some(_) => {
                if let Some(position) = self.targets.iter().position(|&t| usize::from(t) == key) {
                    self.targets.remove(position);
                } else {
                    self.targets.push(key as u8);
                }
            }
            None => {
                self.source = Some(key);
                self.targets.push(key as u8);
            }
        }
    }

    /// Discards the pending operation without writing anything.
    pub fn cancel(&mut self) {
        self.source = None;
        self.targets.clear();
    }

    /// Whether an operation is armed.
    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    /// The armed source key, if any.
    pub fn source(&self) -> Option<KeyIndex> {
        self.source
    }

    /// Whether `key` is the armed source.
    pub fn is_source(&self, key: KeyIndex) -> bool {
        self.source == Some(key)
    }

    /// Whether `key` is currently selected as a paste target.
    pub fn is_target(&self, key: KeyIndex) -> bool {
        self.targets.iter().any(|&t| usize::from(t) == key)
    }

    /// Writes the source's data over every selected target and clears the buffer.
    ///
    /// Does nothing (beyond clearing) when no source is armed.
    pub fn execute(&mut self, scope: PasteScope, module: &mut ModuleState) {
        let Some(source) = self.source.take() else {
            self.targets.clear();
            return;
        };
        debug!("Pasting {} targets from source {}", self.targets.len(), source);
        for target in self.targets.drain(..) {
            let target = usize::from(target);
            match scope {
                PasteScope::Bank => {
                    module.banks[target] = module.banks[source];
                }
                PasteScope::Channel => {
                    paste_channel(module, source, target);
                }
                PasteScope::Preset => {
                    let channel = module.current_channel;
                    let bank = module.current_bank_mut();
                    bank.cells[target][channel].voltage = bank.cells[source][channel].voltage;
                }
                PasteScope::PresetAllChannels => {
                    let bank = module.current_bank_mut();
                    for channel in 0..CHANNEL_COUNT {
                        bank.cells[target][channel].voltage = bank.cells[source][channel].voltage;
                    }
                }
            }
        }
    }
}

/// Duplicates one output channel of the current bank onto another.
///
/// A gate channel source carries its gate steps and the gate flag; a CV source
/// carries voltages and activation.
fn paste_channel(module: &mut ModuleState, source: KeyIndex, target: KeyIndex) {
    let bank = module.current_bank_mut();
    if bank.channels[source].gate_channel {
        bank.channels[target].gate_channel = true;
        for preset in 0..PRESET_COUNT {
            bank.cells[preset][target].gate = bank.cells[preset][source].gate;
        }
    } else {
        bank.channels[target].gate_channel = false;
        for preset in 0..PRESET_COUNT {
            bank.cells[preset][target].voltage = bank.cells[preset][source].voltage;
            bank.cells[preset][target].active = bank.cells[preset][source].active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_arms_then_targets_toggle() {
        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(3);
        assert!(cp.is_source(3), "Expected key 3 to be the source");
        assert!(cp.is_target(3), "The source marks itself as an identity target");
        cp.begin_or_toggle(7);
        assert!(cp.is_target(7), "Expected key 7 to be a target");
        cp.begin_or_toggle(7);
        assert!(!cp.is_target(7), "Expected key 7 to be deselected");
    }

    #[test]
    fn pressing_the_source_again_cancels() {
        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(3);
        cp.begin_or_toggle(8);
        cp.begin_or_toggle(3);
        assert!(!cp.has_source(), "Expected the operation to be abandoned");
        assert!(!cp.is_target(8), "Expected targets to clear on cancel");
    }

    #[test]
    fn bank_paste_duplicates_whole_banks() {
        let mut module = ModuleState::default();
        module.banks[2].cells[5][1].voltage = 1234;
        module.banks[2].cells[5][1].locked = true;
        module.banks[2].channels[1].gate_channel = true;

        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(2);
        cp.begin_or_toggle(9);
        cp.begin_or_toggle(14);
        cp.execute(PasteScope::Bank, &mut module);

        for target in [9, 14] {
            assert_eq!(
                1234, module.banks[target].cells[5][1].voltage,
                "Expected left but got right"
            );
            assert!(module.banks[target].cells[5][1].locked, "Expected lock to carry over");
            assert!(
                module.banks[target].channels[1].gate_channel,
                "Expected channel flags to carry over"
            );
        }
        assert!(!cp.has_source(), "Expected buffer to clear after paste");
        assert!(!cp.is_target(9), "Expected targets to clear after paste");
    }

    #[test]
    fn cv_channel_paste_copies_voltage_and_activation() {
        let mut module = ModuleState::default();
        module.banks[0].cells[4][2].voltage = 800;
        module.banks[0].cells[4][2].active = false;
        module.banks[0].cells[4][6].gate = true;

        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(2);
        cp.begin_or_toggle(6);
        cp.execute(PasteScope::Channel, &mut module);

        assert_eq!(800, module.banks[0].cells[4][6].voltage, "Expected left but got right");
        assert!(!module.banks[0].cells[4][6].active, "Expected activation to carry over");
        assert!(module.banks[0].cells[4][6].gate, "Expected gate steps to be untouched");
    }

    #[test]
    fn gate_channel_paste_copies_gates_and_flag() {
        let mut module = ModuleState::default();
        module.banks[0].channels[1].gate_channel = true;
        module.banks[0].cells[0][1].gate = true;
        module.banks[0].cells[9][1].gate = true;
        module.banks[0].cells[0][5].voltage = 777;

        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(1);
        cp.begin_or_toggle(5);
        cp.execute(PasteScope::Channel, &mut module);

        assert!(module.banks[0].channels[5].gate_channel, "Expected gate flag to carry over");
        assert!(module.banks[0].cells[0][5].gate, "Expected gate step to carry over");
        assert!(module.banks[0].cells[9][5].gate, "Expected gate step to carry over");
        assert_eq!(
            777, module.banks[0].cells[0][5].voltage,
            "Expected voltages to be untouched"
        );
    }

    #[test]
    fn preset_paste_copies_only_current_channel_voltage() {
        let mut module = ModuleState::default();
        module.current_channel = 3;
        module.banks[0].cells[2][3].voltage = 555;
        module.banks[0].cells[2][4].voltage = 999;

        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(2);
        cp.begin_or_toggle(11);
        cp.execute(PasteScope::Preset, &mut module);

        assert_eq!(555, module.banks[0].cells[11][3].voltage, "Expected left but got right");
        assert_ne!(999, module.banks[0].cells[11][4].voltage, "Expected other channels untouched");
    }

    #[test]
    fn preset_all_channels_paste_covers_every_channel() {
        let mut module = ModuleState::default();
        for channel in 0..CHANNEL_COUNT {
            module.banks[0].cells[0][channel].voltage = 100 + channel as u16;
        }

        let mut cp = CopyPaste::new();
        cp.begin_or_toggle(0);
        cp.begin_or_toggle(15);
        cp.execute(PasteScope::PresetAllChannels, &mut module);

        for channel in 0..CHANNEL_COUNT {
            assert_eq!(
                100 + channel as u16,
                module.banks[0].cells[15][channel].voltage,
                "Expected left but got right"
            );
        }
    }

    #[test]
    fn execute_without_source_is_a_no_op() {
        let mut module = ModuleState::default();
        let pristine = module.banks[0];
        let mut cp = CopyPaste::new();
        cp.execute(PasteScope::Bank, &mut module);
        assert_eq!(
            pristine.cells[0][0].voltage, module.banks[0].cells[0][0].voltage,
            "Expected left but got right"
        );
    }
}
