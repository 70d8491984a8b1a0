//! The stored "memory" of the module: 16 banks of 16 presets across 8 output channels,
//! plus the cursor and sequencing fields that select what is currently playing.
//!
//! Everything addressable by the 16 keys lives here. A single [`VoltageCell`] holds all
//! per-step data for one `(bank, preset, channel)` intersection, so the various step
//! attributes can never drift out of sync with one another.

use tinyvec::ArrayVec;

/// Number of banks per module.
pub const BANK_COUNT: usize = 16;
/// Number of presets (steps) per bank.
pub const PRESET_COUNT: usize = 16;
/// Number of output channels.
pub const CHANNEL_COUNT: usize = 8;
/// Number of illuminated keys on the panel.
pub const KEY_COUNT: usize = 16;

/// Full-scale output value at the DAC's 12-bit resolution.
pub const VOLTAGE_MAX: u16 = 4095;

/// Index of a bank, `0..16`.
pub type BankIndex = usize;
/// Index of a preset within a bank, `0..16`.
pub type PresetIndex = usize;
/// Index of an output channel, `0..8`.
pub type ChannelIndex = usize;
/// Index of a panel key, `0..16`.
pub type KeyIndex = usize;

/// All stored data for one `(bank, preset, channel)` intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VoltageCell {
    /// The stored level at 12-bit scale, `0..=4095`.
    pub voltage: u16,
    /// Inactive cells are skipped at resolution time in favor of the nearest previous
    /// active cell on the same channel.
    pub active: bool,
    /// Locked cells cannot be overwritten by recording, manual or automatic.
    pub locked: bool,
    /// Randomized cells produce a freshly generated value instead of the stored one.
    pub random: bool,
    /// Whether this step fires when the channel is configured as a gate channel.
    pub gate: bool,
}

impl Default for VoltageCell {
    fn default() -> Self {
        Self {
            voltage: 0,
            // every cell starts active, so the at-least-one-active rule holds from first boot
            active: true,
            locked: false,
            random: false,
            gate: false,
        }
    }
}

/// Per-channel configuration within one bank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelFlags {
    /// The channel emits gate/trigger levels rather than continuous CV.
    pub gate_channel: bool,
    /// The channel samples its input whenever a gate arrives at the REC jack.
    pub auto_record: bool,
    /// Every resolved output on the channel is randomized.
    pub random_output: bool,
    /// Recording on the channel captures random values instead of the CV input.
    pub random_input: bool,
}

/// One bank: per-channel flags plus the 16x8 matrix of voltage cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bank {
    /// Channel configuration flags, indexed by channel.
    pub channels: [ChannelFlags; CHANNEL_COUNT],
    /// Voltage cells, indexed by `[preset][channel]`.
    pub cells: [[VoltageCell; CHANNEL_COUNT]; PRESET_COUNT],
}

impl Default for Bank {
    fn default() -> Self {
        Self {
            channels: [ChannelFlags::default(); CHANNEL_COUNT],
            cells: [[VoltageCell::default(); CHANNEL_COUNT]; PRESET_COUNT],
        }
    }
}

impl Bank {
    /// Borrows the flags of one channel.
    pub fn channel(&self, channel: ChannelIndex) -> &ChannelFlags {
        &self.channels[channel]
    }

    /// Mutably borrows the flags of one channel.
    pub fn channel_mut(&mut self, channel: ChannelIndex) -> &mut ChannelFlags {
        &mut self.channels[channel]
    }

    /// Borrows one voltage cell.
    pub fn cell(&self, preset: PresetIndex, channel: ChannelIndex) -> &VoltageCell {
        &self.cells[preset][channel]
    }

    /// Mutably borrows one voltage cell.
    pub fn cell_mut(&mut self, preset: PresetIndex, channel: ChannelIndex) -> &mut VoltageCell {
        &mut self.cells[preset][channel]
    }
}

/// The set of presets that are skipped entirely during sequencing.
///
/// At least one preset must always remain addressable, so marking the 16th preset as
/// removed is refused at the point of removal. Readers never have to re-check the
/// invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemovedPresets {
    data: ArrayVec<[u8; PRESET_COUNT]>,
}

impl RemovedPresets {
    /// Constructs an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the preset is currently removed from the sequence.
    pub fn is_removed(&self, preset: PresetIndex) -> bool {
        self.data.contains(&(preset as u8))
    }

    /// Marks a preset as removed. Returns `false`, leaving the set unchanged, when the
    /// removal would leave no addressable preset.
    pub fn remove(&mut self, preset: PresetIndex) -> bool {
        if self.is_removed(preset) {
            return true;
        }
        if self.data.len() >= PRESET_COUNT - 1 {
            return false;
        }
        self.data.push(preset as u8);
        true
    }

    /// Puts a removed preset back into the sequence.
    pub fn restore(&mut self, preset: PresetIndex) {
        self.data.retain(|&p| p != preset as u8);
    }

    /// Number of removed presets.
    pub fn count(&self) -> usize {
        self.data.len()
    }

    /// Whether every preset has been removed. Structurally impossible through the UI,
    /// but advance logic guards on it anyway rather than trust loaded data.
    pub fn all_removed(&self) -> bool {
        self.data.len() >= PRESET_COUNT
    }
}

/// The single source of truth for everything the module has memorized, owned by the
/// control loop for the entire lifetime of the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleState {
    /// The sixteen banks of stored data.
    pub banks: [Bank; BANK_COUNT],
    /// The bank currently being played and edited.
    pub current_bank: BankIndex,
    /// The preset currently being played.
    pub current_preset: PresetIndex,
    /// The channel currently selected for recording and step editing.
    pub current_channel: ChannelIndex,
    /// Presets skipped during sequencing.
    pub removed_presets: RemovedPresets,
    /// Step size when an advance pulse arrives, nominally `1`, negated by the reverse
    /// jack. Legal range is -15..=15; out-of-range values are reset to 1 when consumed.
    pub advance_preset_addend: i8,
    /// Step size when a bank-advance pulse arrives. Same range rules as the preset
    /// addend.
    pub advance_bank_addend: i8,
    /// Stashed copy of a cell's voltage so the random-input chord step can be backed
    /// out without permanently losing the stored value. Strictly ephemeral.
    pub cached_voltage: u16,
}

impl Default for ModuleState {
    fn default() -> Self {
        Self {
            banks: [Bank::default(); BANK_COUNT],
            current_bank: 0,
            current_preset: 0,
            current_channel: 0,
            removed_presets: RemovedPresets::new(),
            advance_preset_addend: 1,
            advance_bank_addend: 1,
            cached_voltage: 0,
        }
    }
}

impl ModuleState {
    /// Borrows the bank currently being played.
    pub fn current_bank(&self) -> &Bank {
        &self.banks[self.current_bank]
    }

    /// Mutably borrows the bank currently being played.
    pub fn current_bank_mut(&mut self) -> &mut Bank {
        &mut self.banks[self.current_bank]
    }
}
