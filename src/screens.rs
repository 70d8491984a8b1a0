//! Per-screen key handlers.
//!
//! Each handler covers one screen's bare presses and its MOD-chord cycle. The cycles
//! all run through [`ChordTracker::cycle_effect`][crate::chord::ChordTracker], with a
//! small effect enum per screen whose discriminants are the press counts; the wrap
//! step restores the key's default state and rewinds the cycle.

use num_derive::FromPrimitive;

use crate::clock::ClockTracker;
use crate::config::ModuleConfig;
use crate::controller::Controller;
use crate::io::{CvInput, RandomSource, Storage, StorageError};
use crate::memory::{Bank, CHANNEL_COUNT, ChannelIndex, KeyIndex, ModuleState, PRESET_COUNT};
use crate::navigation::Screen;

/// Chord cycle on the channel-configuration screen.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
enum ChannelSelectEffect {
    CopyPaste = 1,
    GateChannel,
    RandomChannel,
    Rewind,
}

/// Chord cycle on a gate channel's step screen.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
enum GateStepEffect {
    RandomStep = 1,
    Rewind,
}

/// Chord cycle on a CV channel's step screen.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
enum CvStepEffect {
    CopyPaste = 1,
    Lock,
    Deactivate,
    Randomize,
    Rewind,
}

/// Chord cycle on the global-edit screen, applied to all eight channels at once.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
enum GlobalEditEffect {
    CopyPaste = 1,
    LockPreset,
    DeactivatePreset,
    Rewind,
}

/// Chord cycle on the record-channel screen.
#[derive(Clone, Copy, Debug, PartialEq, FromPrimitive)]
enum RecordEffect {
    AutoRecord = 1,
    RandomInput,
    Rewind,
}

/// The four 2x2 corners of the 4x4 key grid, used by the section-select screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quadrant {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Quadrant {
    fn of(key: KeyIndex) -> Self {
        match key {
            0 | 1 | 4 | 5 => Self::NorthWest,
            2 | 3 | 6 | 7 => Self::NorthEast,
            8 | 9 | 12 | 13 => Self::SouthWest,
            _ => Self::SouthEast,
        }
    }
}

impl Controller {
    /// Bank selection: bare press selects a bank, the chord runs copy-paste only.
    pub(crate) fn handle_bank_select(&mut self, key: KeyIndex, module: &mut ModuleState) {
        if self.mod_held() {
            self.chord.track(key);
            self.copy_paste.begin_or_toggle(key);
        } else if key != module.current_bank {
            module.current_bank = key;
        }
    }

    /// Channel configuration: bare press selects the channel and opens its step
    /// screen; the chord cycles copy-paste, gate channel, random channel, back.
    pub(crate) fn handle_edit_channel_select(&mut self, key: KeyIndex, module: &mut ModuleState) {
        if key >= CHANNEL_COUNT {
            return;
        }
        module.current_channel = key;

        if !self.mod_held() {
            let _ = self.nav.go_forward(Screen::EditChannelVoltages);
            return;
        }

        let flags = *module.current_bank().channel(key);
        let stale = flags.random_output || flags.gate_channel;
        match self.chord.cycle_effect::<ChannelSelectEffect>(key, stale) {
            None => {
                let bank = module.current_bank_mut();
                bank.channels[key].random_output = false;
                if bank.channels[key].gate_channel {
                    carry_rests_to_inactive(bank, key);
                    bank.channels[key].gate_channel = false;
                }
            }
            Some(ChannelSelectEffect::CopyPaste) => self.copy_paste.begin_or_toggle(key),
            Some(ChannelSelectEffect::GateChannel) => {
                self.copy_paste.cancel();
                module.current_bank_mut().channels[key].gate_channel = true;
            }
            Some(ChannelSelectEffect::RandomChannel) => {
                let bank = module.current_bank_mut();
                bank.channels[key].gate_channel = false;
                bank.channels[key].random_output = true;
            }
            Some(ChannelSelectEffect::Rewind) => {
                module.current_bank_mut().channels[key].random_output = false;
                self.chord.rewind();
            }
        }
    }

    /// Step editing on the selected channel. Gate channels toggle steps and cycle
    /// random/back; CV channels sample on a bare press (starting continuous
    /// recording) and cycle copy-paste, lock, inactive, random, back.
    pub(crate) fn handle_edit_channel_voltages<IO>(
        &mut self,
        key: KeyIndex,
        module: &mut ModuleState,
        io: &mut IO,
    ) where
        IO: CvInput,
    {
        // Alternate preset selection, armed by a MOD long-press on this screen.
        if !self.mod_held() && self.ready_for_preset_selection {
            module.current_preset = key;
            self.ready_for_preset_selection = false;
            return;
        }

        let channel = module.current_channel;

        if module.current_bank().channel(channel).gate_channel {
            if !self.mod_held() {
                let cell = module.current_bank_mut().cell_mut(key, channel);
                cell.gate = !cell.gate;
                return;
            }
            let stale = module.current_bank().cell(key, channel).random;
            match self.chord.cycle_effect::<GateStepEffect>(key, stale) {
                None => module.current_bank_mut().cell_mut(key, channel).random = false,
                Some(GateStepEffect::RandomStep) => {
                    module.current_bank_mut().cell_mut(key, channel).random = true;
                }
                Some(GateStepEffect::Rewind) => {
                    module.current_bank_mut().cell_mut(key, channel).random = false;
                    self.chord.rewind();
                }
            }
            return;
        }

        if !self.mod_held() {
            self.selected_key_for_recording = Some(key);
            // The first sample; the tick keeps recording while the key is held.
            module.current_bank_mut().cell_mut(key, channel).voltage = io.sample();
            return;
        }

        let cell = *module.current_bank().cell(key, channel);
        let stale = cell.locked || !cell.active || cell.random;
        match self.chord.cycle_effect::<CvStepEffect>(key, stale) {
            None => {
                let cell = module.current_bank_mut().cell_mut(key, channel);
                cell.locked = false;
                cell.active = true;
                cell.random = false;
            }
            Some(CvStepEffect::CopyPaste) => self.copy_paste.begin_or_toggle(key),
            Some(CvStepEffect::Lock) => {
                self.copy_paste.cancel();
                module.current_bank_mut().cell_mut(key, channel).locked = true;
            }
            Some(CvStepEffect::Deactivate) => {
                let cell = module.current_bank_mut().cell_mut(key, channel);
                cell.locked = false;
                cell.active = false;
            }
            Some(CvStepEffect::Randomize) => {
                let cell = module.current_bank_mut().cell_mut(key, channel);
                cell.active = true;
                cell.random = true;
            }
            Some(CvStepEffect::Rewind) => {
                module.current_bank_mut().cell_mut(key, channel).random = false;
                self.chord.rewind();
            }
        }
    }

    /// Global preset editing: bare press toggles removal from the sequence; the chord
    /// cycles copy-paste, lock-all, deactivate-all, back, acting on all channels.
    pub(crate) fn handle_global_edit(&mut self, key: KeyIndex, module: &mut ModuleState) {
        if !self.mod_held() {
            if self.ready_for_preset_selection {
                module.current_preset = key;
                self.ready_for_preset_selection = false;
                return;
            }
            if module.removed_presets.is_removed(key) {
                module.removed_presets.restore(key);
            } else if !module.removed_presets.remove(key) {
                warn!("Refusing to remove the last addressable preset");
            }
            return;
        }

        let stale = {
            let bank = module.current_bank();
            let all_locked = (0..CHANNEL_COUNT).all(|ch| bank.cell(key, ch).locked);
            let all_inactive = (0..CHANNEL_COUNT).all(|ch| !bank.cell(key, ch).active);
            all_locked || all_inactive
        };
        match self.chord.cycle_effect::<GlobalEditEffect>(key, stale) {
            None => {
                let bank = module.current_bank_mut();
                for channel in 0..CHANNEL_COUNT {
                    bank.cells[key][channel].locked = false;
                    bank.cells[key][channel].active = true;
                }
            }
            Some(GlobalEditEffect::CopyPaste) => self.copy_paste.begin_or_toggle(key),
            Some(GlobalEditEffect::LockPreset) => {
                self.copy_paste.cancel();
                let bank = module.current_bank_mut();
                for channel in 0..CHANNEL_COUNT {
                    bank.cells[key][channel].locked = true;
                }
            }
            Some(GlobalEditEffect::DeactivatePreset) => {
                let bank = module.current_bank_mut();
                for channel in 0..CHANNEL_COUNT {
                    bank.cells[key][channel].locked = false;
                    bank.cells[key][channel].active = false;
                }
            }
            Some(GlobalEditEffect::Rewind) => {
                let bank = module.current_bank_mut();
                for channel in 0..CHANNEL_COUNT {
                    bank.cells[key][channel].active = true;
                }
                self.chord.rewind();
            }
        }
    }

    /// Module selection: pick a module directory and replace the whole data model
    /// from storage. A failed load keeps the data currently in memory.
    pub(crate) fn handle_module_select<IO>(
        &mut self,
        key: KeyIndex,
        module: &mut ModuleState,
        config: &mut ModuleConfig,
        io: &mut IO,
    ) where
        IO: Storage,
    {
        config.current_module = key as u8;
        match io.load_module(config.current_module) {
            Ok(loaded) => {
                info!("Loaded module {}", config.current_module);
                *module = loaded;
            }
            Err(err) => {
                warn!("Failed to load module {}: {:?}", config.current_module, err);
            }
        }
    }

    /// Channel selection for the home screen's recording flow; navigates back.
    pub(crate) fn handle_preset_channel_select(&mut self, key: KeyIndex, module: &mut ModuleState) {
        if key >= CHANNEL_COUNT {
            return;
        }
        module.current_channel = key;
        let _ = self.nav.go_back();
    }

    /// The home screen: bare press selects a preset; a MOD-held press records into
    /// the pressed preset on the current channel.
    pub(crate) fn handle_preset_select<IO>(
        &mut self,
        key: KeyIndex,
        module: &mut ModuleState,
        config: &ModuleConfig,
        io: &mut IO,
    ) where
        IO: CvInput + RandomSource,
    {
        if self.mod_held() {
            self.chord.hold(key);
            self.selected_key_for_recording = Some(key);
            let channel = module.current_channel;
            let randomized = module.current_bank().channel(channel).random_input
                || (module.current_bank().cell(key, channel).random
                    && config.random_output_overwrites);
            let value = if randomized { io.random_voltage() } else { io.sample() };
            module.current_bank_mut().cell_mut(key, channel).voltage = value;
        } else {
            module.current_preset = key;
        }
    }

    /// Recording: bare press selects a channel and samples (or waits for the next
    /// pulse when externally sequenced); the chord on the initial key cycles
    /// auto-record, random-input, back.
    pub(crate) fn handle_record_channel_select<IO>(
        &mut self,
        key: KeyIndex,
        module: &mut ModuleState,
        clock: &ClockTracker,
        io: &mut IO,
    ) where
        IO: CvInput + RandomSource,
    {
        if key >= CHANNEL_COUNT {
            return;
        }
        module.current_channel = key;
        let preset = module.current_preset;

        if !self.mod_held() {
            self.selected_key_for_recording = Some(key);
            if !clock.is_advancing() {
                // When externally sequenced the sample instead happens on the next
                // advance pulse.
                module.current_bank_mut().cell_mut(preset, key).voltage = io.sample();
            }
            return;
        }

        self.chord.hold(key);
        if self.chord.initial_key() != Some(key) {
            // Auto recording is armed on one channel at a time.
            return;
        }

        let flags = *module.current_bank().channel(key);
        let stale = flags.auto_record || flags.random_input;
        match self.chord.cycle_effect::<RecordEffect>(key, stale) {
            None => {
                let bank = module.current_bank_mut();
                bank.channels[key].auto_record = false;
                bank.channels[key].random_input = false;
            }
            Some(RecordEffect::AutoRecord) => {
                module.current_bank_mut().channels[key].auto_record = true;
            }
            Some(RecordEffect::RandomInput) => {
                // Rides on top of auto recording rather than replacing it, so the REC
                // gate records random values on this channel.
                module.current_bank_mut().channels[key].random_input = true;
                if !clock.is_advancing() {
                    module.cached_voltage = module.current_bank().cell(preset, key).voltage;
                    module.current_bank_mut().cell_mut(preset, key).voltage =
                        io.random_voltage();
                }
            }
            Some(RecordEffect::Rewind) => {
                let cached = module.cached_voltage;
                let bank = module.current_bank_mut();
                bank.channels[key].auto_record = false;
                bank.channels[key].random_input = false;
                if !clock.is_advancing() {
                    bank.cells[preset][key].voltage = cached;
                }
                self.chord.rewind();
            }
        }
    }

    /// The section hub: each corner navigates to a section, with MOD variants for
    /// module loading (SW) and the two-press bank save (SE). Any press outside the
    /// SE corner cancels a pending save.
    pub(crate) fn handle_section_select<IO>(
        &mut self,
        key: KeyIndex,
        module: &mut ModuleState,
        config: &ModuleConfig,
        io: &mut IO,
    ) where
        IO: Storage,
    {
        let quadrant = Quadrant::of(key);
        if self.ready_to_save && quadrant != Quadrant::SouthEast {
            self.ready_to_save = false;
            return;
        }

        match quadrant {
            Quadrant::NorthWest => {
                if !self.mod_held() {
                    let _ = self.nav.go_forward(Screen::EditChannelSelect);
                }
            }
            Quadrant::NorthEast => {
                if !self.mod_held() {
                    let _ = self.nav.go_forward(Screen::RecordChannelSelect);
                }
            }
            Quadrant::SouthWest => {
                if self.mod_held() {
                    self.chord.hold(key);
                    let _ = self.nav.go_forward(Screen::ModuleSelect);
                } else {
                    let _ = self.nav.go_forward(Screen::GlobalEdit);
                }
            }
            Quadrant::SouthEast => {
                if self.mod_held() || self.ready_to_save {
                    if !self.ready_to_save {
                        self.chord.hold(key);
                        self.ready_to_save = true;
                    } else {
                        self.save_current_bank(module, config, io);
                    }
                } else {
                    let _ = self.nav.go_forward(Screen::BankSelect);
                }
            }
        }
    }

    /// The confirmed save. A not-ready medium keeps the save armed so the next
    /// confirmation press retries; any other failure abandons it.
    fn save_current_bank<IO>(
        &mut self,
        module: &ModuleState,
        config: &ModuleConfig,
        io: &mut IO,
    ) where
        IO: Storage,
    {
        match io.save_bank(config.current_module, module.current_bank, module.current_bank()) {
            Ok(()) => {
                info!("Saved bank {}", module.current_bank);
                self.ready_to_save = false;
            }
            Err(StorageError::NotReady) => {
                warn!("Storage not ready, press again to retry the save");
            }
            Err(err) => {
                error!("Failed to save bank {}: {:?}", module.current_bank, err);
                self.ready_to_save = false;
            }
        }
    }
}

/// When a gate channel is converted back to CV, its silent steps become inactive
/// cells so the channel keeps its rests.
fn carry_rests_to_inactive(bank: &mut Bank, channel: ChannelIndex) {
    for preset in 0..PRESET_COUNT {
        if !bank.cells[preset][channel].gate {
            bank.cells[preset][channel].active = false;
        }
    }
}
