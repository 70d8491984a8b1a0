//! The top-level interaction machine: MOD button, jack inputs, key dispatch and the
//! per-tick output refresh.
//!
//! One [`Controller`] owns the navigation stack, the chord tracker and the copy-paste
//! buffer. The embedding calls [`tick`][Controller::tick] once per loop iteration with
//! the loop's start instant and forwards debounced key transitions to
//! [`handle_key_event`][Controller::handle_key_event]. Ordering within a tick matters:
//! the MOD button is evaluated before the jacks so that a release navigates or pastes
//! before any pulse arriving in the same iteration is interpreted.

use embassy_time::{Duration, Instant};

use crate::advance::{clamp_addend, next_bank, next_preset};
use crate::chord::ChordTracker;
use crate::clock::ClockTracker;
use crate::config::ModuleConfig;
use crate::copy_paste::{CopyPaste, PasteScope};
use crate::io::{CvInput, CvOutput, Gpio, InputLine, RandomSource, Storage};
use crate::memory::{CHANNEL_COUNT, ChannelIndex, KEY_COUNT, KeyIndex, ModuleState};
use crate::navigation::{NavigationStack, Screen};
use crate::resolver;

/// How long after a MOD press the release is ignored as switch bounce.
pub const MOD_DEBOUNCE: Duration = Duration::from_millis(300);

/// How long MOD must be held, with no key pressed, to count as a long press.
pub const LONG_PRESS: Duration = Duration::from_millis(1500);

/// Transition direction of a key event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    /// The key was pressed.
    Rising,
    /// The key was released.
    Falling,
}

/// A debounced transition of one of the 16 keys, as reported by the embedding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// Hardware key index, `0..16`, before any orientation flip.
    pub key: KeyIndex,
    /// Press or release.
    pub edge: Edge,
}

/// Fire-once edge detector for a jack input, re-armed when the line deasserts.
#[derive(Clone, Copy, Debug)]
struct Latch {
    ready: bool,
}

impl Latch {
    const fn new() -> Self {
        Self { ready: true }
    }

    /// Returns `true` exactly once per assertion.
    fn poll(&mut self, asserted: bool) -> bool {
        if self.ready && asserted {
            self.ready = false;
            return true;
        }
        if !self.ready && !asserted {
            self.ready = true;
        }
        false
    }

    /// Whether the line is currently held asserted (fired and not yet released).
    fn is_held(&self) -> bool {
        !self.ready
    }
}

/// The interaction state machine.
pub struct Controller {
    pub(crate) nav: NavigationStack,
    pub(crate) chord: ChordTracker,
    pub(crate) copy_paste: CopyPaste,
    advance_latch: Latch,
    record_latch: Latch,
    reset_latch: Latch,
    reverse_latch: Latch,
    bank_advance_latch: Latch,
    bank_reverse_latch: Latch,
    ready_for_key_press: bool,
    pub(crate) ready_for_mod_press: bool,
    last_mod_press: Instant,
    pub(crate) ready_for_preset_selection: bool,
    pub(crate) ready_to_save: bool,
    pub(crate) selected_key_for_recording: Option<KeyIndex>,
    pub(crate) reset_requested: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// Constructs a controller sitting idle on the home screen.
    pub fn new() -> Self {
        Self {
            nav: NavigationStack::new(),
            chord: ChordTracker::new(),
            copy_paste: CopyPaste::new(),
            advance_latch: Latch::new(),
            record_latch: Latch::new(),
            reset_latch: Latch::new(),
            reverse_latch: Latch::new(),
            bank_advance_latch: Latch::new(),
            bank_reverse_latch: Latch::new(),
            ready_for_key_press: true,
            ready_for_mod_press: true,
            last_mod_press: Instant::from_ticks(0),
            ready_for_preset_selection: false,
            ready_to_save: false,
            selected_key_for_recording: None,
            reset_requested: false,
        }
    }

    /// The screen currently presented.
    pub fn screen(&self) -> Screen {
        self.nav.current()
    }

    /// The current MOD chord, for display purposes.
    pub fn chord(&self) -> &ChordTracker {
        &self.chord
    }

    /// The pending copy-paste selection, for display purposes.
    pub fn copy_paste(&self) -> &CopyPaste {
        &self.copy_paste
    }

    /// Whether a save is armed and awaiting its confirmation press.
    pub fn ready_to_save(&self) -> bool {
        self.ready_to_save
    }

    /// The key held for continuous recording, if any.
    pub fn selected_key_for_recording(&self) -> Option<KeyIndex> {
        self.selected_key_for_recording
    }

    /// Whether the alternate preset-selection flow is armed.
    pub fn ready_for_preset_selection(&self) -> bool {
        self.ready_for_preset_selection
    }

    /// Takes the pending reboot request, if a key was pressed on the error screen.
    /// Performing the reboot is the embedding's job.
    pub fn take_reset_request(&mut self) -> bool {
        let requested = self.reset_requested;
        self.reset_requested = false;
        requested
    }

    pub(crate) fn mod_held(&self) -> bool {
        !self.ready_for_mod_press
    }

    /// One loop iteration: polls the MOD button and every jack, runs continuous
    /// recording, and refreshes all eight outputs.
    pub fn tick<IO>(
        &mut self,
        now: Instant,
        module: &mut ModuleState,
        config: &ModuleConfig,
        clock: &mut ClockTracker,
        io: &mut IO,
    ) where
        IO: Gpio + CvInput + CvOutput + RandomSource,
    {
        clock.tick(now, config);

        let mod_held = io.is_asserted(InputLine::Mod);
        self.handle_mod_button(now, mod_held, module);

        if self.reset_latch.poll(io.is_asserted(InputLine::Reset)) {
            info!("RESET input");
            module.current_preset = 0;
        }
        if self.bank_reverse_latch.poll(io.is_asserted(InputLine::BankReverse)) {
            info!("BANK REV input");
            module.advance_bank_addend = module.advance_bank_addend.saturating_neg();
        }
        if self.bank_advance_latch.poll(io.is_asserted(InputLine::BankAdvance)) {
            info!("BANK ADV input");
            module.advance_bank_addend = clamp_addend(module.advance_bank_addend);
            module.current_bank = next_bank(module.current_bank, module.advance_bank_addend);
        }
        if self.reverse_latch.poll(io.is_asserted(InputLine::Reverse)) {
            info!("REV input");
            module.advance_preset_addend = module.advance_preset_addend.saturating_neg();
        }
        if self.advance_latch.poll(io.is_asserted(InputLine::Advance)) {
            self.handle_advance_pulse(now, module, config, clock, io);
        }
        if self.record_latch.poll(io.is_asserted(InputLine::Record)) {
            initial_record_sample(module, io);
        }

        self.record_continuously(module, clock, io);
        self.refresh_outputs(now, module, config, clock, io);
    }

    /// Dispatches a key transition to the current screen's handler.
    ///
    /// A rising edge is handled once and arms a falling-edge guard; the falling edge
    /// re-arms key handling and ends any continuous recording. The key index is
    /// mirrored when the panel is mounted upside down.
    pub fn handle_key_event<IO>(
        &mut self,
        event: KeyEvent,
        module: &mut ModuleState,
        config: &mut ModuleConfig,
        clock: &ClockTracker,
        io: &mut IO,
    ) where
        IO: CvInput + RandomSource + Storage,
    {
        match event.edge {
            Edge::Rising if self.ready_for_key_press => {
                if event.key >= KEY_COUNT {
                    warn!("Ignoring out-of-range key {}", event.key);
                    return;
                }
                self.ready_for_key_press = false;
                let key = if config.controller_orientation {
                    event.key
                } else {
                    KEY_COUNT - 1 - event.key
                };
                match self.nav.current() {
                    Screen::BankSelect => self.handle_bank_select(key, module),
                    Screen::EditChannelSelect => self.handle_edit_channel_select(key, module),
                    Screen::EditChannelVoltages => {
                        self.handle_edit_channel_voltages(key, module, io)
                    }
                    Screen::Error => {
                        self.reset_requested = true;
                    }
                    Screen::GlobalEdit => self.handle_global_edit(key, module),
                    Screen::ModuleSelect => self.handle_module_select(key, module, config, io),
                    Screen::PresetChannelSelect => self.handle_preset_channel_select(key, module),
                    Screen::PresetSelect => self.handle_preset_select(key, module, config, io),
                    Screen::RecordChannelSelect => {
                        self.handle_record_channel_select(key, module, clock, io)
                    }
                    Screen::SectionSelect => self.handle_section_select(key, module, config, io),
                }
            }
            Edge::Falling if !self.ready_for_key_press => {
                self.ready_for_key_press = true;
                self.selected_key_for_recording = None;
            }
            _ => {}
        }
    }

    /// Long-press detection, press latching and debounced release handling for the
    /// MOD button.
    fn handle_mod_button(&mut self, now: Instant, held: bool, module: &mut ModuleState) {
        // A long press with no chord key chosen yet fires while the button is still
        // down, and marks the hold consumed so the release does not also navigate.
        if self.mod_held()
            && !self.chord.is_engaged()
            && now >= self.last_mod_press
            && now - self.last_mod_press > LONG_PRESS
        {
            self.chord.engage();
            match self.nav.current() {
                Screen::PresetSelect => {
                    let _ = self.nav.go_forward(Screen::PresetChannelSelect);
                }
                Screen::EditChannelVoltages | Screen::GlobalEdit => {
                    self.ready_for_preset_selection = true;
                }
                _ => {}
            }
            return;
        }

        if self.ready_for_mod_press && held {
            self.ready_for_mod_press = false;
            self.last_mod_press = now;
            return;
        }

        // The release is ignored until the debounce time has elapsed. `now` earlier
        // than the press can only mean the monotonic clock started over, in which
        // case the debounce is treated as elapsed.
        if self.mod_held()
            && !held
            && (now < self.last_mod_press || now - self.last_mod_press > MOD_DEBOUNCE)
        {
            self.finish_mod_press(module);
            self.ready_for_mod_press = true;
        }
    }

    /// What a MOD release means depends on what happened during the hold: finish a
    /// chord (pasting if one was armed), confirm a pending cancel, or navigate.
    fn finish_mod_press(&mut self, module: &mut ModuleState) {
        if self.chord.is_engaged() {
            self.chord.reset();
            if self.copy_paste.has_source() {
                match self.nav.current() {
                    Screen::BankSelect => self.copy_paste.execute(PasteScope::Bank, module),
                    Screen::EditChannelSelect => {
                        self.copy_paste.execute(PasteScope::Channel, module)
                    }
                    Screen::EditChannelVoltages => {
                        self.copy_paste.execute(PasteScope::Preset, module)
                    }
                    Screen::GlobalEdit => {
                        self.copy_paste.execute(PasteScope::PresetAllChannels, module)
                    }
                    _ => {
                        warn!("Copy-paste armed on a screen with no paste scope");
                        self.copy_paste.cancel();
                    }
                }
            }
        } else if self.nav.current() == Screen::SectionSelect && self.ready_to_save {
            self.ready_to_save = false;
        } else if self.nav.current() == Screen::PresetSelect {
            let _ = self.nav.go_forward(Screen::SectionSelect);
        } else if self.ready_for_preset_selection {
            self.ready_for_preset_selection = false;
        } else {
            let _ = self.nav.go_back();
        }
    }

    /// An advance pulse: step to the next preset (scrambling it first when write-time
    /// randomization is on), feed the clock tracker, and sample if a record key is
    /// held.
    fn handle_advance_pulse<IO>(
        &mut self,
        now: Instant,
        module: &mut ModuleState,
        config: &ModuleConfig,
        clock: &mut ClockTracker,
        io: &mut IO,
    ) where
        IO: CvInput + RandomSource,
    {
        module.advance_preset_addend = clamp_addend(module.advance_preset_addend);
        if module.removed_presets.all_removed() {
            warn!("Every preset is marked removed, holding the current preset");
        } else {
            let next = next_preset(
                module.current_preset,
                module.advance_preset_addend,
                &module.removed_presets,
            );
            if config.random_output_overwrites {
                resolver::scramble_preset(module, next, io);
            }
            module.current_preset = next;
        }

        // A record key held while externally sequenced samples on the pulse, not on
        // the press.
        if self.nav.current() == Screen::RecordChannelSelect {
            if let Some(channel) = self.selected_key_for_recording {
                record_on_selected_channel(module, channel, io);
            }
        }

        clock.on_advance_pulse(now);
    }

    /// Recording that happens every tick rather than on an edge: a held key on a
    /// recording-capable screen, or auto-record channels while the REC gate is held.
    fn record_continuously<IO>(&self, module: &mut ModuleState, clock: &ClockTracker, io: &mut IO)
    where
        IO: CvInput,
    {
        if let Some(key) = self.selected_key_for_recording {
            match self.nav.current() {
                Screen::EditChannelVoltages | Screen::PresetSelect => {
                    let channel = module.current_channel;
                    if !module.current_bank().channels[channel].random_input {
                        module.current_bank_mut().cells[key][channel].voltage = io.sample();
                    }
                }
                Screen::RecordChannelSelect if !clock.is_advancing() => {
                    record_on_selected_channel(module, key, io);
                }
                _ => {}
            }
        } else if self.record_latch.is_held() && !clock.is_advancing() {
            auto_record(module, io);
        }
    }

    /// Resolves all eight channels and writes the results to the DAC. A channel that
    /// fails to resolve keeps its previously written value for this tick.
    fn refresh_outputs<IO>(
        &self,
        now: Instant,
        module: &ModuleState,
        config: &ModuleConfig,
        clock: &ClockTracker,
        io: &mut IO,
    ) where
        IO: CvOutput + RandomSource,
    {
        for channel in 0..CHANNEL_COUNT {
            match resolver::resolve(module, module.current_preset, channel, clock, config, io, now)
            {
                Ok(value) => io.write_channel(channel, value),
                Err(err) => warn!("Leaving a channel unrefreshed: {:?}", err),
            }
        }
    }
}

/// Samples into the selected channel at the current preset, unless the cell is locked.
fn record_on_selected_channel<IO: CvInput>(
    module: &mut ModuleState,
    channel: ChannelIndex,
    io: &mut IO,
) {
    let preset = module.current_preset;
    let bank = module.current_bank_mut();
    if !bank.cells[preset][channel].locked {
        bank.cells[preset][channel].voltage = io.sample();
    }
}

/// The initial sample fired by a rising edge on the REC jack: every auto-record
/// channel captures the input (or a random value for random-input channels).
fn initial_record_sample<IO: CvInput + RandomSource>(module: &mut ModuleState, io: &mut IO) {
    let preset = module.current_preset;
    for channel in 0..CHANNEL_COUNT {
        let flags = *module.current_bank().channel(channel);
        if flags.auto_record {
            let value = if flags.random_input {
                io.random_voltage()
            } else {
                io.sample()
            };
            module.current_bank_mut().cells[preset][channel].voltage = value;
        }
    }
}

/// Continuous auto-recording while the REC gate stays high, skipping locked cells and
/// random-input channels (those only sample on the edge).
fn auto_record<IO: CvInput>(module: &mut ModuleState, io: &mut IO) {
    let preset = module.current_preset;
    for channel in 0..CHANNEL_COUNT {
        let flags = *module.current_bank().channel(channel);
        if flags.auto_record
            && !flags.random_input
            && !module.current_bank().cells[preset][channel].locked
        {
            module.current_bank_mut().cells[preset][channel].voltage = io.sample();
        }
    }
}
