//! Shared test doubles: a deterministic random source and an in-memory stand-in for
//! the whole hardware/storage surface.

use tinyvec::ArrayVec;

use crate::io::{
    CvInput, CvOutput, Gpio, InputLine, KeyDisplay, RandomSource, Rgb, Storage, StorageError,
};
use crate::memory::{Bank, CHANNEL_COUNT, ChannelIndex, KEY_COUNT, KeyIndex, ModuleState};

/// Small deterministic generator (64-bit LCG), so tests can replay the exact values a
/// run produced.
pub struct Lcg {
    state: u64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl RandomSource for Lcg {
    fn random_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) as u32
    }
}

/// Scriptable implementation of every collaborator trait.
pub struct FakeIo {
    pub advance: bool,
    pub record: bool,
    pub mod_button: bool,
    pub reset: bool,
    pub reverse: bool,
    pub bank_advance: bool,
    pub bank_reverse: bool,
    /// Raw 10-bit reading returned by the CV input.
    pub cv: u16,
    /// Last value written to each output channel.
    pub outputs: [u16; CHANNEL_COUNT],
    pub rng: Lcg,
    /// Module returned by `load_module` when no error is scripted.
    pub loadable: ModuleState,
    pub load_error: Option<StorageError>,
    pub save_error: Option<StorageError>,
    /// `(module, bank)` of every successful save, most recent last.
    pub saved: ArrayVec<[(u8, usize); 8]>,
    pub key_colors: [Rgb; KEY_COUNT],
}

impl Default for FakeIo {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeIo {
    pub fn new() -> Self {
        Self {
            advance: false,
            record: false,
            mod_button: false,
            reset: false,
            reverse: false,
            bank_advance: false,
            bank_reverse: false,
            cv: 0,
            outputs: [0; CHANNEL_COUNT],
            rng: Lcg::new(1),
            loadable: ModuleState::default(),
            load_error: None,
            save_error: None,
            saved: ArrayVec::new(),
            key_colors: [[0; 3]; KEY_COUNT],
        }
    }
}

impl Gpio for FakeIo {
    fn is_asserted(&mut self, line: InputLine) -> bool {
        match line {
            InputLine::Advance => self.advance,
            InputLine::Record => self.record,
            InputLine::Mod => self.mod_button,
            InputLine::Reset => self.reset,
            InputLine::Reverse => self.reverse,
            InputLine::BankAdvance => self.bank_advance,
            InputLine::BankReverse => self.bank_reverse,
        }
    }
}

impl CvInput for FakeIo {
    fn read_raw(&mut self) -> u16 {
        self.cv
    }
}

impl CvOutput for FakeIo {
    fn write_channel(&mut self, channel: ChannelIndex, value: u16) {
        self.outputs[channel] = value;
    }
}

impl RandomSource for FakeIo {
    fn random_u32(&mut self) -> u32 {
        self.rng.random_u32()
    }
}

impl Storage for FakeIo {
    fn load_module(&mut self, _module: u8) -> Result<ModuleState, StorageError> {
        match self.load_error {
            Some(err) => Err(err),
            None => Ok(self.loadable.clone()),
        }
    }

    fn save_bank(&mut self, module: u8, bank: usize, _data: &Bank) -> Result<(), StorageError> {
        match self.save_error {
            Some(err) => Err(err),
            None => {
                self.saved.push((module, bank));
                Ok(())
            }
        }
    }
}

impl KeyDisplay for FakeIo {
    fn set_key_color(&mut self, key: KeyIndex, color: Rgb) {
        self.key_colors[key] = color;
    }

    fn commit(&mut self) {}
}
