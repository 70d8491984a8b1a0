//! Interfaces to the hardware and storage collaborators.
//!
//! The core never touches pins, DACs or the filesystem itself; an embedding implements
//! these traits and hands them to the control loop. Keeping the seams here means the
//! whole interaction machine can be exercised on a development host with test doubles.

use crate::memory::{Bank, BankIndex, ChannelIndex, KeyIndex, ModuleState, VOLTAGE_MAX};

/// Highest value the 10-bit ADC can produce.
pub const ADC_MAX: u16 = 1023;

/// The named digital input lines of the panel and jacks.
///
/// Implementations report the *asserted* state of a line; whether a jack is wired
/// active-high or active-low is the embedding's concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputLine {
    /// Gate that advances the current preset.
    Advance,
    /// Gate that triggers sampling on auto-record channels.
    Record,
    /// The MOD button.
    Mod,
    /// Gate that resets preset advancement to the first preset.
    Reset,
    /// Gate that reverses the direction of preset advancement.
    Reverse,
    /// Gate that advances the current bank.
    BankAdvance,
    /// Gate that reverses the direction of bank advancement.
    BankReverse,
}

/// Digital input lines, polled once per loop iteration.
pub trait Gpio {
    /// Whether `line` is currently asserted.
    fn is_asserted(&mut self, line: InputLine) -> bool;
}

/// The CV input jack.
pub trait CvInput {
    /// Reads the input at the ADC's native 10-bit resolution.
    fn read_raw(&mut self) -> u16;

    /// Reads the input scaled up to the 12-bit range used for storage and output.
    fn sample(&mut self) -> u16 {
        ten_bit_to_twelve_bit(self.read_raw())
    }
}

/// The CV/gate output channels (DAC).
pub trait CvOutput {
    /// Writes a 12-bit value to one output channel.
    fn write_channel(&mut self, channel: ChannelIndex, value: u16);
}

/// Source of uniformly distributed random numbers.
pub trait RandomSource {
    /// Returns a uniformly distributed 32-bit value.
    fn random_u32(&mut self) -> u32;

    /// Returns a value in `0..bound`. `bound` must be non-zero.
    fn below(&mut self, bound: u32) -> u32 {
        self.random_u32() % bound
    }

    /// Fair coin flip.
    fn coin_flip(&mut self) -> bool {
        self.below(2) == 1
    }

    /// A random voltage covering the full 12-bit output range.
    fn random_voltage(&mut self) -> u16 {
        self.below(u32::from(VOLTAGE_MAX) + 1) as u16
    }
}

/// Failure reported by the persistence collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// The backing medium is not ready yet; retrying shortly may succeed.
    NotReady,
    /// The requested module or bank does not exist on the medium.
    NotFound,
    /// The stored data could not be parsed.
    Malformed,
    /// Any other input/output failure.
    Io,
}

/// Persistence of module data.
///
/// A load replaces the whole data model; a save is an explicit, user-triggered
/// snapshot of a single bank. The core never serializes anything itself.
pub trait Storage {
    /// Loads the full data model of the module stored at `module`.
    fn load_module(&mut self, module: u8) -> Result<ModuleState, StorageError>;

    /// Persists one bank of the module stored at `module`.
    fn save_bank(&mut self, module: u8, bank: BankIndex, data: &Bank) -> Result<(), StorageError>;
}

/// A color as `[red, green, blue]`.
pub type Rgb = [u8; 3];

/// The 16 illuminated keys.
///
/// Color choice is a pure function of core state and lives entirely in the embedding;
/// the core only promises that its state accessors are sufficient input for it.
pub trait KeyDisplay {
    /// Stages a color for one key.
    fn set_key_color(&mut self, key: KeyIndex, color: Rgb);

    /// Pushes all staged colors to the hardware.
    fn commit(&mut self);
}

/// Scales a 10-bit ADC reading up to the 12-bit range, mapping the endpoints exactly.
pub fn ten_bit_to_twelve_bit(n: u16) -> u16 {
    if n > ADC_MAX {
        warn!("Invalid 10-bit reading: {}", n);
        0
    } else if n == ADC_MAX {
        VOLTAGE_MAX
    } else {
        n << 2
    }
}
