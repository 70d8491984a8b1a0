//! Rarely-changing module configuration.
//!
//! These values come from the persistence collaborator at startup and, with the
//! exception of the module selection, never change while the module is running.

use embassy_time::Duration;

/// Global configuration for the module.
///
/// Unlike [`ModuleState`][crate::memory::ModuleState], nothing here is edited through
/// the 16 keys; the values are populated from storage at boot and treated as fixed.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleConfig {
    /// `true` for the default "controller" panel orientation with the keys toward the
    /// performer. The inverted panel flips the key indices, so `false` makes the
    /// controller mirror every key event.
    pub controller_orientation: bool,
    /// Which module directory to load banks from. Selected on the module-select screen.
    pub current_module: u8,
    /// How long after the last advance pulse the module still counts as being
    /// externally sequenced.
    pub max_advance_interval: Duration,
    /// Permissible deviation, as a fraction of the average pulse interval, within
    /// which advance pulses still count as a regular clock. `0.1` means +/- 10%.
    pub clock_tolerance: f32,
    /// When `true`, randomization writes fresh values into memory each time the
    /// sequence advances; when `false`, random values are generated at read time and
    /// the stored data is never touched.
    pub random_output_overwrites: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            controller_orientation: true,
            current_module: 0,
            max_advance_interval: Duration::from_millis(2000),
            clock_tolerance: 0.1,
            random_output_overwrites: false,
        }
    }
}
