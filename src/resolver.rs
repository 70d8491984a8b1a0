//! Resolution of stored data into the value driven onto an output channel.
//!
//! Resolution is performed for every channel on every loop iteration, so with
//! read-time randomization disabled it must be a pure read: the same memory, clock
//! state and instant always resolve to the same value, and nothing in memory is
//! modified. Write-time randomization instead mutates memory once per advance pulse
//! via [`scramble_preset`] and leaves resolution fully deterministic.

use embassy_time::Instant;

use crate::clock::ClockTracker;
use crate::config::ModuleConfig;
use crate::io::RandomSource;
use crate::memory::{CHANNEL_COUNT, ChannelIndex, ModuleState, PRESET_COUNT, PresetIndex, VOLTAGE_MAX};

/// Failure to resolve an output value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResolveError {
    /// Every preset on the channel is inactive, so there is no voltage to fall back
    /// to. Loaded data can be in this state even though the editing screens forbid it.
    NoActivePreset {
        /// The channel that could not be resolved.
        channel: ChannelIndex,
    },
}

/// Resolves the value to drive onto `channel` while `preset` is playing.
///
/// Gate channels resolve to full scale while the gate is high and zero otherwise.
/// CV channels resolve the stored voltage, substituting the nearest previous active
/// preset when the addressed one is inactive, and substituting a fresh random value
/// when read-time randomization applies.
pub fn resolve<R: RandomSource>(
    module: &ModuleState,
    preset: PresetIndex,
    channel: ChannelIndex,
    clock: &ClockTracker,
    config: &ModuleConfig,
    random: &mut R,
    now: Instant,
) -> Result<u16, ResolveError> {
    let bank = module.current_bank();
    let cell = bank.cell(preset, channel);

    if bank.channel(channel).gate_channel {
        let gate = if !config.random_output_overwrites && cell.random {
            random.coin_flip()
        } else {
            cell.gate
        };
        return Ok(if gate && clock.gate_open(now) { VOLTAGE_MAX } else { 0 });
    }

    if cell.active {
        return Ok(cv_value(module, preset, channel, config, random));
    }

    // Walk backward through the sequence for the most recent active preset.
    for step in 1..PRESET_COUNT {
        let candidate = (preset + PRESET_COUNT - step) % PRESET_COUNT;
        if bank.cell(candidate, channel).active {
            return Ok(cv_value(module, candidate, channel, config, random));
        }
    }
    Err(ResolveError::NoActivePreset { channel })
}

/// The CV value of one active cell, honoring read-time randomization.
fn cv_value<R: RandomSource>(
    module: &ModuleState,
    preset: PresetIndex,
    channel: ChannelIndex,
    config: &ModuleConfig,
    random: &mut R,
) -> u16 {
    let bank = module.current_bank();
    let cell = bank.cell(preset, channel);
    if !config.random_output_overwrites
        && (bank.channel(channel).random_output || cell.random)
    {
        random.random_voltage()
    } else {
        cell.voltage
    }
}

/// Overwrites the randomized cells of one preset with fresh values.
///
/// Only used when write-time randomization is configured; called once per advance
/// pulse for the preset about to play. Gate channels flip their gate step, CV channels
/// receive a new voltage.
pub fn scramble_preset<R: RandomSource>(
    module: &mut ModuleState,
    preset: PresetIndex,
    random: &mut R,
) {
    let bank = module.current_bank_mut();
    for channel in 0..CHANNEL_COUNT {
        let flags = bank.channels[channel];
        let cell = &mut bank.cells[preset][channel];
        if flags.random_output || cell.random {
            if flags.gate_channel {
                cell.gate = random.coin_flip();
            } else {
                cell.voltage = random.random_voltage();
            }
        }
    }
}
