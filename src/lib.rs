//! This crate contains the hardware-agnostic control core of Keepsake, a
//! [Eurorack](https://en.wikipedia.org/wiki/Eurorack) module that memorizes banks of
//! [CV/gate](https://en.wikipedia.org/wiki/CV/gate) presets behind a 4x4 grid of
//! illuminated keys. The crate owns the data model, the modal screen state machine,
//! chorded key handling, clock classification and voltage resolution; the embedding
//! supplies pins, DAC, storage and an executor through the traits in [`io`].

#![deny(missing_docs)]
#![no_std]

#[macro_use]
mod fmt;

pub mod advance;
pub mod chord;
pub mod clock;
pub mod config;
pub mod controller;
pub mod copy_paste;
pub mod io;

/// Data structures for everything the module memorizes.
pub mod memory;

pub mod navigation;
pub mod resolver;
mod screens;

#[cfg(test)]
mod test_support;
