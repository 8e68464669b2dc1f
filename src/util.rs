// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Conversions between the perceptual units used for control (semitones, decibels)
//! and the linear factors used for synthesis.

/// Compute a factor measured in cents (1/100 of a semitone)
///
/// # Example
///
/// ```
/// # use sinewave::util::*;
///
/// assert_eq!(from_cents(-16.0), from_semitones(-16.0 / 100.0));
/// ```
pub fn from_cents(cents: f64) -> f64 {
    2.0f64.powf(cents / 1200.0)
}

/// Compute a factor measured in octaves (one octave corresponds to a factor of two).
///
/// # Example
///
/// ```
/// # use sinewave::util::*;
///
/// assert_eq!(from_octaves(3.0), 8.0);
/// assert_eq!(from_octaves(-1.0), 0.5);
/// ```
pub fn from_octaves(octaves: f64) -> f64 {
    2.0f64.powf(octaves)
}

/// Compute a frequency ratio measured in semitones (one octave consists of 12 semitones)
///
/// # Example
///
/// ```
/// # use sinewave::util::*;
///
/// assert_eq!(from_semitones(12.0), 2.0);
/// assert_eq!(from_semitones(3.0), from_octaves(3.0 / 12.0));
/// ```
pub fn from_semitones(semitones: f64) -> f64 {
    2.0f64.powf(semitones / 12.0)
}

/// Compute the number of semitones between two frequencies with the given ratio.
pub fn to_semitones(ratio: f64) -> f64 {
    12.0 * ratio.log2()
}

/// Compute a linear amplitude ratio from a level measured in decibels.
///
/// # Example
///
/// ```
/// # use sinewave::util::*;
///
/// assert_eq!(amplitude_from_decibels(0.0), 1.0);
/// assert_eq!(amplitude_from_decibels(20.0), 10.0);
/// assert_eq!(amplitude_from_decibels(-40.0), 1.0 / 100.0);
/// ```
pub fn amplitude_from_decibels(decibels: f64) -> f64 {
    10.0f64.powf(decibels / 20.0)
}

/// Inverse of [`amplitude_from_decibels`]. Silence maps to negative infinity.
pub fn decibels_from_amplitude(amplitude: f64) -> f64 {
    20.0 * amplitude.log10()
}
