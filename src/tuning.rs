// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use crate::util;

/// Frequency of middle C (C4) in concert tuning with A4 at 440 Hz.
pub const MIDDLE_C: f64 = 261.625_565_300_6;

/// Defines the tuning of a voice by assigning a frequency to pitch zero.
/// Pitches are measured in semitones relative to that reference,
/// fractional pitches are allowed.
///
/// # Examples
///
/// ```
/// use sinewave::tuning::*;
/// let concert = Tuning { reference_frequency: 440.0 };
/// assert_eq!(concert.frequency(0.0), 440.0);
/// assert_eq!(concert.frequency(12.0), 880.0);
/// assert_eq!(concert.frequency(-24.0), 110.0);
/// assert_eq!(Tuning::default().frequency(0.0), MIDDLE_C);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub reference_frequency: f64,
}

impl Tuning {
    /// Return the frequency of a pitch relative to this tuning.
    pub fn frequency(&self, pitch: f64) -> f64 {
        self.reference_frequency * util::from_semitones(pitch)
    }

    /// Return the pitch of a frequency relative to this tuning.
    pub fn pitch(&self, frequency: f64) -> f64 {
        util::to_semitones(frequency / self.reference_frequency)
    }
}

/// Pitch zero is middle C.
impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            reference_frequency: MIDDLE_C,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pitch_round_trips_through_frequency() {
        let tuning = Tuning::default();
        assert_eq!(tuning.pitch(MIDDLE_C), 0.0);
        let a4 = tuning.frequency(9.0);
        assert!((a4 - 440.0).abs() < 1e-6, "A4 = {}", a4);
        assert!((tuning.pitch(a4) - 9.0).abs() < 1e-9);
    }
}
