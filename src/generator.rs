// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! A single voice whose pitch and loudness glide towards their goals.
//!
//! Pitch glides are exponential in frequency (linear in semitones) and loudness
//! glides are exponential in amplitude (linear in decibels), so that both are
//! perceived as even. A glide never overshoots: once the exponential curve
//! crosses the goal, the value stays exactly at the goal.

use std::fmt;

use log::{debug, trace};
use snafu::Snafu;

use crate::tuning::Tuning;
use crate::util;
use crate::waveform::{Phase, WaveShape, Waveform};

/// The sample rate used when nothing else is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Initial tone of a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tone {
    /// Semitones relative to the reference frequency of the tuning.
    Pitch(f64),
    /// Frequency in Hz.
    Frequency(f64),
}

/// Initial loudness of a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Loudness {
    /// Level relative to a full scale amplitude of 1.0.
    Decibels(f64),
    /// Linear amplitude ratio.
    Amplitude(f64),
}

/// Parameters of a glide generator.
pub struct Params {
    pub tone: Tone,
    pub loudness: Loudness,
    /// Speed of pitch glides in semitones per second.
    pub pitch_per_second: f64,
    /// Speed of loudness glides in decibels per second.
    pub decibels_per_second: f64,
    /// Samples per second rate of the generated audio signal.
    pub sample_rate: u32,
    pub waveform: Box<dyn Waveform>,
    /// Number of cycles after which the phase is wrapped around.
    /// Must be a whole number so that wrapping does not shift the waveform.
    pub phase_wrap: f64,
    /// Output at or below this level is replaced by exact silence.
    pub decibel_floor: f64,
    /// Reference frequency for pitches.
    pub tuning: Tuning,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tone: Tone::Pitch(0.0),
            loudness: Loudness::Decibels(0.0),
            pitch_per_second: 12.0,
            decibels_per_second: 1.0,
            sample_rate: DEFAULT_SAMPLE_RATE,
            waveform: Box::new(WaveShape::Sine),
            phase_wrap: 2_000_000_000.0,
            decibel_floor: -100.0,
            tuning: Tuning::default(),
        }
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Params")
            .field("tone", &self.tone)
            .field("loudness", &self.loudness)
            .field("pitch_per_second", &self.pitch_per_second)
            .field("decibels_per_second", &self.decibels_per_second)
            .field("sample_rate", &self.sample_rate)
            .field("phase_wrap", &self.phase_wrap)
            .field("decibel_floor", &self.decibel_floor)
            .field("tuning", &self.tuning)
            .finish()
    }
}

/// Invalid parameters or goals.
#[derive(Debug, PartialEq, Snafu)]
pub enum GeneratorError {
    #[snafu(display("Sample rate must be positive"))]
    InvalidSampleRate,
    #[snafu(display("Frequency must be positive and finite, got {} Hz", frequency))]
    InvalidFrequency { frequency: f64 },
    #[snafu(display("Amplitude must be non-negative and finite, got {}", amplitude))]
    InvalidAmplitude { amplitude: f64 },
    #[snafu(display("Level must not be NaN or infinitely loud, got {} dB", decibels))]
    InvalidDecibels { decibels: f64 },
    #[snafu(display("Glide rate {} must be non-negative and finite, got {}", name, rate))]
    InvalidRate { name: &'static str, rate: f64 },
    #[snafu(display("Phase wrap must be a positive whole number of cycles, got {}", cycles))]
    InvalidPhaseWrap { cycles: f64 },
    #[snafu(display("Reference frequency must be positive and finite, got {} Hz", frequency))]
    InvalidTuning { frequency: f64 },
}

/// Which way a value moves during one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
    Hold,
}

impl Direction {
    fn between(current: f64, goal: f64) -> Self {
        if goal > current {
            Direction::Up
        } else if goal < current {
            Direction::Down
        } else {
            Direction::Hold
        }
    }

    fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
            Direction::Hold => 0.0,
        }
    }

    /// Keep a point of the glide curve from moving past the goal.
    fn clamp(self, candidate: f64, goal: f64) -> f64 {
        match self {
            Direction::Up => candidate.min(goal),
            Direction::Down => candidate.max(goal),
            Direction::Hold => goal,
        }
    }
}

/// Generates blocks of a periodic signal, gliding smoothly between pitches and volumes.
///
/// ```
/// use sinewave::generator::*;
///
/// let mut generator = GlideGenerator::new(Params::default()).unwrap();
/// generator.set_pitch(12.0).unwrap();
/// for _ in 0..110 {
///     generator.next_block(441);
/// }
/// assert_eq!(generator.frequency(), 2.0 * sinewave::tuning::MIDDLE_C);
/// ```
pub struct GlideGenerator {
    sample_rate: u32,
    tuning: Tuning,

    frequency: f64,
    goal_frequency: f64,
    amplitude: f64,
    goal_amplitude: f64,
    phase: Phase,

    pitch_per_second: f64,
    decibels_per_second: f64,
    waveform: Box<dyn Waveform>,
    phase_wrap: f64,
    amplitude_cutoff: f64,
}

impl GlideGenerator {
    /// Create a generator resting at the initial tone and loudness.
    pub fn new(params: Params) -> Result<Self, GeneratorError> {
        if params.sample_rate == 0 {
            return Err(GeneratorError::InvalidSampleRate);
        }
        let reference = params.tuning.reference_frequency;
        if !(reference.is_finite() && reference > 0.0) {
            return Err(GeneratorError::InvalidTuning {
                frequency: reference,
            });
        }
        check_rate("pitch_per_second", params.pitch_per_second)?;
        check_rate("decibels_per_second", params.decibels_per_second)?;
        let wrap = params.phase_wrap;
        if !(wrap.is_finite() && wrap >= 1.0 && wrap.fract() == 0.0) {
            return Err(GeneratorError::InvalidPhaseWrap { cycles: wrap });
        }

        let frequency = match params.tone {
            Tone::Pitch(pitch) => params.tuning.frequency(pitch),
            Tone::Frequency(frequency) => frequency,
        };
        check_frequency(frequency)?;
        let amplitude = match params.loudness {
            Loudness::Decibels(decibels) => decibels_to_goal(decibels)?,
            Loudness::Amplitude(amplitude) => check_amplitude(amplitude)?,
        };
        let amplitude_cutoff = decibels_to_goal(params.decibel_floor)?;
        // A voice starting below the floor must still be able to glide upwards.
        let amplitude = amplitude.max(amplitude_cutoff);

        debug!(
            "new generator at {:.3} Hz, amplitude {:.4}, {} Hz sample rate",
            frequency, amplitude, params.sample_rate
        );

        Ok(Self {
            sample_rate: params.sample_rate,
            tuning: params.tuning,
            frequency,
            goal_frequency: frequency,
            amplitude,
            goal_amplitude: amplitude,
            phase: Phase::ZERO,
            pitch_per_second: params.pitch_per_second,
            decibels_per_second: params.decibels_per_second,
            waveform: params.waveform,
            phase_wrap: wrap,
            amplitude_cutoff,
        })
    }

    /// Set the goal frequency in Hz that the signal will gradually shift towards.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<(), GeneratorError> {
        check_frequency(frequency)?;
        trace!("goal frequency {:.3} Hz", frequency);
        self.goal_frequency = frequency;
        Ok(())
    }

    /// Set the goal pitch in semitones relative to the tuning reference.
    pub fn set_pitch(&mut self, pitch: f64) -> Result<(), GeneratorError> {
        self.set_frequency(self.tuning.frequency(pitch))
    }

    /// Set the goal linear amplitude that the signal will gradually shift towards.
    pub fn set_amplitude(&mut self, amplitude: f64) -> Result<(), GeneratorError> {
        self.goal_amplitude = check_amplitude(amplitude)?;
        trace!("goal amplitude {:.6}", amplitude);
        Ok(())
    }

    /// Set the goal loudness in decibels. Negative infinity mutes.
    pub fn set_decibels(&mut self, decibels: f64) -> Result<(), GeneratorError> {
        self.goal_amplitude = decibels_to_goal(decibels)?;
        trace!("goal level {:.2} dB", decibels);
        Ok(())
    }

    /// Replace the waveform, starting with the next block.
    pub fn set_waveform<W: Waveform + 'static>(&mut self, waveform: W) {
        self.waveform = Box::new(waveform);
    }

    /// Produce the next `frames` samples as a new vector.
    pub fn next_block(&mut self, frames: usize) -> Vec<f64> {
        let mut block = vec![0.0; frames];
        self.fill_block(&mut block);
        block
    }

    /// Overwrite `output` with the continuation of the signal, advancing
    /// frequency, amplitude and phase by `output.len()` samples.
    pub fn fill_block(&mut self, output: &mut [f64]) {
        if output.is_empty() {
            return;
        }
        let sample_rate = f64::from(self.sample_rate);
        let dt = sample_rate.recip();

        // Directions are decided once per block, from the values at its start.
        let start_frequency = self.frequency;
        let start_amplitude = self.amplitude;
        let frequency_direction = Direction::between(start_frequency, self.goal_frequency);
        let amplitude_direction = Direction::between(start_amplitude, self.goal_amplitude);
        let semitone_step = frequency_direction.sign() * self.pitch_per_second;
        let decibel_step = amplitude_direction.sign() * self.decibels_per_second;

        let mut frequency = start_frequency;
        let mut amplitude = start_amplitude;
        let mut phase = self.phase;

        for (i, sample) in output.iter_mut().enumerate() {
            let t = i as f64 / sample_rate;

            frequency = frequency_direction.clamp(
                start_frequency * util::from_semitones(semitone_step * t),
                self.goal_frequency,
            );
            amplitude = amplitude_direction.clamp(
                start_amplitude * util::amplitude_from_decibels(decibel_step * t),
                self.goal_amplitude,
            );
            if amplitude <= self.amplitude_cutoff {
                amplitude = 0.0;
            }

            // Integrating the frequency keeps the phase smooth while gliding.
            phase = phase.advance(frequency * dt);
            *sample = amplitude * self.waveform.eval(phase.radians());
        }

        self.frequency = frequency;
        // Muted output must not drag the state to zero, a glide could never leave it.
        self.amplitude = amplitude.max(self.amplitude_cutoff);
        self.phase = phase.wrap(self.phase_wrap);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn tuning(&self) -> Tuning {
        self.tuning
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn goal_frequency(&self) -> f64 {
        self.goal_frequency
    }

    /// Current pitch in semitones relative to the tuning reference.
    pub fn pitch(&self) -> f64 {
        self.tuning.pitch(self.frequency)
    }

    /// Current linear amplitude. Never below the cutoff.
    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn goal_amplitude(&self) -> f64 {
        self.goal_amplitude
    }

    /// Current loudness in decibels.
    pub fn decibels(&self) -> f64 {
        util::decibels_from_amplitude(self.amplitude)
    }

    pub fn amplitude_cutoff(&self) -> f64 {
        self.amplitude_cutoff
    }

    /// Phase after the last generated sample, in cycles.
    pub fn phase(&self) -> f64 {
        self.phase.cycles()
    }

    /// Whether frequency or amplitude still differ from their goals.
    /// A goal below the floor counts as reached once the amplitude rests at the cutoff.
    pub fn is_gliding(&self) -> bool {
        self.frequency != self.goal_frequency
            || self.amplitude != self.goal_amplitude.max(self.amplitude_cutoff)
    }
}

impl fmt::Debug for GlideGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlideGenerator")
            .field("sample_rate", &self.sample_rate)
            .field("frequency", &self.frequency)
            .field("goal_frequency", &self.goal_frequency)
            .field("amplitude", &self.amplitude)
            .field("goal_amplitude", &self.goal_amplitude)
            .field("phase", &self.phase)
            .finish()
    }
}

fn check_rate(name: &'static str, rate: f64) -> Result<(), GeneratorError> {
    if rate.is_finite() && rate >= 0.0 {
        Ok(())
    } else {
        Err(GeneratorError::InvalidRate { name, rate })
    }
}

fn check_frequency(frequency: f64) -> Result<f64, GeneratorError> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(frequency)
    } else {
        Err(GeneratorError::InvalidFrequency { frequency })
    }
}

fn check_amplitude(amplitude: f64) -> Result<f64, GeneratorError> {
    if amplitude.is_finite() && amplitude >= 0.0 {
        Ok(amplitude)
    } else {
        Err(GeneratorError::InvalidAmplitude { amplitude })
    }
}

fn decibels_to_goal(decibels: f64) -> Result<f64, GeneratorError> {
    let amplitude = util::amplitude_from_decibels(decibels);
    if amplitude.is_finite() {
        Ok(amplitude)
    } else {
        Err(GeneratorError::InvalidDecibels { decibels })
    }
}
