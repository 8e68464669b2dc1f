// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Periodic functions turning an angle into a sample.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

/// Accumulated phase of an oscillator, measured in cycles.
///
/// Unlike a phase offset inside a single period, this keeps counting up
/// so that a sample can be computed directly from it. It is only ever brought back
/// down by whole multiples of a wrap threshold.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Phase(f64);

impl Phase {
    pub const ZERO: Phase = Phase(0.0);

    pub fn new(cycles: f64) -> Phase {
        Phase(cycles)
    }

    pub fn cycles(self) -> f64 {
        self.0
    }

    /// The angle in radians that is fed to a waveform.
    pub fn radians(self) -> f64 {
        2.0 * PI * self.0
    }

    pub fn advance(self, cycles: f64) -> Phase {
        Phase(self.0 + cycles)
    }

    /// Remove whole multiples of `threshold` cycles once the phase exceeds it.
    ///
    /// The remainder is exact, so this takes a single step however large the phase is.
    ///
    /// ```
    /// # use sinewave::waveform::Phase;
    /// assert_eq!(Phase::new(25.5).wrap(10.0), Phase::new(5.5));
    /// assert_eq!(Phase::new(10.0).wrap(10.0), Phase::new(10.0));
    /// ```
    pub fn wrap(mut self, threshold: f64) -> Phase {
        if self.0 > threshold {
            self.0 %= threshold;
        }
        self
    }
}

/// A periodic function mapping an angle in radians to a sample in `[-1, 1]`.
///
/// The period must divide `2π` times the phase wrap threshold of the generator
/// using it, which holds for every waveform with a period of `2π`.
/// Plain closures are waveforms as well:
///
/// ```
/// # use sinewave::waveform::*;
/// let half_sine = |radians: f64| radians.sin().max(0.0);
/// assert_eq!(half_sine.eval(-1.0), 0.0);
/// ```
pub trait Waveform: Send {
    fn eval(&self, radians: f64) -> f64;
}

impl<F> Waveform for F
where
    F: Fn(f64) -> f64 + Send,
{
    fn eval(&self, radians: f64) -> f64 {
        self(radians)
    }
}

/// The built-in waveforms, all with a period of `2π`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WaveShape {
    Sine,
    Square,
    Triangle,
    Saw,
}

impl Default for WaveShape {
    fn default() -> Self {
        WaveShape::Sine
    }
}

impl Waveform for WaveShape {
    fn eval(&self, radians: f64) -> f64 {
        match self {
            WaveShape::Sine => radians.sin(),
            WaveShape::Square => {
                if cycle_offset(radians) < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Triangle => {
                let offset = cycle_offset(radians);
                if offset < 0.25 {
                    4.0 * offset
                } else if offset < 0.75 {
                    2.0 - 4.0 * offset
                } else {
                    4.0 * offset - 4.0
                }
            }
            WaveShape::Saw => {
                // Starts at zero like the other shapes, rising through the first half.
                let offset = cycle_offset(radians);
                if offset < 0.5 {
                    2.0 * offset
                } else {
                    2.0 * offset - 2.0
                }
            }
        }
    }
}

/// Position within the current period, in `[0, 1)`.
fn cycle_offset(radians: f64) -> f64 {
    (radians / (2.0 * PI)).rem_euclid(1.0)
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseShapeError {
    #[snafu(display("Unknown wave shape {:?}, expected sine, square, triangle or saw", name))]
    UnknownShape { name: String },
}

impl FromStr for WaveShape {
    type Err = ParseShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(WaveShape::Sine),
            "square" | "rectangle" => Ok(WaveShape::Square),
            "triangle" => Ok(WaveShape::Triangle),
            "saw" | "sawtooth" => Ok(WaveShape::Saw),
            _ => Err(ParseShapeError::UnknownShape { name: s.to_owned() }),
        }
    }
}

impl fmt::Display for WaveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaveShape::Sine => "sine",
            WaveShape::Square => "square",
            WaveShape::Triangle => "triangle",
            WaveShape::Saw => "saw",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SHAPES: [WaveShape; 4] = [
        WaveShape::Sine,
        WaveShape::Square,
        WaveShape::Triangle,
        WaveShape::Saw,
    ];

    #[test]
    fn shapes_stay_in_range() {
        for shape in SHAPES.iter() {
            for i in -200..200 {
                let value = shape.eval(i as f64 * 0.1);
                assert!((-1.0..=1.0).contains(&value), "{}: {}", shape, value);
            }
        }
    }

    #[test]
    fn shapes_are_periodic() {
        for shape in SHAPES.iter() {
            for &radians in &[0.3, 1.7, 4.0, 5.9] {
                let a = shape.eval(radians);
                let b = shape.eval(radians + 2.0 * PI * 1000.0);
                assert!((a - b).abs() < 1e-9, "{} at {}: {} vs {}", shape, radians, a, b);
            }
        }
    }

    #[test]
    fn quarter_period_values() {
        assert_eq!(WaveShape::Triangle.eval(0.0), 0.0);
        assert_eq!(WaveShape::Triangle.eval(PI / 2.0), 1.0);
        assert_eq!(WaveShape::Square.eval(PI / 2.0), 1.0);
        assert_eq!(WaveShape::Square.eval(3.0 * PI / 2.0), -1.0);
        assert_eq!(WaveShape::Saw.eval(0.0), 0.0);
        assert_eq!(WaveShape::Saw.eval(PI / 2.0), 0.5);
    }

    #[test]
    fn parse_shapes() {
        for shape in SHAPES.iter() {
            assert_eq!(shape.to_string().parse::<WaveShape>(), Ok(*shape));
        }
        assert_eq!("Sawtooth".parse::<WaveShape>(), Ok(WaveShape::Saw));
        let err = "noise".parse::<WaveShape>().unwrap_err();
        expect_test::expect![[r#"Unknown wave shape "noise", expected sine, square, triangle or saw"#]]
            .assert_eq(&err.to_string());
    }

    #[test]
    fn phase_wraps_by_whole_thresholds() {
        let phase = Phase::new(2.0e9 + 0.25).wrap(2.0e9);
        assert_eq!(phase.cycles(), 0.25);
        assert_eq!(Phase::ZERO.advance(1.5).cycles(), 1.5);
    }

    #[test]
    fn huge_phase_wraps_in_one_step() {
        // Far beyond the point where subtracting the threshold changes the value.
        let phase = Phase::new(1.0e25).wrap(2.0e9);
        assert!(phase.cycles() >= 0.0 && phase.cycles() < 2.0e9);
        assert_eq!(phase.cycles().fract(), 0.0);
        assert_eq!(Phase::new(3.0 * 2.0e9).wrap(2.0e9).cycles(), 0.0);
    }
}
