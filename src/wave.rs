// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! This is the namespace for all parts dealing with data in sampled waves.

use std::str::FromStr;

use snafu::Snafu;

/// Convenience type for making things stereo, e.g. individual samples.
///
/// ```
/// use sinewave::wave::*;
///
/// assert_eq!(Stereo::mono(0.5), Stereo::new(0.5, 0.5));
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stereo<T> {
    pub left: T,
    pub right: T,
}

impl<T> Stereo<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn mono(mono: T) -> Self
    where
        T: Copy,
    {
        Self::new(mono, mono)
    }
}

impl Stereo<f64> {
    /// Linearly spread a mono signal onto stereo channels, by keeping
    /// one channel at 100% while linearly attenuating the other.
    ///
    /// # Examples
    ///
    /// ```
    /// # use sinewave::wave::*;
    ///
    /// assert_eq!(Stereo::panned_mono(1.0, 0.0), Stereo::new(1.0, 1.0));
    /// assert_eq!(Stereo::panned_mono(1.0, -1.0), Stereo::new(1.0, 0.0));
    /// assert_eq!(Stereo::panned_mono(1.0, 1.0), Stereo::new(0.0, 1.0));
    /// ```
    pub fn panned_mono(mono: f64, pan: f64) -> Self {
        let left = mono * 1.0f64.min(1.0 - pan);
        let right = mono * 1.0f64.min(1.0 + pan);
        Stereo::new(left, right)
    }
}

/// Which side of a stereo output a mono signal is played on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    Both,
    Left,
    Right,
}

impl Side {
    fn pan(self) -> f64 {
        match self {
            Side::Both => 0.0,
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseSideError {
    #[snafu(display("Unknown channel side {:?}, expected lr, l or r", side))]
    UnknownSide { side: String },
}

impl FromStr for Side {
    type Err = ParseSideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lr" | "both" => Ok(Side::Both),
            "l" | "left" => Ok(Side::Left),
            "r" | "right" => Ok(Side::Right),
            _ => Err(ParseSideError::UnknownSide { side: s.to_owned() }),
        }
    }
}

/// How a mono signal is laid out on the output channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChannelLayout {
    Mono,
    Stereo(Side),
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo(_) => 2,
        }
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout::Mono
    }
}

/// A buffer holding interleaved floating point audio frames.
pub struct AudioBuffer {
    layout: ChannelLayout,
    samples: Vec<f64>,
}

#[allow(clippy::len_without_is_empty)]
impl AudioBuffer {
    pub fn new(layout: ChannelLayout, frame_count: usize) -> Self {
        Self {
            layout,
            samples: vec![0.0; frame_count * layout.channels()],
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    /// Size of the buffer in frames.
    pub fn len(&self) -> usize {
        self.samples.len() / self.layout.channels()
    }

    /// Size of the buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f64>()
    }

    /// Interleaved samples of all channels.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Spread a mono signal onto the channels of this buffer, one frame per mono sample.
    /// Frames beyond the end of `mono` are left untouched.
    ///
    /// ```
    /// # use sinewave::wave::*;
    /// let mut buffer = AudioBuffer::new(ChannelLayout::Stereo(Side::Right), 2);
    /// buffer.fill_from_mono(&[0.5, -0.25]);
    /// assert_eq!(buffer.samples(), &[0.0, 0.5, 0.0, -0.25]);
    /// ```
    pub fn fill_from_mono(&mut self, mono: &[f64]) {
        match self.layout {
            ChannelLayout::Mono => {
                for (target, sample) in self.samples.iter_mut().zip(mono.iter()) {
                    *target = *sample;
                }
            }
            ChannelLayout::Stereo(side) => {
                for (target, sample) in self.samples.chunks_exact_mut(2).zip(mono.iter()) {
                    let frame = Stereo::panned_mono(*sample, side.pan());
                    target[0] = frame.left;
                    target[1] = frame.right;
                }
            }
        }
    }

    /// Limit all samples to the range `[-1, 1]`.
    pub fn clip(&mut self) {
        self.samples
            .iter_mut()
            .for_each(|s| *s = s.max(-1.0).min(1.0));
    }

    /// Copy the `f64` samples to little endian bytes, keeping the channels interleaved.
    ///
    /// Returns the number of frames that were actually copied.
    /// Might be less than the number of frames in the buffer if the output buffer was not large enough.
    pub fn copy_bytes_to(&self, bytes: &mut [u8]) -> usize {
        let frame_bytes = self.layout.channels() * 8;
        let mut processed = 0;
        for (frame, target) in self
            .samples
            .chunks_exact(self.layout.channels())
            .zip(bytes.chunks_exact_mut(frame_bytes))
        {
            for (sample, target) in frame.iter().zip(target.chunks_exact_mut(8)) {
                target.copy_from_slice(&sample.to_le_bytes());
            }
            processed += 1;
        }
        processed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mono_layout_copies_samples() {
        let mut buffer = AudioBuffer::new(ChannelLayout::Mono, 3);
        buffer.fill_from_mono(&[0.1, 0.2, 0.3]);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.byte_len(), 24);
        assert_eq!(buffer.samples(), &[0.1, 0.2, 0.3]);
    }

    #[test]
    fn stereo_sides() {
        let mut both = AudioBuffer::new(ChannelLayout::Stereo(Side::Both), 1);
        let mut left = AudioBuffer::new(ChannelLayout::Stereo(Side::Left), 1);
        both.fill_from_mono(&[0.75]);
        left.fill_from_mono(&[0.75]);
        assert_eq!(both.samples(), &[0.75, 0.75]);
        assert_eq!(left.samples(), &[0.75, 0.0]);
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn clipping() {
        let mut buffer = AudioBuffer::new(ChannelLayout::Mono, 3);
        buffer.fill_from_mono(&[2.0, -0.5, -3.0]);
        buffer.clip();
        assert_eq!(buffer.samples(), &[1.0, -0.5, -1.0]);
    }

    #[test]
    fn bytes_are_little_endian_and_interleaved() {
        let mut buffer = AudioBuffer::new(ChannelLayout::Stereo(Side::Left), 2);
        buffer.fill_from_mono(&[1.0, -2.0]);
        let mut bytes = vec![0u8; buffer.byte_len()];
        assert_eq!(buffer.copy_bytes_to(&mut bytes), 2);
        assert_eq!(&bytes[0..8], &1.0f64.to_le_bytes());
        assert_eq!(&bytes[8..16], &0.0f64.to_le_bytes());
        assert_eq!(&bytes[16..24], &(-2.0f64).to_le_bytes());

        let mut short = vec![0u8; 20];
        assert_eq!(buffer.copy_bytes_to(&mut short), 1);
    }

    #[test]
    fn parse_sides() {
        assert_eq!("lr".parse::<Side>(), Ok(Side::Both));
        assert_eq!("l".parse::<Side>(), Ok(Side::Left));
        assert_eq!("r".parse::<Side>(), Ok(Side::Right));
        expect_test::expect![[r#"Unknown channel side "x", expected lr, l or r"#]]
            .assert_eq(&"x".parse::<Side>().unwrap_err().to_string());
    }
}
