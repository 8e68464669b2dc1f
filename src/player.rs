// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Playing a glide generator on the speakers, or rendering it to a file.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use log::{error, info};
use snafu::Snafu;

use crate::generator::{GeneratorError, GlideGenerator, Params};
use crate::output::{SoxSink, SoxTarget};
use crate::wave::{AudioBuffer, ChannelLayout};
use crate::waveform::Waveform;

/// How generated samples are delivered.
#[derive(Debug, Clone, Copy)]
pub struct OutputParams {
    pub layout: ChannelLayout,
    /// Number of frames computed per block.
    pub block_frames: usize,
    /// Limit samples to `[-1, 1]` before handing them to sox.
    pub clip: bool,
    pub dither: bool,
}

impl Default for OutputParams {
    fn default() -> Self {
        Self {
            layout: ChannelLayout::Mono,
            // 10 ms buffer at 44100 Hz
            block_frames: 441,
            clip: true,
            dither: true,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum PlayerError {
    #[snafu(display("Invalid generator settings: {}", source))]
    Generator { source: GeneratorError },
    #[snafu(display("Block size must be positive"))]
    EmptyBlock,
    #[snafu(display("Failed to start sox: {}", source))]
    Spawn { source: io::Error },
    #[snafu(display("Failed to write audio to sox: {}", source))]
    Write { source: io::Error },
}

impl From<GeneratorError> for PlayerError {
    fn from(source: GeneratorError) -> Self {
        PlayerError::Generator { source }
    }
}

/// Reusable buffers for turning generator blocks into output frames.
struct BlockRenderer {
    mono: Vec<f64>,
    frames: AudioBuffer,
    clip: bool,
}

impl BlockRenderer {
    fn new(output: &OutputParams) -> Self {
        Self {
            mono: vec![0.0; output.block_frames],
            frames: AudioBuffer::new(output.layout, output.block_frames),
            clip: output.clip,
        }
    }

    fn render(&mut self, generator: &mut GlideGenerator) -> &AudioBuffer {
        generator.fill_block(&mut self.mono);
        self.frames.fill_from_mono(&self.mono);
        if self.clip {
            self.frames.clip();
        }
        &self.frames
    }
}

/// Number of whole blocks covering `seconds`, saturating for absurd durations.
fn block_count(seconds: f64, sample_rate: u32, block_frames: usize) -> usize {
    let frames = (seconds.max(0.0) * f64::from(sample_rate)).round() as usize;
    frames.saturating_add(block_frames - 1) / block_frames
}

/// Render `seconds` of audio into `sink`, rounded up to whole blocks.
pub fn render(
    generator: &mut GlideGenerator,
    output: &OutputParams,
    sink: &mut SoxSink,
    seconds: f64,
) -> Result<(), PlayerError> {
    if output.block_frames == 0 {
        return Err(PlayerError::EmptyBlock);
    }
    let blocks = block_count(seconds, generator.sample_rate(), output.block_frames);
    info!(
        "rendering {} blocks of {} frames ({:.2} seconds)",
        blocks, output.block_frames, seconds
    );

    let mut renderer = BlockRenderer::new(output);
    for _ in 0..blocks {
        let frames = renderer.render(generator);
        sink.write(frames)
            .map_err(|source| PlayerError::Write { source })?;
    }
    Ok(())
}

/// Plays a continuous tone in a background thread. Changes in frequency or
/// amplitude transition smoothly.
///
/// The generator is shared with the playback thread, which holds the lock
/// only while computing a block and never while writing to sox.
pub struct SineWave {
    generator: Arc<Mutex<GlideGenerator>>,
    output: OutputParams,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl SineWave {
    pub fn new(params: Params, output: OutputParams) -> Result<Self, PlayerError> {
        if output.block_frames == 0 {
            return Err(PlayerError::EmptyBlock);
        }
        let generator = GlideGenerator::new(params)?;
        Ok(Self {
            generator: Arc::new(Mutex::new(generator)),
            output,
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        })
    }

    /// Start playing in a separate thread. Does nothing if already playing.
    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.is_playing() {
            return Ok(());
        }
        // Reap a thread that ended on its own, e.g. after a pipe error.
        self.stop();

        let sample_rate = self.lock().sample_rate();
        let mut sink = SoxSink::new(
            sample_rate,
            self.output.layout.channels(),
            SoxTarget::Play,
            self.output.dither,
        )
        .map_err(|source| PlayerError::Spawn { source })?;

        let generator = Arc::clone(&self.generator);
        let running = Arc::clone(&self.running);
        let mut renderer = BlockRenderer::new(&self.output);
        running.store(true, Ordering::SeqCst);
        info!("playing at {} Hz", sample_rate);

        self.thread = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let frames = {
                    let mut generator = match generator.lock() {
                        Ok(generator) => generator,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    renderer.render(&mut generator)
                };
                if let Err(err) = sink.write(frames) {
                    error!("Failed to write audio to sox stream: {}", err);
                    break;
                }
            }
            running.store(false, Ordering::SeqCst);
        }));
        Ok(())
    }

    /// Stop playing and wait for the playback thread to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("playback thread panicked");
            }
            info!("stopped");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Set the goal frequency in Hz, which will be smoothly transitioned to.
    pub fn set_frequency(&self, frequency: f64) -> Result<(), PlayerError> {
        Ok(self.lock().set_frequency(frequency)?)
    }

    /// Set the goal pitch in semitones relative to middle C (or the configured reference).
    pub fn set_pitch(&self, pitch: f64) -> Result<(), PlayerError> {
        Ok(self.lock().set_pitch(pitch)?)
    }

    /// Set the goal volume in decibels relative to full scale.
    pub fn set_volume(&self, decibels: f64) -> Result<(), PlayerError> {
        Ok(self.lock().set_decibels(decibels)?)
    }

    /// Set the goal volume as a linear amplitude.
    pub fn set_amplitude(&self, amplitude: f64) -> Result<(), PlayerError> {
        Ok(self.lock().set_amplitude(amplitude)?)
    }

    pub fn set_waveform<W: Waveform + 'static>(&self, waveform: W) {
        self.lock().set_waveform(waveform)
    }

    /// Exclusive access to the generator, e.g. to inspect its current state.
    /// Playback stalls while the guard is held.
    pub fn generator(&self) -> MutexGuard<'_, GlideGenerator> {
        self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, GlideGenerator> {
        // The generator has no invariants a panicking writer could break halfway.
        match self.generator.lock() {
            Ok(generator) => generator,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for SineWave {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::generator::Tone;
    use crate::wave::Side;

    #[test]
    fn setters_reach_the_shared_generator() {
        let wave = SineWave::new(Params::default(), OutputParams::default()).unwrap();
        wave.set_frequency(440.0).unwrap();
        wave.set_volume(-20.0).unwrap();
        assert!(!wave.is_playing());
        let generator = wave.generator();
        assert_eq!(generator.goal_frequency(), 440.0);
        assert!((generator.goal_amplitude() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn invalid_settings_are_reported() {
        let err = SineWave::new(
            Params {
                tone: Tone::Frequency(0.0),
                ..Params::default()
            },
            OutputParams::default(),
        )
        .err()
        .unwrap();
        expect_test::expect![[
            "Invalid generator settings: Frequency must be positive and finite, got 0 Hz"
        ]]
        .assert_eq(&err.to_string());

        let wave = SineWave::new(Params::default(), OutputParams::default()).unwrap();
        assert!(matches!(
            wave.set_pitch(f64::NAN),
            Err(PlayerError::Generator { .. })
        ));
        assert!(matches!(
            SineWave::new(
                Params::default(),
                OutputParams {
                    block_frames: 0,
                    ..OutputParams::default()
                }
            ),
            Err(PlayerError::EmptyBlock)
        ));
    }

    #[test]
    fn stop_without_play_is_harmless() {
        let mut wave = SineWave::new(Params::default(), OutputParams::default()).unwrap();
        wave.stop();
        wave.stop();
        assert!(!wave.is_playing());
    }

    #[test]
    fn block_count_rounds_up_and_saturates() {
        assert_eq!(block_count(1.0, 44100, 441), 100);
        assert_eq!(block_count(0.0105, 44100, 441), 2);
        assert_eq!(block_count(-3.0, 44100, 441), 0);
        assert_eq!(block_count(1e300, 44100, 441), usize::MAX / 441);
    }

    #[test]
    fn renderer_lays_out_and_clips_blocks() {
        let mut generator = GlideGenerator::new(Params {
            waveform: Box::new(|_radians: f64| 2.0),
            ..Params::default()
        })
        .unwrap();
        let mut renderer = BlockRenderer::new(&OutputParams {
            layout: ChannelLayout::Stereo(Side::Right),
            block_frames: 4,
            ..OutputParams::default()
        });
        let frames = renderer.render(&mut generator);
        assert_eq!(frames.len(), 4);
        assert_eq!(frames.samples(), &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]);
    }
}
