// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Easy interface for getting sound to play using a sox subprocess.

use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use log::debug;

use crate::wave::AudioBuffer;

#[derive(Debug, Clone, Copy)]
pub enum SoxTarget<'a> {
    /// Play on the default audio device.
    Play,
    /// Write to a file in any format sox supports.
    File(&'a Path),
}

/// A running `play` or `sox` process consuming raw `f64` frames on its stdin.
pub struct SoxSink {
    player: Child,
    audio_stream: Option<ChildStdin>,
    buffer: Vec<u8>,
}

impl SoxSink {
    /// Spawn sox for a stream with the given rate and number of interleaved channels.
    pub fn new(
        sample_rate: u32,
        channels: usize,
        target: SoxTarget,
        dither: bool,
    ) -> io::Result<Self> {
        let sample_rate_str = format!("{}", sample_rate);
        let channels_str = format!("{}", channels);
        let mut args = vec![
            "-R", // make the output reproducible
            "--channels",
            channels_str.as_str(),
            "--rate",
            sample_rate_str.as_str(),
            "--type",
            "f64",
            "/dev/stdin",
        ];
        if !dither {
            // Global option, must precede the input file.
            args.insert(0, "-D");
        }

        let (play, sox) = sox_binaries();

        let player = match target {
            SoxTarget::Play => {
                debug!(
                    "spawning {} for {} channels at {} Hz",
                    play.display(),
                    channels,
                    sample_rate
                );
                Command::new(&play)
                    .args(&args)
                    .stdin(Stdio::piped())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()?
            }
            SoxTarget::File(outfile) => {
                debug!("spawning {} writing {}", sox.display(), outfile.display());
                Command::new(&sox)
                    .args(&args)
                    .arg(outfile)
                    .stdin(Stdio::piped())
                    .spawn()?
            }
        };
        Self::from_child(player)
    }

    fn from_child(mut player: Child) -> io::Result<Self> {
        let audio_stream = player.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "sox process has no stdin")
        })?;

        // sox should exit automatically once the input stream is closed,
        // there's no special precaution required.

        Ok(Self {
            player,
            audio_stream: Some(audio_stream),
            buffer: Vec::new(),
        })
    }

    /// Send a buffer of audio to sox, blocking until the pipe accepted all of it.
    pub fn write(&mut self, audio: &AudioBuffer) -> io::Result<()> {
        let audio_stream = self.audio_stream.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::BrokenPipe, "sox stream already closed")
        })?;
        if self.buffer.len() != audio.byte_len() {
            self.buffer.resize(audio.byte_len(), 0);
        }
        audio.copy_bytes_to(&mut self.buffer);
        audio_stream.write_all(&self.buffer)?;
        audio_stream.flush()
    }

    /// Close the stream and wait until sox has played or written everything.
    pub fn finish(mut self) -> io::Result<()> {
        self.close()
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(audio_stream) = self.audio_stream.take() {
            drop(audio_stream);
            let status = self.player.wait()?;
            if !status.success() {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("sox exited with {}", status),
                ));
            }
        }
        Ok(())
    }
}

impl Drop for SoxSink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            debug!("closing sox stream: {}", err);
        }
    }
}

/// For properly recording the sox dependency on nix.
fn sox_binaries() -> (PathBuf, PathBuf) {
    if let Some(sox_bin) = option_env!("NIX_SOX_BIN") {
        debug!("using sox from nix store {}", sox_bin);
        let play = Path::new(sox_bin).join("play");
        let sox = Path::new(sox_bin).join("sox");
        (play, sox)
    } else {
        ("play".into(), "sox".into())
    }
}
