// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Command line front end: play or render a sequence of gliding tones.

use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use log::{debug, info};
use snafu::Snafu;
use structopt::clap::AppSettings;
use structopt::StructOpt;

use crate::generator::{GeneratorError, GlideGenerator, Loudness, Params, Tone};
use crate::output::{SoxSink, SoxTarget};
use crate::player::{self, OutputParams, SineWave};
use crate::wave::{ChannelLayout, Side};
use crate::waveform::WaveShape;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sinewave",
    about = "Playing tones that glide smoothly between pitches and volumes",
    setting = AppSettings::AllowLeadingHyphen
)]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Initial pitch in semitones relative to middle C.
    #[structopt(short, long, default_value = "0")]
    pitch: f64,

    /// Initial volume in decibels relative to full scale.
    #[structopt(short, long, default_value = "0")]
    decibels: f64,

    /// Speed of pitch changes in semitones per second.
    #[structopt(long, default_value = "12")]
    pitch_per_second: f64,

    /// Speed of volume changes in decibels per second.
    #[structopt(long, default_value = "1")]
    decibels_per_second: f64,

    #[structopt(long, default_value = "44100")]
    sample_rate: u32,

    /// One of sine, square, triangle or saw.
    #[structopt(short, long, default_value = "sine")]
    waveform: WaveShape,

    /// Number of output channels.
    #[structopt(long, default_value = "1", possible_values = &["1", "2"])]
    channels: usize,

    /// Side of a stereo output that plays the tone: lr, l or r.
    #[structopt(long, default_value = "lr")]
    side: Side,

    /// Pass samples outside of [-1, 1] on to sox unchanged.
    #[structopt(long)]
    no_clip: bool,

    #[structopt(long)]
    no_dither: bool,

    /// Seconds each step is held unless the step says otherwise.
    #[structopt(long, default_value = "1")]
    hold: f64,

    /// Output file (any sox-supported format). The tone is played directly if not given.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Goals to glide to, in order, written as PITCH[@DECIBELS][:SECONDS].
    steps: Vec<Step>,
}

impl Opt {
    fn generator_params(&self) -> Params {
        Params {
            tone: Tone::Pitch(self.pitch),
            loudness: Loudness::Decibels(self.decibels),
            pitch_per_second: self.pitch_per_second,
            decibels_per_second: self.decibels_per_second,
            sample_rate: self.sample_rate,
            waveform: Box::new(self.waveform),
            ..Params::default()
        }
    }

    fn output_params(&self) -> OutputParams {
        let layout = if self.channels == 2 {
            ChannelLayout::Stereo(self.side)
        } else {
            ChannelLayout::Mono
        };
        OutputParams {
            layout,
            clip: !self.no_clip,
            dither: !self.no_dither,
            ..OutputParams::default()
        }
    }

    /// The steps to play. Without any, the initial tone is held once.
    fn schedule(&self) -> Vec<Step> {
        if self.steps.is_empty() {
            vec![Step {
                pitch: self.pitch,
                decibels: None,
                seconds: None,
            }]
        } else {
            self.steps.clone()
        }
    }
}

/// A goal for the tone, held for some time.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub pitch: f64,
    pub decibels: Option<f64>,
    pub seconds: Option<f64>,
}

impl Step {
    pub fn apply_to(&self, generator: &mut GlideGenerator) -> Result<(), GeneratorError> {
        generator.set_pitch(self.pitch)?;
        if let Some(decibels) = self.decibels {
            generator.set_decibels(decibels)?;
        }
        Ok(())
    }

    pub fn duration(&self, default_seconds: f64) -> f64 {
        self.seconds.unwrap_or(default_seconds)
    }
}

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum StepParseError {
    #[snafu(display("Invalid {} {:?} in step {:?}", what, text, step))]
    InvalidNumber {
        what: &'static str,
        text: String,
        step: String,
    },
    #[snafu(display("Duration must be a non-negative number of seconds in step {:?}", step))]
    InvalidDuration { step: String },
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let number = |what: &'static str, text: &str| {
            text.trim()
                .parse::<f64>()
                .map_err(|_| StepParseError::InvalidNumber {
                    what,
                    text: text.to_owned(),
                    step: s.to_owned(),
                })
        };

        let mut timed = s.splitn(2, ':');
        let goal = timed.next().unwrap_or("");
        let seconds = match timed.next() {
            Some(text) => Some(number("duration", text)?),
            None => None,
        };
        if seconds.map_or(false, |seconds| !(seconds.is_finite() && seconds >= 0.0)) {
            return Err(StepParseError::InvalidDuration { step: s.to_owned() });
        }

        let mut leveled = goal.splitn(2, '@');
        let pitch = number("pitch", leveled.next().unwrap_or(""))?;
        let decibels = match leveled.next() {
            Some(text) => Some(number("level", text)?),
            None => None,
        };

        Ok(Step {
            pitch,
            decibels,
            seconds,
        })
    }
}

pub fn tone_main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)?;
    debug!("{:?}", opt);

    if !(opt.hold.is_finite() && opt.hold >= 0.0) {
        let message = format!("hold must be a non-negative number of seconds, got {}", opt.hold);
        return Err(message.into());
    }

    match opt.output.as_deref() {
        Some(path) => render_to_file(&opt, path),
        None => play_live(&opt),
    }
}

fn play_live(opt: &Opt) -> Result<(), Box<dyn Error>> {
    let mut wave = SineWave::new(opt.generator_params(), opt.output_params())?;
    wave.play()?;
    for step in opt.schedule() {
        step.apply_to(&mut wave.generator())?;
        let seconds = step.duration(opt.hold);
        info!("gliding to pitch {} for {:.2} seconds", step.pitch, seconds);
        thread::sleep(Duration::from_secs_f64(seconds));
        if !wave.is_playing() {
            return Err("playback stopped unexpectedly".into());
        }
    }
    wave.stop();
    Ok(())
}

fn render_to_file(opt: &Opt, path: &Path) -> Result<(), Box<dyn Error>> {
    let mut generator = GlideGenerator::new(opt.generator_params())?;
    let output = opt.output_params();
    let mut sink = SoxSink::new(
        generator.sample_rate(),
        output.layout.channels(),
        SoxTarget::File(path),
        output.dither,
    )?;
    for step in opt.schedule() {
        step.apply_to(&mut generator)?;
        player::render(&mut generator, &output, &mut sink, step.duration(opt.hold))?;
    }
    sink.finish()?;
    info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use expect_test::expect;

    fn opt(args: &[&str]) -> Opt {
        Opt::from_iter_safe(std::iter::once("sinewave").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn parse_steps() {
        expect![[r#"Ok(Step { pitch: 12.0, decibels: None, seconds: None })"#]]
            .assert_eq(&format!("{:?}", "12".parse::<Step>()));
        expect![[r#"Ok(Step { pitch: -5.5, decibels: Some(-10.0), seconds: Some(0.25) })"#]]
            .assert_eq(&format!("{:?}", "-5.5@-10:0.25".parse::<Step>()));
        expect![[r#"Ok(Step { pitch: 7.0, decibels: None, seconds: Some(2.0) })"#]]
            .assert_eq(&format!("{:?}", "7:2".parse::<Step>()));
    }

    #[test]
    fn reject_bad_steps() {
        let err = |s: &str| s.parse::<Step>().unwrap_err().to_string();
        expect![[r#"Invalid pitch "c4" in step "c4""#]].assert_eq(&err("c4"));
        expect![[r#"Invalid level "loud" in step "3@loud""#]].assert_eq(&err("3@loud"));
        expect![[r#"Invalid duration "" in step "3:""#]].assert_eq(&err("3:"));
        expect![[r#"Duration must be a non-negative number of seconds in step "3:-1""#]]
            .assert_eq(&err("3:-1"));
        assert!("3:inf".parse::<Step>().is_err());
    }

    #[test]
    fn steps_set_goals() {
        let mut generator = GlideGenerator::new(Params::default()).unwrap();
        let step: Step = "12@-20".parse().unwrap();
        step.apply_to(&mut generator).unwrap();
        assert_eq!(generator.goal_frequency(), 2.0 * crate::tuning::MIDDLE_C);
        assert!((generator.goal_amplitude() - 0.1).abs() < 1e-12);
        assert_eq!(step.duration(3.0), 3.0);
    }

    #[test]
    fn command_line_maps_onto_params() {
        let opt = opt(&[
            "--pitch",
            "-3",
            "--channels",
            "2",
            "--side",
            "l",
            "--waveform",
            "triangle",
            "--no-dither",
            "0",
            "-12@-6:0.5",
        ]);
        let params = opt.generator_params();
        assert_eq!(params.tone, Tone::Pitch(-3.0));
        assert_eq!(params.sample_rate, 44100);
        let output = opt.output_params();
        assert_eq!(output.layout, ChannelLayout::Stereo(Side::Left));
        assert!(output.clip);
        assert!(!output.dither);
        assert_eq!(opt.waveform, WaveShape::Triangle);
        assert_eq!(opt.schedule().len(), 2);
        assert_eq!(opt.schedule()[1].decibels, Some(-6.0));
    }

    #[test]
    fn holding_the_initial_tone_without_steps() {
        let opt = opt(&["--pitch", "4", "--hold", "0.5"]);
        assert_eq!(
            opt.schedule(),
            vec![Step {
                pitch: 4.0,
                decibels: None,
                seconds: None
            }]
        );
        assert_eq!(opt.output_params().layout, ChannelLayout::Mono);
    }

    #[test]
    fn unknown_waveform_is_a_usage_error() {
        assert!(Opt::from_iter_safe(&["sinewave", "--waveform", "noise"]).is_err());
    }
}
