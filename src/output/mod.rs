// sinewave -- a smoothly gliding tone generator
// Copyright (C) 2020  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Getting generated audio out of the process.

pub mod sox;

pub use sox::{SoxSink, SoxTarget};
