// Copyright (c) 2021 Andrew Gazelka - All Rights Reserved.
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Module to interact with cargo options

use std::path::PathBuf;

use clap::Parser;

/// Options parsed from CLI
#[derive(Parser, Debug)]
#[command(about, author, version)]
pub struct CliOptions {
    /// A JSON file with path, executor and behavior settings. Anything
    /// missing from it keeps its default.
    #[clap(long)]
    pub settings: Option<PathBuf>,

    /// The block the agent should walk to
    #[clap(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, default_values_t = [40, 0, 25])]
    pub goal: Vec<i32>,

    /// The most ticks the demo will run for
    #[clap(short, long, default_value = "20000")]
    pub ticks: u64,

    /// The radius (in chunks) of the flat world around the origin
    #[clap(short, long, default_value = "3")]
    pub radius: i32,

    /// The number of random pillars scattered over the world
    #[clap(long, default_value = "40")]
    pub obstacles: usize,

    /// Seed for the obstacles
    #[clap(long, default_value = "1")]
    pub seed: u64,

    /// Blocks the agent may place when bridging or pillaring
    #[clap(long, default_value = "64")]
    pub throwaway: usize,

    /// The milliseconds between ticks
    #[clap(long, default_value = "50")]
    pub tick_ms: u64,
}

impl CliOptions {
    pub fn get() -> Self {
        Self::parse()
    }
}
