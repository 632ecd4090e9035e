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

use interfaces::types::BlockLocation;
use thiserror::Error;

/// Why a search did not produce a path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchFailure {
    #[error("the frontier was exhausted after {nodes} nodes and no partial path qualifies")]
    Exhausted { nodes: usize },

    #[error("ran out of time after {nodes} nodes without getting far enough from the start")]
    NoProgress { nodes: usize },

    #[error("search was cancelled")]
    Cancelled,

    #[error("search panicked: {0}")]
    Panicked(String),

    #[error("search worker went away without a result")]
    WorkerGone,
}

/// A path could not be built or joined
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("a path needs at least one position")]
    Empty,

    #[error("expected {expected} movements for {positions} positions")]
    LengthMismatch { positions: usize, expected: usize },

    #[error("movement {index} does not connect {src} to {dest}")]
    Disconnected {
        index: usize,
        src: BlockLocation,
        dest: BlockLocation,
    },

    #[error("the paths are for different goals")]
    GoalMismatch,

    #[error("the first path ends at {end} but the second starts at {start}")]
    JunctionMismatch {
        end: BlockLocation,
        start: BlockLocation,
    },

    #[error("{0} appears in both paths")]
    Overlap(BlockLocation),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

pub type Res<T = ()> = Result<T, ConfigError>;
