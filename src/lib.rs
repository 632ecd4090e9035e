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

//! Anytime pathfinding and path execution for an agent in a voxel world.
//!
//! A [`client::tasks::navigate::PathingBehavior`] owns the goal. Each tick it
//! polls the search running in the background, drives the current
//! [`client::follow::PathExecutor`] and starts new searches when needed.

pub mod bootstrap;
pub mod client;
pub mod error;
pub mod storage;
