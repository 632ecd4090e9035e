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

use serde::{Deserialize, Serialize};

use crate::{
    client::physics::{fall_ticks, jump_one_block_ticks, tools::ToolModel},
    storage::world::WorldView,
};

/// Cost of moves in ticks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Costs {
    pub block_walk: f64,
    pub block_walk_water: f64,
    pub diagonal_mult: f64,
    pub jump_one_block: f64,
    pub walk_off_edge: f64,
    pub place: f64,
    pub break_overhead: f64,
    pub parkour_per_block: f64,
    pub swim_vertical: f64,
}

const WALK_SPEED: f64 = 4.317;
const WATER_SPEED: f64 = 2.2;

impl Default for Costs {
    fn default() -> Self {
        let block_walk = 20.0 / WALK_SPEED;
        let block_walk_water = 20.0 / WATER_SPEED;
        Self {
            block_walk,
            block_walk_water,
            diagonal_mult: std::f64::consts::SQRT_2,
            jump_one_block: jump_one_block_ticks(),
            walk_off_edge: block_walk * 0.8,
            place: 20.0,
            break_overhead: 2.0,
            parkour_per_block: block_walk,
            swim_vertical: block_walk_water,
        }
    }
}

impl Costs {
    /// The cost of falling `blocks` blocks
    pub fn fall(&self, blocks: u32) -> f64 {
        fall_ticks(blocks)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub costs: Costs,

    pub allow_break: bool,
    pub allow_place: bool,
    pub allow_parkour: bool,
    pub allow_diagonal: bool,
    pub allow_water: bool,

    /// the highest drop onto solid ground
    pub max_fall_height: u32,

    /// the highest drop into water
    pub max_fall_height_water: u32,

    /// the widest gap a parkour jump crosses
    pub max_parkour_gap: u32,

    /// divisors applied to the g-score when ranking nodes for the anytime fallback
    pub coefficients: Vec<f64>,

    /// an anytime path must end at least this far (straight line) from the start
    pub min_dist_path: f64,

    /// a node must beat the previous best by this much to replace it
    pub min_improvement: f64,

    /// stop expanding after this many edges lead into unknown chunks
    pub max_unknown_expansions: usize,

    /// check the clock every this many expansions. Must be a power of two.
    pub time_check_interval: usize,

    /// seed for the neighbor shuffling
    pub seed: u64,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            costs: Costs::default(),
            allow_break: true,
            allow_place: true,
            allow_parkour: true,
            allow_diagonal: true,
            allow_water: true,
            max_fall_height: 3,
            max_fall_height_water: 20,
            max_parkour_gap: 3,
            coefficients: vec![1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 10.0],
            min_dist_path: 5.0,
            min_improvement: 0.01,
            max_unknown_expansions: 50,
            time_check_interval: 64,
            seed: 0x5EED,
        }
    }
}

/// Everything needed to compute the cost of a movement
pub struct CalculationContext<'a, W: WorldView + ?Sized, T: ToolModel + ?Sized> {
    pub world: &'a W,
    pub tools: &'a T,
    pub config: &'a PathConfig,

    /// The number of 'throwaway' blocks we have, i.e., for bridging
    pub throwaway_block_count: usize,
}

impl<W: WorldView + ?Sized, T: ToolModel + ?Sized> Clone for CalculationContext<'_, W, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<W: WorldView + ?Sized, T: ToolModel + ?Sized> Copy for CalculationContext<'_, W, T> {}

impl<'a, W: WorldView + ?Sized, T: ToolModel + ?Sized> CalculationContext<'a, W, T> {
    pub const fn new(
        world: &'a W,
        tools: &'a T,
        config: &'a PathConfig,
        throwaway_block_count: usize,
    ) -> Self {
        Self {
            world,
            tools,
            config,
            throwaway_block_count,
        }
    }

    pub const fn costs(&self) -> &Costs {
        &self.config.costs
    }

    pub const fn can_place(&self) -> bool {
        self.config.allow_place && self.throwaway_block_count > 0
    }
}
