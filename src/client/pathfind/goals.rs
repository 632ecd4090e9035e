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

//! Where a search is trying to get to.
//!
//! Every goal answers two questions about a block location: are we there, and
//! roughly how many ticks away are we. Most heuristics are built from
//! [`xz_cost`] and [`y_cost`].

use interfaces::types::BlockLocation;
use serde::{Deserialize, Serialize};

use crate::client::physics::{fall_ticks, jump_one_block_ticks};

/// Estimated ticks per horizontal block. Lower than the real walking cost so
/// block and XZ heuristics never overestimate on flat ground.
pub const HEURISTIC_PER_BLOCK: f64 = 3.563;

const SQRT_1_2: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// The most octile distance can exceed straight-line distance by, `sqrt(4 - 2√2)`
const OCTILE_OVER_EUCLID: f64 = 1.082_392_200_292_394;

/// Octile distance over the xz plane
pub fn xz_cost(dx: i64, dz: i64) -> f64 {
    let x = dx.unsigned_abs() as f64;
    let z = dz.unsigned_abs() as f64;

    let (straight, diagonal) = if x < z { (z - x, x) } else { (x - z, z) };

    (diagonal * std::f64::consts::SQRT_2 + straight) * HEURISTIC_PER_BLOCK
}

/// The cost of changing from `y` to `goal_y`
pub fn y_cost(goal_y: i16, y: i16) -> f64 {
    drop_cost(i32::from(y) - i32::from(goal_y))
}

// `dy` blocks above where we want to be
fn drop_cost(dy: i32) -> f64 {
    match dy.cmp(&0) {
        // going down is roughly half of a two block fall per block
        std::cmp::Ordering::Greater => fall_ticks(2) / 2.0 * f64::from(dy),
        std::cmp::Ordering::Less => f64::from(-dy) * jump_one_block_ticks(),
        std::cmp::Ordering::Equal => 0.0,
    }
}

fn block_cost(dx: i64, dy: i32, dz: i64) -> f64 {
    drop_cost(dy) + xz_cost(dx, dz)
}

/// `to - from` per axis, widened so nothing overflows
fn offset(from: BlockLocation, to: BlockLocation) -> (i64, i32, i64) {
    (
        i64::from(to.x) - i64::from(from.x),
        i32::from(to.y) - i32::from(from.y),
        i64::from(to.z) - i64::from(from.z),
    )
}

fn block_cost_between(from: BlockLocation, to: BlockLocation) -> f64 {
    let (dx, dy, dz) = offset(from, to);
    block_cost(dx, dy, dz)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    /// feet exactly at a block
    Block(BlockLocation),

    /// either the feet or the head at a block
    TwoBlocks(BlockLocation),

    /// close enough to reach out and touch a block
    GetToBlock(BlockLocation),

    /// within `range` blocks (straight line) of `pos`
    Near { pos: BlockLocation, range: u32 },

    /// any y at a column
    XZ { x: i32, z: i32 },

    YLevel(i16),

    /// on one of the two axes or two diagonals through the origin at `level`
    Axis { level: i16 },

    /// any of the inner goals. Uses the smallest inner heuristic, which is
    /// not admissible when the inner goals disagree.
    Composite(Vec<Goal>),

    /// get as far as possible from the inner goal. Never reached.
    Inverted(Box<Goal>),

    /// keep travelling in the direction (dx, dz) from `origin`. Never reached.
    StrictDirection {
        origin: BlockLocation,
        dx: i32,
        dz: i32,
    },

    /// visit the waypoints in order, starting at `index`
    Patrol {
        waypoints: Vec<BlockLocation>,
        index: usize,
    },

    /// be at least `distance` blocks (xz) away from every location in `from`
    RunAway {
        from: Vec<BlockLocation>,
        distance: u32,
        maintain_y: Option<i16>,
    },
}

impl Goal {
    pub fn is_in_goal(&self, loc: BlockLocation) -> bool {
        match self {
            Self::Block(goal) => *goal == loc,
            Self::TwoBlocks(goal) => *goal == loc || *goal == loc.above(),
            Self::GetToBlock(goal) => {
                let dx = u64::from(loc.x.abs_diff(goal.x));
                let dz = u64::from(loc.z.abs_diff(goal.z));
                let dy = i32::from(loc.y) - i32::from(goal.y);

                // standing below the block with our head next to it is fine
                let dy = if dy < 0 { dy + 1 } else { dy };
                dx + u64::from(dy.unsigned_abs()) + dz <= 1
            }
            Self::Near { pos, range } => {
                let range = f64::from(*range);
                loc.dist2(*pos) <= range * range
            }
            Self::XZ { x, z } => loc.x == *x && loc.z == *z,
            Self::YLevel(level) => loc.y == *level,
            Self::Axis { level } => {
                loc.y == *level && (loc.x == 0 || loc.z == 0 || loc.x.abs() == loc.z.abs())
            }
            Self::Composite(goals) => goals.iter().any(|goal| goal.is_in_goal(loc)),
            Self::Inverted(_) | Self::StrictDirection { .. } => false,
            Self::Patrol { waypoints, index } => match waypoints.get(*index) {
                Some(waypoint) => *waypoint == loc,
                None => true,
            },
            Self::RunAway {
                from,
                distance,
                maintain_y,
            } => {
                if maintain_y.is_some_and(|y| y != loc.y) {
                    return false;
                }
                let min_dist2 = u64::from(*distance) * u64::from(*distance);
                from.iter().all(|avoid| {
                    let dx = u64::from(loc.x.abs_diff(avoid.x));
                    let dz = u64::from(loc.z.abs_diff(avoid.z));
                    dx * dx + dz * dz >= min_dist2
                })
            }
        }
    }

    /// Estimated ticks until the goal is reached
    pub fn heuristic(&self, loc: BlockLocation) -> f64 {
        match self {
            Self::Block(goal) => block_cost_between(*goal, loc),
            Self::TwoBlocks(goal) => {
                let (dx, dy, dz) = offset(*goal, loc);
                let dy = if dy < 0 { dy + 1 } else { dy };
                block_cost(dx, dy, dz)
            }
            Self::GetToBlock(goal) => {
                let (dx, dy, dz) = offset(*goal, loc);
                let dy = if dy < -1 { dy + 1 } else { dy };
                block_cost(dx, dy, dz)
            }
            Self::Near { pos, .. } => block_cost_between(*pos, loc),
            Self::XZ { x, z } => xz_cost(
                i64::from(loc.x) - i64::from(*x),
                i64::from(loc.z) - i64::from(*z),
            ),
            Self::YLevel(level) => y_cost(*level, loc.y),
            Self::Axis { level } => {
                let x = f64::from(loc.x.unsigned_abs());
                let z = f64::from(loc.z.unsigned_abs());

                let shorter = x.min(z);
                let longer = x.max(z);
                let to_diagonal = (longer - shorter) * SQRT_1_2;

                let flat = x.min(z).min(to_diagonal);
                flat * HEURISTIC_PER_BLOCK + y_cost(*level, loc.y)
            }
            Self::Composite(goals) => goals
                .iter()
                .map(|goal| goal.heuristic(loc))
                .fold(f64::INFINITY, f64::min),
            Self::Inverted(goal) => -goal.heuristic(loc),
            Self::StrictDirection { origin, dx, dz } => {
                let rel_x = f64::from(loc.x) - f64::from(origin.x);
                let rel_z = f64::from(loc.z) - f64::from(origin.z);
                let (dx, dz) = (f64::from(*dx), f64::from(*dz));

                let along = rel_x.mul_add(dx, rel_z * dz);
                let across = (rel_x * dz).abs() + (rel_z * dx).abs();
                let vertical = f64::from(loc.y.abs_diff(origin.y));

                -along * 100.0 + across * 1000.0 + vertical * 1000.0
            }
            Self::Patrol { waypoints, index } => waypoints
                .get(*index)
                .map_or(0.0, |goal| block_cost_between(*goal, loc)),
            Self::RunAway {
                from, maintain_y, ..
            } => {
                let closest = from
                    .iter()
                    .map(|avoid| {
                        let (dx, _, dz) = offset(*avoid, loc);
                        xz_cost(dx, dz)
                    })
                    .fold(f64::INFINITY, f64::min);

                let mut heuristic = -closest;
                if let Some(y) = maintain_y {
                    heuristic = heuristic.mul_add(0.6, y_cost(*y, loc.y) * 1.5);
                }
                heuristic
            }
        }
    }

    /// The heuristic once the goal is reached. Most goals are zero here.
    pub fn heuristic_at_goal(&self) -> f64 {
        match self {
            Self::Composite(goals) => goals
                .iter()
                .map(Self::heuristic_at_goal)
                .fold(f64::INFINITY, f64::min),
            Self::Inverted(_) | Self::StrictDirection { .. } => f64::NEG_INFINITY,
            Self::RunAway {
                from,
                distance,
                maintain_y,
            } => {
                if from.is_empty() {
                    return 0.0;
                }

                // a column whose estimate is at least this far from every
                // location is far enough away for real
                let closest = f64::from(*distance) * OCTILE_OVER_EUCLID * HEURISTIC_PER_BLOCK;
                if maintain_y.is_some() {
                    -closest * 0.6
                } else {
                    -closest
                }
            }
            _ => 0.0,
        }
    }

    /// Whether a path ending at `loc` needs no further planning
    pub fn reached_by(&self, loc: BlockLocation) -> bool {
        self.is_in_goal(loc) || self.heuristic(loc) <= self.heuristic_at_goal()
    }

    /// A patrol aimed at the next waypoint. Other goals are returned unchanged.
    #[must_use]
    pub fn advanced(&self) -> Self {
        match self {
            Self::Patrol { waypoints, index } if !waypoints.is_empty() => Self::Patrol {
                waypoints: waypoints.clone(),
                index: (index + 1) % waypoints.len(),
            },
            other => other.clone(),
        }
    }
}
