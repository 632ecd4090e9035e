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

//! The edges of the search graph.
//!
//! A [`MoveKind`] evaluated at a source location gives a destination and a
//! cost in ticks. Costs only depend on the world snapshot, the tool model and
//! the config so the same inputs always give the same edge. An impossible
//! edge has a cost of [`INF`].

use interfaces::types::{BlockLocation, CardinalDirection, DiagonalDirection, SimpleType};
use smallvec::SmallVec;

use crate::{
    client::{pathfind::context::CalculationContext, physics::tools::ToolModel},
    storage::world::WorldView,
};

pub mod movement;

pub const INF: f64 = f64::INFINITY;

/// The largest number of candidate edges from one location
pub const MAX_EDGES: usize = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MoveKind {
    /// one block over on the same level
    Traverse(CardinalDirection),
    Diagonal(DiagonalDirection),

    /// one block over and one block up
    Ascend(CardinalDirection),

    /// one block over and exactly one block down
    Descend(CardinalDirection),

    /// one block over and two or more blocks down
    Fall(CardinalDirection),

    /// straight up by placing a block underneath (or swimming)
    Pillar,

    /// straight down by breaking the floor (or swimming)
    Downward,

    /// jump over a gap
    Parkour(CardinalDirection),
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edge {
    pub kind: MoveKind,
    pub dest: BlockLocation,
    pub cost: f64,
}

impl Edge {
    const fn impossible(kind: MoveKind, dest: BlockLocation) -> Self {
        Self {
            kind,
            dest,
            cost: INF,
        }
    }

    pub fn possible(&self) -> bool {
        self.cost < INF
    }
}

impl<W: WorldView + ?Sized, T: ToolModel + ?Sized> CalculationContext<'_, W, T> {
    fn block(&self, loc: BlockLocation) -> SimpleType {
        self.world.block_type_at(loc)
    }

    fn passable(&self, loc: BlockLocation) -> bool {
        match self.block(loc) {
            SimpleType::WalkThrough => true,
            SimpleType::Water => self.config.allow_water,
            SimpleType::Solid | SimpleType::Avoid => false,
        }
    }

    fn in_water(&self, loc: BlockLocation) -> bool {
        self.config.allow_water && self.block(loc) == SimpleType::Water
    }

    fn on_solid(&self, loc: BlockLocation) -> bool {
        self.block(loc.below()) == SimpleType::Solid
    }

    // can the body rest here once it arrives
    fn standable(&self, loc: BlockLocation) -> bool {
        self.in_water(loc) || self.on_solid(loc)
    }

    // the ticks needed to make a cell passable
    fn clear_cost(&self, loc: BlockLocation) -> f64 {
        match self.block(loc) {
            SimpleType::WalkThrough => 0.0,
            SimpleType::Water if self.config.allow_water => 0.0,
            SimpleType::Solid if self.config.allow_break => {
                self.tools.break_ticks(SimpleType::Solid) + self.costs().break_overhead
            }
            _ => INF,
        }
    }

    // the ticks needed to make `floor` something we can stand on. A placed
    // block needs a solid face to go against which is not one of `agent`.
    fn support_cost(&self, floor: BlockLocation, agent: &[BlockLocation]) -> f64 {
        match self.block(floor) {
            SimpleType::Solid => 0.0,
            SimpleType::Avoid => INF,
            SimpleType::WalkThrough | SimpleType::Water => {
                if !self.can_place() {
                    return INF;
                }
                let supported = floor.neighbors().into_iter().any(|face| {
                    !agent.contains(&face) && self.block(face) == SimpleType::Solid
                });
                if supported {
                    self.costs().place
                } else {
                    INF
                }
            }
        }
    }

    fn walk_cost(&self, src: BlockLocation, dest: BlockLocation) -> f64 {
        if self.in_water(src) || self.in_water(dest) {
            self.costs().block_walk_water
        } else {
            self.costs().block_walk
        }
    }

    fn traverse(&self, src: BlockLocation, direction: CardinalDirection) -> Edge {
        let kind = MoveKind::Traverse(direction);
        let dest = src + direction.unit_change();

        let breaking = self.clear_cost(dest) + self.clear_cost(dest.above());
        if breaking >= INF {
            return Edge::impossible(kind, dest);
        }

        let floor = if self.in_water(dest) {
            0.0
        } else {
            self.support_cost(dest.below(), &[src, src.above()])
        };

        Edge {
            kind,
            dest,
            cost: self.walk_cost(src, dest) + breaking + floor,
        }
    }

    fn diagonal(&self, src: BlockLocation, direction: DiagonalDirection) -> Edge {
        let kind = MoveKind::Diagonal(direction);
        let dest = src + direction.unit_change();

        if !self.passable(dest) || !self.passable(dest.above()) || !self.standable(dest) {
            return Edge::impossible(kind, dest);
        }

        let corners = [
            src + direction.0.unit_change(),
            src + direction.1.unit_change(),
        ];

        let touches_avoid = corners.iter().any(|corner| {
            self.block(*corner) == SimpleType::Avoid
                || self.block(corner.above()) == SimpleType::Avoid
        });

        let any_open = corners
            .iter()
            .any(|corner| self.passable(*corner) && self.passable(corner.above()));

        if touches_avoid || !any_open {
            return Edge::impossible(kind, dest);
        }

        Edge {
            kind,
            dest,
            cost: self.walk_cost(src, dest) * self.costs().diagonal_mult,
        }
    }

    fn ascend(&self, src: BlockLocation, direction: CardinalDirection) -> Edge {
        let kind = MoveKind::Ascend(direction);
        let over = src + direction.unit_change();
        let dest = over.above();

        if !self.standable(src) {
            return Edge::impossible(kind, dest);
        }

        let breaking = self.clear_cost(src.add_y(2))
            + self.clear_cost(dest)
            + self.clear_cost(dest.above());
        if breaking >= INF {
            return Edge::impossible(kind, dest);
        }

        let step = self.support_cost(over, &[src, src.above()]);
        let costs = self.costs();

        Edge {
            kind,
            dest,
            cost: costs.block_walk + costs.jump_one_block + breaking + step,
        }
    }

    fn descend(&self, src: BlockLocation, direction: CardinalDirection) -> Edge {
        let kind = MoveKind::Descend(direction);
        let over = src + direction.unit_change();
        let dest = over.below();

        let breaking =
            self.clear_cost(over.above()) + self.clear_cost(over) + self.clear_cost(dest);
        if breaking >= INF || !self.standable(dest) {
            return Edge::impossible(kind, dest);
        }

        let costs = self.costs();
        Edge {
            kind,
            dest,
            cost: costs.walk_off_edge + costs.fall(1) + breaking,
        }
    }

    fn fall(&self, src: BlockLocation, direction: CardinalDirection) -> Edge {
        let kind = MoveKind::Fall(direction);
        let over = src + direction.unit_change();
        let config = self.config;

        let breaking = self.clear_cost(over.above()) + self.clear_cost(over);

        // the first block under `over` must be open air, otherwise this is a
        // traverse or a descend
        if breaking >= INF || self.block(over.below()) != SimpleType::WalkThrough {
            return Edge::impossible(kind, over.below());
        }

        let deepest = (config.max_fall_height + 1).max(config.max_fall_height_water);
        let deepest = i16::try_from(deepest).unwrap_or(i16::MAX);

        for depth in 2..=deepest {
            let cell = over.add_y(-depth);
            let blocks = u32::from(depth.unsigned_abs());

            let landing = match self.block(cell) {
                SimpleType::WalkThrough => continue,
                SimpleType::Water if config.allow_water && blocks <= config.max_fall_height_water => {
                    Some((cell, blocks))
                }

                // a drop of one block is a descend
                SimpleType::Solid if blocks > 2 && blocks - 1 <= config.max_fall_height => {
                    Some((cell.above(), blocks - 1))
                }
                _ => None,
            };

            let Some((dest, blocks)) = landing else {
                return Edge::impossible(kind, over.below());
            };

            let costs = self.costs();
            return Edge {
                kind,
                dest,
                cost: costs.walk_off_edge + costs.fall(blocks) + breaking,
            };
        }

        Edge::impossible(kind, over.below())
    }

    fn pillar(&self, src: BlockLocation) -> Edge {
        let kind = MoveKind::Pillar;
        let dest = src.above();
        let costs = self.costs();

        if self.in_water(src) {
            // swim up
            if !self.passable(dest) {
                return Edge::impossible(kind, dest);
            }
            return Edge {
                kind,
                dest,
                cost: costs.swim_vertical + self.clear_cost(dest.above()),
            };
        }

        if !self.on_solid(src) {
            return Edge::impossible(kind, dest);
        }

        // the block under our feet. If it is already solid it was placed by us
        let place = self.support_cost(src, &[]);
        let breaking = self.clear_cost(dest) + self.clear_cost(dest.above());

        Edge {
            kind,
            dest,
            cost: costs.jump_one_block + place + breaking,
        }
    }

    fn downward(&self, src: BlockLocation) -> Edge {
        let kind = MoveKind::Downward;
        let dest = src.below();
        let costs = self.costs();

        if self.in_water(src) && self.passable(dest) {
            if !self.standable(dest) {
                return Edge::impossible(kind, dest);
            }
            return Edge {
                kind,
                dest,
                cost: costs.swim_vertical,
            };
        }

        if !self.on_solid(dest) {
            return Edge::impossible(kind, dest);
        }

        // already dug out, i.e., while the move is being executed
        if self.block(dest) == SimpleType::WalkThrough {
            return Edge {
                kind,
                dest,
                cost: costs.fall(1),
            };
        }

        if self.block(dest) != SimpleType::Solid {
            return Edge::impossible(kind, dest);
        }

        Edge {
            kind,
            dest,
            cost: self.clear_cost(dest) + costs.fall(1),
        }
    }

    fn parkour(&self, src: BlockLocation, direction: CardinalDirection) -> Edge {
        let kind = MoveKind::Parkour(direction);
        let unit = direction.unit_change();
        let placeholder = src + unit.scale(2);
        let config = self.config;

        let can_jump = !self.in_water(src) && self.on_solid(src) && self.passable(src.add_y(2));
        if !config.allow_parkour || !can_jump {
            return Edge::impossible(kind, placeholder);
        }

        let widest = i32::try_from(config.max_parkour_gap).unwrap_or(i32::MAX - 1);

        for blocks in 1..=widest + 1 {
            let cell = src + unit.scale(blocks);
            if !self.passable(cell) || !self.passable(cell.above()) {
                return Edge::impossible(kind, placeholder);
            }

            let floor = self.block(cell.below());

            if blocks == 1 {
                // there must be something to jump over
                if floor == SimpleType::Solid {
                    return Edge::impossible(kind, placeholder);
                }
            } else if floor == SimpleType::Solid {
                return Edge {
                    kind,
                    dest: cell,
                    cost: self.costs().parkour_per_block * f64::from(blocks),
                };
            }

            // we pass through the top of the arc
            if !self.passable(cell.add_y(2)) {
                return Edge::impossible(kind, placeholder);
            }
        }

        Edge::impossible(kind, placeholder)
    }
}

impl MoveKind {
    /// Every kind of movement the config allows
    pub fn candidates(allow_diagonal: bool, allow_parkour: bool) -> SmallVec<[Self; MAX_EDGES]> {
        let mut res = SmallVec::new();

        for direction in CardinalDirection::ALL {
            res.push(Self::Traverse(direction));
            res.push(Self::Ascend(direction));
            res.push(Self::Descend(direction));
            res.push(Self::Fall(direction));
            if allow_parkour {
                res.push(Self::Parkour(direction));
            }
        }

        if allow_diagonal {
            for direction in DiagonalDirection::ALL {
                res.push(Self::Diagonal(direction));
            }
        }

        res.push(Self::Pillar);
        res.push(Self::Downward);
        res
    }

    /// Where the move goes and how much it costs from `src` in the world of `ctx`
    pub fn evaluate<W: WorldView + ?Sized, T: ToolModel + ?Sized>(
        self,
        ctx: &CalculationContext<W, T>,
        src: BlockLocation,
    ) -> Edge {
        match self {
            Self::Traverse(direction) => ctx.traverse(src, direction),
            Self::Diagonal(direction) => ctx.diagonal(src, direction),
            Self::Ascend(direction) => ctx.ascend(src, direction),
            Self::Descend(direction) => ctx.descend(src, direction),
            Self::Fall(direction) => ctx.fall(src, direction),
            Self::Pillar => ctx.pillar(src),
            Self::Downward => ctx.downward(src),
            Self::Parkour(direction) => ctx.parkour(src, direction),
        }
    }

    /// Whether the agent has to jump to make this move
    pub const fn jumps(self) -> bool {
        matches!(self, Self::Ascend(..) | Self::Pillar | Self::Parkour(..))
    }

    /// The cells the body sweeps through which may have to be broken first
    pub fn positions_to_break(
        self,
        src: BlockLocation,
        dest: BlockLocation,
    ) -> SmallVec<[BlockLocation; 4]> {
        let mut res = SmallVec::new();
        match self {
            Self::Traverse(_) => res.extend([dest, dest.above()]),
            Self::Ascend(_) => res.extend([src.add_y(2), dest, dest.above()]),
            Self::Descend(_) => res.extend([dest.add_y(2), dest.above(), dest]),
            Self::Fall(direction) => {
                let over = src + direction.unit_change();
                res.extend([over.above(), over]);
            }
            Self::Pillar => res.extend([dest, dest.above()]),
            Self::Downward => res.push(dest),
            Self::Diagonal(_) | Self::Parkour(_) => {}
        }
        res
    }

    /// The block which may have to be placed so there is something to stand on
    pub const fn position_to_place(
        self,
        src: BlockLocation,
        dest: BlockLocation,
    ) -> Option<BlockLocation> {
        match self {
            Self::Traverse(_) | Self::Ascend(_) => Some(dest.below()),
            Self::Pillar => Some(src),
            _ => None,
        }
    }
}

/// All the possible and impossible edges leaving `src` which stay inside the world border
pub fn edges<W: WorldView + ?Sized, T: ToolModel + ?Sized>(
    ctx: &CalculationContext<W, T>,
    src: BlockLocation,
) -> SmallVec<[Edge; MAX_EDGES]> {
    MoveKind::candidates(ctx.config.allow_diagonal, ctx.config.allow_parkour)
        .into_iter()
        .map(|kind| kind.evaluate(ctx, src))
        .filter(|edge| ctx.world.inside_bounds(edge.dest.x, edge.dest.z))
        .collect()
}
