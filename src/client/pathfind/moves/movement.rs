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

use interfaces::types::{BlockLocation, SimpleType};
use smallvec::SmallVec;

use crate::{
    client::{
        agent::Agent,
        pathfind::{
            context::CalculationContext,
            moves::{MoveKind, INF},
        },
        physics::tools::ToolModel,
    },
    storage::world::WorldView,
};

type Blocks = SmallVec<[BlockLocation; 6]>;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MovementStatus {
    /// breaking or placing before we can move
    Prepping,
    Running,
    Success,
    Failed,

    /// the world changed and the movement is no longer possible
    Unreachable,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    Waiting,
    Breaking,
    Placing,
    Moving,
}

/// One edge of a path along with everything needed to execute it
#[derive(Clone, Debug)]
pub struct Movement {
    kind: MoveKind,
    src: BlockLocation,
    dest: BlockLocation,

    positions_to_break: SmallVec<[BlockLocation; 4]>,
    position_to_place: Option<BlockLocation>,

    cost: Option<f64>,

    /// the first cost we knew of
    cost_estimate: Option<f64>,

    to_break_cached: Option<Blocks>,
    to_place_cached: Option<Blocks>,
    to_walk_into_cached: Option<Blocks>,

    phase: Phase,
    ticks: u32,
}

impl Movement {
    pub fn new(kind: MoveKind, src: BlockLocation, dest: BlockLocation) -> Self {
        Self {
            kind,
            src,
            dest,
            positions_to_break: kind.positions_to_break(src, dest),
            position_to_place: kind.position_to_place(src, dest),
            cost: None,
            cost_estimate: None,
            to_break_cached: None,
            to_place_cached: None,
            to_walk_into_cached: None,
            phase: Phase::Waiting,
            ticks: 0,
        }
    }

    /// A movement whose cost is already known, i.e., from a search
    pub fn with_cost(kind: MoveKind, src: BlockLocation, dest: BlockLocation, cost: f64) -> Self {
        let mut res = Self::new(kind, src, dest);
        res.cost = Some(cost);
        res.cost_estimate = Some(cost);
        res
    }

    pub const fn kind(&self) -> MoveKind {
        self.kind
    }

    pub const fn src(&self) -> BlockLocation {
        self.src
    }

    pub const fn dest(&self) -> BlockLocation {
        self.dest
    }

    pub const fn cost_estimate(&self) -> Option<f64> {
        self.cost_estimate
    }

    /// ticks spent in [`Movement::update`] since the last reset
    pub const fn ticks(&self) -> u32 {
        self.ticks
    }

    /// The memoized cost. Only computed if it is not known yet.
    pub fn cost<W: WorldView + ?Sized, T: ToolModel + ?Sized>(
        &mut self,
        ctx: &CalculationContext<W, T>,
    ) -> f64 {
        match self.cost {
            Some(cost) => cost,
            None => self.recalculate_cost(ctx),
        }
    }

    /// Evaluate the cost again against the current world. If the move would
    /// now end somewhere else (i.e., a fall lands on a new block) it is
    /// impossible.
    pub fn recalculate_cost<W: WorldView + ?Sized, T: ToolModel + ?Sized>(
        &mut self,
        ctx: &CalculationContext<W, T>,
    ) -> f64 {
        let edge = self.kind.evaluate(ctx, self.src);
        let cost = if edge.dest == self.dest { edge.cost } else { INF };

        self.cost = Some(cost);
        self.cost_estimate.get_or_insert(cost);
        cost
    }

    fn compute_to_break<W: WorldView + ?Sized>(&self, world: &W) -> Blocks {
        self.positions_to_break
            .iter()
            .copied()
            .filter(|&loc| world.block_type_at(loc) == SimpleType::Solid)
            .collect()
    }

    fn compute_to_place<W: WorldView + ?Sized>(&self, world: &W) -> Blocks {
        let Some(target) = self.position_to_place else {
            return Blocks::new();
        };

        let needed = match self.kind {
            // swimming up needs nothing under us
            MoveKind::Pillar => world.block_type_at(target) == SimpleType::WalkThrough,
            _ => {
                world.block_type_at(self.dest) != SimpleType::Water
                    && world.block_type_at(target).replaceable()
            }
        };

        let mut res = Blocks::new();
        if needed {
            res.push(target);
        }
        res
    }

    fn compute_to_walk_into<W: WorldView + ?Sized>(&self, world: &W) -> Blocks {
        let mut res = Blocks::new();
        let swept = self
            .positions_to_break
            .iter()
            .copied()
            .chain([self.dest, self.dest.above()]);

        for loc in swept {
            if !res.contains(&loc) && world.block_type_at(loc).passable() {
                res.push(loc);
            }
        }
        res
    }

    /// Blocks which must be broken before we can move
    pub fn to_break<W: WorldView + ?Sized>(&mut self, world: &W) -> &[BlockLocation] {
        if self.to_break_cached.is_none() {
            self.to_break_cached = Some(self.compute_to_break(world));
        }
        self.to_break_cached.as_deref().unwrap_or_default()
    }

    /// Blocks which must be placed before we can move
    pub fn to_place<W: WorldView + ?Sized>(&mut self, world: &W) -> &[BlockLocation] {
        if self.to_place_cached.is_none() {
            self.to_place_cached = Some(self.compute_to_place(world));
        }
        self.to_place_cached.as_deref().unwrap_or_default()
    }

    /// Open blocks the body passes through
    pub fn to_walk_into<W: WorldView + ?Sized>(&mut self, world: &W) -> &[BlockLocation] {
        if self.to_walk_into_cached.is_none() {
            self.to_walk_into_cached = Some(self.compute_to_walk_into(world));
        }
        self.to_walk_into_cached.as_deref().unwrap_or_default()
    }

    /// Recompute the requirement caches. Returns true if any of them changed.
    pub fn refresh_requirements<W: WorldView + ?Sized>(&mut self, world: &W) -> bool {
        let to_break = Some(self.compute_to_break(world));
        let to_place = Some(self.compute_to_place(world));
        let to_walk_into = Some(self.compute_to_walk_into(world));

        let changed = to_break != self.to_break_cached
            || to_place != self.to_place_cached
            || to_walk_into != self.to_walk_into_cached;

        self.to_break_cached = to_break;
        self.to_place_cached = to_place;
        self.to_walk_into_cached = to_walk_into;

        changed
    }

    /// Forget execution progress so the movement can be started again
    pub fn reset(&mut self) {
        self.phase = Phase::Waiting;
        self.ticks = 0;
        self.to_break_cached = None;
        self.to_place_cached = None;
        self.to_walk_into_cached = None;
    }

    /// Whether stopping now leaves the agent somewhere it can stand
    pub const fn safe_to_cancel(&self) -> bool {
        match self.phase {
            Phase::Waiting | Phase::Breaking => true,
            Phase::Placing => false,
            Phase::Moving => matches!(self.kind, MoveKind::Traverse(..) | MoveKind::Diagonal(..)),
        }
    }

    fn arrived<W: WorldView + ?Sized>(&self, world: &W, agent: &impl Agent) -> bool {
        agent.location() == self.dest
            && (agent.on_ground() || world.block_type_at(self.dest) == SimpleType::Water)
    }

    /// Drive the agent for one tick
    pub fn update<W: WorldView + ?Sized, T: ToolModel + ?Sized>(
        &mut self,
        ctx: &CalculationContext<W, T>,
        agent: &mut impl Agent,
    ) -> MovementStatus {
        self.ticks += 1;

        // i.e., the block under us was broken and we dropped into place
        if self.arrived(ctx.world, agent) {
            self.phase = Phase::Waiting;
            return MovementStatus::Success;
        }

        if self.recalculate_cost(ctx) >= INF {
            return MovementStatus::Unreachable;
        }

        if let Some(&target) = self.compute_to_break(ctx.world).first() {
            self.phase = Phase::Breaking;
            agent.mine(target);
            return MovementStatus::Prepping;
        }

        if let Some(&target) = self.compute_to_place(ctx.world).first() {
            if agent.throwaway_count() == 0 {
                return MovementStatus::Failed;
            }
            self.phase = Phase::Placing;
            if !agent.place(target) {
                return MovementStatus::Failed;
            }
            return MovementStatus::Prepping;
        }

        self.phase = Phase::Moving;
        agent.walk_toward(self.dest, self.kind.jumps());

        if self.arrived(ctx.world, agent) {
            self.phase = Phase::Waiting;
            return MovementStatus::Success;
        }

        MovementStatus::Running
    }
}
