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

//! Drives an agent along one [`Path`], a movement at a time.
//!
//! Every tick the executor first makes sure the agent is where the path
//! expects it to be (or close enough), then re-validates the movements around
//! the cursor against the live world, and only then lets the movement at the
//! cursor act.

use indexmap::IndexSet;
use interfaces::types::BlockLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    client::{
        agent::Agent,
        pathfind::{
            context::{CalculationContext, PathConfig},
            moves::{movement::MovementStatus, INF},
            path::Path,
        },
        physics::tools::ToolModel,
    },
    error::PathError,
    storage::world::WorldView,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// how far from the path we may be before we start counting ticks
    pub max_dist_from_path: f64,

    /// how far from the path we may ever be
    pub max_max_dist_from_path: f64,

    /// consecutive ticks allowed beyond [`ExecutorConfig::max_dist_from_path`]
    pub max_ticks_away: u32,

    pub skip_back_window: usize,
    pub skip_forward_window: usize,

    /// movements on each side of the cursor whose requirements are tracked
    pub requirement_window: usize,

    /// movements past the cursor which are re-validated
    pub cost_verification_lookahead: usize,

    /// the most a movement may get more expensive than planned
    pub max_cost_increase: f64,

    /// ticks allowed on a movement on top of its estimated cost
    pub movement_timeout_ticks: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_dist_from_path: 2.0,
            max_max_dist_from_path: 3.0,
            max_ticks_away: 200,
            skip_back_window: 10,
            skip_forward_window: 10,
            requirement_window: 10,
            cost_verification_lookahead: 5,
            max_cost_increase: 10.0,
            movement_timeout_ticks: 100,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ExecutorSignal {
    Running,
    Succeeded,
    Failed,
}

pub struct PathExecutor {
    path: Path,
    config: ExecutorConfig,

    /// index into the movements of the path
    cursor: usize,
    signal: ExecutorSignal,

    ticks_away: u32,
    ticks_on_current: u32,

    /// the cost of the cursor movement when we first reached it
    current_estimate: Option<f64>,
    lookahead_checked: bool,

    /// the cursor the requirement sets were built for
    requirements_cursor: Option<usize>,
    to_break: IndexSet<BlockLocation>,
    to_place: IndexSet<BlockLocation>,
    to_walk_into: IndexSet<BlockLocation>,
}

impl PathExecutor {
    pub fn new(path: Path, config: ExecutorConfig) -> Self {
        Self {
            path,
            config,
            cursor: 0,
            signal: ExecutorSignal::Running,
            ticks_away: 0,
            ticks_on_current: 0,
            current_estimate: None,
            lookahead_checked: false,
            requirements_cursor: None,
            to_break: IndexSet::new(),
            to_place: IndexSet::new(),
            to_walk_into: IndexSet::new(),
        }
    }

    /// The index of the movement being executed
    pub const fn position(&self) -> usize {
        self.cursor
    }

    pub const fn path(&self) -> &Path {
        &self.path
    }

    pub const fn signal(&self) -> ExecutorSignal {
        self.signal
    }

    pub const fn blocks_to_break(&self) -> &IndexSet<BlockLocation> {
        &self.to_break
    }

    pub const fn blocks_to_place(&self) -> &IndexSet<BlockLocation> {
        &self.to_place
    }

    pub const fn blocks_to_walk_into(&self) -> &IndexSet<BlockLocation> {
        &self.to_walk_into
    }

    /// True between movements and while a movement is at a point where it
    /// can be abandoned, i.e., not mid-placement.
    pub fn safe_to_cancel(&self) -> bool {
        if self.signal != ExecutorSignal::Running {
            return true;
        }

        self.path
            .movements()
            .get(self.cursor)
            .map_or(true, |movement| movement.safe_to_cancel())
    }

    /// Stop executing. The executor is failed afterwards.
    pub fn cancel(&mut self, agent: &mut impl Agent) {
        agent.release_controls();
        if self.signal == ExecutorSignal::Running {
            info!(cursor = self.cursor, "path cancelled");
        }
        self.signal = ExecutorSignal::Failed;
    }

    /// A new executor over this path followed by `next`, at the same cursor
    pub fn try_splice(&self, next: &Path) -> Result<Self, PathError> {
        let path = Path::splice(&self.path, next)?;
        debug!(
            from = self.path.len(),
            to = path.len(),
            "spliced next segment onto current path"
        );

        Ok(Self {
            path,
            config: self.config.clone(),
            cursor: self.cursor,
            signal: self.signal,
            ticks_away: self.ticks_away,
            ticks_on_current: self.ticks_on_current,
            current_estimate: self.current_estimate,
            lookahead_checked: self.lookahead_checked,
            requirements_cursor: None,
            to_break: self.to_break.clone(),
            to_place: self.to_place.clone(),
            to_walk_into: self.to_walk_into.clone(),
        })
    }

    fn fail(&mut self, agent: &mut impl Agent, reason: &str) -> ExecutorSignal {
        info!(cursor = self.cursor, "path failed: {reason}");
        agent.release_controls();
        self.signal = ExecutorSignal::Failed;
        self.signal
    }

    fn on_cursor_change(&mut self, agent: &mut impl Agent) {
        agent.release_controls();
        self.ticks_on_current = 0;
        self.current_estimate = None;
        self.lookahead_checked = false;
    }

    fn distance_from_path(&self, location: BlockLocation) -> f64 {
        self.path
            .positions()
            .iter()
            .map(|pos| pos.dist(location))
            .fold(f64::INFINITY, f64::min)
    }

    /// A position behind the cursor we are standing on, i.e., after lag
    fn skip_back_target(&self, location: BlockLocation) -> Option<usize> {
        let from = self.cursor.saturating_sub(self.config.skip_back_window);
        let to = self.cursor.saturating_sub(1);
        (from..to).find(|&i| self.path.positions()[i] == location)
    }

    /// A position ahead of the next one we are standing on. The next one is
    /// only ever reached through the movement completing.
    fn skip_forward_target(&self, location: BlockLocation) -> Option<usize> {
        let last = self.path.len() - 1;
        let to = (self.cursor + self.config.skip_forward_window).min(last);
        (self.cursor + 2..=to).find(|&i| self.path.positions()[i] == location)
    }

    fn refresh_requirements<W: WorldView + ?Sized>(&mut self, world: &W) {
        let window = self.config.requirement_window;
        let movements = self.path.movements_mut();
        if movements.is_empty() {
            return;
        }

        let from = self.cursor.saturating_sub(window);
        let to = (self.cursor + window).min(movements.len() - 1);

        let mut changed = false;
        for movement in &mut movements[from..=to] {
            changed |= movement.refresh_requirements(world);
        }

        if !changed && self.requirements_cursor == Some(self.cursor) {
            return;
        }

        self.to_break.clear();
        self.to_place.clear();
        self.to_walk_into.clear();

        for movement in &mut movements[from..=to] {
            self.to_break.extend(movement.to_break(world).iter().copied());
            self.to_place.extend(movement.to_place(world).iter().copied());
            self.to_walk_into
                .extend(movement.to_walk_into(world).iter().copied());
        }

        self.requirements_cursor = Some(self.cursor);
    }

    fn finish(&mut self, agent: &mut impl Agent) -> ExecutorSignal {
        agent.release_controls();
        if agent.location() == self.path.dest() {
            info!(dest = %self.path.dest(), "path finished");
            self.signal = ExecutorSignal::Succeeded;
            self.signal
        } else {
            self.fail(agent, "ran out of movements away from the destination")
        }
    }

    /// Advance the path by one tick
    pub fn tick<W: WorldView + ?Sized, T: ToolModel + ?Sized, A: Agent>(
        &mut self,
        world: &W,
        tools: &T,
        path_config: &PathConfig,
        agent: &mut A,
    ) -> ExecutorSignal {
        if self.signal != ExecutorSignal::Running {
            return self.signal;
        }

        self.tick_inner(world, tools, path_config, agent, true)
    }

    fn tick_inner<W: WorldView + ?Sized, T: ToolModel + ?Sized, A: Agent>(
        &mut self,
        world: &W,
        tools: &T,
        path_config: &PathConfig,
        agent: &mut A,
        may_skip: bool,
    ) -> ExecutorSignal {
        let location = agent.location();
        let movement_count = self.path.movements().len();

        if self.cursor >= movement_count {
            return self.finish(agent);
        }

        if may_skip && location != self.path.positions()[self.cursor] {
            if let Some(i) = self.skip_back_target(location) {
                let old = self.cursor;
                self.cursor = i.saturating_sub(1);
                debug!(from = old, to = self.cursor, "skipping back");

                let last = old.min(movement_count - 1);
                for movement in &mut self.path.movements_mut()[self.cursor..=last] {
                    movement.reset();
                }

                self.on_cursor_change(agent);
                return self.tick_inner(world, tools, path_config, agent, false);
            }

            if let Some(i) = self.skip_forward_target(location) {
                debug!(from = self.cursor, to = i - 1, "skipping forward");
                self.cursor = i - 1;
                self.on_cursor_change(agent);
                return self.tick_inner(world, tools, path_config, agent, false);
            }
        }

        let distance = self.distance_from_path(location);
        if distance > self.config.max_max_dist_from_path {
            return self.fail(agent, "too far from the path");
        }

        if distance > self.config.max_dist_from_path {
            self.ticks_away += 1;
            trace!(ticks = self.ticks_away, distance, "away from the path");
            if self.ticks_away > self.config.max_ticks_away {
                return self.fail(agent, "away from the path for too long");
            }
        } else {
            self.ticks_away = 0;
        }

        self.refresh_requirements(world);

        let ctx = CalculationContext::new(world, tools, path_config, agent.throwaway_count());
        let cursor = self.cursor;

        let dest = self.path.movements()[cursor].dest();
        if !world.is_loaded(dest.x, dest.z) {
            trace!(%dest, "waiting for the destination to load");
            agent.release_controls();
            return ExecutorSignal::Running;
        }

        let safe = self.path.movements()[cursor].safe_to_cancel();
        let movements = self.path.movements_mut();

        let estimate = *self.current_estimate.get_or_insert_with(|| {
            let movement = &mut movements[cursor];
            movement
                .cost_estimate()
                .unwrap_or_else(|| movement.cost(&ctx))
        });

        if !self.lookahead_checked {
            let last = (cursor + self.config.cost_verification_lookahead).min(movement_count);
            let mut blocked = false;

            for movement in &mut movements[cursor..last] {
                let ahead = movement.dest();
                if world.is_loaded(ahead.x, ahead.z) && movement.recalculate_cost(&ctx) >= INF {
                    blocked = true;
                    break;
                }
            }

            if blocked && safe {
                return self.fail(agent, "a movement ahead became impossible");
            }

            // try again next tick if we could not cancel
            self.lookahead_checked = !blocked;
        }

        let live = movements[cursor].recalculate_cost(&ctx);

        if live >= INF && safe {
            return self.fail(agent, "the current movement became impossible");
        }

        if live - estimate > self.config.max_cost_increase && safe {
            return self.fail(agent, "the current movement got too expensive");
        }

        let allowed = estimate + f64::from(self.config.movement_timeout_ticks);
        if f64::from(self.ticks_on_current) > allowed {
            return self.fail(agent, "the current movement timed out");
        }

        self.ticks_on_current += 1;
        let status = self.path.movements_mut()[cursor].update(&ctx, agent);

        match status {
            MovementStatus::Success => {
                trace!(cursor, "movement finished");
                self.cursor += 1;
                self.on_cursor_change(agent);

                if self.cursor == movement_count {
                    return self.finish(agent);
                }

                ExecutorSignal::Running
            }
            MovementStatus::Failed | MovementStatus::Unreachable => {
                self.fail(agent, &format!("movement reported {status:?}"))
            }
            MovementStatus::Prepping | MovementStatus::Running => ExecutorSignal::Running,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use interfaces::types::{BlockLocation, CardinalDirection, SimpleType};
    use more_asserts::*;
    use parking_lot::RwLock;

    use crate::{
        client::{
            agent::Agent,
            follow::{ExecutorConfig, ExecutorSignal, PathExecutor},
            pathfind::{
                context::PathConfig,
                goals::Goal,
                moves::{movement::Movement, MoveKind},
                path::Path,
            },
            physics::tools::Tool,
            sim::SimAgent,
        },
        storage::blocks::WorldBlocks,
    };

    struct Fixture {
        world: Arc<RwLock<WorldBlocks>>,
        tool: Tool,
        config: PathConfig,
        agent: SimAgent,
    }

    impl Fixture {
        fn new(blocks: WorldBlocks) -> Self {
            let world = Arc::new(RwLock::new(blocks));
            let agent = SimAgent::new(world.clone(), BlockLocation::new(0, 0, 0), 0);
            Self {
                world,
                tool: Tool::default(),
                config: PathConfig::default(),
                agent,
            }
        }

        fn tick(&mut self, executor: &mut PathExecutor) -> ExecutorSignal {
            executor.tick(&*self.world, &self.tool, &self.config, &mut self.agent)
        }

        /// walk along +x from x = 0 to x = `to`
        fn straight(&self, to: i32) -> Path {
            let positions: Vec<_> = (0..=to).map(|x| BlockLocation::new(x, 0, 0)).collect();
            let movements = positions
                .windows(2)
                .map(|pair| {
                    Movement::with_cost(
                        MoveKind::Traverse(CardinalDirection::North),
                        pair[0],
                        pair[1],
                        self.config.costs.block_walk,
                    )
                })
                .collect();
            let goal = Arc::new(Goal::Block(BlockLocation::new(to, 0, 0)));
            Path::try_new(positions, movements, goal, 0).unwrap()
        }
    }

    #[test]
    fn test_no_drift() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let n = 8;
        let mut executor = PathExecutor::new(fixture.straight(n), ExecutorConfig::default());

        for i in 1..n {
            assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
            assert_eq!(executor.position(), i as usize);
        }

        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Succeeded);
        assert_eq!(executor.position(), n as usize);
        assert_eq!(fixture.agent.location(), BlockLocation::new(n, 0, 0));

        // terminal states stick
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Succeeded);
    }

    #[test]
    fn test_hard_threshold() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(5), ExecutorConfig::default());

        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);

        fixture.agent.teleport(BlockLocation::new(1, 0, 4));
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Failed);
        assert_eq!(executor.signal(), ExecutorSignal::Failed);
    }

    #[test]
    fn test_soft_threshold() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let config = ExecutorConfig {
            max_ticks_away: 20,
            ..ExecutorConfig::default()
        };
        let mut executor = PathExecutor::new(fixture.straight(5), config);

        // sqrt(5) from (2, 0, 0), between the soft and hard thresholds
        fixture.agent.set_frozen(true);
        fixture.agent.teleport(BlockLocation::new(2, 1, 2));

        for _ in 0..20 {
            assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
        }
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Failed);
    }

    #[test]
    fn test_soft_threshold_resets() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let config = ExecutorConfig {
            max_ticks_away: 5,
            ..ExecutorConfig::default()
        };
        let mut executor = PathExecutor::new(fixture.straight(5), config);
        fixture.agent.set_frozen(true);

        for _ in 0..3 {
            fixture.agent.teleport(BlockLocation::new(2, 1, 2));
            for _ in 0..5 {
                assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
            }

            fixture.agent.teleport(BlockLocation::new(0, 0, 0));
            assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
        }
    }

    #[test]
    fn test_skip_forward() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(6), ExecutorConfig::default());

        fixture.agent.teleport(BlockLocation::new(3, 0, 0));
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);

        // the movement into (3, 0, 0) confirmed the arrival
        assert_eq!(executor.position(), 3);
    }

    #[test]
    fn test_next_position_is_not_skipped_to() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(6), ExecutorConfig::default());

        fixture.agent.teleport(BlockLocation::new(1, 0, 0));
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);

        // one step only, and only because the movement saw it arrive
        assert_eq!(executor.position(), 1);
    }

    #[test]
    fn test_skip_back() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(8), ExecutorConfig::default());

        for _ in 0..4 {
            fixture.tick(&mut executor);
        }
        assert_eq!(executor.position(), 4);

        // lag puts us back at (1, 0, 0)
        fixture.agent.teleport(BlockLocation::new(1, 0, 0));
        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
        assert_eq!(executor.position(), 1);

        let mut ticks = 0;
        while fixture.tick(&mut executor) == ExecutorSignal::Running {
            ticks += 1;
        }
        assert_eq!(executor.signal(), ExecutorSignal::Succeeded);
        assert_eq!(ticks, 6);
    }

    #[test]
    fn test_blocked_ahead() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(6), ExecutorConfig::default());

        fixture
            .world
            .write()
            .set_block(BlockLocation::new(3, 0, 0), SimpleType::Avoid);

        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Failed);
        assert_eq!(executor.position(), 0);
    }

    #[test]
    fn test_movement_timeout() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let mut executor = PathExecutor::new(fixture.straight(3), ExecutorConfig::default());
        fixture.agent.set_frozen(true);

        let mut ticks = 0;
        while fixture.tick(&mut executor) == ExecutorSignal::Running {
            ticks += 1;
            assert_le!(ticks, 200);
        }

        // a block walk is a bit over 4.6 ticks, plus 100 ticks of slack
        assert_eq!(executor.signal(), ExecutorSignal::Failed);
        assert_eq!(ticks, 105);
    }

    #[test]
    fn test_requirements() {
        let mut blocks = WorldBlocks::flat(1);
        let wall = BlockLocation::new(2, 1, 0);
        blocks.set_block(wall, SimpleType::Solid);

        let mut fixture = Fixture::new(blocks);
        let path = fixture.straight(4);
        let mut executor = PathExecutor::new(path, ExecutorConfig::default());

        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
        assert!(executor.blocks_to_break().contains(&wall));
        assert!(executor.blocks_to_place().is_empty());
        assert!(executor
            .blocks_to_walk_into()
            .contains(&BlockLocation::new(2, 0, 0)));

        // someone else broke it
        fixture.world.write().set_block(wall, SimpleType::WalkThrough);
        fixture.tick(&mut executor);
        assert!(!executor.blocks_to_break().contains(&wall));
    }

    #[test]
    fn test_waits_for_unloaded_destination() {
        let mut fixture = Fixture::new(WorldBlocks::flat(0));
        let mut executor = PathExecutor::new(fixture.straight(15), ExecutorConfig::default());

        for _ in 0..14 {
            fixture.tick(&mut executor);
        }
        assert_eq!(executor.position(), 14);

        fixture
            .world
            .write()
            .remove_column(interfaces::types::ChunkLocation(0, 0));

        assert_eq!(fixture.tick(&mut executor), ExecutorSignal::Running);
        assert_eq!(executor.position(), 14);
        assert!(!fixture.agent.walking());
    }

    #[test]
    fn test_cancel_and_splice() {
        let mut fixture = Fixture::new(WorldBlocks::flat(1));
        let first = fixture.straight(4);
        let mut executor = PathExecutor::new(first.clone(), ExecutorConfig::default());

        fixture.tick(&mut executor);
        fixture.tick(&mut executor);
        assert!(executor.safe_to_cancel());

        let positions: Vec<_> = (4..=7).map(|x| BlockLocation::new(x, 0, 0)).collect();
        let movements = positions
            .windows(2)
            .map(|pair| Movement::new(MoveKind::Traverse(CardinalDirection::North), pair[0], pair[1]))
            .collect();
        let second = Path::try_new(positions, movements, first.goal().clone(), 0).unwrap();

        let mut spliced = executor.try_splice(&second).unwrap();
        assert_eq!(spliced.position(), 2);
        assert_eq!(spliced.path().len(), 8);

        executor.cancel(&mut fixture.agent);
        assert_eq!(executor.signal(), ExecutorSignal::Failed);
        assert!(!fixture.agent.walking());

        let mut signal = ExecutorSignal::Running;
        while signal == ExecutorSignal::Running {
            signal = fixture.tick(&mut spliced);
        }
        assert_eq!(signal, ExecutorSignal::Succeeded);
        assert_eq!(fixture.agent.location(), BlockLocation::new(7, 0, 0));
    }
}
