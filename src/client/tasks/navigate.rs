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

//! Owns the goal and glues searches to executors.
//!
//! At most one search is in flight. At most one executor is current and one
//! is planned next. Only [`PathingBehavior::tick`] touches either slot.

use std::{sync::Arc, time::Duration};

use interfaces::types::BlockLocation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    client::{
        agent::Agent,
        follow::{ExecutorConfig, ExecutorSignal, PathExecutor},
        pathfind::{
            context::PathConfig,
            goals::Goal,
            incremental::SearchRequest,
            path::Path,
            worker::{SearchHandle, SearchProgressReader},
        },
        physics::tools::ToolModel,
    },
    error::SearchFailure,
    storage::world::WorldView,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// budgets when there is nothing to execute
    pub primary_timeout_ms: u64,
    pub failure_timeout_ms: u64,

    /// budgets when planning the segment after the current one
    pub plan_ahead_primary_timeout_ms: u64,
    pub plan_ahead_failure_timeout_ms: u64,

    /// plan the next segment once fewer positions than this are left
    pub plan_ahead_positions: usize,

    pub cutoff_at_loaded: bool,
    pub static_cutoff: bool,
    pub path_cutoff_minimum_length: usize,
    pub path_cutoff_factor: f64,

    /// ticks to wait before searching again after a failed search
    pub calc_failed_cooldown_ticks: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            primary_timeout_ms: 2000,
            failure_timeout_ms: 6000,
            plan_ahead_primary_timeout_ms: 500,
            plan_ahead_failure_timeout_ms: 1500,
            plan_ahead_positions: 20,
            cutoff_at_loaded: true,
            static_cutoff: true,
            path_cutoff_minimum_length: 30,
            path_cutoff_factor: 0.9,
            calc_failed_cooldown_ticks: 20,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathEvent {
    CalcStarted,
    NextSegmentCalcStarted,
    CalcFinishedNowExecuting,
    NextSegmentReady,
    SplicedOntoCurrent,
    ContinuingOntoPlannedNext,
    PathFinishedNextStillCalculating,
    DiscardedStaleResult,
    CalcFailed(SearchFailure),
    PathFailed,
    AtGoal,
    Canceled,
}

struct InFlight {
    handle: SearchHandle,

    /// started from the end of the current path
    plan_ahead: bool,

    /// false once the result can only be thrown away
    wanted: bool,
}

pub struct PathingBehavior<T: ToolModel + Clone> {
    tools: T,
    path_config: PathConfig,
    executor_config: ExecutorConfig,
    config: BehaviorConfig,

    goal: Option<Arc<Goal>>,
    current: Option<PathExecutor>,
    next: Option<PathExecutor>,
    in_flight: Option<InFlight>,

    cooldown: u32,
}

impl<T: ToolModel + Clone + Send + Sync + 'static> PathingBehavior<T> {
    pub const fn new(
        tools: T,
        path_config: PathConfig,
        executor_config: ExecutorConfig,
        config: BehaviorConfig,
    ) -> Self {
        Self {
            tools,
            path_config,
            executor_config,
            config,
            goal: None,
            current: None,
            next: None,
            in_flight: None,
            cooldown: 0,
        }
    }

    /// Aim for a new goal. The current path is dropped as soon as it is safe.
    pub fn set_goal(&mut self, goal: Goal) {
        info!(?goal, "new goal");
        self.goal = Some(Arc::new(goal));
        self.next = None;
        self.cooldown = 0;
    }

    pub const fn goal(&self) -> Option<&Arc<Goal>> {
        self.goal.as_ref()
    }

    pub const fn is_pathing(&self) -> bool {
        self.current.is_some()
    }

    pub const fn current(&self) -> Option<&PathExecutor> {
        self.current.as_ref()
    }

    pub const fn next(&self) -> Option<&PathExecutor> {
        self.next.as_ref()
    }

    pub fn is_calculating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// True once the search in flight has a result waiting for the next tick
    pub fn is_search_finished(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|flight| flight.handle.is_finished())
    }

    /// A way to watch the in-flight search
    pub fn progress(&self) -> Option<SearchProgressReader> {
        self.in_flight.as_ref().map(|flight| flight.handle.progress())
    }

    pub fn best_path_so_far(&self) -> Option<Arc<Path>> {
        self.progress()?.best_path_so_far()
    }

    /// Stop everything and forget the goal. A search in flight is left to
    /// finish and its result is thrown away.
    pub fn cancel(&mut self, agent: &mut impl Agent) -> PathEvent {
        if let Some(mut current) = self.current.take() {
            current.cancel(agent);
        }
        agent.release_controls();

        self.next = None;
        self.goal = None;

        if let Some(flight) = &mut self.in_flight {
            flight.wanted = false;
        }

        info!("pathing cancelled");
        PathEvent::Canceled
    }

    pub fn tick<W, A>(&mut self, world: &Arc<W>, agent: &mut A) -> Vec<PathEvent>
    where
        W: WorldView + Send + Sync + 'static,
        A: Agent,
    {
        let mut events = Vec::new();
        self.cooldown = self.cooldown.saturating_sub(1);

        self.poll_search(world, agent.location(), &mut events);
        self.tick_current(world, agent, &mut events);
        self.plan_ahead(world, agent, &mut events);
        self.start_if_idle(world, agent, &mut events);

        if !events.is_empty() {
            debug!(?events, "pathing events");
        }

        events
    }

    fn reach_goal(&mut self, events: &mut Vec<PathEvent>) {
        events.push(PathEvent::AtGoal);
        self.next = None;

        self.goal = match self.goal.take().as_deref() {
            Some(goal @ Goal::Patrol { .. }) => {
                let next = goal.advanced();
                info!(goal = ?next, "patrolling on");
                Some(Arc::new(next))
            }
            _ => {
                info!("at goal");
                None
            }
        };

        if let Some(flight) = &mut self.in_flight {
            flight.wanted = false;
        }
    }

    /// Drop both executors. A plan-ahead search continues a path which is
    /// gone now, so its result is no longer wanted.
    fn drop_paths(&mut self) {
        self.current = None;
        self.next = None;

        if let Some(flight) = &mut self.in_flight {
            if flight.plan_ahead {
                flight.wanted = false;
            }
        }
    }

    fn trim<W: WorldView>(&self, path: Path, world: &W) -> Path {
        let mut path = path;
        if self.config.cutoff_at_loaded {
            path = path.cutoff_at_loaded(world);
        }
        if self.config.static_cutoff {
            path = path.static_cutoff(
                self.config.path_cutoff_minimum_length,
                self.config.path_cutoff_factor,
            );
        }
        path
    }

    fn dispatch<W: WorldView + Send + Sync + 'static>(
        &mut self,
        world: &Arc<W>,
        request: SearchRequest,
        throwaway: usize,
        plan_ahead: bool,
    ) {
        debug!(start = %request.start, plan_ahead, "dispatching search");
        let handle = SearchHandle::spawn(
            world.clone(),
            self.tools.clone(),
            self.path_config.clone(),
            throwaway,
            request,
        );
        self.in_flight = Some(InFlight {
            handle,
            plan_ahead,
            wanted: true,
        });
    }

    fn poll_search<W: WorldView>(
        &mut self,
        world: &Arc<W>,
        location: BlockLocation,
        events: &mut Vec<PathEvent>,
    ) {
        let Some(flight) = &mut self.in_flight else {
            return;
        };

        let Some(res) = flight.handle.try_result() else {
            return;
        };

        let Some(flight) = self.in_flight.take() else {
            return;
        };

        let stale = !flight.wanted || self.goal.as_ref() != Some(flight.handle.goal());
        if stale {
            debug!("throwing away a search for an old goal");
            events.push(PathEvent::DiscardedStaleResult);
            return;
        }

        let path = match res {
            Ok(path) => self.trim(path, &**world),
            Err(err) => {
                self.cooldown = self.config.calc_failed_cooldown_ticks;
                events.push(PathEvent::CalcFailed(err));
                return;
            }
        };

        if path.len() <= 1 {
            self.cooldown = self.config.calc_failed_cooldown_ticks;
            let nodes = path.nodes_considered();
            events.push(PathEvent::CalcFailed(SearchFailure::NoProgress { nodes }));
            return;
        }

        self.install(path, flight.plan_ahead, location, events);
    }

    fn install(
        &mut self,
        path: Path,
        plan_ahead: bool,
        location: BlockLocation,
        events: &mut Vec<PathEvent>,
    ) {
        let Some(current) = &self.current else {
            if path.src() != location {
                debug!(src = %path.src(), %location, "new path does not start at the agent");
                events.push(PathEvent::DiscardedStaleResult);
                return;
            }

            debug!(plan_ahead, positions = path.len(), "executing new path");
            self.current = Some(PathExecutor::new(path, self.executor_config.clone()));
            events.push(PathEvent::CalcFinishedNowExecuting);
            return;
        };

        if current.path().dest() != path.src() {
            debug!("new path does not continue the current one");
            events.push(PathEvent::DiscardedStaleResult);
            return;
        }

        match current.try_splice(&path) {
            Ok(spliced) => {
                self.current = Some(spliced);
                events.push(PathEvent::SplicedOntoCurrent);
            }
            Err(err) => {
                debug!("could not splice ({err}), keeping it for later");
                self.next = Some(PathExecutor::new(path, self.executor_config.clone()));
                events.push(PathEvent::NextSegmentReady);
            }
        }
    }

    fn tick_current<W: WorldView, A: Agent>(
        &mut self,
        world: &Arc<W>,
        agent: &mut A,
        events: &mut Vec<PathEvent>,
    ) {
        let Some(current) = &mut self.current else {
            return;
        };

        let goal_changed = self.goal.as_ref() != Some(current.path().goal());
        if goal_changed && current.safe_to_cancel() {
            current.cancel(agent);
            self.drop_paths();
            events.push(PathEvent::Canceled);
            return;
        }

        match current.tick(&**world, &self.tools, &self.path_config, agent) {
            ExecutorSignal::Running => {}
            ExecutorSignal::Failed => {
                self.drop_paths();
                events.push(PathEvent::PathFailed);
            }
            ExecutorSignal::Succeeded => {
                self.current = None;
                let location = agent.location();

                if self.goal.as_ref().is_some_and(|goal| goal.reached_by(location)) {
                    self.reach_goal(events);
                    return;
                }

                match self.next.take() {
                    Some(next) if next.path().src() == location => {
                        info!("continuing onto the planned next segment");
                        self.current = Some(next);
                        events.push(PathEvent::ContinuingOntoPlannedNext);
                    }
                    _ => {
                        if self.in_flight.as_ref().is_some_and(|flight| flight.wanted) {
                            events.push(PathEvent::PathFinishedNextStillCalculating);
                        }
                    }
                }
            }
        }
    }

    fn plan_ahead<W: WorldView + Send + Sync + 'static>(
        &mut self,
        world: &Arc<W>,
        agent: &impl Agent,
        events: &mut Vec<PathEvent>,
    ) {
        if self.in_flight.is_some() || self.next.is_some() {
            return;
        }

        let (Some(goal), Some(current)) = (&self.goal, &self.current) else {
            return;
        };

        let path = current.path();
        if goal.reached_by(path.dest()) {
            return;
        }

        let remaining = path.len().saturating_sub(current.position());
        if remaining >= self.config.plan_ahead_positions {
            return;
        }

        let request = SearchRequest {
            start: path.dest(),
            goal: goal.clone(),
            primary_timeout: Duration::from_millis(self.config.plan_ahead_primary_timeout_ms),
            failure_timeout: Duration::from_millis(self.config.plan_ahead_failure_timeout_ms),
        };

        self.dispatch(world, request, agent.throwaway_count(), true);
        events.push(PathEvent::NextSegmentCalcStarted);
    }

    fn start_if_idle<W: WorldView + Send + Sync + 'static>(
        &mut self,
        world: &Arc<W>,
        agent: &impl Agent,
        events: &mut Vec<PathEvent>,
    ) {
        if self.current.is_some() || self.in_flight.is_some() || self.cooldown > 0 {
            return;
        }

        let Some(goal) = self.goal.clone() else {
            return;
        };

        let start = agent.location();
        if goal.reached_by(start) {
            self.reach_goal(events);
            return;
        }

        let request = SearchRequest {
            start,
            goal,
            primary_timeout: Duration::from_millis(self.config.primary_timeout_ms),
            failure_timeout: Duration::from_millis(self.config.failure_timeout_ms),
        };

        self.dispatch(world, request, agent.throwaway_count(), false);
        events.push(PathEvent::CalcStarted);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use assert_matches::assert_matches;
    use interfaces::types::{BlockLocation, SimpleType};
    use parking_lot::RwLock;

    use crate::{
        client::{
            agent::Agent,
            follow::{ExecutorConfig, PathExecutor},
            pathfind::{
                context::PathConfig, goals::Goal, incremental::SearchRequest,
                path::tests::straight,
            },
            physics::tools::Tool,
            sim::SimAgent,
            tasks::navigate::{BehaviorConfig, PathEvent, PathingBehavior},
        },
        storage::blocks::WorldBlocks,
    };

    type World = Arc<RwLock<WorldBlocks>>;

    fn setup(blocks: WorldBlocks) -> (World, SimAgent, PathingBehavior<Tool>) {
        let world = Arc::new(RwLock::new(blocks));
        let agent = SimAgent::new(world.clone(), BlockLocation::new(0, 0, 0), 16);
        let behavior = PathingBehavior::new(
            Tool::default(),
            PathConfig::default(),
            ExecutorConfig::default(),
            BehaviorConfig::default(),
        );
        (world, agent, behavior)
    }

    /// tick until `stop` says so, collecting every event
    fn run_until(
        world: &World,
        agent: &mut SimAgent,
        behavior: &mut PathingBehavior<Tool>,
        mut stop: impl FnMut(&[PathEvent]) -> bool,
    ) -> Vec<PathEvent> {
        let mut all = Vec::new();
        for _ in 0..20_000 {
            let events = behavior.tick(world, agent);
            let done = stop(&events);
            all.extend(events);
            if done {
                return all;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        panic!("never stopped: {all:?}");
    }

    #[test]
    fn test_reaches_goal() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        let target = BlockLocation::new(10, 0, 7);
        behavior.set_goal(Goal::Block(target));

        let events = run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::AtGoal)
        });

        assert_eq!(events[0], PathEvent::CalcStarted);
        assert!(events.contains(&PathEvent::CalcFinishedNowExecuting));
        assert_eq!(agent.location(), target);
        assert!(behavior.goal().is_none());
        assert!(!behavior.is_pathing());
    }

    #[test]
    fn test_already_at_goal() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        behavior.set_goal(Goal::Block(BlockLocation::new(0, 0, 0)));

        assert_eq!(behavior.tick(&world, &mut agent), vec![PathEvent::AtGoal]);
        assert!(!behavior.is_calculating());
    }

    #[test]
    fn test_cancel() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        behavior.set_goal(Goal::Block(BlockLocation::new(12, 0, 0)));

        run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::CalcFinishedNowExecuting)
        });
        assert!(behavior.is_pathing());

        assert_eq!(behavior.cancel(&mut agent), PathEvent::Canceled);
        assert!(!behavior.is_pathing());
        assert!(behavior.goal().is_none());
        assert!(!agent.walking());

        // nothing else happens without a goal
        for _ in 0..5 {
            let events = behavior.tick(&world, &mut agent);
            assert!(events
                .iter()
                .all(|event| *event == PathEvent::DiscardedStaleResult));
        }
    }

    #[test]
    fn test_goal_change_drops_path() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        behavior.set_goal(Goal::Block(BlockLocation::new(12, 0, 0)));

        run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::CalcFinishedNowExecuting)
        });

        behavior.set_goal(Goal::Block(BlockLocation::new(-10, 0, 0)));
        let events = behavior.tick(&world, &mut agent);
        assert!(events.contains(&PathEvent::Canceled));

        run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::AtGoal)
        });
        assert_eq!(agent.location(), BlockLocation::new(-10, 0, 0));
    }

    #[test]
    fn test_unreachable_goal_cools_down() {
        let mut blocks = WorldBlocks::flat(1);
        let start = BlockLocation::new(0, 0, 0);
        for neighbor in start.neighbors() {
            blocks.set_block(neighbor, SimpleType::Avoid);
        }
        blocks.set_block(start.add_y(2), SimpleType::Avoid);

        let (world, mut agent, mut behavior) = setup(blocks);
        behavior.set_goal(Goal::Block(BlockLocation::new(8, 0, 0)));

        let events = run_until(&world, &mut agent, &mut behavior, |events| {
            events.iter().any(|event| matches!(event, PathEvent::CalcFailed(..)))
        });
        assert_matches!(events.last(), Some(PathEvent::CalcFailed(..)));

        // no new search until the cooldown is over
        for _ in 0..BehaviorConfig::default().calc_failed_cooldown_ticks - 1 {
            assert!(behavior.tick(&world, &mut agent).is_empty());
        }
        assert_eq!(behavior.tick(&world, &mut agent), vec![PathEvent::CalcStarted]);
    }

    #[test]
    fn test_patrol_advances() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        let waypoints = vec![BlockLocation::new(6, 0, 0), BlockLocation::new(6, 0, 6)];
        behavior.set_goal(Goal::Patrol {
            waypoints: waypoints.clone(),
            index: 0,
        });

        run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::AtGoal)
        });
        assert_eq!(agent.location(), waypoints[0]);
        assert_eq!(
            behavior.goal().map(|goal| (**goal).clone()),
            Some(Goal::Patrol {
                waypoints: waypoints.clone(),
                index: 1
            })
        );

        run_until(&world, &mut agent, &mut behavior, |events| {
            events.contains(&PathEvent::AtGoal)
        });
        assert_eq!(agent.location(), waypoints[1]);
    }

    #[test]
    fn test_failed_path_drops_plan_ahead() {
        let (world, mut agent, mut behavior) = setup(WorldBlocks::flat(1));
        let goal = Arc::new(Goal::Block(BlockLocation::new(12, 0, 0)));

        behavior.goal = Some(goal.clone());
        behavior.current = Some(PathExecutor::new(
            straight(&goal, 0, 5),
            ExecutorConfig::default(),
        ));

        let request = SearchRequest {
            start: BlockLocation::new(5, 0, 0),
            goal,
            primary_timeout: Duration::from_millis(500),
            failure_timeout: Duration::from_secs(2),
        };
        behavior.dispatch(&world, request, agent.throwaway_count(), true);

        world
            .write()
            .set_block(BlockLocation::new(2, 0, 0), SimpleType::Avoid);

        let mut events = Vec::new();
        behavior.tick_current(&world, &mut agent, &mut events);
        assert_eq!(events, vec![PathEvent::PathFailed]);

        // the next segment starts where the failed path would have ended
        let events = loop {
            let mut events = Vec::new();
            behavior.poll_search(&world, agent.location(), &mut events);
            if !events.is_empty() {
                break events;
            }
            std::thread::sleep(Duration::from_millis(1));
        };

        assert_eq!(events, vec![PathEvent::DiscardedStaleResult]);
        assert!(!behavior.is_pathing());
        assert!(!behavior.is_calculating());
    }

    #[test]
    fn test_path_away_from_agent_is_not_installed() {
        let (_, agent, mut behavior) = setup(WorldBlocks::flat(1));
        let goal = Arc::new(Goal::Block(BlockLocation::new(12, 0, 0)));
        behavior.goal = Some(goal.clone());

        let mut events = Vec::new();
        behavior.install(straight(&goal, 5, 10), true, agent.location(), &mut events);
        assert_eq!(events, vec![PathEvent::DiscardedStaleResult]);
        assert!(!behavior.is_pathing());

        let mut events = Vec::new();
        behavior.install(straight(&goal, 0, 10), false, agent.location(), &mut events);
        assert_eq!(events, vec![PathEvent::CalcFinishedNowExecuting]);
        assert!(behavior.is_pathing());
    }
}
