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

//! Anytime A* over the graph of [`Movement`]s.
//!
//! Nodes live in a pool and are referred to by index, so relaxing a node is a
//! lookup and a slot update. The frontier uses lazy deletion: an entry whose
//! score no longer matches its node is skipped when popped.
//!
//! If the goal cannot be reached in time the search falls back to the best
//! node under one of several relaxation coefficients (credit baritone).

use std::{
    collections::{BinaryHeap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use float_ord::FloatOrd;
use interfaces::types::BlockLocation;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::{debug, info};

use crate::{
    client::{
        pathfind::{
            context::{CalculationContext, PathConfig},
            goals::Goal,
            moves::{self, movement::Movement, MoveKind},
            path::Path,
            MinHeapNode,
        },
        physics::tools::ToolModel,
        timing::{Increment, Incremental},
    },
    error::SearchFailure,
    storage::world::WorldView,
};

/// What to search for and how long we may take
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub start: BlockLocation,
    pub goal: Arc<Goal>,

    /// after this we stop as soon as we have a usable partial path
    pub primary_timeout: Duration,

    /// after this we stop no matter what
    pub failure_timeout: Duration,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SearchState {
    Idle,
    Running,
    Succeeded,
    Failed,

    /// ended early with a partial path
    TimedOut,
}

pub type SearchResult = Result<Path, SearchFailure>;

struct SearchNode {
    pos: BlockLocation,
    parent: Option<(usize, MoveKind)>,
    cost: f64,
    estimated: f64,
    combined: f64,
    is_open: bool,
}

pub struct AStar<W: WorldView + ?Sized, T: ToolModel> {
    world: Arc<W>,
    tools: T,
    config: PathConfig,
    throwaway: usize,

    start: BlockLocation,
    goal: Arc<Goal>,
    primary_timeout: Duration,
    failure_timeout: Duration,

    nodes: Vec<SearchNode>,
    ids: HashMap<BlockLocation, usize>,
    open: BinaryHeap<MinHeapNode<usize, FloatOrd<f64>>>,

    /// per coefficient, the best `h + g / coefficient` and its node
    best_scores: Vec<f64>,
    best_nodes: Vec<Option<usize>>,

    /// true until one of the best nodes is far enough from the start
    failing: bool,

    most_recent: Option<usize>,
    nodes_considered: usize,
    unknown_expansions: usize,

    rng: StdRng,
    cancel: Arc<AtomicBool>,

    state: SearchState,
    started_at: Option<Instant>,
    result: Option<SearchResult>,
}

impl<W: WorldView + ?Sized, T: ToolModel> AStar<W, T> {
    pub fn new(
        world: Arc<W>,
        tools: T,
        config: PathConfig,
        throwaway: usize,
        request: SearchRequest,
    ) -> Self {
        let SearchRequest {
            start,
            goal,
            primary_timeout,
            failure_timeout,
        } = request;

        let coefficients = config.coefficients.len();
        let rng = StdRng::seed_from_u64(config.seed);

        let mut res = Self {
            world,
            tools,
            config,
            throwaway,
            start,
            goal,
            primary_timeout,
            failure_timeout,
            nodes: Vec::new(),
            ids: HashMap::new(),
            open: BinaryHeap::new(),
            best_scores: vec![f64::INFINITY; coefficients],
            best_nodes: vec![None; coefficients],
            failing: true,
            most_recent: None,
            nodes_considered: 0,
            unknown_expansions: 0,
            rng,
            cancel: Arc::new(AtomicBool::new(false)),
            state: SearchState::Idle,
            started_at: None,
            result: None,
        };

        let start_id = res.node_at(start);
        let node = &mut res.nodes[start_id];
        node.cost = 0.0;
        node.combined = node.estimated;
        node.is_open = true;
        let score = node.combined;

        res.open.push(MinHeapNode::new(start_id, FloatOrd(score)));
        res.best_scores.fill(score);
        res.best_nodes.fill(Some(start_id));

        res
    }

    /// Setting the returned flag stops the search at its next time check
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub const fn state(&self) -> SearchState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            SearchState::Succeeded | SearchState::Failed | SearchState::TimedOut
        )
    }

    pub const fn nodes_considered(&self) -> usize {
        self.nodes_considered
    }

    pub const fn goal(&self) -> &Arc<Goal> {
        &self.goal
    }

    /// Run to completion with the given budgets
    pub fn calculate(&mut self, primary_timeout: Duration, failure_timeout: Duration) -> SearchResult {
        self.primary_timeout = primary_timeout;
        self.failure_timeout = failure_timeout;
        self.run()
    }

    /// The partial path the search would return if it stopped right now
    pub fn best_path_so_far(&self) -> Option<Path> {
        self.best_qualifying().map(|id| self.path_to(id))
    }

    /// The path to the node which was expanded last
    pub fn path_to_most_recent_node(&self) -> Option<Path> {
        self.most_recent.map(|id| self.path_to(id))
    }

    fn node_at(&mut self, pos: BlockLocation) -> usize {
        if let Some(&id) = self.ids.get(&pos) {
            return id;
        }

        let estimated = self.goal.heuristic(pos);
        let id = self.nodes.len();
        self.nodes.push(SearchNode {
            pos,
            parent: None,
            cost: f64::INFINITY,
            estimated,
            combined: f64::INFINITY,
            is_open: false,
        });
        self.ids.insert(pos, id);
        id
    }

    fn path_to(&self, id: usize) -> Path {
        let mut positions = Vec::new();
        let mut movements = Vec::new();

        let mut on = id;
        loop {
            let node = &self.nodes[on];
            positions.push(node.pos);

            let Some((parent_id, kind)) = node.parent else {
                break;
            };

            let parent = &self.nodes[parent_id];
            movements.push(Movement::with_cost(
                kind,
                parent.pos,
                node.pos,
                node.cost - parent.cost,
            ));
            on = parent_id;
        }

        positions.reverse();
        movements.reverse();

        Path::from_search(positions, movements, self.goal.clone(), self.nodes_considered)
    }

    /// the tightest coefficient whose best node got far enough from the start
    fn best_qualifying(&self) -> Option<usize> {
        let min_dist2 = self.config.min_dist_path * self.config.min_dist_path;
        self.best_nodes
            .iter()
            .flatten()
            .copied()
            .find(|&id| self.nodes[id].pos.dist2(self.start) > min_dist2)
    }

    fn expand(&mut self, id: usize) {
        let (pos, cost) = {
            let node = &self.nodes[id];
            (node.pos, node.cost)
        };

        let mut edges = {
            let ctx = CalculationContext::new(&*self.world, &self.tools, &self.config, self.throwaway);
            moves::edges(&ctx, pos)
        };

        edges.shuffle(&mut self.rng);

        let min_improvement = self.config.min_improvement;
        let min_dist2 = self.config.min_dist_path * self.config.min_dist_path;

        for edge in edges {
            if !edge.possible() {
                if !self.world.is_loaded(edge.dest.x, edge.dest.z) {
                    self.unknown_expansions += 1;
                }
                continue;
            }

            let tentative = cost + edge.cost;
            let neighbor_id = self.node_at(edge.dest);
            let neighbor = &mut self.nodes[neighbor_id];

            if neighbor.cost - tentative <= min_improvement {
                continue;
            }

            neighbor.parent = Some((id, edge.kind));
            neighbor.cost = tentative;
            neighbor.combined = tentative + neighbor.estimated;
            neighbor.is_open = true;

            let estimated = neighbor.estimated;
            let combined = neighbor.combined;
            let far_enough = neighbor.pos.dist2(self.start) > min_dist2;

            self.open.push(MinHeapNode::new(neighbor_id, FloatOrd(combined)));

            for (i, &coefficient) in self.config.coefficients.iter().enumerate() {
                let score = estimated + tentative / coefficient;
                if self.best_scores[i] - score > min_improvement {
                    self.best_scores[i] = score;
                    self.best_nodes[i] = Some(neighbor_id);
                    if self.failing && far_enough {
                        self.failing = false;
                    }
                }
            }
        }
    }

    fn finish(&mut self, state: SearchState, result: SearchResult) -> Increment<SearchResult> {
        self.state = state;

        let elapsed = self.started_at.map(|at| at.elapsed()).unwrap_or_default();
        match &result {
            Ok(path) => info!(
                ?state,
                nodes = self.nodes_considered,
                ?elapsed,
                positions = path.len(),
                "search finished"
            ),
            Err(err) => info!(?state, nodes = self.nodes_considered, ?elapsed, "search failed: {err}"),
        }

        self.result = Some(result.clone());
        Increment::Finished(result)
    }

    /// Stop early and return the best partial path if there is one
    fn fall_back(&mut self) -> Increment<SearchResult> {
        match self.best_qualifying() {
            Some(id) => {
                let path = self.path_to(id);
                debug!(dest = %path.dest(), "using best path so far");
                self.finish(SearchState::TimedOut, Ok(path))
            }
            None => {
                let nodes = self.nodes_considered;
                self.finish(SearchState::Failed, Err(SearchFailure::NoProgress { nodes }))
            }
        }
    }
}

impl<W: WorldView + ?Sized, T: ToolModel> Incremental<SearchResult> for AStar<W, T> {
    /// Expand up to `time_check_interval` nodes, then check the clock
    fn iterate(&mut self) -> Increment<SearchResult> {
        if let Some(result) = &self.result {
            return Increment::Finished(result.clone());
        }

        let started_at = match self.started_at {
            Some(at) => at,
            None => {
                debug!(start = %self.start, goal = ?self.goal, "starting search");
                self.state = SearchState::Running;
                *self.started_at.insert(Instant::now())
            }
        };

        for _ in 0..self.config.time_check_interval.max(1) {
            let Some(MinHeapNode { contents: id, score }) = self.open.pop() else {
                let nodes = self.nodes_considered;
                return self.finish(SearchState::Failed, Err(SearchFailure::Exhausted { nodes }));
            };

            let node = &mut self.nodes[id];
            if !node.is_open || score.0 != node.combined {
                continue;
            }
            node.is_open = false;
            let pos = node.pos;

            self.most_recent = Some(id);
            self.nodes_considered += 1;

            if self.goal.is_in_goal(pos) {
                let path = self.path_to(id);
                return self.finish(SearchState::Succeeded, Ok(path));
            }

            self.expand(id);

            if self.unknown_expansions > self.config.max_unknown_expansions {
                debug!(unknown = self.unknown_expansions, "too many edges into unknown chunks");
                return self.fall_back();
            }
        }

        if self.cancel.load(Ordering::Relaxed) {
            return self.finish(SearchState::Failed, Err(SearchFailure::Cancelled));
        }

        let elapsed = started_at.elapsed();
        if elapsed > self.failure_timeout || (elapsed > self.primary_timeout && !self.failing) {
            return self.fall_back();
        }

        Increment::InProgress
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use assert_matches::assert_matches;
    use interfaces::types::{BlockLocation, SimpleType};
    use more_asserts::*;

    use crate::{
        client::{
            pathfind::{
                context::PathConfig,
                goals::Goal,
                incremental::{AStar, SearchRequest, SearchState},
                moves::INF,
            },
            physics::tools::Tool,
            timing::{Increment, Incremental},
        },
        error::SearchFailure,
        storage::blocks::WorldBlocks,
    };

    const ORIGIN: BlockLocation = BlockLocation::new(0, 0, 0);

    fn search(world: WorldBlocks, goal: Goal, config: PathConfig) -> AStar<WorldBlocks, Tool> {
        let request = SearchRequest {
            start: ORIGIN,
            goal: Arc::new(goal),
            primary_timeout: Duration::from_secs(2),
            failure_timeout: Duration::from_secs(6),
        };
        AStar::new(Arc::new(world), Tool::default(), config, 0, request)
    }

    #[test]
    fn test_flat_plane() {
        let config = PathConfig::default();
        let block_walk = config.costs.block_walk;
        let goal = Goal::Block(BlockLocation::new(5, 0, 0));

        let mut astar = search(WorldBlocks::flat(1), goal, config);
        let path = astar
            .calculate(Duration::from_secs(2), Duration::from_secs(6))
            .unwrap();

        assert_eq!(astar.state(), SearchState::Succeeded);
        assert!(astar.is_finished());
        assert_eq!(path.len(), 6);
        assert_eq!(path.src(), ORIGIN);
        assert_eq!(path.dest(), BlockLocation::new(5, 0, 0));
        assert_lt!((path.total_cost() - 5.0 * block_walk).abs(), 1e-9);
        assert_gt!(path.nodes_considered(), 0);
    }

    #[test]
    fn test_same_seed_same_path() {
        let goal = Goal::Block(BlockLocation::new(7, 0, 4));

        let first = search(WorldBlocks::flat(1), goal.clone(), PathConfig::default()).run();
        let second = search(WorldBlocks::flat(1), goal, PathConfig::default()).run();

        assert_eq!(first.unwrap().positions(), second.unwrap().positions());
    }

    #[test]
    fn test_enclosed_start_is_exhausted() {
        let mut world = WorldBlocks::flat(1);
        for neighbor in ORIGIN.neighbors() {
            world.set_block(neighbor, SimpleType::Avoid);
        }
        world.set_block(ORIGIN.add_y(2), SimpleType::Avoid);

        let goal = Goal::Block(BlockLocation::new(10, 0, 0));
        let mut astar = search(world, goal, PathConfig::default());

        let res = astar.calculate(Duration::from_millis(200), Duration::from_millis(500));
        assert_matches!(res, Err(SearchFailure::Exhausted { .. }));
        assert_eq!(astar.state(), SearchState::Failed);
        assert!(astar.best_path_so_far().is_none());
    }

    #[test]
    fn test_unknown_region_falls_back() {
        // the goal is in a chunk we do not know about
        let goal = Goal::Block(BlockLocation::new(200, 0, 0));
        let mut astar = search(WorldBlocks::flat(1), goal, PathConfig::default());

        let path = astar.run().unwrap();
        assert_eq!(astar.state(), SearchState::TimedOut);
        assert_gt!(path.dest().dist2(ORIGIN), 25.0);
        assert_gt!(path.dest().x, 0);
        assert!(path.total_cost() < INF);
    }

    #[test]
    fn test_timeout_returns_partial_path() {
        let mut config = PathConfig::default();
        config.max_unknown_expansions = usize::MAX;
        let goal = Goal::Block(BlockLocation::new(40, 0, 40));

        let mut world = WorldBlocks::flat(3);
        // a wall the search will spend forever breaking around
        world.fill(
            BlockLocation::new(20, -16, -48),
            BlockLocation::new(20, 40, 47),
            SimpleType::Avoid,
        );

        let mut astar = search(world, goal, config);
        let res = astar.calculate(Duration::ZERO, Duration::from_millis(100));

        match res {
            Ok(path) => {
                assert_eq!(astar.state(), SearchState::TimedOut);
                assert_gt!(path.dest().dist2(ORIGIN), 25.0);
            }
            Err(err) => assert_matches!(err, SearchFailure::NoProgress { .. } | SearchFailure::Exhausted { .. }),
        }
    }

    #[test]
    fn test_cancel() {
        let goal = Goal::Block(BlockLocation::new(30, 0, 30));
        let mut astar = search(WorldBlocks::flat(3), goal, PathConfig::default());

        astar.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);
        assert_eq!(astar.run().unwrap_err(), SearchFailure::Cancelled);
    }

    #[test]
    fn test_introspection() {
        let goal = Goal::Block(BlockLocation::new(60, 0, 0));
        let mut astar = search(WorldBlocks::flat(4), goal, PathConfig::default());

        assert!(astar.path_to_most_recent_node().is_none());
        assert_eq!(astar.state(), SearchState::Idle);

        for _ in 0..4 {
            assert_matches!(astar.iterate(), Increment::InProgress);
        }
        assert_eq!(astar.state(), SearchState::Running);
        assert!(!astar.is_finished());

        let recent = astar.path_to_most_recent_node().unwrap();
        assert_eq!(recent.src(), ORIGIN);
        assert_le!(astar.nodes_considered(), 4 * 64);
        assert_gt!(astar.nodes_considered(), 0);

        let best = astar.best_path_so_far().unwrap();
        assert_eq!(best.src(), ORIGIN);
        assert_gt!(best.dest().dist2(ORIGIN), 25.0);
    }

    #[test]
    fn test_inverted_goal_runs_away() {
        let goal = Goal::Inverted(Box::new(Goal::Block(ORIGIN)));
        let mut astar = search(WorldBlocks::flat(1), goal, PathConfig::default());

        // never in goal so the search only ever stops by falling back
        let path = astar
            .calculate(Duration::from_millis(20), Duration::from_millis(200))
            .unwrap();
        assert_gt!(path.dest().dist2(ORIGIN), 25.0);
    }
}
