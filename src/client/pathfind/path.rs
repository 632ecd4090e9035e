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

use std::{collections::HashSet, sync::Arc};

use interfaces::types::BlockLocation;
use itertools::Itertools;

use crate::{
    client::pathfind::{goals::Goal, moves::movement::Movement},
    error::PathError,
    storage::world::WorldView,
};

/// An ordered list of positions and the movements between them.
///
/// `movements[i]` always goes from `positions[i]` to `positions[i + 1]`.
#[derive(Clone, Debug)]
pub struct Path {
    positions: Vec<BlockLocation>,
    movements: Vec<Movement>,
    goal: Arc<Goal>,
    nodes_considered: usize,
}

impl Path {
    pub fn try_new(
        positions: Vec<BlockLocation>,
        movements: Vec<Movement>,
        goal: Arc<Goal>,
        nodes_considered: usize,
    ) -> Result<Self, PathError> {
        let path = Self {
            positions,
            movements,
            goal,
            nodes_considered,
        };
        path.validate()?;
        Ok(path)
    }

    /// Used by the search. A broken path here is a bug in the search.
    pub(crate) fn from_search(
        positions: Vec<BlockLocation>,
        movements: Vec<Movement>,
        goal: Arc<Goal>,
        nodes_considered: usize,
    ) -> Self {
        let path = Self {
            positions,
            movements,
            goal,
            nodes_considered,
        };

        if let Err(err) = path.validate() {
            panic!("search built an invalid path: {err}");
        }

        path
    }

    fn validate(&self) -> Result<(), PathError> {
        if self.positions.is_empty() {
            return Err(PathError::Empty);
        }

        let expected = self.positions.len() - 1;
        if self.movements.len() != expected {
            return Err(PathError::LengthMismatch {
                positions: self.positions.len(),
                expected,
            });
        }

        for (index, ((&src, &dest), movement)) in self
            .positions
            .iter()
            .tuple_windows()
            .zip(&self.movements)
            .enumerate()
        {
            if movement.src() != src || movement.dest() != dest {
                return Err(PathError::Disconnected { index, src, dest });
            }
        }

        Ok(())
    }

    pub fn positions(&self) -> &[BlockLocation] {
        &self.positions
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub(crate) fn movements_mut(&mut self) -> &mut [Movement] {
        &mut self.movements
    }

    pub fn src(&self) -> BlockLocation {
        self.positions[0]
    }

    pub fn dest(&self) -> BlockLocation {
        self.positions[self.positions.len() - 1]
    }

    /// the number of positions
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub const fn goal(&self) -> &Arc<Goal> {
        &self.goal
    }

    pub const fn nodes_considered(&self) -> usize {
        self.nodes_considered
    }

    /// The sum of the estimated movement costs. Infinite if any is unknown.
    pub fn total_cost(&self) -> f64 {
        self.movements
            .iter()
            .map(|movement| movement.cost_estimate().unwrap_or(f64::INFINITY))
            .sum()
    }

    /// The first `last + 1` positions. The whole path if it is not that long.
    #[must_use]
    pub fn cutoff(&self, last: usize) -> Self {
        if last + 1 >= self.positions.len() {
            return self.clone();
        }

        Self {
            positions: self.positions[..=last].to_vec(),
            movements: self.movements[..last].to_vec(),
            goal: self.goal.clone(),
            nodes_considered: self.nodes_considered,
        }
    }

    /// Everything before the first position in a chunk we do not know about
    #[must_use]
    pub fn cutoff_at_loaded<W: WorldView + ?Sized>(&self, world: &W) -> Self {
        let first_unloaded = self
            .positions
            .iter()
            .position(|pos| !world.is_loaded(pos.x, pos.z));

        match first_unloaded {
            None => self.clone(),
            Some(idx) => self.cutoff(idx.saturating_sub(1)),
        }
    }

    /// Do not trust the far end of a long path which does not reach the goal
    #[must_use]
    pub fn static_cutoff(&self, minimum_length: usize, factor: f64) -> Self {
        if self.positions.len() < minimum_length || self.goal.reached_by(self.dest()) {
            return self.clone();
        }

        let keep = ((self.positions.len() - 1) as f64 * factor) as usize;
        self.cutoff(keep)
    }

    /// `first` followed by `second`. The end of `first` must be the start of
    /// `second` and no other position may be in both.
    pub fn splice(first: &Self, second: &Self) -> Result<Self, PathError> {
        if first.goal != second.goal {
            return Err(PathError::GoalMismatch);
        }

        if first.dest() != second.src() {
            return Err(PathError::JunctionMismatch {
                end: first.dest(),
                start: second.src(),
            });
        }

        let seen: HashSet<_> = first.positions.iter().copied().collect();
        if let Some(&overlap) = second.positions[1..].iter().find(|pos| seen.contains(pos)) {
            return Err(PathError::Overlap(overlap));
        }

        let positions = first
            .positions
            .iter()
            .chain(&second.positions[1..])
            .copied()
            .collect();

        let movements = first
            .movements
            .iter()
            .chain(&second.movements)
            .cloned()
            .collect();

        Ok(Self {
            positions,
            movements,
            goal: first.goal.clone(),
            nodes_considered: first.nodes_considered + second.nodes_considered,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use assert_matches::assert_matches;
    use interfaces::types::{BlockLocation, CardinalDirection};

    use crate::{
        client::pathfind::{
            goals::Goal,
            moves::{movement::Movement, MoveKind},
            path::Path,
        },
        error::PathError,
        storage::blocks::WorldBlocks,
    };

    /// A straight walk along +x from `from` to `to`
    pub fn straight(goal: &Arc<Goal>, from: i32, to: i32) -> Path {
        let positions: Vec<_> = (from..=to).map(|x| BlockLocation::new(x, 0, 0)).collect();
        let movements = positions
            .windows(2)
            .map(|pair| {
                Movement::with_cost(
                    MoveKind::Traverse(CardinalDirection::North),
                    pair[0],
                    pair[1],
                    1.0,
                )
            })
            .collect();
        Path::try_new(positions, movements, goal.clone(), 0).unwrap()
    }

    fn goal() -> Arc<Goal> {
        Arc::new(Goal::Block(BlockLocation::new(100, 0, 0)))
    }

    #[test]
    fn test_invariant() {
        let goal = goal();
        let path = straight(&goal, 0, 5);
        assert_eq!(path.len(), 6);
        assert_eq!(path.movements().len(), 5);
        assert_eq!(path.src(), BlockLocation::new(0, 0, 0));
        assert_eq!(path.dest(), BlockLocation::new(5, 0, 0));
        assert_eq!(path.total_cost(), 5.0);

        for (i, movement) in path.movements().iter().enumerate() {
            assert_eq!(movement.src(), path.positions()[i]);
            assert_eq!(movement.dest(), path.positions()[i + 1]);
        }
    }

    #[test]
    fn test_rejects_broken_paths() {
        let goal = goal();
        let a = BlockLocation::new(0, 0, 0);
        let b = BlockLocation::new(1, 0, 0);
        let c = BlockLocation::new(2, 0, 0);
        let kind = MoveKind::Traverse(CardinalDirection::North);

        assert_matches!(
            Path::try_new(vec![], vec![], goal.clone(), 0),
            Err(PathError::Empty)
        );
        assert_matches!(
            Path::try_new(vec![a, b], vec![], goal.clone(), 0),
            Err(PathError::LengthMismatch { .. })
        );
        assert_matches!(
            Path::try_new(vec![a, c], vec![Movement::new(kind, a, b)], goal, 0),
            Err(PathError::Disconnected { index: 0, .. })
        );
    }

    #[test]
    fn test_cutoff() {
        let goal = goal();
        let path = straight(&goal, 0, 9);

        for k in 0..path.len() {
            let cut = path.cutoff(k);
            assert_eq!(cut.positions(), &path.positions()[..=k]);
            assert_eq!(cut.movements().len(), k);
        }

        assert_eq!(path.cutoff(100).len(), path.len());
    }

    #[test]
    fn test_cutoff_at_loaded() {
        let goal = goal();
        let world = WorldBlocks::flat(0);

        // x = 16 is in the next chunk over
        let path = straight(&goal, 10, 20);
        let cut = path.cutoff_at_loaded(&world);
        assert_eq!(cut.dest(), BlockLocation::new(15, 0, 0));

        let inside = straight(&goal, 0, 5);
        assert_eq!(inside.cutoff_at_loaded(&world).len(), inside.len());
    }

    #[test]
    fn test_static_cutoff() {
        let goal = goal();
        let path = straight(&goal, 0, 40);

        let cut = path.static_cutoff(30, 0.9);
        assert_eq!(cut.len(), 37);

        // short paths are kept
        let short = straight(&goal, 0, 10);
        assert_eq!(short.static_cutoff(30, 0.9).len(), 11);

        // paths which reach the goal are kept
        let reaching = Arc::new(Goal::Block(BlockLocation::new(40, 0, 0)));
        let path = straight(&reaching, 0, 40);
        assert_eq!(path.static_cutoff(30, 0.9).len(), 41);
    }

    #[test]
    fn test_splice() {
        let goal = goal();
        let a = straight(&goal, 0, 5);
        let b = straight(&goal, 5, 9);

        let spliced = Path::splice(&a, &b).unwrap();
        let mut expected = a.positions().to_vec();
        expected.extend_from_slice(&b.positions()[1..]);
        assert_eq!(spliced.positions(), expected.as_slice());
        assert_eq!(spliced.movements().len(), spliced.len() - 1);

        assert_matches!(
            Path::splice(&a, &straight(&goal, 6, 9)),
            Err(PathError::JunctionMismatch { .. })
        );

        let other = Arc::new(Goal::YLevel(3));
        assert_matches!(
            Path::splice(&a, &straight(&other, 5, 9)),
            Err(PathError::GoalMismatch)
        );
    }

    #[test]
    fn test_splice_overlap() {
        let goal = goal();
        let a = straight(&goal, 0, 5);

        let back = BlockLocation::new(4, 0, 0);
        let end = BlockLocation::new(5, 0, 0);
        let b = Path::try_new(
            vec![end, back],
            vec![Movement::new(
                MoveKind::Traverse(CardinalDirection::South),
                end,
                back,
            )],
            goal,
            0,
        )
        .unwrap();

        assert_eq!(Path::splice(&a, &b).unwrap_err(), PathError::Overlap(back));
    }
}
