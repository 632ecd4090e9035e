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

//! A deterministic agent which lives inside a [`WorldBlocks`].
//!
//! Moves happen instantly: walking puts the feet straight at the target if
//! the body fits, mining removes a block in one tick, and gravity is applied
//! right after every change.

use std::sync::Arc;

use interfaces::types::{BlockLocation, SimpleType};
use parking_lot::RwLock;
use tracing::trace;

use crate::{
    client::agent::Agent,
    storage::{blocks::WorldBlocks, world::WorldView},
};

/// how far we are willing to fall before giving up (the void)
const MAX_FALL: usize = 512;

pub struct SimAgent {
    world: Arc<RwLock<WorldBlocks>>,
    location: BlockLocation,
    throwaway: usize,

    /// ignore every request
    frozen: bool,

    walking: bool,
    mined: usize,
    placed: usize,
}

impl SimAgent {
    pub fn new(world: Arc<RwLock<WorldBlocks>>, location: BlockLocation, throwaway: usize) -> Self {
        Self {
            world,
            location,
            throwaway,
            frozen: false,
            walking: false,
            mined: 0,
            placed: 0,
        }
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Move without asking, i.e., lag or a server correction
    pub fn teleport(&mut self, location: BlockLocation) {
        self.location = location;
    }

    pub const fn walking(&self) -> bool {
        self.walking
    }

    pub const fn blocks_mined(&self) -> usize {
        self.mined
    }

    pub const fn blocks_placed(&self) -> usize {
        self.placed
    }

    fn fits(world: &WorldBlocks, location: BlockLocation) -> bool {
        world.block_type_at(location).passable() && world.block_type_at(location.above()).passable()
    }

    fn settle(&mut self) {
        let world = self.world.read();
        for _ in 0..MAX_FALL {
            let feet = world.block_type_at(self.location);
            let floor = world.block_type_at(self.location.below());
            if feet == SimpleType::Water || !floor.passable() {
                return;
            }
            self.location = self.location.below();
        }
    }
}

impl Agent for SimAgent {
    fn location(&self) -> BlockLocation {
        self.location
    }

    fn on_ground(&self) -> bool {
        self.world.read().block_type_at(self.location.below()) == SimpleType::Solid
    }

    fn mine(&mut self, target: BlockLocation) {
        if self.frozen {
            return;
        }

        let removed = {
            let mut world = self.world.write();
            world.get_block(target) == Some(SimpleType::Solid)
                && world.set_block(target, SimpleType::WalkThrough)
        };

        if removed {
            trace!("mined {target}");
            self.mined += 1;
            self.settle();
        }
    }

    fn place(&mut self, target: BlockLocation) -> bool {
        if self.frozen || self.throwaway == 0 {
            return false;
        }

        // jump and place under our feet
        if target == self.location {
            self.location = self.location.above();
        }

        let placed = {
            let mut world = self.world.write();
            world
                .get_block(target)
                .is_some_and(SimpleType::replaceable)
                && world.set_block(target, SimpleType::Solid)
        };

        if placed {
            trace!("placed {target}");
            self.throwaway -= 1;
            self.placed += 1;
        }

        self.settle();
        placed
    }

    fn walk_toward(&mut self, target: BlockLocation, _jump: bool) {
        if self.frozen {
            return;
        }

        self.walking = true;
        if Self::fits(&self.world.read(), target) {
            self.location = target;
            self.settle();
        }
    }

    fn release_controls(&mut self) {
        self.walking = false;
    }

    fn throwaway_count(&self) -> usize {
        self.throwaway
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use interfaces::types::{BlockLocation, SimpleType};
    use parking_lot::RwLock;

    use crate::{
        client::{agent::Agent, sim::SimAgent},
        storage::blocks::WorldBlocks,
    };

    #[test]
    fn test_gravity() {
        let mut world = WorldBlocks::flat(1);
        world.fill(
            BlockLocation::new(1, -3, 0),
            BlockLocation::new(1, -1, 0),
            SimpleType::WalkThrough,
        );
        let world = Arc::new(RwLock::new(world));

        let mut agent = SimAgent::new(world, BlockLocation::new(0, 0, 0), 0);
        agent.walk_toward(BlockLocation::new(1, 0, 0), false);
        assert_eq!(agent.location(), BlockLocation::new(1, -3, 0));
        assert!(agent.on_ground());
    }

    #[test]
    fn test_blocked_and_frozen() {
        let mut world = WorldBlocks::flat(1);
        world.set_block(BlockLocation::new(1, 1, 0), SimpleType::Solid);
        let world = Arc::new(RwLock::new(world));

        let mut agent = SimAgent::new(world, BlockLocation::new(0, 0, 0), 0);
        agent.walk_toward(BlockLocation::new(1, 0, 0), false);
        assert_eq!(agent.location(), BlockLocation::new(0, 0, 0));

        agent.mine(BlockLocation::new(1, 1, 0));
        assert_eq!(agent.blocks_mined(), 1);

        agent.set_frozen(true);
        agent.walk_toward(BlockLocation::new(1, 0, 0), false);
        assert_eq!(agent.location(), BlockLocation::new(0, 0, 0));

        agent.set_frozen(false);
        agent.walk_toward(BlockLocation::new(1, 0, 0), false);
        assert_eq!(agent.location(), BlockLocation::new(1, 0, 0));
        assert!(agent.walking());
        agent.release_controls();
        assert!(!agent.walking());
    }
}
