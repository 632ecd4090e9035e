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

use std::sync::Arc;

use interfaces::types::{BlockLocation, SimpleType};
use parking_lot::RwLock;

/// Read access to the blocks of a world.
///
/// Implementations may be backed by live data or by an approximation. The
/// pathfinder only ever needs the coarse [`SimpleType`] of a block.
pub trait WorldView {
    /// `None` if the block is not known (i.e., the chunk is not loaded)
    fn get_block_simple(&self, location: BlockLocation) -> Option<SimpleType>;

    /// The world border. Locations outside of it are never pathed to.
    fn inside_bounds(&self, _x: i32, _z: i32) -> bool {
        true
    }

    /// Like [`WorldView::get_block_simple`] but unknown blocks are assumed
    /// to be something we should never walk through.
    fn block_type_at(&self, location: BlockLocation) -> SimpleType {
        self.get_block_simple(location).unwrap_or(SimpleType::Avoid)
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        self.get_block_simple(BlockLocation::new(x, 0, z)).is_some()
    }
}

impl<W: WorldView + ?Sized> WorldView for &W {
    fn get_block_simple(&self, location: BlockLocation) -> Option<SimpleType> {
        (**self).get_block_simple(location)
    }

    fn inside_bounds(&self, x: i32, z: i32) -> bool {
        (**self).inside_bounds(x, z)
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        (**self).is_loaded(x, z)
    }
}

impl<W: WorldView + ?Sized> WorldView for Arc<W> {
    fn get_block_simple(&self, location: BlockLocation) -> Option<SimpleType> {
        (**self).get_block_simple(location)
    }

    fn inside_bounds(&self, x: i32, z: i32) -> bool {
        (**self).inside_bounds(x, z)
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        (**self).is_loaded(x, z)
    }
}

/// A world which is being modified by the tick loop while a search reads it
impl<W: WorldView> WorldView for RwLock<W> {
    fn get_block_simple(&self, location: BlockLocation) -> Option<SimpleType> {
        self.read().get_block_simple(location)
    }

    fn inside_bounds(&self, x: i32, z: i32) -> bool {
        self.read().inside_bounds(x, z)
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        self.read().is_loaded(x, z)
    }
}
