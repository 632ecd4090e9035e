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

use std::collections::HashMap;

use interfaces::types::{BlockLocation, ChunkLocation, SimpleType};

use crate::storage::{chunk::ChunkColumn, world::WorldView};

/// How far below y = 0 a flat world is solid
const FLAT_DEPTH: u16 = 16;

/// The blocks we know about, stored by chunk column. Columns which have not
/// been added are unknown.
#[derive(Clone, Default)]
pub struct WorldBlocks {
    storage: HashMap<ChunkLocation, ChunkColumn>,
    border: Option<i32>,
}

impl WorldBlocks {
    /// A flat world where everything below y = 0 is solid. Only chunks within
    /// `radius` chunks of the origin are loaded.
    pub fn flat(radius: i32) -> Self {
        let mut world = Self::default();
        for cx in -radius..=radius {
            for cz in -radius..=radius {
                world.add_column(ChunkLocation(cx, cz), ChunkColumn::flat(FLAT_DEPTH));
            }
        }
        world
    }

    /// Only allow pathing within `|x| <= border` and `|z| <= border`
    pub const fn with_border(mut self, border: i32) -> Self {
        self.border = Some(border);
        self
    }

    pub fn add_column(&mut self, location: ChunkLocation, column: ChunkColumn) {
        self.storage.insert(location, column);
    }

    pub fn remove_column(&mut self, location: ChunkLocation) {
        self.storage.remove(&location);
    }

    const fn split(location: BlockLocation) -> (ChunkLocation, u8, u8) {
        let BlockLocation { x, z, .. } = location;
        let chunk_x = x >> 4;
        let chunk_z = z >> 4;

        let x = (x - (chunk_x << 4)) as u8;
        let z = (z - (chunk_z << 4)) as u8;

        (ChunkLocation(chunk_x, chunk_z), x, z)
    }

    pub fn get_block(&self, location: BlockLocation) -> Option<SimpleType> {
        let (loc, x, z) = Self::split(location);
        let column = self.storage.get(&loc)?;
        Some(column.get_block(x, location.y, z))
    }

    /// Sets a block. Returns false if the chunk is not loaded.
    pub fn set_block(&mut self, location: BlockLocation, block: SimpleType) -> bool {
        let (loc, x, z) = Self::split(location);
        match self.storage.get_mut(&loc) {
            None => false,
            Some(column) => {
                column.set_block(x, location.y, z, block);
                true
            }
        }
    }

    /// Fill the inclusive cuboid between `from` and `to`
    pub fn fill(&mut self, from: BlockLocation, to: BlockLocation, block: SimpleType) {
        let (min_x, max_x) = (from.x.min(to.x), from.x.max(to.x));
        let (min_y, max_y) = (from.y.min(to.y), from.y.max(to.y));
        let (min_z, max_z) = (from.z.min(to.z), from.z.max(to.z));

        for x in min_x..=max_x {
            for y in min_y..=max_y {
                for z in min_z..=max_z {
                    self.set_block(BlockLocation::new(x, y, z), block);
                }
            }
        }
    }

    pub fn loaded_chunks(&self) -> usize {
        self.storage.len()
    }
}

impl WorldView for WorldBlocks {
    fn get_block_simple(&self, location: BlockLocation) -> Option<SimpleType> {
        self.get_block(location)
    }

    fn inside_bounds(&self, x: i32, z: i32) -> bool {
        self.border
            .map_or(true, |border| x.abs() <= border && z.abs() <= border)
    }

    fn is_loaded(&self, x: i32, z: i32) -> bool {
        self.storage.contains_key(&ChunkLocation(x >> 4, z >> 4))
    }
}
