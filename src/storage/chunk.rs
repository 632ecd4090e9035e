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

use interfaces::types::SimpleType;

const SECTION_HEIGHT: usize = 16;
const SECTION_WIDTH: usize = 16;
const SECTION_ELEMENTS: usize = SECTION_WIDTH * SECTION_WIDTH * SECTION_HEIGHT;
const BITS_PER_ENUM: usize = 2;
const SECTION_BYTES: usize = SECTION_ELEMENTS * BITS_PER_ENUM / 8;

/// every 2 bit pair set to 0b11, i.e., [`SimpleType::WalkThrough`]
const ALL_AIR: u8 = !0;

/// 16x16x16 blocks stored with 2 bits per block
#[derive(Clone)]
pub struct LowMemoryChunkSection {
    storage: [u8; SECTION_BYTES],
}

impl Default for LowMemoryChunkSection {
    fn default() -> Self {
        Self {
            storage: [ALL_AIR; SECTION_BYTES],
        }
    }
}

impl LowMemoryChunkSection {
    const fn idx(x: u8, y: u8, z: u8) -> (usize, u8) {
        let block_number =
            (((y as usize * SECTION_HEIGHT) + z as usize) * SECTION_WIDTH) + x as usize;

        // 2 bits per block
        let idx = block_number >> 2;
        let offset = ((block_number - (idx << 2)) * BITS_PER_ENUM) as u8;
        (idx, offset)
    }

    pub fn get_simple_type(&self, x: u8, y: u8, z: u8) -> SimpleType {
        let (idx, offset) = Self::idx(x, y, z);
        let res = (self.storage[idx] >> offset) & 0b11;
        SimpleType::from(res)
    }

    pub fn set_simple_type(&mut self, x: u8, y: u8, z: u8, input: SimpleType) {
        let (idx, offset) = Self::idx(x, y, z);

        let mut block = self.storage[idx];

        let zero_out = !(0b11 << offset);
        block &= zero_out;
        block |= input.id() << offset;

        self.storage[idx] = block;
    }

    fn filled(kind: SimpleType) -> Self {
        let id = kind.id();
        let byte = id | (id << 2) | (id << 4) | (id << 6);
        Self {
            storage: [byte; SECTION_BYTES],
        }
    }
}

/// A 16x16 column of blocks with unbounded height. Sections which were never
/// written to are air.
#[derive(Clone, Default)]
pub struct ChunkColumn {
    sections: HashMap<i16, LowMemoryChunkSection>,
}

impl ChunkColumn {
    /// A column which is solid below y = 0 (down to `depth` blocks) and air above
    pub fn flat(depth: u16) -> Self {
        let mut column = Self::default();
        let sections = depth.div_ceil(SECTION_HEIGHT as u16) as i16;
        for section in 1..=sections {
            column
                .sections
                .insert(-section, LowMemoryChunkSection::filled(SimpleType::Solid));
        }
        column
    }

    const fn split_y(y: i16) -> (i16, u8) {
        (y >> 4, (y & 0xF) as u8)
    }

    pub fn get_block(&self, x: u8, y: i16, z: u8) -> SimpleType {
        let (section_y, rel_y) = Self::split_y(y);
        self.sections
            .get(&section_y)
            .map_or(SimpleType::WalkThrough, |section| {
                section.get_simple_type(x, rel_y, z)
            })
    }

    pub fn set_block(&mut self, x: u8, y: i16, z: u8, kind: SimpleType) {
        let (section_y, rel_y) = Self::split_y(y);
        self.sections
            .entry(section_y)
            .or_default()
            .set_simple_type(x, rel_y, z, kind);
    }
}

#[cfg(test)]
mod tests {
    use interfaces::types::SimpleType;

    use crate::storage::chunk::{ChunkColumn, LowMemoryChunkSection};

    #[test]
    fn test_section_round_trip() {
        let mut section = LowMemoryChunkSection::default();
        assert_eq!(section.get_simple_type(3, 4, 5), SimpleType::WalkThrough);

        section.set_simple_type(3, 4, 5, SimpleType::Avoid);
        section.set_simple_type(4, 4, 5, SimpleType::Water);

        assert_eq!(section.get_simple_type(3, 4, 5), SimpleType::Avoid);
        assert_eq!(section.get_simple_type(4, 4, 5), SimpleType::Water);
        assert_eq!(section.get_simple_type(2, 4, 5), SimpleType::WalkThrough);
    }

    #[test]
    fn test_flat_column() {
        let column = ChunkColumn::flat(16);
        assert_eq!(column.get_block(0, -1, 0), SimpleType::Solid);
        assert_eq!(column.get_block(15, -16, 15), SimpleType::Solid);
        assert_eq!(column.get_block(15, -17, 15), SimpleType::WalkThrough);
        assert_eq!(column.get_block(7, 0, 7), SimpleType::WalkThrough);
    }

    #[test]
    fn test_negative_y() {
        let mut column = ChunkColumn::default();
        column.set_block(1, -3, 1, SimpleType::Solid);
        assert_eq!(column.get_block(1, -3, 1), SimpleType::Solid);
        assert_eq!(column.get_block(1, 13, 1), SimpleType::WalkThrough);
    }
}
