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

use interfaces::types::BlockLocation;

/// The body a movement drives.
///
/// Every method is a request for this tick. Whether it worked is observed on
/// the next tick through [`Agent::location`] and the world.
pub trait Agent {
    /// the block the feet are in
    fn location(&self) -> BlockLocation;

    fn on_ground(&self) -> bool;

    /// keep digging at `target`
    fn mine(&mut self, target: BlockLocation);

    /// place a throwaway block at `target`. False if there was nothing to place.
    fn place(&mut self, target: BlockLocation) -> bool;

    fn walk_toward(&mut self, target: BlockLocation, jump: bool);

    /// stop walking, jumping and digging
    fn release_controls(&mut self);

    /// the number of blocks we are willing to place
    fn throwaway_count(&self) -> usize;
}
