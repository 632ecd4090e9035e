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

use std::cmp::Ordering;

pub mod context;
pub mod goals;
pub mod incremental;
pub mod moves;
pub mod path;
pub mod worker;

/// An entry of a [`std::collections::BinaryHeap`] which pops the lowest score first
pub struct MinHeapNode<T, C: Ord> {
    pub contents: T,
    pub score: C,
}

impl<T, C: Ord> MinHeapNode<T, C> {
    pub const fn new(contents: T, score: C) -> Self {
        Self { contents, score }
    }
}

impl<T: Clone, C: Clone + Ord> Clone for MinHeapNode<T, C> {
    fn clone(&self) -> Self {
        Self {
            contents: self.contents.clone(),
            score: self.score.clone(),
        }
    }
}

impl<T, C: Ord> Ord for MinHeapNode<T, C> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.score.cmp(&self.score)
    }
}

impl<T, C: Ord> PartialOrd for MinHeapNode<T, C> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T, C: Ord> PartialEq for MinHeapNode<T, C> {
    fn eq(&self, other: &Self) -> bool {
        self.score.eq(&other.score)
    }
}

impl<T, C: Ord> Eq for MinHeapNode<T, C> {}
