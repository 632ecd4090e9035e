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

/// The result of doing one slice of a long-running task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Increment<T> {
    Finished(T),
    InProgress,
}

impl<T> Increment<T> {
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(..))
    }
}

/// Tasks which can be done incrementally. Used in pathfinding
pub trait Incremental<T> {
    /// complete an iteration. Returns [`Increment::Finished`] when it is done
    fn iterate(&mut self) -> Increment<T>;

    /// iterate until finished
    fn run(&mut self) -> T {
        loop {
            if let Increment::Finished(res) = self.iterate() {
                return res;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::client::timing::{Increment, Incremental};

    struct Countdown(u32);

    impl Incremental<&'static str> for Countdown {
        fn iterate(&mut self) -> Increment<&'static str> {
            if self.0 == 0 {
                return Increment::Finished("done");
            }
            self.0 -= 1;
            Increment::InProgress
        }
    }

    #[test]
    fn test_run_until_finished() {
        let mut countdown = Countdown(3);
        assert!(!countdown.iterate().is_finished());
        assert_eq!(countdown.run(), "done");
        assert_eq!(countdown.0, 0);
    }
}
