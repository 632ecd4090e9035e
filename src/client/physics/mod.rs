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

//! Vertical motion timings used to turn falls and jumps into tick costs

use once_cell::sync::Lazy;

pub mod tools;

const ACC_G: f64 = 0.08;

const DRAG_MULT: f64 = 0.98; // 00000190734863;

/// the highest fall we keep a precomputed cost for
const MAX_TABLED_FALL: usize = 256;

static FALL_N_BLOCKS: Lazy<[f64; MAX_TABLED_FALL + 1]> = Lazy::new(|| {
    let mut res = [0.0; MAX_TABLED_FALL + 1];
    for (blocks, ticks) in res.iter_mut().enumerate() {
        *ticks = distance_to_ticks(blocks as f64);
    }
    res
});

fn ver_speed(prev_speed: f64) -> f64 {
    (prev_speed - ACC_G) * DRAG_MULT
}

/// The number of ticks (fractional) a body starting at rest takes to fall `distance` blocks
pub fn distance_to_ticks(distance: f64) -> f64 {
    if distance <= 0.0 {
        return 0.0;
    }

    let mut remaining = distance;
    let mut ticks = 0.0;
    let mut y_vel = 0.0;

    loop {
        y_vel = ver_speed(y_vel);
        let step = -y_vel;
        if step >= remaining {
            // we only use part of this tick
            return ticks + remaining / step;
        }
        remaining -= step;
        ticks += 1.0;
    }
}

/// ticks to fall `blocks` whole blocks
pub fn fall_ticks(blocks: u32) -> f64 {
    let idx = blocks as usize;
    if idx <= MAX_TABLED_FALL {
        FALL_N_BLOCKS[idx]
    } else {
        distance_to_ticks(f64::from(blocks))
    }
}

/// ticks it takes to get up one block: the apex of a jump is ~1.25 blocks and
/// we land a quarter block below it
pub fn jump_one_block_ticks() -> f64 {
    distance_to_ticks(1.25) - distance_to_ticks(0.25)
}

#[cfg(test)]
mod tests {
    use more_asserts::*;

    use crate::client::physics::{distance_to_ticks, fall_ticks, jump_one_block_ticks};

    #[test]
    fn test_fall_monotonic() {
        let mut prev = 0.0;
        for blocks in 1..40 {
            let ticks = fall_ticks(blocks);
            assert_gt!(ticks, prev);
            prev = ticks;
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(fall_ticks(0), 0.0);

        // falling a block takes a bit over 4.5 ticks
        let one = fall_ticks(1);
        assert_gt!(one, 4.0);
        assert_lt!(one, 5.0);

        // falling is faster than walking the same distance after a few blocks
        assert_lt!(fall_ticks(20) / 20.0, 20.0 / 4.317);
    }

    #[test]
    fn test_jump() {
        let jump = jump_one_block_ticks();
        assert_gt!(jump, 2.0);
        assert_lt!(jump, 4.0);
        assert!((distance_to_ticks(1.25) - distance_to_ticks(0.25) - jump).abs() < 1e-9);
    }
}
