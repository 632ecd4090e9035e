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

use std::{sync::Arc, thread, time::Duration};

use anyhow::{bail, Context};
use colored::Colorize;
use interfaces::types::{BlockLocation, SimpleType};
use parking_lot::RwLock;
use rand::{rngs::StdRng, Rng, SeedableRng};
use swarmbot_nav::{
    bootstrap::{init_logging, opts::CliOptions, Settings},
    client::{
        agent::Agent,
        pathfind::goals::Goal,
        physics::tools::Tool,
        sim::SimAgent,
        tasks::navigate::{PathEvent, PathingBehavior},
    },
    storage::WorldBlocks,
};
use tracing::info;

/// A flat world with pillars scattered over it. Every fifth one is
/// something to stay away from.
fn build_world(radius: i32, obstacles: usize, seed: u64, keep_clear: &[BlockLocation]) -> WorldBlocks {
    let mut world = WorldBlocks::flat(radius);
    let mut rng = StdRng::seed_from_u64(seed);

    let min = -radius * 16;
    let max = radius * 16 + 15;

    let mut placed = 0;
    while placed < obstacles {
        let x = rng.gen_range(min..=max);
        let z = rng.gen_range(min..=max);
        let base = BlockLocation::new(x, 0, z);

        if keep_clear.iter().any(|loc| loc.dist2(base) < 9.0) {
            continue;
        }

        let kind = if placed % 5 == 4 {
            SimpleType::Avoid
        } else {
            SimpleType::Solid
        };

        let height = rng.gen_range(1..=4);
        world.fill(base, base.add_y(height - 1), kind);
        placed += 1;
    }

    world
}

fn print_event(tick: u64, event: &PathEvent, location: BlockLocation) {
    let name = format!("{event:?}");
    let name = match event {
        PathEvent::AtGoal => name.green().bold(),
        PathEvent::CalcFailed(..) | PathEvent::PathFailed => name.red(),
        PathEvent::Canceled | PathEvent::DiscardedStaleResult => name.yellow(),
        _ => name.cyan(),
    };
    println!("{} {name} at {location}", format!("[{tick:>6}]").dimmed());
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let CliOptions {
        settings,
        goal,
        ticks,
        radius,
        obstacles,
        seed,
        throwaway,
        tick_ms,
    } = CliOptions::get();

    let settings = Settings::load(settings.as_deref())?;

    let [x, y, z] = goal[..] else {
        bail!("a goal needs exactly three coordinates");
    };
    let y = i16::try_from(y).context("goal y is out of range")?;
    let goal = BlockLocation::new(x, y, z);

    let start = BlockLocation::new(0, 0, 0);
    let world = Arc::new(RwLock::new(build_world(radius, obstacles, seed, &[start, goal])));

    let mut agent = SimAgent::new(world.clone(), start, throwaway);
    let mut behavior = PathingBehavior::new(
        Tool::default(),
        settings.path,
        settings.executor,
        settings.behavior,
    );
    behavior.set_goal(Goal::Block(goal));

    info!(%start, %goal, obstacles, "starting");

    for tick in 0..ticks {
        for event in behavior.tick(&world, &mut agent) {
            print_event(tick, &event, agent.location());

            if event == PathEvent::AtGoal {
                println!(
                    "{} in {tick} ticks, mined {} and placed {} blocks",
                    "arrived".green().bold(),
                    agent.blocks_mined(),
                    agent.blocks_placed()
                );
                return Ok(());
            }
        }

        thread::sleep(Duration::from_millis(tick_ms));
    }

    bail!(
        "did not reach {goal} within {ticks} ticks (stopped at {})",
        agent.location()
    )
}
