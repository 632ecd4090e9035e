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

//! Runs one search off the tick loop.
//!
//! The result comes back over a oneshot channel which the tick loop polls.
//! Snapshots of the search's progress are published over a watch channel so
//! an observer never has to touch the search itself.

use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use tokio::sync::{oneshot, watch};
use tracing::warn;

use crate::{
    client::{
        pathfind::{
            context::PathConfig,
            goals::Goal,
            incremental::{AStar, SearchRequest, SearchResult},
            path::Path,
        },
        physics::tools::ToolModel,
        timing::{Increment, Incremental},
    },
    error::SearchFailure,
    storage::world::WorldView,
};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Clone, Debug, Default)]
pub struct SearchProgress {
    pub best_so_far: Option<Arc<Path>>,
    pub most_recent: Option<Arc<Path>>,
    pub nodes_considered: usize,
}

/// A cheap handle for watching a search from anywhere
#[derive(Clone)]
pub struct SearchProgressReader {
    rx: watch::Receiver<SearchProgress>,
}

impl SearchProgressReader {
    pub fn latest(&self) -> SearchProgress {
        self.rx.borrow().clone()
    }

    pub fn best_path_so_far(&self) -> Option<Arc<Path>> {
        self.rx.borrow().best_so_far.clone()
    }

    pub fn path_to_most_recent_node(&self) -> Option<Arc<Path>> {
        self.rx.borrow().most_recent.clone()
    }
}

/// The one search in flight
pub struct SearchHandle {
    goal: Arc<Goal>,
    result: oneshot::Receiver<SearchResult>,
    progress: watch::Receiver<SearchProgress>,
    finished: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "unknown panic".to_string()
}

fn publish<W: WorldView + ?Sized, T: ToolModel>(
    astar: &AStar<W, T>,
    tx: &watch::Sender<SearchProgress>,
) {
    tx.send_replace(SearchProgress {
        best_so_far: astar.best_path_so_far().map(Arc::new),
        most_recent: astar.path_to_most_recent_node().map(Arc::new),
        nodes_considered: astar.nodes_considered(),
    });
}

fn drive<W: WorldView + ?Sized, T: ToolModel>(
    astar: &mut AStar<W, T>,
    progress: &watch::Sender<SearchProgress>,
) -> SearchResult {
    let mut last_publish = Instant::now();
    loop {
        if let Increment::Finished(res) = astar.iterate() {
            publish(astar, progress);
            return res;
        }

        if last_publish.elapsed() >= PROGRESS_INTERVAL {
            publish(astar, progress);
            last_publish = Instant::now();
        }
    }
}

impl SearchHandle {
    /// Start searching on the rayon thread pool
    pub fn spawn<W, T>(
        world: Arc<W>,
        tools: T,
        config: PathConfig,
        throwaway: usize,
        request: SearchRequest,
    ) -> Self
    where
        W: WorldView + Send + Sync + ?Sized + 'static,
        T: ToolModel + Send + Sync + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let (progress_tx, progress_rx) = watch::channel(SearchProgress::default());
        let finished = Arc::new(AtomicBool::new(false));

        let goal = request.goal.clone();
        let mut astar = AStar::new(world, tools, config, throwaway, request);
        let cancel = astar.cancel_flag();

        let done = finished.clone();
        rayon::spawn(move || {
            let res = catch_unwind(AssertUnwindSafe(|| drive(&mut astar, &progress_tx)))
                .unwrap_or_else(|payload| {
                    let msg = panic_message(payload.as_ref());
                    warn!("search panicked: {msg}");
                    Err(SearchFailure::Panicked(msg))
                });

            done.store(true, Ordering::Release);

            // the receiver is gone if nobody wants the result anymore
            let _ = result_tx.send(res);
        });

        Self {
            goal,
            result: result_rx,
            progress: progress_rx,
            finished,
            cancel,
        }
    }

    pub const fn goal(&self) -> &Arc<Goal> {
        &self.goal
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Ask the search to stop at its next time check
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn progress(&self) -> SearchProgressReader {
        SearchProgressReader {
            rx: self.progress.clone(),
        }
    }

    /// `None` while the search is still running
    pub fn try_result(&mut self) -> Option<SearchResult> {
        match self.result.try_recv() {
            Ok(res) => Some(res),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(SearchFailure::WorkerGone)),
        }
    }

    /// Block until the search is done. Only for callers which are not the
    /// tick loop, i.e., tests.
    pub fn wait(mut self) -> SearchResult {
        loop {
            if let Some(res) = self.try_result() {
                return res;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}
