//! Bounded fan-out of per-rectangle tasks.

use crate::{options::DispatchArgs, report::Failure};
use anyhow::Result;
use dashmap::DashMap;
use indicatif::ProgressBar;
use log::{debug, warn};
use raster::Raster;
use rayon::{prelude::*, ThreadPoolBuilder};
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    path::PathBuf,
    sync::OnceLock,
    thread::available_parallelism,
    time::{Duration, Instant},
};
use terrain::{Deadline, Rectangle, TerrainError};

/// Lifecycle of one task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T> {
    Pending,
    Running,
    Completed(T),
    Failed(String),
}

/// Results of every task, in index order.
#[derive(Debug)]
pub struct Outcome<T> {
    pub completed: Vec<(usize, T)>,
    pub failures: Vec<Failure>,
}

pub struct Dispatcher {
    /// Raster every worker opens for itself.
    raster: PathBuf,

    workers: usize,

    task_timeout: Option<Duration>,

    progress: ProgressBar,
}

impl Dispatcher {
    pub fn new(raster: PathBuf, workers: Option<usize>, task_timeout: Option<Duration>) -> Self {
        let workers = workers
            .filter(|n| *n > 0)
            .or_else(|| available_parallelism().ok().map(usize::from))
            .unwrap_or(1);
        Self {
            raster,
            workers,
            task_timeout,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn from_args(args: &DispatchArgs) -> Self {
        Self::new(args.raster.clone(), args.workers, args.task_timeout)
    }

    #[must_use]
    pub fn progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs `task` once per rectangle on a pool of `workers` threads
    /// and waits for every task to finish.
    ///
    /// Rectangles are handed to workers as they become free. A failed
    /// or panicking task is recorded and never stops its siblings.
    ///
    /// A task's deadline starts before its worker opens the raster, so
    /// a slow first read counts against the task that triggered it.
    pub fn run<T, F>(&self, rectangles: Vec<Rectangle>, task: F) -> Result<Outcome<T>>
    where
        T: Send + Sync,
        F: Fn(&Raster, &Rectangle, &Deadline) -> Result<T, TerrainError> + Sync,
    {
        let states: DashMap<usize, TaskState<T>> = rectangles
            .iter()
            .map(|rect| (rect.id, TaskState::Pending))
            .collect();
        let pool = ThreadPoolBuilder::new().num_threads(self.workers).build()?;
        let handles: Vec<OnceLock<Result<Raster, String>>> = (0..pool.current_num_threads())
            .map(|_| OnceLock::new())
            .collect();
        debug!(
            "dispatching {} tasks to {} workers",
            states.len(),
            handles.len()
        );

        let started = Instant::now();
        pool.install(|| {
            rectangles.into_iter().par_bridge().for_each(|rect| {
                states.insert(rect.id, TaskState::Running);
                let deadline = Deadline::new(self.task_timeout);
                let worker = rayon::current_thread_index().unwrap_or(0) % handles.len();
                let raster = handles[worker].get_or_init(|| {
                    debug!("worker {worker} opening {:?}", self.raster);
                    catch_unwind(AssertUnwindSafe(|| Raster::open(&self.raster)))
                        .map_err(|payload| panic_reason(&*payload))?
                        .map_err(|e| e.to_string())
                });
                let state = match raster {
                    Ok(raster) => {
                        let result = catch_unwind(AssertUnwindSafe(|| {
                            deadline.check()?;
                            task(raster, &rect, &deadline)
                        }));
                        match result {
                            Ok(Ok(value)) => TaskState::Completed(value),
                            Ok(Err(e)) => TaskState::Failed(e.to_string()),
                            Err(payload) => TaskState::Failed(panic_reason(&*payload)),
                        }
                    }
                    Err(e) => TaskState::Failed(e.clone()),
                };
                if let TaskState::Failed(reason) = &state {
                    warn!("rectangle {}: {reason}", rect.id);
                }
                states.insert(rect.id, state);
                self.progress.inc(1);
            });
        });
        self.progress.finish();
        debug!("dispatch finished in {:?}", started.elapsed());

        Ok(Outcome::from(states))
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause");
    format!("panicked: {msg}")
}

impl<T> From<DashMap<usize, TaskState<T>>> for Outcome<T> {
    fn from(states: DashMap<usize, TaskState<T>>) -> Self {
        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for (index, state) in states {
            match state {
                TaskState::Completed(value) => completed.push((index, value)),
                TaskState::Failed(reason) => failures.push(Failure { index, reason }),
                TaskState::Pending | TaskState::Running => failures.push(Failure {
                    index,
                    reason: "task did not finish".to_string(),
                }),
            }
        }
        completed.sort_by_key(|(index, _)| *index);
        failures.sort_by_key(|f| f.index);
        Self {
            completed,
            failures,
        }
    }
}
