//! Scheduler tuning knobs.
//!
//! There is no file/env configuration layer at this level — `nice` and
//! `expire` values are chosen by whatever upstream layer schedules a task,
//! not read from a config file here. These are just the handful of
//! constants the algorithm itself depends on, grouped so a caller can tune
//! them without forking the crate.

#[derive(Clone, Copy, Debug)]
pub struct SchedulerConfig {
    /// Width of the look-back window used by `lookup_ge_wrapping` to find
    /// "the next thing to happen" on the cyclic key space. `1 << 31` makes
    /// the lookup equivalent to "smallest key in the half-plane beginning
    /// 2^31 before now", which is large enough to reach any stale entry yet
    /// small enough that `now + valid_future` can't wrap around into it.
    pub look_back: u32,
    /// Maximum number of handlers invoked per `process_runnable_tasks`
    /// call.
    pub max_budget: usize,
    /// Number of tasks collected into one batch before they are executed.
    pub batch_size: usize,
    /// Optional cap on live task records. `None` means the pool grows
    /// without bound (a plain `slab::Slab`); `Some(n)` makes `new_task`
    /// return `SchedulerError::PoolExhausted` once `nb_tasks` reaches `n`.
    pub max_tasks: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            look_back: 1 << 31,
            max_budget: 200,
            batch_size: 16,
            max_tasks: None,
        }
    }
}
