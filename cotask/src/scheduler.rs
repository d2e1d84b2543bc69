//! The scheduler driver.

use std::any::Any;

use slab::Slab;
use tracing::{debug, trace};

use crate::config::SchedulerConfig;
use crate::ebtree::Tree;
use crate::error::SchedulerError;
use crate::state::TaskState;
use crate::task::{Task, TaskCtx, TaskId, TaskOutcome};
use crate::tick::{Clock, SystemClock, Tick};

/// Owns the two ordered trees, the task pool, and every scheduler-wide
/// counter (`tasks_run_queue`, `niced_tasks`, `rqueue_ticks`, `nb_tasks`).
///
/// There is no process-wide singleton: every counter and both trees live in
/// a value the caller constructs explicitly. One `Scheduler` models one
/// cooperative scheduling domain; running more than one per process means
/// sharding work across OS threads, each with its own `Scheduler`.
pub struct Scheduler<C: Clock = SystemClock> {
    pub(crate) tasks: Slab<Task>,
    pub(crate) run_queue: Tree<TaskId>,
    pub(crate) wait_queue: Tree<TaskId>,
    pub(crate) rqueue_ticks: u32,
    pub(crate) tasks_run_queue: usize,
    pub(crate) niced_tasks: usize,
    pub(crate) nb_tasks: usize,
    pub(crate) config: SchedulerConfig,
    clock: C,
}

impl Scheduler<SystemClock> {
    /// Builds a scheduler driven by the default `SystemClock`.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new(), SchedulerConfig::default())
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    /// Builds a scheduler with an explicit clock and config. Never fails:
    /// the backing pool is a `slab::Slab` that grows on demand unless
    /// `config.max_tasks` caps it, and that cap is enforced by `new_task`
    /// rather than here.
    pub fn with_clock(clock: C, config: SchedulerConfig) -> Self {
        Self {
            tasks: Slab::new(),
            run_queue: Tree::new(),
            wait_queue: Tree::new(),
            rqueue_ticks: 0,
            tasks_run_queue: 0,
            niced_tasks: 0,
            nb_tasks: 0,
            config,
            clock,
        }
    }

    pub fn now(&self) -> Tick {
        self.clock.now()
    }

    /// Direct access to the clock, mainly so tests can drive a
    /// [`crate::tick::ManualClock`] without real time passing.
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn nb_tasks(&self) -> usize {
        self.nb_tasks
    }

    pub fn tasks_run_queue(&self) -> usize {
        self.tasks_run_queue
    }

    pub fn niced_tasks(&self) -> usize {
        self.niced_tasks
    }

    /// Seeds the run-queue insertion counter. Exists so wrap-around
    /// behavior can be exercised without actually performing four billion
    /// wakeups; has no use outside tests.
    pub fn seed_rqueue_ticks(&mut self, ticks: u32) {
        self.rqueue_ticks = ticks;
    }

    /// Allocates a new task with `state = WOKEN_INIT`, `nice = 0`,
    /// `expire = eternity`, both nodes unlinked.
    pub fn new_task<F>(
        &mut self,
        context: Box<dyn Any>,
        process: F,
    ) -> Result<TaskId, SchedulerError>
    where
        F: FnMut(&mut TaskCtx) -> TaskOutcome + 'static,
    {
        if let Some(max) = self.config.max_tasks {
            if self.nb_tasks >= max {
                return Err(SchedulerError::PoolExhausted { capacity: max });
            }
        }
        let task = Task::new(Box::new(process), context);
        let id = TaskId(self.tasks.insert(task));
        self.nb_tasks += 1;
        trace!(task = id.0, "new_task");
        Ok(id)
    }

    /// Frees a task's slab slot. Preconditions: not `RUNNING`, both nodes
    /// unlinked — asserted in debug builds, since violating either is
    /// caller misuse rather than a reportable error.
    pub fn free_task(&mut self, id: TaskId) {
        if let Some(task) = self.tasks.get(id.0) {
            debug_assert!(!task.is_running(), "free_task on a running task");
            debug_assert!(!task.is_run_queued(), "free_task on a run-queued task");
            debug_assert!(!task.is_wait_queued(), "free_task on a wait-queued task");
            self.tasks.remove(id.0);
            self.nb_tasks -= 1;
            trace!(task = id.0, "free_task");
        }
    }

    pub fn task_nice(&self, id: TaskId) -> Option<i16> {
        self.tasks.get(id.0).map(|t| t.nice)
    }

    pub fn set_task_nice(&mut self, id: TaskId, nice: i16) {
        debug_assert!((-1024..=1024).contains(&nice), "nice out of range");
        if let Some(task) = self.tasks.get_mut(id.0) {
            let nice = nice.clamp(-1024, 1024);
            let was_niced = task.nice != 0;
            let is_niced = nice != 0;
            task.nice = nice;
            if task.is_run_queued() && was_niced != is_niced {
                if is_niced {
                    self.niced_tasks += 1;
                } else {
                    self.niced_tasks -= 1;
                }
            }
        }
    }

    pub fn task_expire(&self, id: TaskId) -> Option<Tick> {
        self.tasks.get(id.0).map(|t| t.expire())
    }

    pub fn set_task_expire(&mut self, id: TaskId, expire: Tick) {
        if let Some(task) = self.tasks.get_mut(id.0) {
            task.set_expire(expire);
        }
    }

    /// Drains a bounded prefix of the run queue, invoking each task's
    /// handler. Returns the number of handler invocations performed, for
    /// telemetry and tests.
    pub fn process_runnable_tasks(&mut self) -> usize {
        let tasks_run_queue_cur = self.tasks_run_queue;
        let nb_tasks_cur = self.nb_tasks;
        if self.run_queue.is_empty() {
            return 0;
        }

        let mut budget = self.config.max_budget.min(tasks_run_queue_cur);
        if self.niced_tasks > 0 {
            budget = (budget + 3) / 4;
        }
        debug!(
            tasks_run_queue = tasks_run_queue_cur,
            nb_tasks = nb_tasks_cur,
            budget,
            "process_runnable_tasks"
        );

        let mut invoked = 0usize;
        while budget > 0 {
            let batch = self.collect_batch();
            if batch.is_empty() {
                break;
            }
            for (entry_key, id) in &batch {
                self.run_queue.remove(*entry_key);
                self.tasks_run_queue -= 1;
                if let Some(task) = self.tasks.get_mut(id.0) {
                    if task.nice != 0 {
                        self.niced_tasks -= 1;
                    }
                    task.rq = None;
                    task.state |= task.pending_state;
                    task.state.insert(TaskState::RUNNING);
                    task.pending_state = TaskState::empty();
                    task.calls += 1;
                }
            }

            for (_entry_key, id) in &batch {
                self.run_one(*id);
                invoked += 1;
            }

            budget = budget.saturating_sub(batch.len());
        }
        invoked
    }

    /// Collects up to `config.batch_size` run-queue entries, oldest first by
    /// `(rq key, insertion sequence)`, wrapping through `first()` at most
    /// once: a second wrap within one collection pass must stop, not spin
    /// on the same entries forever.
    fn collect_batch(&self) -> Vec<(crate::ebtree::EntryKey, TaskId)> {
        let look_back = self.config.look_back;
        let mut batch = Vec::with_capacity(self.config.batch_size);
        let mut cursor = self.run_queue.lookup_ge_wrapping(self.rqueue_ticks, look_back);
        let start = cursor.map(|(k, _)| k);
        let mut rewound = false;
        while batch.len() < self.config.batch_size {
            let Some(entry) = cursor else { break };
            if rewound && Some(entry.0) == start {
                // We've walked all the way around the tree back to where we
                // started: a genuine second wrap within one collection pass
                // would otherwise spin forever re-adding the same entries,
                // so stop instead.
                break;
            }
            batch.push(entry);
            cursor = self.run_queue.next(entry.0);
            if cursor.is_none() {
                if rewound {
                    break;
                }
                rewound = true;
                cursor = self.run_queue.first();
            }
        }
        batch
    }

    fn run_one(&mut self, id: TaskId) {
        let Some(task) = self.tasks.get_mut(id.0) else {
            return;
        };
        let wake_reasons = task.state & TaskState::WOKEN_MASK;
        let mut self_wake = TaskState::empty();
        let outcome = {
            let mut ctx = TaskCtx {
                id,
                state: wake_reasons,
                context: &mut task.context,
                expire: &mut task.expire,
                self_wake: &mut self_wake,
            };
            (task.process)(&mut ctx)
        };

        match outcome {
            TaskOutcome::Delete => {
                self.tasks.remove(id.0);
                self.nb_tasks -= 1;
            }
            TaskOutcome::Continue => {
                let task = self.tasks.get_mut(id.0).expect("task vanished mid-run");
                task.state.remove(TaskState::RUNNING);
                task.pending_state |= self_wake;
                if !task.pending_state.is_empty() {
                    self.wakeup_core(id, TaskState::empty());
                } else {
                    self.queue(id);
                }
            }
        }
    }
}
