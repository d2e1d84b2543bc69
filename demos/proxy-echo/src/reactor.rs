//! `mio`-backed `cotask::Reactor` for the echo proxy.
//!
//! Mirrors the reactor/registry split from the runtime this demo is built
//! on top of: a `Poll` plus its cloned `Registry` so registration can happen
//! from code that doesn't own the event loop, and a `Token -> TaskId` table
//! so readiness events can be translated back into scheduler wakeups.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use mio::{Events, Interest, Poll, Registry, Token};

use cotask::{Reactor, TaskId, TaskState, Tick};

pub struct MioReactor {
    poll: Poll,
    events: Events,
    registry: Registry,
    epoch: Instant,
    tokens: HashMap<usize, TaskId>,
}

impl MioReactor {
    pub fn new() -> io::Result<Self> {
        let poll = Poll::new()?;
        let registry = poll.registry().try_clone()?;
        Ok(Self {
            poll,
            events: Events::with_capacity(128),
            registry,
            epoch: Instant::now(),
            tokens: HashMap::new(),
        })
    }

    /// A `Tick` on the same wrapping millisecond counter `cotask::SystemClock`
    /// uses, so deadlines computed from `Scheduler::now()` and from this
    /// reactor's own clock are directly comparable.
    pub fn now(&self) -> Tick {
        let ms = self.epoch.elapsed().as_millis() as u64;
        Tick::new((ms & u32::MAX as u64) as u32)
    }

    /// Registers interest in a source on behalf of `task`, recording the
    /// `Token(task.raw()) -> task` mapping `poll_until` needs to translate
    /// readiness back into a wakeup.
    pub fn register<S: mio::event::Source>(
        &mut self,
        source: &mut S,
        interest: Interest,
        task: TaskId,
    ) -> io::Result<()> {
        self.registry.register(source, Token(task.raw()), interest)?;
        self.tokens.insert(task.raw(), task);
        Ok(())
    }

    pub fn reregister<S: mio::event::Source>(
        &mut self,
        source: &mut S,
        interest: Interest,
        task: TaskId,
    ) -> io::Result<()> {
        self.registry.reregister(source, Token(task.raw()), interest)
    }

    pub fn deregister<S: mio::event::Source>(&mut self, source: &mut S, task: TaskId) -> io::Result<()> {
        self.tokens.remove(&task.raw());
        self.registry.deregister(source)
    }
}

impl Reactor for MioReactor {
    fn poll_until(&mut self, deadline: Tick) -> Vec<(TaskId, TaskState)> {
        let now = self.now();
        let timeout = if !deadline.is_set() {
            None
        } else if deadline.is_le(now) {
            Some(Duration::ZERO)
        } else {
            Some(Duration::from_millis(deadline.0.wrapping_sub(now.0) as u64))
        };

        if let Err(err) = self.poll.poll(&mut self.events, timeout) {
            if err.kind() != io::ErrorKind::Interrupted {
                tracing::warn!(?err, "mio poll failed");
            }
            return Vec::new();
        }

        let mut woken = Vec::with_capacity(self.events.iter().count());
        for event in self.events.iter() {
            let Token(raw) = event.token();
            let Some(&task) = self.tokens.get(&raw) else {
                continue;
            };
            woken.push((task, TaskState::WOKEN_IO));
        }
        woken
    }
}
