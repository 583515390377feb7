//! # Tick Scheduler
//!
//! Timeouts driven by simulation time rather than wall-clock time. Store a
//! [`TickScheduler`] as a world resource and advance it from a system with
//! the step length of each tick.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Handle for a pending timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct Task {
    remaining: Duration,
    run: Box<dyn FnOnce()>,
}

/// Pending timeouts, fired in the order they were scheduled.
#[derive(Default)]
pub struct TickScheduler {
    next_id: u64,
    tasks: BTreeMap<TimerId, Task>,
}

impl TickScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `f` to run once more than `timeout` of tick time elapsed.
    pub fn set_timeout(&mut self, f: impl FnOnce() + 'static, timeout: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.tasks.insert(
            id,
            Task {
                remaining: timeout,
                run: Box::new(f),
            },
        );
        id
    }

    /// Cancels a pending timeout. Returns `false` if it already fired or was
    /// cancelled.
    pub fn clear_timeout(&mut self, id: TimerId) -> bool {
        self.tasks.remove(&id).is_some()
    }

    /// Number of pending timeouts.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Advances every timeout by `dt` and runs those whose time is up.
    ///
    /// A timeout fires on the tick that would take its remaining time below
    /// zero. Returns the number of timeouts fired.
    pub fn tick(&mut self, dt: Duration) -> usize {
        let mut due = Vec::new();
        for (&id, task) in &mut self.tasks {
            match task.remaining.checked_sub(dt) {
                Some(remaining) => task.remaining = remaining,
                None => due.push(id),
            }
        }

        for id in &due {
            if let Some(task) = self.tasks.remove(id) {
                (task.run)();
            }
        }
        if !due.is_empty() {
            tracing::trace!(fired = due.len(), pending = self.tasks.len(), "timeouts fired");
        }
        due.len()
    }
}

impl fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickScheduler")
            .field("pending", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
