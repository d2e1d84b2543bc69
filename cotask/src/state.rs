//! Task state and wake-reason bits.

use bitflags::bitflags;

bitflags! {
    /// Bits over `{RUNNING, WOKEN_*}`. `state` carries the reasons for the
    /// *current* wakeup; `pending_state` (same bit shape) accumulates
    /// reasons that arrive while the task is `RUNNING`, to be promoted into
    /// `state` on the next wakeup.
    #[derive(Default)]
    pub struct TaskState: u16 {
        /// The task's handler is currently executing. While set, the task
        /// is in neither queue.
        const RUNNING       = 1 << 0;
        /// First wakeup after creation.
        const WOKEN_INIT    = 1 << 1;
        /// Woken by the wait-queue expiry sweep.
        const WOKEN_TIMER   = 1 << 2;
        /// Woken by readiness on a registered I/O source.
        const WOKEN_IO      = 1 << 3;
        /// Woken by a delivered signal.
        const WOKEN_SIGNAL  = 1 << 4;
        /// Woken by an inter-task message.
        const WOKEN_MSG     = 1 << 5;
        /// Woken because a resource it was waiting on became available.
        const WOKEN_RES     = 1 << 6;
        /// Catch-all wake reason for anything not covered above.
        const WOKEN_OTHER   = 1 << 7;
    }
}

impl TaskState {
    /// All WOKEN_* bits, i.e. every bit except `RUNNING`.
    pub const WOKEN_MASK: TaskState = TaskState::from_bits_truncate(!TaskState::RUNNING.bits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn woken_mask_excludes_running() {
        assert!(!TaskState::WOKEN_MASK.contains(TaskState::RUNNING));
        assert!(TaskState::WOKEN_MASK.contains(TaskState::WOKEN_TIMER));
    }
}
