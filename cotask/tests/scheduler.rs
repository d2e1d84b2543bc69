//! End-to-end scheduler scenarios: FIFO fairness, nice bias, self re-wake,
//! run-queue wraparound, and timer delivery (including a timer rescheduled
//! before it fires).

use std::cell::RefCell;
use std::rc::Rc;

use cotask::{Scheduler, Tick};
use cotask::{TaskId, TaskOutcome, TaskState};

#[test]
fn fifo_fairness_with_equal_nice() {
    let mut sched = Scheduler::new();
    let log: Rc<RefCell<Vec<TaskId>>> = Rc::new(RefCell::new(Vec::new()));

    let mut ids = Vec::new();
    for _ in 0..5 {
        let log = log.clone();
        let id = sched
            .new_task(Box::new(()), move |ctx| {
                log.borrow_mut().push(ctx.id());
                TaskOutcome::Continue
            })
            .unwrap();
        ids.push(id);
    }

    for &id in &ids {
        sched.wakeup(id, TaskState::WOKEN_OTHER);
    }

    let invoked = sched.process_runnable_tasks();
    assert_eq!(invoked, 5);
    assert_eq!(*log.borrow(), ids);
}

#[test]
fn nice_bias_delays_relative_to_peers() {
    let mut sched = Scheduler::new();
    let log: Rc<RefCell<Vec<TaskId>>> = Rc::new(RefCell::new(Vec::new()));

    let mut plain_ids = Vec::new();
    for _ in 0..64 {
        let log = log.clone();
        let id = sched
            .new_task(Box::new(()), move |ctx| {
                log.borrow_mut().push(ctx.id());
                TaskOutcome::Continue
            })
            .unwrap();
        plain_ids.push(id);
    }
    let nice_log = log.clone();
    let nice_id = sched
        .new_task(Box::new(()), move |ctx| {
            nice_log.borrow_mut().push(ctx.id());
            TaskOutcome::Continue
        })
        .unwrap();
    sched.set_task_nice(nice_id, 1024);

    // Wake everything round-robin, niced task last.
    for &id in &plain_ids {
        sched.wakeup(id, TaskState::WOKEN_OTHER);
    }
    sched.wakeup(nice_id, TaskState::WOKEN_OTHER);

    while sched.tasks_run_queue() > 0 {
        sched.process_runnable_tasks();
    }

    let order = log.borrow();
    assert_eq!(order.len(), 65);
    let nice_pos = order.iter().position(|&id| id == nice_id).unwrap();
    for &plain in &plain_ids {
        let plain_pos = order.iter().position(|&id| id == plain).unwrap();
        assert!(
            nice_pos > plain_pos,
            "nice=+1024 task should run strictly after its nice=0 peer from the same round"
        );
    }
}

#[test]
fn self_rewake_does_not_repeat_within_a_batch() {
    let mut sched = Scheduler::new();
    let calls = Rc::new(RefCell::new(0u32));
    let calls_inner = calls.clone();
    let id = sched
        .new_task(Box::new(()), move |ctx| {
            let mut n = calls_inner.borrow_mut();
            *n += 1;
            if *n < 2 {
                ctx.wake_self(TaskState::WOKEN_OTHER);
            }
            TaskOutcome::Continue
        })
        .unwrap();

    sched.wakeup(id, TaskState::WOKEN_OTHER);
    let invoked = sched.process_runnable_tasks();
    assert_eq!(invoked, 1, "must not run twice within the same batch");
    assert_eq!(*calls.borrow(), 1);
    // The self-wake promoted it straight back onto the run queue.
    assert_eq!(sched.tasks_run_queue(), 1);

    let invoked = sched.process_runnable_tasks();
    assert_eq!(invoked, 1);
    assert_eq!(*calls.borrow(), 2);
    assert_eq!(sched.tasks_run_queue(), 0);
}

#[test]
fn wrap_around_preserves_insertion_order() {
    let mut sched = Scheduler::new();
    sched.seed_rqueue_ticks(u32::MAX - 1);

    let log: Rc<RefCell<Vec<TaskId>>> = Rc::new(RefCell::new(Vec::new()));
    let log_a = log.clone();
    let a = sched
        .new_task(Box::new(()), move |ctx| {
            log_a.borrow_mut().push(ctx.id());
            TaskOutcome::Continue
        })
        .unwrap();
    let log_b = log.clone();
    let b = sched
        .new_task(Box::new(()), move |ctx| {
            log_b.borrow_mut().push(ctx.id());
            TaskOutcome::Continue
        })
        .unwrap();

    sched.wakeup(a, TaskState::WOKEN_OTHER);
    sched.wakeup(b, TaskState::WOKEN_OTHER);

    let invoked = sched.process_runnable_tasks();
    assert_eq!(invoked, 2);
    assert_eq!(*log.borrow(), vec![a, b]);
}

#[test]
fn single_timer_fires_once_at_its_deadline() {
    use cotask::ManualClock;
    use cotask::SchedulerConfig;

    let mut sched = Scheduler::with_clock(ManualClock::new(0), SchedulerConfig::default());
    let fired = Rc::new(RefCell::new(0u32));
    let fired_inner = fired.clone();
    let id = sched
        .new_task(Box::new(()), move |_ctx| {
            *fired_inner.borrow_mut() += 1;
            TaskOutcome::Continue
        })
        .unwrap();
    sched.set_task_expire(id, Tick::new(100));
    sched.queue(id);

    let mut deadline = sched.wake_expired_tasks();
    while deadline != Tick::ETERNITY {
        sched.clock_mut().advance(1);
        sched.process_runnable_tasks();
        deadline = sched.wake_expired_tasks();
    }
    sched.process_runnable_tasks();

    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn rescheduled_timer_fires_at_new_deadline_not_old_one() {
    use cotask::ManualClock;
    use cotask::SchedulerConfig;

    let mut sched = Scheduler::with_clock(ManualClock::new(0), SchedulerConfig::default());
    let fired = Rc::new(RefCell::new(Vec::new()));
    let fired_inner = fired.clone();
    let id = sched
        .new_task(Box::new(()), move |ctx| {
            fired_inner.borrow_mut().push(ctx.expire());
            TaskOutcome::Continue
        })
        .unwrap();
    sched.set_task_expire(id, Tick::new(100));
    sched.queue(id);
    sched.set_task_expire(id, Tick::new(500));

    sched.clock_mut().advance(500);
    let deadline = sched.wake_expired_tasks();
    assert_eq!(deadline, Tick::ETERNITY);
    sched.process_runnable_tasks();

    assert_eq!(fired.borrow().len(), 1);
}
