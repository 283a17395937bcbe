//! A single-threaded reference host
//!
//! `EventLoop` keeps a FIFO of deferred tasks and a deadline ordered list of
//! timers. Each pass first runs the tasks that were deferred before the pass
//! started, then every timer that has expired. [`EventLoop::run`] keeps
//! going, sleeping the thread until the next deadline, until nothing is left.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use crate::host::{Host, Task, TimerHandle};
use crate::timeout_list::{self, TimeoutHandle, TimeoutList};

#[derive(Default)]
struct Inner {
    ready: VecDeque<Task>,
    timers: TimeoutList<Task>,
}

/// Single-threaded timer and next-tick loop
#[derive(Default)]
pub struct EventLoop {
    inner: RefCell<Inner>,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop::default()
    }

    /// number of live timers
    pub fn pending_timers(&self) -> usize {
        self.inner.borrow().timers.len()
    }

    /// true when there is neither a deferred task nor a live timer
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.borrow();
        inner.ready.is_empty() && inner.timers.is_empty()
    }

    /// run one pass of the loop without blocking
    ///
    /// return true if there is still work left
    pub fn turn(&self) -> bool {
        // tasks deferred while running this batch go to the next pass
        let batch = std::mem::take(&mut self.inner.borrow_mut().ready);
        for task in batch {
            task();
        }

        let now = timeout_list::now();
        loop {
            // release the borrow before running the task, it may add timers
            let task = self.inner.borrow_mut().timers.pop_expired(now);
            match task {
                Some(task) => task(),
                None => break,
            }
        }

        !self.is_idle()
    }

    // how long the loop may sleep before the next pass
    fn next_wait(&self) -> Option<Duration> {
        let mut inner = self.inner.borrow_mut();
        if !inner.ready.is_empty() {
            return Some(Duration::ZERO);
        }
        inner.timers.next_expire(timeout_list::now())
    }

    /// run until there is no deferred task and no live timer left
    pub fn run(&self) {
        while self.turn() {
            match self.next_wait() {
                Some(dur) if !dur.is_zero() => {
                    trace!("event loop sleep {:?}", dur);
                    thread::sleep(dur);
                }
                Some(_) => {}
                None => break,
            }
        }
    }

    /// run passes until `dur` elapsed or there is no work left
    pub fn run_for(&self, dur: Duration) {
        let deadline = timeout_list::now() + dur;
        while self.turn() {
            let now = timeout_list::now();
            if now >= deadline {
                return;
            }
            if let Some(wait) = self.next_wait() {
                thread::sleep(wait.min(deadline - now));
            }
        }
    }
}

impl Host for EventLoop {
    fn schedule_timer(&self, delay: Duration, task: Task) -> TimerHandle {
        let h = self.inner.borrow_mut().timers.add_timer(delay, task);
        trace!("schedule timer {} after {:?}", h.id(), delay);
        TimerHandle(h.id())
    }

    fn cancel_timer(&self, handle: TimerHandle) {
        let task = self
            .inner
            .borrow_mut()
            .timers
            .del_timer(TimeoutHandle::from_id(handle.0));
        // drop the task outside of the borrow, it may own coroutine state
        if task.is_some() {
            trace!("cancel timer {}", handle.0);
        }
        drop(task);
    }

    fn defer(&self, task: Task) {
        self.inner.borrow_mut().ready.push_back(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn deferred_before_timers() {
        let ev = EventLoop::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        ev.schedule_timer(Duration::ZERO, Box::new(move || l.borrow_mut().push("timer")));
        let l = log.clone();
        ev.defer(Box::new(move || l.borrow_mut().push("defer")));

        ev.run();
        assert_eq!(*log.borrow(), ["defer", "timer"]);
        assert!(ev.is_idle());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let ev = EventLoop::new();
        let fired = Rc::new(RefCell::new(false));
        let f = fired.clone();
        let h = ev.schedule_timer(
            Duration::from_millis(5),
            Box::new(move || *f.borrow_mut() = true),
        );
        assert_eq!(ev.pending_timers(), 1);
        ev.cancel_timer(h);
        // cancel twice is a no-op
        ev.cancel_timer(h);
        assert_eq!(ev.pending_timers(), 0);
        ev.run();
        assert!(!*fired.borrow());
    }

    #[test]
    fn timer_waits_for_deadline() {
        let ev = Rc::new(EventLoop::new());
        let start = timeout_list::now();
        let elapsed = Rc::new(RefCell::new(None));
        let e = elapsed.clone();
        ev.schedule_timer(
            Duration::from_millis(20),
            Box::new(move || *e.borrow_mut() = Some(start.elapsed())),
        );
        ev.run();
        assert!(elapsed.borrow().unwrap() >= Duration::from_millis(20));
    }

    #[test]
    fn task_can_schedule_more_work() {
        let ev = Rc::new(EventLoop::new());
        let count = Rc::new(RefCell::new(0));
        let (ev2, c) = (ev.clone(), count.clone());
        ev.defer(Box::new(move || {
            *c.borrow_mut() += 1;
            let c = c.clone();
            ev2.schedule_timer(Duration::from_millis(1), Box::new(move || *c.borrow_mut() += 1));
        }));
        ev.run();
        assert_eq!(*count.borrow(), 2);
    }
}
