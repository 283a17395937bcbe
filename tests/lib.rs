use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use corun::coroutine::{self, Builder, Callback, Input, Resumable, State, Step};
use corun::{Cause, Error, ErrorKind, EventLoop, Host};

type Errors = Rc<RefCell<Vec<Error>>>;

// a per-coroutine handler that collects the uncaught errors
fn collect() -> (Errors, impl Fn(Error) + 'static) {
    let errors = Errors::default();
    let e = errors.clone();
    (errors, move |err| e.borrow_mut().push(err))
}

#[test]
fn one_coroutine() {
    let ev = Rc::new(EventLoop::new());
    let ran = Rc::new(Cell::new(false));
    let r = ran.clone();
    let co = coroutine::spawn(ev.clone(), move |_| {
        r.set(true);
        Ok(())
    })
    .unwrap();
    // runs up to the first suspension point right away
    assert!(ran.get());
    assert_eq!(co.state(), State::Finished);
    assert!(co.is_done());
}

#[test]
fn callback_resumes_with_value() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let got = Rc::new(Cell::new(0));
    let g = got.clone();
    let co = coroutine::spawn(ev.clone(), move |co| {
        let cb = coroutine::callback()?;
        host.schedule_timer(Duration::ZERO, Box::new(move || cb.resolve(42)));
        let v = co.suspend()?;
        g.set(*v.get::<i32>(0).unwrap());
        Ok(())
    })
    .unwrap();
    assert_eq!(co.state(), State::Suspended);

    ev.run();
    assert_eq!(got.get(), 42);
    assert_eq!(co.state(), State::Finished);
}

#[test]
fn callback_resumes_only_once() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    coroutine::spawn(ev.clone(), move |co| {
        let cb = coroutine::callback()?;
        let dup = cb.clone();
        host.schedule_timer(
            Duration::ZERO,
            Box::new(move || {
                cb.resolve(1);
                dup.resolve(2);
            }),
        );
        let v = co.suspend()?;
        s.borrow_mut().push(v.into_first::<i32>().unwrap());

        let cb = coroutine::callback()?;
        host.schedule_timer(Duration::from_millis(10), Box::new(move || cb.resolve(3)));
        let v = co.suspend()?;
        s.borrow_mut().push(v.into_first::<i32>().unwrap());
        Ok(())
    })
    .unwrap();
    ev.run();
    assert_eq!(*seen.borrow(), [1, 3]);
}

#[test]
fn second_callback_is_rejected() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let checked = Rc::new(Cell::new(false));
    let c = checked.clone();
    coroutine::spawn(ev.clone(), move |_| {
        let _first = coroutine::callback()?;
        let err = coroutine::callback_with(Some(Duration::from_millis(10)), "second").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::CallbackAlreadyInProgress);
        // no timer was armed for the rejected adapter
        assert_eq!(host.pending_timers(), 0);
        c.set(true);
        Ok(())
    })
    .unwrap();
    assert!(checked.get());
}

#[test]
fn synchronous_completion() {
    let ev = Rc::new(EventLoop::new());
    let got = Rc::new(RefCell::new(String::new()));
    let g = got.clone();
    let co = coroutine::spawn(ev.clone(), move |co| {
        let cb = coroutine::callback()?;
        // completes before the body suspends
        cb.resolve(String::from("now"));
        let v = co.suspend()?;
        *g.borrow_mut() = v.into_first::<String>().unwrap();
        Ok(())
    })
    .unwrap();
    assert_eq!(co.state(), State::Finished);
    assert_eq!(*got.borrow(), "now");
}

#[test]
fn body_error_goes_to_handler() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    let co = Builder::new()
        .name("worker")
        .error_handler(handler)
        .spawn(ev.clone(), |_| Err(Error::new("boom")))
        .unwrap();
    assert_eq!(co.state(), State::Failed);

    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    let err = &errors[0];
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.coroutine(), Some("worker"));
    assert_eq!(err.cause(), Some(Cause::Exception));
    assert!(err.is_uncaught());
}

#[test]
fn rejected_callback_raises_in_body() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let (errors, handler) = collect();
    Builder::new()
        .name("reader")
        .error_handler(handler)
        .spawn(ev.clone(), move |co| {
            let cb = coroutine::callback()?;
            host.defer(Box::new(move || cb.reject(std::io::Error::other("disk gone"))));
            co.suspend()?;
            unreachable!("the error must propagate");
        })
        .unwrap();
    ev.run();

    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message(), "disk gone");
    assert_eq!(errors[0].coroutine(), Some("reader"));
}

#[test]
fn coroutine_timeout() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    let start = Instant::now();
    let co = Builder::new()
        .name("slow")
        .timeout(Duration::from_millis(50))
        .error_handler(handler)
        .spawn(ev.clone(), |co| {
            let _cb = coroutine::callback()?;
            // nobody ever completes the callback
            co.suspend()?;
            Ok(())
        })
        .unwrap();
    ev.run();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert_eq!(co.state(), State::Failed);
    let errors = errors.borrow();
    assert_eq!(errors.len(), 1);
    let err = &errors[0];
    assert_eq!(err.cause(), Some(Cause::TimedOut));
    assert_eq!(err.name(), Some("slow"));
    assert_eq!(err.message(), "coroutine slow did not finish within 50 ms");
}

#[test]
fn timeout_is_recoverable() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    let recovered = Rc::new(Cell::new(false));
    let r = recovered.clone();
    let co = Builder::new()
        .timeout(Duration::from_millis(10))
        .error_handler(handler)
        .spawn(ev.clone(), move |co| {
            let _cb = coroutine::callback()?;
            match co.suspend() {
                Err(e) if e.is_timed_out() => r.set(true),
                other => panic!("unexpected resume {:?}", other),
            }
            Ok(())
        })
        .unwrap();
    ev.run();

    assert!(recovered.get());
    assert!(errors.borrow().is_empty());
    assert_eq!(co.state(), State::Finished);
}

#[test]
fn finished_coroutine_cancels_its_timeout() {
    let ev = Rc::new(EventLoop::new());
    Builder::new()
        .timeout(Duration::from_secs(60))
        .spawn(ev.clone(), |co| co.yield_now())
        .unwrap();
    assert_eq!(ev.pending_timers(), 1);
    let start = Instant::now();
    ev.run();
    assert_eq!(ev.pending_timers(), 0);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn callback_timeout_drops_late_completion() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let woke_at = Rc::new(Cell::new(None));
    let w = woke_at.clone();
    let start = Instant::now();
    coroutine::spawn(ev.clone(), move |co| {
        let cb = coroutine::callback_with(Some(Duration::from_millis(10)), "read")?;
        let late = cb.clone();
        host.schedule_timer(Duration::from_millis(30), Box::new(move || late.resolve(1)));

        let err = co.suspend().unwrap_err();
        assert_eq!(err.cause(), Some(Cause::TimedOut));
        assert_eq!(err.name(), Some("read"));
        assert_eq!(err.coroutine(), Some(""));
        assert!(cb.is_fired());

        // the late completion at 30ms must not cut this short
        co.sleep(Duration::from_millis(50))?;
        w.set(Some(start.elapsed()));
        Ok(())
    })
    .unwrap();
    ev.run();
    assert!(woke_at.get().unwrap() >= Duration::from_millis(60));
}

#[test]
fn completion_after_finish_is_ignored() {
    let ev = Rc::new(EventLoop::new());
    let stash: Rc<RefCell<Option<Callback>>> = Rc::default();
    let s = stash.clone();
    let (errors, handler) = collect();
    let co = Builder::new()
        .error_handler(handler)
        .spawn(ev.clone(), move |_| {
            *s.borrow_mut() = Some(coroutine::callback()?);
            Ok(())
        })
        .unwrap();
    assert_eq!(co.state(), State::Finished);

    let cb = stash.borrow_mut().take().unwrap();
    cb.reject("too late");
    ev.run();
    assert_eq!(co.state(), State::Finished);
    assert!(errors.borrow().is_empty());
}

#[test]
fn sleep_and_yield() {
    let ev = Rc::new(EventLoop::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["a", "b"] {
        let l = log.clone();
        coroutine::spawn(ev.clone(), move |co| {
            for i in 0..2 {
                l.borrow_mut().push(format!("{}{}", name, i));
                co.yield_now()?;
            }
            Ok(())
        })
        .unwrap();
    }
    ev.run();
    assert_eq!(*log.borrow(), ["a0", "b0", "a1", "b1"]);

    let start = Instant::now();
    let slept = Rc::new(Cell::new(None));
    let s = slept.clone();
    coroutine::spawn(ev.clone(), move |co| {
        co.sleep(Duration::from_millis(20))?;
        s.set(Some(start.elapsed()));
        Ok(())
    })
    .unwrap();
    ev.run();
    assert!(slept.get().unwrap() >= Duration::from_millis(20));
}

#[test]
fn breadcrumbs_span_suspensions() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    Builder::new()
        .name("crumbs")
        .enable_breadcrumbs(true)
        .error_handler(handler)
        .spawn(ev.clone(), |co| {
            let cb = coroutine::callback_with(None, "first")?;
            cb.resolve(());
            co.suspend()?;
            let _cb = coroutine::callback_with(Some(Duration::from_millis(5)), "second")?;
            co.suspend()?;
            Ok(())
        })
        .unwrap();
    ev.run();

    let errors = errors.borrow();
    let trace = errors[0].trace().expect("trace must be attached");
    let labels: Vec<_> = trace.breadcrumbs().iter().map(|b| b.label()).collect();
    assert_eq!(labels, ["callback second", "callback first", "coroutine crumbs start"]);
    assert!(trace.breadcrumbs().iter().all(|b| b.location().file().ends_with("lib.rs")));

    let report = format!("{:#}", errors[0]);
    assert!(report.starts_with("coroutine \"crumbs\" failed: callback second did not finish"));
    assert!(report.contains("at callback first"));
}

#[test]
fn breadcrumbs_disabled() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    Builder::new()
        .enable_breadcrumbs(false)
        .error_handler(handler)
        .spawn(ev.clone(), |_| {
            coroutine::future()?;
            Err("plain".into())
        })
        .unwrap();
    assert!(errors.borrow()[0].trace().is_none());
}

#[test]
fn panic_is_reported_not_raised() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    let co = Builder::new()
        .name("bad")
        .error_handler(handler)
        .spawn(ev.clone(), |co| {
            co.yield_now()?;
            panic!("bad body");
        })
        .unwrap();
    ev.run();

    assert_eq!(co.state(), State::Failed);
    let errors = errors.borrow();
    assert_eq!(errors[0].kind(), &ErrorKind::Panicked("bad body".into()));
    assert_eq!(errors[0].coroutine(), Some("bad"));
}

// a hand written state machine, yielding to the host loop three times
struct Ticker {
    ticks: Rc<Cell<u32>>,
}

impl Resumable for Ticker {
    fn resume(&mut self, input: Input) -> Result<Step, Error> {
        input?;
        if self.ticks.get() == 3 {
            return Ok(Step::Finished);
        }
        self.ticks.set(self.ticks.get() + 1);
        coroutine::defer()?;
        Ok(Step::Suspended)
    }

    fn is_done(&self) -> bool {
        self.ticks.get() == 3
    }
}

#[test]
fn custom_resumable() {
    let ev = Rc::new(EventLoop::new());
    let ticks = Rc::new(Cell::new(0));
    let co = coroutine::run(ev.clone(), Ticker { ticks: ticks.clone() }).unwrap();
    assert_eq!(ticks.get(), 1);
    ev.run();
    assert_eq!(ticks.get(), 3);
    assert_eq!(co.state(), State::Finished);

    // a finished procedure can't be started again
    let err = coroutine::run(ev.clone(), Ticker { ticks }).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidArgument(_)));
}

#[test]
fn handler_can_restart_the_coroutine() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let retried = Rc::new(Cell::new(false));
    let r = retried.clone();
    Builder::new()
        .name("flaky")
        .error_handler(move |err| {
            assert_eq!(err.coroutine(), Some("flaky"));
            // no coroutine is active any more
            let r = r.clone();
            coroutine::spawn(host.clone(), move |co| {
                co.yield_now()?;
                r.set(true);
                Ok(())
            })
            .unwrap();
        })
        .spawn(ev.clone(), |co| {
            co.yield_now()?;
            Err("first attempt failed".into())
        })
        .unwrap();
    ev.run();
    assert!(retried.get());
}

// panics on the given step, counting from one
struct Faulty {
    steps: u32,
    panic_at: u32,
}

impl Resumable for Faulty {
    fn resume(&mut self, input: Input) -> Result<Step, Error> {
        input?;
        self.steps += 1;
        if self.steps == self.panic_at {
            panic!("faulty step {}", self.steps);
        }
        coroutine::defer()?;
        Ok(Step::Suspended)
    }

    fn is_done(&self) -> bool {
        false
    }
}

#[test]
fn panicking_resumable_fails_the_coroutine() {
    let ev = Rc::new(EventLoop::new());
    let (errors, handler) = collect();
    let co = Builder::new()
        .name("faulty")
        .error_handler(handler)
        .run(ev.clone(), Faulty { steps: 0, panic_at: 1 })
        .unwrap();
    assert_eq!(co.state(), State::Failed);
    assert!(!coroutine::is_coroutine());

    let co = Builder::new()
        .name("faulty-later")
        .error_handler({
            let errors = errors.clone();
            move |err| errors.borrow_mut().push(err)
        })
        .run(ev.clone(), Faulty { steps: 0, panic_at: 2 })
        .unwrap();
    assert_eq!(co.state(), State::Suspended);
    // the panic is raised from inside the host loop
    ev.run();
    assert_eq!(co.state(), State::Failed);
    assert!(!coroutine::is_coroutine());

    let errors = errors.borrow();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0].kind(), &ErrorKind::Panicked("faulty step 1".into()));
    assert_eq!(errors[0].coroutine(), Some("faulty"));
    assert_eq!(errors[1].kind(), &ErrorKind::Panicked("faulty step 2".into()));
    assert_eq!(errors[1].coroutine(), Some("faulty-later"));
    assert!(errors[1].is_uncaught());
}

#[test]
fn resolved_callback_cancels_its_timeout() {
    let ev = Rc::new(EventLoop::new());
    let host = ev.clone();
    let armed = Rc::new(Cell::new(0));
    let a = armed.clone();
    let start = Instant::now();
    let co = coroutine::spawn(ev.clone(), move |co| {
        let cb = coroutine::callback_with(Some(Duration::from_secs(60)), "x")?;
        a.set(host.pending_timers());
        host.defer(Box::new(move || cb.resolve(())));
        co.suspend()?;
        Ok(())
    })
    .unwrap();
    ev.run();

    assert_eq!(armed.get(), 1);
    assert_eq!(co.state(), State::Finished);
    assert_eq!(ev.pending_timers(), 0);
    assert!(start.elapsed() < Duration::from_secs(10));
}
