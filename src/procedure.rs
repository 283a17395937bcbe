//! Resumable procedures
//!
//! A coroutine is driven one step at a time through [`Resumable::resume`].
//! The input of a step is either the values of the completion that woke it
//! up, or an error to raise at the suspension point. [`Procedure`] is the
//! usual implementation: a body closure running on its own generator stack,
//! which can suspend from any call depth through [`Co::suspend`].

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use generator::{Gn, LocalGenerator};

use crate::config::config;
use crate::error::Error;
use crate::future::Future;
use crate::values::Values;

/// What a coroutine is resumed with
pub type Input = Result<Values, Error>;

/// The outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// stopped at a suspension point, waiting for the next input
    Suspended,
    /// ran to the end
    Finished,
}

/// A computation that can be started and then repeatedly resumed
///
/// The first call of `resume` starts it. An `Err` return means the
/// computation failed and nothing inside handled the failure.
pub trait Resumable {
    fn resume(&mut self, input: Input) -> Result<Step, Error>;

    /// true once the computation can't be resumed any more
    fn is_done(&self) -> bool;
}

// what the generator hands back to the scheduler
enum Yielded {
    Suspend,
    Return(Result<(), Error>),
}

/// The body-side view of a running coroutine
///
/// It is only handed to the coroutine body, which is the only code that
/// can suspend the coroutine.
pub struct Co<'a> {
    suspend: &'a mut dyn FnMut() -> Input,
}

impl<'a> Co<'a> {
    /// suspend the coroutine until something resumes it
    ///
    /// return the values of the completion, or the error raised into the
    /// coroutine at this point
    pub fn suspend(&mut self) -> Input {
        (self.suspend)()
    }

    /// suspend the coroutine for `dur`
    pub fn sleep(&mut self, dur: Duration) -> Result<(), Error> {
        crate::sleep::sleep(dur)?;
        self.suspend().map(drop)
    }

    /// give the other work of the host loop a turn
    pub fn yield_now(&mut self) -> Result<(), Error> {
        crate::yield_now::defer()?;
        self.suspend().map(drop)
    }

    /// wait until every future is done, return how many failed
    pub fn join<'f, I>(&mut self, futures: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = &'f Future>,
    {
        crate::join::join(self, futures)
    }
}

/// A resumable procedure running a body closure on a generator stack
pub struct Procedure {
    gen: LocalGenerator<'static, Input, Yielded>,
}

impl Procedure {
    pub fn new<F>(body: F) -> Self
    where
        F: for<'a, 'b> FnOnce(&'a mut Co<'b>) -> Result<(), Error> + 'static,
    {
        let stack_size = config().get_stack_size();
        let gen = Gn::<Input>::new_scoped_opt_local(stack_size, move |mut scope| {
            // the first input only starts the body, there is nothing to read
            let mut suspend = || {
                scope.yield_with(Yielded::Suspend);
                scope.get_yield().unwrap_or_else(|| Ok(Values::new()))
            };
            let mut co = Co {
                suspend: &mut suspend,
            };
            match panic::catch_unwind(AssertUnwindSafe(|| body(&mut co))) {
                Ok(ret) => Yielded::Return(ret),
                // dropping an unfinished generator unwinds its stack, let it pass
                Err(p) if p.is::<generator::Error>() => panic::resume_unwind(p),
                Err(p) => Yielded::Return(Err(Error::panicked(p.as_ref()))),
            }
        });
        Procedure { gen }
    }
}

impl Resumable for Procedure {
    fn resume(&mut self, input: Input) -> Result<Step, Error> {
        let gen = &mut self.gen;
        match panic::catch_unwind(AssertUnwindSafe(|| gen.raw_send(Some(input)))) {
            Ok(Some(Yielded::Suspend)) => Ok(Step::Suspended),
            Ok(Some(Yielded::Return(Ok(())))) | Ok(None) => Ok(Step::Finished),
            Ok(Some(Yielded::Return(Err(e)))) => Err(e),
            Err(panic) => Err(Error::panicked(panic.as_ref())),
        }
    }

    fn is_done(&self) -> bool {
        self.gen.is_done()
    }
}
