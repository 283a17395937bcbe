//! # Cooperative Coroutine Scheduler
//!
//! Corun lets callback style asynchronous code be written as straight-line
//! coroutine bodies, inside a host that runs exactly one thing at a time.
//! The host supplies timers and a "run soon" primitive; corun supplies
//! suspension and resumption, timeouts, fan-out/fan-in joining and
//! diagnostic traces that span suspension points.
//!
//! ## Features
//!
//! * Stackful coroutine bodies based on the `generator` crate
//! * Node style callback adapters, at most one outstanding per coroutine
//! * Futures for fan-out work, joined in listing order
//! * Whole-coroutine, callback and future timeouts
//! * Errors raised at the suspension point, recoverable inside the body
//! * Uncaught failures routed to a configurable handler, never a crash
//! * Breadcrumb traces stitched across suspensions
//! * A single-threaded reference event loop, or bring your own host
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use std::time::Duration;
//! use corun::{coroutine, EventLoop, Host};
//!
//! let ev = Rc::new(EventLoop::new());
//! let host = ev.clone();
//! corun::go!(ev.clone(), move |co| {
//!     let cb = coroutine::callback()?;
//!     host.schedule_timer(Duration::ZERO, Box::new(move || cb.resolve(42)));
//!     let v = co.suspend()?;
//!     assert_eq!(v.get::<i32>(0), Some(&42));
//!     Ok(())
//! })
//! .unwrap();
//! ev.run();
//! ```

// #![deny(missing_docs)]

#[macro_use]
#[doc(hidden)]
extern crate log;
#[doc(hidden)]
extern crate generator;
#[doc(hidden)]
extern crate smallvec;

mod breadcrumbs;
mod callback;
mod config;
mod error;
mod event_loop;
mod future;
mod host;
mod join;
mod local;
mod procedure;
mod sleep;
#[macro_use]
mod macros;
mod coroutine_impl;
mod scheduler;
mod timeout;
mod timeout_list;
mod values;
mod yield_now;

pub mod coroutine;
pub use breadcrumbs::{Breadcrumb, Trace};
pub use config::{config, enable_breadcrumbs, set_error_handler, Config, ErrorHandler};
pub use error::{Cause, Error, ErrorKind, Result, TimeoutKind};
pub use event_loop::EventLoop;
pub use host::{Host, HostRef, Task, TimerHandle};
pub use values::Values;
// re-export coroutine interface
pub use coroutine::{callback, defer, future, join, run, sleep, spawn, Co, Coroutine, Future};
