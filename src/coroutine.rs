//! Coroutine APIs
//!
//! Everything a coroutine body needs: starting coroutines, the suspension
//! context, callback adapters, futures and joining them, sleeping and
//! yielding to the host loop.

pub use crate::callback::{callback, callback_with, Callback};
pub use crate::coroutine_impl::{Coroutine, State};
pub use crate::future::{future, future_with, Future};
pub use crate::join::join;
pub use crate::local::{current, is_coroutine};
pub use crate::procedure::{Co, Input, Procedure, Resumable, Step};
pub use crate::scheduler::{run, spawn, Builder};
pub use crate::sleep::sleep;
pub use crate::yield_now::defer;
