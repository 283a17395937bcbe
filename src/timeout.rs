use std::time::Duration;

use crate::error::{Error, TimeoutKind};
use crate::host::{Host, TimerHandle};

/// arm a single-shot timer that delivers a `TimedOut` error to `target`
///
/// the error is built up front, `target` receives it after `delay` unless
/// the returned timer is cancelled first
pub(crate) fn schedule<F>(
    host: &dyn Host,
    kind: TimeoutKind,
    name: &str,
    delay: Duration,
    target: F,
) -> TimerHandle
where
    F: FnOnce(Error) + 'static,
{
    let err = Error::timed_out(kind, name, delay);
    host.schedule_timer(
        delay,
        Box::new(move || {
            debug!("{}", err);
            target(err)
        }),
    )
}

/// a timeout is armed only for a positive duration
#[inline]
pub(crate) fn effective(timeout: Option<Duration>) -> Option<Duration> {
    timeout.filter(|d| !d.is_zero())
}
