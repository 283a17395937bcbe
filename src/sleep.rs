use std::time::Duration;

use crate::error::Error;
use crate::local;
use crate::values::Values;

/// resume the running coroutine after `dur`
///
/// this only arms the timer, the body suspends itself afterwards,
/// [`Co::sleep`] does both
///
/// [`Co::sleep`]: ../procedure/struct.Co.html#method.sleep
pub fn sleep(dur: Duration) -> Result<(), Error> {
    let handle = local::current_handle("sleep")?;
    let co = handle.clone();
    handle
        .host()
        .schedule_timer(dur, Box::new(move || co.advance(Ok(Values::new()))));
    Ok(())
}
