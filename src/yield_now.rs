use crate::error::Error;
use crate::local;
use crate::values::Values;

/// resume the running coroutine on the next tick of the host loop
///
/// a pure cooperative yield, the body suspends itself afterwards,
/// [`Co::yield_now`] does both
///
/// [`Co::yield_now`]: ../procedure/struct.Co.html#method.yield_now
pub fn defer() -> Result<(), Error> {
    let handle = local::current_handle("defer")?;
    let co = handle.clone();
    handle
        .host()
        .defer(Box::new(move || co.advance(Ok(Values::new()))));
    Ok(())
}
