use crate::error::Error;
use crate::future::Future;
use crate::procedure::Co;

/// wait until all `futures` are done, return how many failed
///
/// futures are visited in the given order. Any resumption of the coroutine
/// re-checks the future being waited on, so a future that completed early
/// is simply counted when its turn comes. An error raised into the
/// coroutine while waiting aborts the join.
pub fn join<'f, I>(co: &mut Co<'_>, futures: I) -> Result<usize, Error>
where
    I: IntoIterator<Item = &'f Future>,
{
    let mut errors = 0;
    for f in futures {
        f.set_joined();
        while !f.is_done() {
            co.suspend()?;
        }
        if f.error().is_some() {
            errors += 1;
        }
    }
    Ok(errors)
}
