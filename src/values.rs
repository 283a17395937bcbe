use std::any::Any;
use std::fmt;

use smallvec::SmallVec;

/// The values a completion hands back to the coroutine it resumes
///
/// This is the `(err, ...values)` tail of a node style callback: an ordered
/// list of arbitrary values. Use the typed accessors to get them back.
#[derive(Default)]
pub struct Values {
    items: SmallVec<[Box<dyn Any>; 2]>,
}

impl Values {
    pub fn new() -> Self {
        Values {
            items: SmallVec::new(),
        }
    }

    /// a list holding exactly one value
    pub fn one<T: Any>(v: T) -> Self {
        let mut values = Values::new();
        values.push(v);
        values
    }

    pub fn push<T: Any>(&mut self, v: T) {
        self.items.push(Box::new(v));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// borrow the value at `idx` if it has type `T`
    pub fn get<T: Any>(&self, idx: usize) -> Option<&T> {
        self.items.get(idx).and_then(|v| v.downcast_ref())
    }

    /// move the value at `idx` out if it has type `T`
    ///
    /// the slot is left holding `()` so later indexes don't shift
    pub fn take<T: Any>(&mut self, idx: usize) -> Option<T> {
        let slot = self.items.get_mut(idx)?;
        if !slot.is::<T>() {
            return None;
        }
        let v = std::mem::replace(slot, Box::new(()));
        v.downcast().ok().map(|v| *v)
    }

    /// consume the list and return the first value if it has type `T`
    pub fn into_first<T: Any>(self) -> Option<T> {
        self.items
            .into_iter()
            .next()
            .and_then(|v| v.downcast().ok())
            .map(|v| *v)
    }
}

impl fmt::Debug for Values {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Values(len={})", self.items.len())
    }
}
