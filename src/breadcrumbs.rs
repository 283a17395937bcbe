//! Cross-suspension diagnostic traces
//!
//! A coroutine body runs in many short slices, so a native backtrace taken
//! when an error finally surfaces only shows the last slice. Instead each
//! coroutine keeps a [`Trail`] of breadcrumbs: one when it starts and one at
//! every place it asks for a callback or a future. Each breadcrumb records
//! the caller location, so no scheduler frames ever end up in the trace.
//! When an error reaches the coroutine the trail is rendered newest-first
//! into a [`Trace`] and attached to the error.

use std::fmt;
use std::panic::Location;
use std::time::{Duration, Instant};

/// One diagnostic snapshot
#[derive(Debug, Clone)]
pub struct Breadcrumb {
    label: String,
    location: &'static Location<'static>,
    // offset from the coroutine start
    at: Duration,
}

impl Breadcrumb {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn elapsed(&self) -> Duration {
        self.at
    }
}

impl fmt::Display for Breadcrumb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "at {} ({}:{}:{}, +{}ms)",
            self.label,
            self.location.file(),
            self.location.line(),
            self.location.column(),
            self.at.as_millis()
        )
    }
}

/// The ordered breadcrumb log of one coroutine
#[derive(Debug)]
pub(crate) struct Trail {
    started: Instant,
    crumbs: Vec<Breadcrumb>,
}

impl Trail {
    pub fn new() -> Self {
        Trail {
            started: Instant::now(),
            crumbs: Vec::new(),
        }
    }

    pub fn push(&mut self, label: String, location: &'static Location<'static>) {
        self.crumbs.push(Breadcrumb {
            label,
            location,
            at: self.started.elapsed(),
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.crumbs.len()
    }

    /// combine the trail into one trace, newest breadcrumb first
    pub fn snapshot(&self) -> Trace {
        Trace {
            crumbs: self.crumbs.iter().rev().cloned().collect(),
        }
    }
}

/// A rendered trail, attached to errors
#[derive(Debug, Clone, Default)]
pub struct Trace {
    crumbs: Vec<Breadcrumb>,
}

impl Trace {
    /// breadcrumbs, newest first
    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.crumbs
    }

    pub fn is_empty(&self) -> bool {
        self.crumbs.is_empty()
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, crumb) in self.crumbs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    {}", crumb)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn here() -> &'static Location<'static> {
        Location::caller()
    }

    #[test]
    fn snapshot_is_newest_first() {
        let mut trail = Trail::new();
        trail.push("coroutine start".into(), here());
        trail.push("callback read".into(), here());
        assert_eq!(trail.len(), 2);

        let trace = trail.snapshot();
        let labels: Vec<_> = trace.breadcrumbs().iter().map(|b| b.label()).collect();
        assert_eq!(labels, ["callback read", "coroutine start"]);

        let rendered = trace.to_string();
        assert!(rendered.starts_with("    at callback read (src/breadcrumbs.rs:"));
        assert_eq!(rendered.lines().count(), 2);
    }
}
