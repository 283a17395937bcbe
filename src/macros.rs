/// macro used to spawn a coroutine
///
/// this macro is just a convenient wrapper for [`spawn`], it also pins down
/// the closure signature so the body can be written without annotations
///
/// [`spawn`]: coroutine/fn.spawn.html
#[macro_export]
macro_rules! go {
    // for free spawn
    ($host:expr, $func:expr) => {{
        fn _go_check<F>(f: F) -> F
        where
            F: for<'a, 'b> FnOnce(&'a mut $crate::coroutine::Co<'b>) -> $crate::Result<()> + 'static,
        {
            f
        }
        let f = _go_check($func);
        $crate::coroutine::spawn($host, f)
    }};

    // for builder spawn
    ($builder:expr, $host:expr, $func:expr) => {{
        fn _go_check<F>(f: F) -> F
        where
            F: for<'a, 'b> FnOnce(&'a mut $crate::coroutine::Co<'b>) -> $crate::Result<()> + 'static,
        {
            f
        }
        let f = _go_check($func);
        $builder.spawn($host, f)
    }};
}

/// build a [`Values`] list from a list of expressions
///
/// [`Values`]: struct.Values.html
#[macro_export]
macro_rules! values {
    () => {
        $crate::Values::new()
    };
    ($($v:expr),+ $(,)?) => {{
        let mut values = $crate::Values::new();
        $(values.push($v);)+
        values
    }};
}
