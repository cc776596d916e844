use {
    crate::logln,
    std::{
        panic::{catch_unwind, UnwindSafe},
        process::exit,
    },
};

/// Runs one fallible setup step; a panic or error aborts the whole game
/// process after logging, because a half-installed payload leaves the image
/// in an unknown state.
pub fn try_or_die(f: impl Fn() -> Result<(), eyre::Error> + UnwindSafe) {
    std::panic::set_hook(Box::new(|panic_info| {
        let payload: Option<&str> = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            Some(s)
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            Some(s)
        } else {
            None
        };

        if let Some(payload) = payload {
            logln!("panic: {payload}");
        }
        if let Some(address) = rct2_interop::diagnostics::current_foreign_call() {
            logln!("panic while executing original code at {address:#010x}");
        }

        let backtrace = std::backtrace::Backtrace::capture();
        logln!("panic at:\n{backtrace}");
    }));

    match catch_unwind(f) {
        Err(_panic) => {
            logln!("Exiting due to panic.");
            exit(1);
        },
        Ok(Err(error)) => {
            logln!("error: {error:?}");
            logln!("Exiting due to error.");
            exit(1);
        },
        Ok(Ok(())) => {},
    }
}
