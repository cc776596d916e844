use std::{
    fs::{File, OpenOptions},
    sync::{LazyLock, Mutex},
};

pub static LOG_FILE: LazyLock<Mutex<File>> = LazyLock::new(|| {
    let date = chrono::Utc::now();
    let date = date.format("%Y-%m-%d-%H");

    // The game process has no console, so everything goes to a file next to
    // its working directory.
    let log_dir = std::env::var("RCT2HOOK_LOG_DIR").unwrap_or_else(|_| "rct2hook-logs".into());
    std::fs::create_dir_all(&log_dir).expect("Unable to create log directory");

    Mutex::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(format!("{log_dir}\\{date}.log"))
            .expect("Unable to open log file"),
    )
});

/// Prints a message to the log file.
#[macro_export]
macro_rules! logln {
    ($($arg:tt)*) => {
        {
            use std::io::Write;

            let date = chrono::Utc::now();
            let date = date.format("%H:%M:%S%.3f");

            let message = format!($($arg)*);

            for line in message.lines() {
                writeln!(crate::logging::LOG_FILE.lock().unwrap(), "{date} {line}").unwrap();
            }
        }
    };
}

pub use crate::logln;
