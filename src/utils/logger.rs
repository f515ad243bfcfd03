//! Logger utility for application-wide logging
//!
//! A file-backed logger that plugs into the standard log crate, echoing
//! records to the console so long exports remain observable.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// File-backed logger
pub struct Logger {
    file: Mutex<File>,
}

impl Logger {
    /// Create a logger writing to the given file
    pub fn new(log_file: &str) -> io::Result<Self> {
        let file = File::create(Path::new(log_file))?;
        Ok(Logger { file: Mutex::new(file) })
    }

    /// Write one line to the log file
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", message)?;
        file.flush()
    }

    /// Install a logger instance as the process-wide log backend
    ///
    /// Called once at startup; a second call just leaves the existing
    /// backend in place.
    pub fn init_global_logger(log_file: &str) -> io::Result<()> {
        let global_logger = Logger::new(log_file)?;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: global logger was already initialized");
        }
        log::set_max_level(LevelFilter::Debug);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = format!("[{}] {}", record.level(), record.args());
            let _ = self.log(&message);

            // Keep the console informed without drowning it in debug noise
            if record.level() <= Level::Info {
                println!("{}", message);
            }
        }
    }

    fn flush(&self) {
        let mut file = self.file.lock().unwrap();
        let _ = file.flush();
    }
}
