//! File logger.
//!
//! The terminal belongs to the viewer while it runs, so log lines go to a file.
//! Until [`init`] is called every logging function is a no-op.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn label(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

struct Sink {
    file: File,
    min_level: Level,
}

lazy_static! {
    static ref SINK: Mutex<Option<Sink>> = Mutex::new(None);
}

/// Starts logging to `path` (appending), dropping anything below `min_level`.
pub fn init(path: &Path, min_level: Level) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let mut sink = SINK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *sink = Some(Sink { file, min_level });
    Ok(())
}

pub fn log(level: Level, message: &str) {
    let mut guard = SINK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(sink) = guard.as_mut() {
        if level >= sink.min_level {
            let _ = writeln!(sink.file, "{}", format_line(level, message));
        }
    }
}

fn format_line(level: Level, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{}] {}", timestamp, level.label(), message)
}

pub fn debug(message: &str) {
    log(Level::Debug, message);
}

pub fn info(message: &str) {
    log(Level::Info, message);
}

pub fn warn(message: &str) {
    log(Level::Warn, message);
}

pub fn error(message: &str) {
    log(Level::Error, message);
}
