//! Append-only invocation log
//!
//! Every router process of a build appends one line: the final argument
//! vector it executed, joined by spaces. Hundreds of routers may append at
//! once, so each line goes out in a single `write` on a descriptor opened
//! with `O_APPEND`, which keeps lines from interleaving.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One log line: the executed argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRecord {
    line: String,
}

impl InvocationRecord {
    pub fn new(argv: &[String]) -> Self {
        Self {
            line: argv.join(" "),
        }
    }

    /// The record without its line terminator
    pub fn line(&self) -> &str {
        &self.line
    }
}

/// Destination for invocation records
pub trait InvocationLog {
    /// Append one record; must not return before the line is written
    fn append(&mut self, record: &InvocationRecord) -> io::Result<()>;
}

/// Log file shared by all concurrent router processes
#[derive(Debug)]
pub struct AppendLog {
    path: PathBuf,
    file: File,
}

impl AppendLog {
    /// Open (creating if needed) the log file for appending
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl InvocationLog for AppendLog {
    fn append(&mut self, record: &InvocationRecord) -> io::Result<()> {
        let mut buf = String::with_capacity(record.line.len() + 1);
        buf.push_str(&record.line);
        buf.push('\n');
        // Unbuffered File: the whole line reaches the kernel in this call
        self.file.write_all(buf.as_bytes())?;
        self.file.flush()
    }
}

/// Discards records; used when logging is disabled or unavailable
#[derive(Debug, Default)]
pub struct NullLog;

impl InvocationLog for NullLog {
    fn append(&mut self, _record: &InvocationRecord) -> io::Result<()> {
        Ok(())
    }
}

/// Collects record lines in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
    pub lines: Vec<String>,
}

impl InvocationLog for MemoryLog {
    fn append(&mut self, record: &InvocationRecord) -> io::Result<()> {
        self.lines.push(record.line.clone());
        Ok(())
    }
}

impl<L: InvocationLog + ?Sized> InvocationLog for &mut L {
    fn append(&mut self, record: &InvocationRecord) -> io::Result<()> {
        (**self).append(record)
    }
}

impl<L: InvocationLog + ?Sized> InvocationLog for Box<L> {
    fn append(&mut self, record: &InvocationRecord) -> io::Result<()> {
        (**self).append(record)
    }
}
