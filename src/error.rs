//! Error types for the routing pipeline
//!
//! Classification and filtering never fail: their uncertain cases resolve to
//! conservative defaults. Only problems that would make the router execute
//! something other than what the build asked for surface here.

use std::io;
use thiserror::Error;

/// Exit code a shell reports for a command that cannot be found
pub const EXIT_NOT_FOUND: i32 = 127;

/// Exit code a shell reports for a command that exists but cannot run
pub const EXIT_NOT_EXECUTABLE: i32 = 126;

/// The selected compiler could not replace the router process
#[derive(Error, Debug)]
#[error("failed to launch {program}: {source}")]
pub struct LaunchError {
    /// Program the router tried to execute
    pub program: String,
    #[source]
    pub source: io::Error,
}

impl LaunchError {
    /// Exit code matching what the host build would see from a shell
    pub fn exit_code(&self) -> i32 {
        match self.source.kind() {
            io::ErrorKind::NotFound => EXIT_NOT_FOUND,
            io::ErrorKind::PermissionDenied => EXIT_NOT_EXECUTABLE,
            _ => 1,
        }
    }
}

/// Errors for invocations the router refuses to reproduce
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("empty argument vector")]
    EmptyArgv,

    #[error("argument {index} is not valid UTF-8: {lossy}")]
    NonUtf8Argument { index: usize, lossy: String },

    #[error("unknown engine name: {0} (expected v8, jsc, chakracore or unknown)")]
    UnknownEngineName(String),

    #[error(transparent)]
    Launch(#[from] LaunchError),
}

impl RouterError {
    /// Exit code for the router process when it cannot dispatch
    pub fn exit_code(&self) -> i32 {
        match self {
            RouterError::Launch(e) => e.exit_code(),
            _ => 1,
        }
    }
}

/// Result type for routing operations
pub type Result<T> = std::result::Result<T, RouterError>;
