//! CLI argument parsing for ccroute
//!
//! Only used when the binary runs under its own name. Invoked as `clang` or
//! `clang++`, every argument belongs to the compiler and nothing is parsed.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for `explain` and `config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (TOML for `config`)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "ccroute")]
#[command(version)]
#[command(
    about = "Compiler-invocation router for instrumented JavaScript engine builds",
    long_about = "Install as clang/clang++ (see `ccroute install`) ahead of the real \
                  compilers. Each invocation is routed to the AFL instrumenting \
                  compiler or the plain compiler, logged, and executed."
)]
pub struct Cli {
    /// Print debug tracing to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show how a compiler invocation would be routed, without running it
    Explain {
        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,

        /// Compiler invocation, program name first (everything after --)
        #[arg(last = true, required = true, value_name = "ARGV")]
        argv: Vec<String>,
    },

    /// Print the effective configuration
    Config {
        /// Output format
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create clang and clang++ symlinks to this executable
    Install {
        /// Directory to place the symlinks in
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Replace existing files
        #[arg(short, long)]
        force: bool,
    },
}
