//! Per-engine target filtering
//!
//! Decides whether one translation unit should go through the instrumenting
//! toolchain. Every uncertain case resolves to "not a target" so that the
//! host build keeps working even when coverage is lost.
//!
//! - V8: every unit is instrumented.
//! - JavaScriptCore: unified sources are scanned for JIT signature tokens;
//!   link steps (no `-c` unit) are instrumented.
//! - ChakraCore: everything except the thread-context unit.

use crate::engine::Engine;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Tokens naming JavaScriptCore's JIT tiers and bytecode subsystems
pub const JSC_SIGNATURES: &[&str] = &[
    "b3",
    "dfg",
    "jit",
    "domjit",
    "ftl",
    "bytecode",
    "bytecompiler",
    "llint",
];

/// ChakraCore unit that the instrumenting toolchain cannot build
pub const CHAKRA_EXCLUDED_UNIT: &str = "Runtime/Base/ThreadContext.cpp";

/// Why a unit was or was not routed to the instrumenting toolchain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reason {
    UnknownEngine,
    V8AllUnits,
    JscLinkStep,
    JscSignature { source: String, token: String },
    JscNoSignature { source: String },
    JscSourceUnreadable { source: String, error: String },
    ChakraExcludedUnit { source: String },
    ChakraIncludedUnit,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::UnknownEngine => write!(f, "engine not recognized, never instrumented"),
            Reason::V8AllUnits => write!(f, "v8 units are always instrumented"),
            Reason::JscLinkStep => write!(f, "no -c unit, treated as a link step"),
            Reason::JscSignature { source, token } => {
                write!(f, "{} contains signature token '{}'", source, token)
            }
            Reason::JscNoSignature { source } => {
                write!(f, "{} contains no signature token", source)
            }
            Reason::JscSourceUnreadable { source, error } => {
                write!(f, "{} could not be read ({})", source, error)
            }
            Reason::ChakraExcludedUnit { source } => {
                write!(f, "{} is excluded from instrumentation", source)
            }
            Reason::ChakraIncludedUnit => write!(f, "not the excluded chakracore unit"),
        }
    }
}

/// Targeting decision plus its rationale
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetVerdict {
    /// Route through the instrumenting toolchain
    pub instrument: bool,
    pub reason: Reason,
}

impl TargetVerdict {
    fn instrument(reason: Reason) -> Self {
        Self {
            instrument: true,
            reason,
        }
    }

    fn skip(reason: Reason) -> Self {
        Self {
            instrument: false,
            reason,
        }
    }
}

/// Should this invocation be compiled with the instrumenting toolchain?
pub fn is_target(engine: Engine, argv: &[String]) -> bool {
    evaluate(engine, argv).instrument
}

/// Targeting decision with rationale
pub fn evaluate(engine: Engine, argv: &[String]) -> TargetVerdict {
    let verdict = match engine {
        Engine::Unknown => TargetVerdict::skip(Reason::UnknownEngine),
        Engine::V8 => TargetVerdict::instrument(Reason::V8AllUnits),
        Engine::Jsc => evaluate_jsc(argv),
        Engine::ChakraCore => evaluate_chakra(argv),
    };
    debug!(%engine, instrument = verdict.instrument, reason = %verdict.reason, "target verdict");
    verdict
}

/// Paths following each `-c` flag, in argument order
pub fn compile_units(argv: &[String]) -> impl Iterator<Item = &str> {
    argv.windows(2)
        .filter(|pair| pair[0] == "-c")
        .map(|pair| pair[1].as_str())
}

fn evaluate_jsc(argv: &[String]) -> TargetVerdict {
    // Unified sources bundle many files, so the contents decide
    let Some(source) = compile_units(argv).next() else {
        return TargetVerdict::instrument(Reason::JscLinkStep);
    };

    match read_source(Path::new(source)) {
        Ok(text) => match JSC_SIGNATURES.iter().find(|sig| text.contains(**sig)) {
            Some(token) => TargetVerdict::instrument(Reason::JscSignature {
                source: source.to_string(),
                token: token.to_string(),
            }),
            None => TargetVerdict::skip(Reason::JscNoSignature {
                source: source.to_string(),
            }),
        },
        Err(error) => TargetVerdict::skip(Reason::JscSourceUnreadable {
            source: source.to_string(),
            error,
        }),
    }
}

fn evaluate_chakra(argv: &[String]) -> TargetVerdict {
    match compile_units(argv).find(|source| source.contains(CHAKRA_EXCLUDED_UNIT)) {
        Some(source) => TargetVerdict::skip(Reason::ChakraExcludedUnit {
            source: source.to_string(),
        }),
        None => TargetVerdict::instrument(Reason::ChakraIncludedUnit),
    }
}

/// Read a source file as text; any I/O failure becomes an error string
fn read_source(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| {
        debug!(path = %path.display(), error = %e, "source unreadable");
        e.to_string()
    })
}
