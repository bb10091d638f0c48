//! ccroute - compiler-invocation router for instrumented JavaScript engine builds
//!
//! Installed in place of `clang`/`clang++`, it classifies each compiler
//! invocation by engine (V8, JavaScriptCore, ChakraCore), decides whether the
//! translation unit should be built with the AFL instrumenting toolchain,
//! strips flags that toolchain rejects, logs the final command line and
//! replaces itself with the chosen compiler.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod invocation_log;
pub mod rewrite;
pub mod router;
pub mod target;

pub use config::RouterConfig;
pub use engine::{Engine, EngineClassifier};
pub use error::{LaunchError, RouterError};
pub use invocation_log::{AppendLog, InvocationLog, InvocationRecord, MemoryLog, NullLog};
pub use rewrite::rewrite;
pub use router::{dispatch, Invocation, Language, Router};
pub use target::{evaluate, is_target, Reason, TargetVerdict};
