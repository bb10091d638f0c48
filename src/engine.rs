//! Engine classification
//!
//! Decides which JavaScript engine source tree a compiler invocation belongs
//! to. A pinned engine from the build configuration wins outright; otherwise
//! path fingerprints in the argument vector decide.

use crate::error::RouterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target codebase of a compiler invocation
///
/// Deserialized through `FromStr`, so configuration files accept the same
/// names and aliases as `CCROUTE_ENGINE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Engine {
    /// V8 (Chromium's engine)
    V8,
    /// JavaScriptCore (WebKit's engine)
    Jsc,
    /// ChakraCore
    ChakraCore,
    /// Not recognized; never instrumented
    Unknown,
}

/// Path fragments checked against every argument, in priority order
const FINGERPRINTS: &[(&str, Engine)] = &[
    ("JavaScriptCore", Engine::Jsc),
    ("chakracore", Engine::ChakraCore),
    // V8 vendors its dependencies under third_party/
    ("third_party", Engine::V8),
];

impl Engine {
    /// Lowercase name used in configuration and output
    pub fn name(&self) -> &'static str {
        match self {
            Engine::V8 => "v8",
            Engine::Jsc => "jsc",
            Engine::ChakraCore => "chakracore",
            Engine::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Engine {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v8" => Ok(Engine::V8),
            "jsc" | "javascriptcore" => Ok(Engine::Jsc),
            "chakracore" | "chakra" | "ch" => Ok(Engine::ChakraCore),
            "unknown" => Ok(Engine::Unknown),
            _ => Err(RouterError::UnknownEngineName(s.to_string())),
        }
    }
}

impl TryFrom<String> for Engine {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Classifies invocations, honoring a build-wide engine pin
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineClassifier {
    pinned: Option<Engine>,
}

impl EngineClassifier {
    /// Classifier that inspects every argument vector
    pub fn new() -> Self {
        Self { pinned: None }
    }

    /// Classifier that returns `engine` for every invocation
    pub fn pinned(engine: Engine) -> Self {
        Self {
            pinned: Some(engine),
        }
    }

    /// Classifier from an optional pin
    pub fn with_pin(pinned: Option<Engine>) -> Self {
        Self { pinned }
    }

    /// Determine the engine for one invocation
    pub fn classify(&self, argv: &[String]) -> Engine {
        if let Some(engine) = self.pinned {
            return engine;
        }
        classify_by_fingerprint(argv)
    }
}

/// Scan arguments for engine path fingerprints; first matching argument wins
pub fn classify_by_fingerprint(argv: &[String]) -> Engine {
    argv.iter()
        .find_map(|arg| {
            FINGERPRINTS
                .iter()
                .find(|(fragment, _)| arg.contains(fragment))
                .map(|(_, engine)| *engine)
        })
        .unwrap_or(Engine::Unknown)
}
