//! Argument vector rewriting for the instrumenting toolchain
//!
//! V8's build passes flags from its bundled clang that the AFL toolchain's
//! compiler does not accept. Those are either dropped as whole arguments or
//! cut out of combined arguments. Other engines' flags pass through as-is.
//!
//! Element 0 (the program) is never touched; the dispatcher owns it.

use crate::engine::Engine;
use tracing::debug;

/// Whole-argument and embedded-fragment edits for one engine
#[derive(Debug, Clone, Copy)]
pub struct RewriteRules {
    /// Arguments dropped wherever they appear verbatim
    pub remove: &'static [&'static str],
    /// Fragments cut out of any argument that contains them
    pub strip: &'static [&'static str],
}

/// Flags V8's build passes that the instrumenting compiler rejects
pub const V8_RULES: RewriteRules = RewriteRules {
    remove: &[
        "-fcomplete-member-pointers",
        "-fcrash-diagnostics-dir=../../tools/clang/crashreports",
        "-Wno-ignored-pragma-optimize",
        "-Wno-implicit-int-float-conversion",
        "-Wno-c99-designator",
        "-Wno-final-dtor-non-final-class",
        "-Wno-sizeof-array-div",
    ],
    strip: &[
        "--color-diagnostics",
        "-fuse-ld=lld",
        "-Wa,-fdebug-compilation-dir,.",
    ],
};

/// Rules for an engine, if its flags need rewriting at all
pub fn rules_for(engine: Engine) -> Option<&'static RewriteRules> {
    match engine {
        Engine::V8 => Some(&V8_RULES),
        Engine::Jsc | Engine::ChakraCore | Engine::Unknown => None,
    }
}

/// Rewrite an argument vector for `engine`
///
/// Order is preserved and no argument is introduced. Running it on its own
/// output changes nothing.
pub fn rewrite(engine: Engine, argv: &[String]) -> Vec<String> {
    match rules_for(engine) {
        Some(rules) => rules.apply(argv),
        None => argv.to_vec(),
    }
}

impl RewriteRules {
    /// Apply these rules to every argument after the program name
    pub fn apply(&self, argv: &[String]) -> Vec<String> {
        let Some((program, args)) = argv.split_first() else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(argv.len());
        out.push(program.clone());

        // Strip first: a stripped argument may reduce to a removable flag
        for arg in args {
            let stripped = self.strip_fragments(arg);
            if self.remove.contains(&stripped.as_str()) {
                debug!(arg = %arg, "removed argument");
                continue;
            }
            if stripped != *arg {
                debug!(from = %arg, to = %stripped, "stripped argument");
            }
            out.push(stripped);
        }
        out
    }

    /// Cut every fragment out of `arg`, until none remains
    fn strip_fragments(&self, arg: &str) -> String {
        let mut out = arg.to_string();
        while let Some(fragment) = self
            .strip
            .iter()
            .find(|f| !f.is_empty() && out.contains(**f))
        {
            out = out.replace(fragment, "");
        }
        out
    }
}
