//! Routing pipeline and execution dispatch
//!
//! `Router::route` runs classification, targeting, toolchain selection and
//! rewriting without side effects. `dispatch` then appends the invocation
//! record and replaces the process image with the selected compiler.

use crate::config::RouterConfig;
use crate::engine::{Engine, EngineClassifier};
use crate::error::{LaunchError, Result, RouterError};
use crate::invocation_log::{InvocationLog, InvocationRecord};
use crate::rewrite::rewrite;
use crate::target::{self, TargetVerdict};
use serde::Serialize;
use std::convert::Infallible;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

/// Compiler entry point the router was invoked as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cxx,
}

impl Language {
    /// Infer from the invoked program name (`clang` vs `clang++`)
    ///
    /// A trailing version (`clang++-14`, `g++-12.2`) is ignored. `cpp` is
    /// the preprocessor, not a C++ driver.
    pub fn from_program(program: &str) -> Self {
        let name = base_name(program).to_ascii_lowercase();
        let name = name.strip_suffix(".exe").unwrap_or(&name);
        let name = strip_version(name);
        if name.ends_with("++") || name.ends_with("xx") {
            Language::Cxx
        } else {
            Language::C
        }
    }
}

/// Fully decided invocation, ready to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub engine: Engine,
    pub language: Language,
    pub verdict: TargetVerdict,
    /// Executable to run; also element 0 of `argv`
    pub program: String,
    /// Rewritten argument vector
    pub argv: Vec<String>,
}

impl Invocation {
    /// The log line for this invocation
    pub fn record(&self) -> InvocationRecord {
        InvocationRecord::new(&self.argv)
    }
}

/// Decides how each compiler invocation is executed
#[derive(Debug, Clone)]
pub struct Router {
    config: RouterConfig,
    classifier: EngineClassifier,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        let classifier = EngineClassifier::with_pin(config.engine);
        Self { config, classifier }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Decide engine, verdict, program and final arguments for `argv`
    pub fn route(&self, argv: &[String]) -> Result<Invocation> {
        let invoked = argv.first().ok_or(RouterError::EmptyArgv)?;

        let engine = self.classifier.classify(argv);
        let verdict = target::evaluate(engine, argv);
        let language = Language::from_program(invoked);
        let program = self.select_program(verdict.instrument, language, invoked);

        let mut argv = rewrite(engine, argv);
        argv[0] = program.clone();

        debug!(%engine, instrument = verdict.instrument, program = %program, "routed");
        Ok(Invocation {
            engine,
            language,
            verdict,
            program,
            argv,
        })
    }

    /// Instrumenting compiler for a target, the invoked compiler otherwise
    fn select_program(&self, instrument: bool, language: Language, invoked: &str) -> String {
        if instrument {
            let name = match language {
                Language::C => &self.config.instrumented_cc,
                Language::Cxx => &self.config.instrumented_cxx,
            };
            return path_string(&self.config.toolchain_dir.join(name));
        }

        let name = base_name(invoked);
        match &self.config.plain_toolchain_dir {
            Some(dir) => path_string(&dir.join(name)),
            None => name.to_string(),
        }
    }
}

/// Log the invocation and replace this process with its compiler
///
/// Only returns on failure. The log is dropped before `exec`, since no
/// destructor runs once the process image is replaced; descriptors close
/// on exec anyway. A log write failure is reported and ignored.
///
/// A bare program name is looked up on `PATH` here rather than by `execvp`,
/// skipping this executable: the router usually sits first on `PATH` under
/// the very name it is about to run.
pub fn dispatch<L: InvocationLog>(
    invocation: Invocation,
    mut log: L,
) -> std::result::Result<Infallible, LaunchError> {
    if let Err(e) = log.append(&invocation.record()) {
        warn!(error = %e, "failed to append invocation record");
    }
    drop(log);

    let Invocation { program, argv, .. } = invocation;
    let executable = resolve_program(&program)?;
    debug!(program = %program, executable = %executable.display(), "exec");

    let args = argv.get(1..).unwrap_or(&[]);
    let err = Command::new(&executable).arg0(&program).args(args).exec();
    Err(LaunchError {
        program,
        source: err,
    })
}

/// Absolute executable for `program`, never this router binary
fn resolve_program(program: &str) -> std::result::Result<PathBuf, LaunchError> {
    if program.contains('/') {
        return Ok(PathBuf::from(program));
    }

    let self_exe = env::current_exe().ok();
    let search_path = env::var_os("PATH").unwrap_or_default();
    find_on_path(program, &search_path, self_exe.as_deref()).ok_or_else(|| LaunchError {
        program: program.to_string(),
        source: io::Error::new(
            io::ErrorKind::NotFound,
            "no compiler by that name on PATH other than the router itself",
        ),
    })
}

/// First executable named `name` in `search_path` that is not `skip`
///
/// Candidates are compared by device and inode after following symlinks, so
/// a `clang` symlink or hard link to the router is passed over.
pub fn find_on_path(name: &str, search_path: &OsStr, skip: Option<&Path>) -> Option<PathBuf> {
    let skip = skip.and_then(|path| fs::metadata(path).ok());
    env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .filter(|candidate| is_executable(candidate))
        .find(|candidate| match (&skip, fs::metadata(candidate)) {
            (Some(skip), Ok(meta)) => (meta.dev(), meta.ino()) != (skip.dev(), skip.ino()),
            _ => true,
        })
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Drop a trailing `-<version>` from a driver name
fn strip_version(name: &str) -> &str {
    match name.rsplit_once('-') {
        Some((stem, version))
            if !stem.is_empty()
                && version.starts_with(|c: char| c.is_ascii_digit())
                && version.chars().all(|c| c.is_ascii_digit() || c == '.') =>
        {
            stem
        }
        _ => name,
    }
}

/// Convert raw process arguments, refusing any that are not UTF-8
pub fn collect_args<I: IntoIterator<Item = OsString>>(args: I) -> Result<Vec<String>> {
    let argv = args
        .into_iter()
        .enumerate()
        .map(|(index, arg)| {
            arg.into_string()
                .map_err(|raw| RouterError::NonUtf8Argument {
                    index,
                    lossy: raw.to_string_lossy().into_owned(),
                })
        })
        .collect::<Result<Vec<_>>>()?;
    if argv.is_empty() {
        return Err(RouterError::EmptyArgv);
    }
    Ok(argv)
}

/// Final path component of a program name
pub fn base_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
