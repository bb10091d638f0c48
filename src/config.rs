//! Router configuration
//!
//! The router cannot take options on its command line (that belongs to the
//! compiler it stands in for), so its settings come from, in order:
//!
//! 1. built-in defaults, relative to the directory of the real executable
//! 2. `ccroute.toml` next to the executable, or the file in `CCROUTE_CONFIG`
//! 3. `CCROUTE_*` environment overrides
//!
//! # Example ccroute.toml
//!
//! ```toml
//! engine = "chakracore"
//! toolchain_dir = "/opt/afl"
//! log_file = "/tmp/ccroute.log"
//! ```

use crate::engine::Engine;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file looked up next to the executable
pub const CONFIG_FILE_NAME: &str = "ccroute.toml";

pub const ENV_CONFIG: &str = "CCROUTE_CONFIG";
pub const ENV_ENGINE: &str = "CCROUTE_ENGINE";
pub const ENV_TOOLCHAIN_DIR: &str = "CCROUTE_TOOLCHAIN_DIR";
pub const ENV_PLAIN_TOOLCHAIN_DIR: &str = "CCROUTE_PLAIN_TOOLCHAIN_DIR";
pub const ENV_LOG: &str = "CCROUTE_LOG";

/// Settings shared by every invocation of one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterConfig {
    /// Pin every invocation to one engine instead of detecting it
    pub engine: Option<Engine>,

    /// Directory holding the instrumenting compilers
    pub toolchain_dir: PathBuf,

    /// Directory holding the plain compilers (None = search PATH)
    pub plain_toolchain_dir: Option<PathBuf>,

    /// Append-only invocation log (None = no log)
    ///
    /// A log that cannot be opened is reported on stderr and skipped; later
    /// write failures are only reported under `CCROUTE_DEBUG`.
    pub log_file: Option<PathBuf>,

    /// Instrumenting C compiler name
    pub instrumented_cc: String,

    /// Instrumenting C++ compiler name
    pub instrumented_cxx: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::relative_to(Path::new("."))
    }
}

impl RouterConfig {
    /// Defaults for a router installed in `install_dir`
    pub fn relative_to(install_dir: &Path) -> Self {
        Self {
            engine: None,
            toolchain_dir: install_dir.join("../../fuzz/afl"),
            plain_toolchain_dir: None,
            log_file: Some(install_dir.join("proxy.log")),
            instrumented_cc: "afl-clang-fast".to_string(),
            instrumented_cxx: "afl-clang-fast++".to_string(),
        }
    }

    /// Load the configuration for the running executable
    pub fn load() -> Result<Self> {
        let exe = env::current_exe().context("Failed to locate the running executable")?;
        // current_exe resolves the clang/clang++ symlinks to the real binary
        let install_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let vars: HashMap<String, String> = env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::load_with(&install_dir, &vars)
    }

    /// Load the configuration from an install directory and a set of variables
    pub fn load_with(install_dir: &Path, vars: &HashMap<String, String>) -> Result<Self> {
        let explicit = vars.get(ENV_CONFIG).filter(|p| !p.is_empty());
        let mut config = match explicit {
            Some(path) => Self::from_file(path, install_dir)?,
            None => {
                let candidate = install_dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    Self::from_file(&candidate, install_dir)?
                } else {
                    Self::relative_to(install_dir)
                }
            }
        };
        config.apply_env(vars)?;
        Ok(config)
    }

    /// Read a TOML file; unset keys take defaults relative to `install_dir`
    pub fn from_file<P: AsRef<Path>>(path: P, install_dir: &Path) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&content, install_dir)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Parse TOML content; unset keys take defaults relative to `install_dir`
    pub fn from_toml_str(content: &str, install_dir: &Path) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigFile {
            engine: Option<Engine>,
            toolchain_dir: Option<PathBuf>,
            plain_toolchain_dir: Option<PathBuf>,
            log_file: Option<PathBuf>,
            instrumented_cc: Option<String>,
            instrumented_cxx: Option<String>,
        }

        let file: ConfigFile = toml::from_str(content).context("Failed to parse TOML")?;
        let defaults = Self::relative_to(install_dir);

        Ok(Self {
            engine: file.engine,
            toolchain_dir: file.toolchain_dir.unwrap_or(defaults.toolchain_dir),
            plain_toolchain_dir: file.plain_toolchain_dir,
            log_file: file.log_file.or(defaults.log_file),
            instrumented_cc: file.instrumented_cc.unwrap_or(defaults.instrumented_cc),
            instrumented_cxx: file.instrumented_cxx.unwrap_or(defaults.instrumented_cxx),
        })
    }

    /// Apply `CCROUTE_*` overrides
    ///
    /// An empty `CCROUTE_ENGINE` clears the pin; an empty
    /// `CCROUTE_PLAIN_TOOLCHAIN_DIR` restores PATH lookup; an empty
    /// `CCROUTE_LOG` disables the log.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) -> Result<()> {
        if let Some(value) = vars.get(ENV_ENGINE) {
            self.engine = if value.trim().is_empty() {
                None
            } else {
                Some(
                    value
                        .parse::<Engine>()
                        .with_context(|| format!("Invalid {}", ENV_ENGINE))?,
                )
            };
        }
        if let Some(value) = vars.get(ENV_TOOLCHAIN_DIR).filter(|v| !v.is_empty()) {
            self.toolchain_dir = PathBuf::from(value);
        }
        if let Some(value) = vars.get(ENV_PLAIN_TOOLCHAIN_DIR) {
            self.plain_toolchain_dir = non_empty_path(value);
        }
        if let Some(value) = vars.get(ENV_LOG) {
            self.log_file = non_empty_path(value);
        }
        Ok(())
    }

    /// Render as TOML for `ccroute config`
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration")
    }
}

fn non_empty_path(value: &str) -> Option<PathBuf> {
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}
