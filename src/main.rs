use anyhow::{bail, Context, Result};
use ccroute::cli::{Cli, Command, OutputFormat};
use ccroute::config::RouterConfig;
use ccroute::error::{LaunchError, RouterError};
use ccroute::invocation_log::{AppendLog, InvocationLog, NullLog};
use ccroute::router::{self, dispatch, Invocation, Router};
use clap::Parser;
use std::convert::Infallible;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Name the binary answers to as an operator CLI; any other name routes
const CLI_NAME: &str = env!("CARGO_PKG_NAME");

/// Enables tracing output when the router runs as a compiler
const ENV_DEBUG: &str = "CCROUTE_DEBUG";

/// Compiler names created by `ccroute install`
const INSTALL_NAMES: &[&str] = &["clang", "clang++"];

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn invoked_as_cli(argv: &[OsString]) -> bool {
    argv.first()
        .and_then(|arg0| Path::new(arg0).file_stem())
        .is_some_and(|stem| stem == CLI_NAME)
}

/// Open the configured log; logging problems never block the build
fn open_log(config: &RouterConfig) -> Box<dyn InvocationLog> {
    let Some(path) = &config.log_file else {
        return Box::new(NullLog);
    };
    match AppendLog::open(path) {
        Ok(log) => Box::new(log),
        Err(e) => {
            // Router mode has no subscriber unless CCROUTE_DEBUG is set
            eprintln!(
                "ccroute: cannot open invocation log {}: {} (continuing without it)",
                path.display(),
                e
            );
            Box::new(NullLog)
        }
    }
}

/// Route this compiler invocation and exec the chosen compiler
fn run_router(raw: Vec<OsString>) -> Result<Infallible> {
    let argv = router::collect_args(raw)?;
    let config = RouterConfig::load()?;
    let router = Router::new(config);
    let invocation = router.route(&argv)?;
    let log = open_log(router.config());
    Ok(dispatch(invocation, log)?)
}

fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<LaunchError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<RouterError>() {
        e.exit_code()
    } else {
        1
    }
}

fn print_invocation(invocation: &Invocation, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(invocation)?);
        }
        OutputFormat::Text => {
            let decision = if invocation.verdict.instrument {
                "instrument"
            } else {
                "plain"
            };
            println!("engine:   {}", invocation.engine);
            println!("verdict:  {} ({})", decision, invocation.verdict.reason);
            println!("program:  {}", invocation.program);
            println!("command:  {}", invocation.record().line());
        }
    }
    Ok(())
}

fn install(dir: &Path, force: bool) -> Result<()> {
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    for name in INSTALL_NAMES {
        let link = dir.join(name);
        if fs::symlink_metadata(&link).is_ok() {
            if !force {
                bail!(
                    "{} already exists (use --force to replace it)",
                    link.display()
                );
            }
            fs::remove_file(&link)
                .with_context(|| format!("Failed to remove {}", link.display()))?;
        }
        std::os::unix::fs::symlink(&exe, &link)
            .with_context(|| format!("Failed to create {}", link.display()))?;
        println!("{} -> {}", link.display(), exe.display());
    }
    Ok(())
}

fn run_cli(args: Cli) -> Result<()> {
    match args.command {
        Command::Explain { format, argv } => {
            let router = Router::new(RouterConfig::load()?);
            let invocation = router.route(&argv)?;
            print_invocation(&invocation, format)
        }
        Command::Config { format } => {
            let config = RouterConfig::load()?;
            match format {
                OutputFormat::Text => print!("{}", config.to_toml()?),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
            }
            Ok(())
        }
        Command::Install { dir, force } => install(&dir, force),
    }
}

fn main() -> Result<()> {
    let argv: Vec<OsString> = std::env::args_os().collect();

    if !invoked_as_cli(&argv) {
        init_tracing(std::env::var_os(ENV_DEBUG).is_some());
        let err = match run_router(argv) {
            Ok(never) => match never {},
            Err(e) => e,
        };
        eprintln!("ccroute: {:#}", err);
        std::process::exit(exit_code(&err));
    }

    let args = Cli::parse_from(argv);
    init_tracing(args.debug);
    run_cli(args)
}
