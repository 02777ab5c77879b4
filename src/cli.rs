//! Command-line interface for console-host.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Command-line arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// REPL executable (overrides config file).
    pub executable: Option<String>,
    /// Working directory for new consoles.
    pub working_dir: Option<PathBuf>,
    /// Base display name.
    pub title: Option<String>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Arguments after `--`, passed to the executable.
    pub args: Vec<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    // Everything after the first `--` belongs to the console process.
    let mut args: Vec<OsString> = args.into_iter().collect();
    let trailing = match args.iter().skip(1).position(|a| a == "--") {
        Some(pos) => args.split_off(pos + 1),
        None => Vec::new(),
    };

    let mut result = Args {
        args: trailing
            .iter()
            .skip(1)
            .map(|a| a.to_string_lossy().into_owned())
            .collect(),
        ..Args::default()
    };
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('e') | Long("executable") => {
                result.executable = Some(parser.value()?.parse()?);
            }
            Short('C') | Long("working-dir") => {
                result.working_dir = Some(parser.value()?.parse()?);
            }
            Short('t') | Long("title") => {
                let title: String = parser.value()?.parse()?;
                if title.trim().is_empty() {
                    return Err(ArgsError::InvalidValue("title", title));
                }
                result.title = Some(title);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"console-host {version}
Interactive REPL console host

USAGE:
    console-host [OPTIONS] [-- ARGS...]

OPTIONS:
    -c, --config <FILE>       Path to configuration file (JSON)
    -e, --executable <EXE>    REPL executable [default: evcxr]
    -C, --working-dir <DIR>   Working directory for new consoles
    -t, --title <TITLE>       Console display name [default: Rust REPL]
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
    -h, --help                Print help
    -V, --version             Print version

ARGS:
    Arguments after `--` replace the configured REPL arguments.

ENVIRONMENT VARIABLES:
    CONSOLE_HOST_EXECUTABLE   REPL executable (overrides config)
    CONSOLE_HOST_WORKDIR      Working directory (overrides config)
    CONSOLE_HOST_TITLE        Display name (overrides config)
    CONSOLE_HOST_LOG_LEVEL    Log level (overrides config)
    RUST_LOG                  Alternative log level setting

EXAMPLES:
    # Start an evcxr console in the current directory
    console-host

    # Use a config file and a project directory
    console-host -c ~/.config/console-host.json -C ~/src/scratch

    # Run another line-oriented REPL
    console-host -e python3 -t Python -- -i -q
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("console-host {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// Lexopt parsing error.
    #[error(transparent)]
    Lexopt(#[from] lexopt::Error),

    /// Invalid argument value.
    #[error("invalid value for --{0}: '{1}'")]
    InvalidValue(&'static str, String),

    /// Unexpected positional argument.
    #[error("unexpected argument: '{0}'")]
    UnexpectedArgument(String),
}
