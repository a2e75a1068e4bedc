//! Command-line interface for script-glue.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Program and arguments to observe.
    pub command: Vec<String>,
    /// Stream output while the program runs.
    pub realtime: bool,
    /// Poll timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Kill timeout in milliseconds.
    pub kill_timeout_ms: Option<u64>,
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Print records as JSON lines.
    pub json: bool,
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
///
/// The first positional argument starts the observed command; it and
/// everything after it are passed through untouched.
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('r') | Long("realtime") => {
                result.realtime = true;
            }
            Short('t') | Long("timeout") => {
                let value: String = parser.value()?.parse()?;
                result.timeout_ms = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("timeout", value))?,
                );
            }
            Short('k') | Long("kill-timeout") => {
                let value: String = parser.value()?.parse()?;
                result.kill_timeout_ms = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("kill-timeout", value))?,
                );
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Long("json") => {
                result.json = true;
            }
            Value(val) => {
                result.command.push(into_string(val)?);
                for rest in parser.raw_args()? {
                    result.command.push(into_string(rest)?);
                }
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

fn into_string(value: OsString) -> Result<String, ArgsError> {
    value
        .into_string()
        .map_err(|v| ArgsError::InvalidValue("command", v.to_string_lossy().into_owned()))
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"script-glue {version}
Run a command and capture its stdout/stderr as timestamped lines

USAGE:
    script-glue [OPTIONS] [--] <PROGRAM> [ARGS]...

OPTIONS:
    -r, --realtime            Print lines as they arrive (Ctrl-C stops)
    -t, --timeout <MS>        Poll timeout per read [default: 1000]
    -k, --kill-timeout <MS>   Wait after killing the process [default: 5000]
    -c, --config <FILE>       Path to configuration file (JSON)
    -l, --log-level <LVL>     Log level (error, warn, info, debug, trace)
        --json                Print one JSON object per line
    -h, --help                Print help
    -V, --version             Print version

ENVIRONMENT VARIABLES:
    SCRIPT_GLUE_REALTIME         Realtime mode (true/false)
    SCRIPT_GLUE_POLL_TIMEOUT_MS  Poll timeout (overrides config)
    SCRIPT_GLUE_KILL_TIMEOUT_MS  Kill timeout (overrides config)
    SCRIPT_GLUE_CACHE_DIR        Request cache directory
    SCRIPT_GLUE_LOG_LEVEL        Log level (overrides config)
    RUST_LOG                     Alternative log level setting

EXAMPLES:
    # Run to completion, then print the transcript
    script-glue make test

    # Tail a long-running command
    script-glue -r -- ping -c 5 localhost

    # Machine-readable output
    script-glue --json git status
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("script-glue {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("script-glue")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn test_default_args() {
        let result = parse_args_from(args(&[])).unwrap();
        assert!(result.command.is_empty());
        assert!(!result.realtime);
        assert!(result.timeout_ms.is_none());
        assert!(!result.json);
    }

    #[test]
    fn test_command_passthrough() {
        let result = parse_args_from(args(&["ls", "-la", "--color"])).unwrap();
        assert_eq!(result.command, vec!["ls", "-la", "--color"]);
    }

    #[test]
    fn test_double_dash() {
        let result = parse_args_from(args(&["-r", "--", "-weird-program", "x"])).unwrap();
        assert!(result.realtime);
        assert_eq!(result.command, vec!["-weird-program", "x"]);
    }

    #[test]
    fn test_timeouts() {
        let result = parse_args_from(args(&["-t", "250", "--kill-timeout", "900", "true"])).unwrap();
        assert_eq!(result.timeout_ms, Some(250));
        assert_eq!(result.kill_timeout_ms, Some(900));
        assert_eq!(result.command, vec!["true"]);
    }

    #[test]
    fn test_config_file() {
        let result = parse_args_from(args(&["-c", "/etc/glue.json", "true"])).unwrap();
        assert_eq!(result.config, Some(PathBuf::from("/etc/glue.json")));
    }

    #[test]
    fn test_help_flag() {
        let result = parse_args_from(args(&["-h"])).unwrap();
        assert!(result.help);

        let result = parse_args_from(args(&["--help"])).unwrap();
        assert!(result.help);
    }

    #[test]
    fn test_version_flag() {
        let result = parse_args_from(args(&["-V"])).unwrap();
        assert!(result.version);
    }

    #[test]
    fn test_log_level_and_json() {
        let result = parse_args_from(args(&["-l", "debug", "--json", "date"])).unwrap();
        assert_eq!(result.log_level, Some("debug".to_string()));
        assert!(result.json);
    }

    #[test]
    fn test_invalid_timeout() {
        let result = parse_args_from(args(&["-t", "soon", "true"]));
        assert!(matches!(result, Err(ArgsError::InvalidValue("timeout", _))));
    }

    #[test]
    fn test_unknown_option() {
        let result = parse_args_from(args(&["--bogus"]));
        assert!(matches!(result, Err(ArgsError::Lexopt(_))));
    }
}
