#![forbid(unsafe_code)]

//! Command-line argument parsing for the demo.
//!
//! Parses args manually. Supports environment variable overrides via the
//! `BBUI_DEMO_*` prefix; explicit flags win over the environment.

use std::env;
use std::process;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
bbui demo: a builders overview rendered against an in-memory session

USAGE:
    bbui-demo [OPTIONS]

OPTIONS:
    --renders=N          Number of renders to run (default: 12)
    --builders=N         Number of seeded builders (default: 6)
    --page-size=N        Builders shown per page (default: 2)
    --log-format=FMT     Log format: 'text' or 'json' (default: text)
    --json               Print the run summary as JSON
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    BBUI_DEMO_RENDERS     Override --renders
    BBUI_DEMO_BUILDERS    Override --builders
    BBUI_DEMO_PAGE_SIZE   Override --page-size
    BBUI_DEMO_LOG_FORMAT  Override --log-format (text|json)
    BBUI_DEMO_JSON        Override --json (1/true to enable)
    BBUI_LOG              Log filter, e.g. 'bbui_data=debug' (default: warn)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn parse(val: &str) -> Option<Self> {
        match val {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opts {
    pub renders: u32,
    pub builders: i64,
    /// Builders shown per page; each page is rendered twice in a row.
    pub page_size: usize,
    pub log_format: LogFormat,
    /// Print the summary as JSON instead of text.
    pub json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            renders: 12,
            builders: 6,
            page_size: 2,
            log_format: LogFormat::Text,
            json: false,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run(Opts),
    Help,
    Version,
}

impl Opts {
    /// Parse the process arguments and environment, exiting on `--help`,
    /// `--version` or invalid input.
    pub fn parse() -> Self {
        let args: Vec<String> = env::args().skip(1).collect();
        match parse_from(&args, |key| env::var(key).ok()) {
            Ok(Command::Run(opts)) => opts,
            Ok(Command::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Ok(Command::Version) => {
                println!("bbui-demo {VERSION}");
                process::exit(0);
            }
            Err(msg) => {
                eprintln!("{msg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }
}

pub fn parse_from(
    args: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Command, String> {
    let mut opts = Opts::default();

    if let Some(val) = lookup("BBUI_DEMO_RENDERS")
        && let Ok(n) = val.parse()
    {
        opts.renders = n;
    }
    if let Some(val) = lookup("BBUI_DEMO_BUILDERS")
        && let Ok(n) = val.parse()
    {
        opts.builders = n;
    }
    if let Some(val) = lookup("BBUI_DEMO_PAGE_SIZE")
        && let Ok(n) = val.parse()
    {
        opts.page_size = n;
    }
    if let Some(val) = lookup("BBUI_DEMO_LOG_FORMAT")
        && let Some(format) = LogFormat::parse(&val)
    {
        opts.log_format = format;
    }
    if let Some(val) = lookup("BBUI_DEMO_JSON") {
        opts.json = val == "1" || val.eq_ignore_ascii_case("true");
    }

    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return Ok(Command::Help),
            "--version" | "-V" => return Ok(Command::Version),
            "--json" => opts.json = true,
            other => {
                if let Some(val) = other.strip_prefix("--renders=") {
                    opts.renders = parse_num(val, "--renders")?;
                } else if let Some(val) = other.strip_prefix("--builders=") {
                    opts.builders = parse_num(val, "--builders")?;
                } else if let Some(val) = other.strip_prefix("--page-size=") {
                    opts.page_size = parse_num(val, "--page-size")?;
                } else if let Some(val) = other.strip_prefix("--log-format=") {
                    opts.log_format = LogFormat::parse(val)
                        .ok_or_else(|| format!("Invalid --log-format value: {val}"))?;
                } else {
                    return Err(format!("Unknown argument: {other}"));
                }
            }
        }
    }

    if opts.page_size == 0 {
        return Err("--page-size must be at least 1".into());
    }
    Ok(Command::Run(opts))
}

fn parse_num<T: std::str::FromStr>(val: &str, flag: &str) -> Result<T, String> {
    val.parse().map_err(|_| format!("Invalid {flag} value: {val}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_opts() {
        let cmd = parse_from(&[], env_of(&[])).unwrap();
        assert_eq!(cmd, Command::Run(Opts::default()));
    }

    #[test]
    fn flags_override_env() {
        let cmd = parse_from(
            &args(&["--renders=3", "--log-format=json"]),
            env_of(&[("BBUI_DEMO_RENDERS", "40"), ("BBUI_DEMO_BUILDERS", "9")]),
        )
        .unwrap();
        let Command::Run(opts) = cmd else {
            panic!("expected run");
        };
        assert_eq!(opts.renders, 3);
        assert_eq!(opts.builders, 9);
        assert_eq!(opts.log_format, LogFormat::Json);
    }

    #[test]
    fn json_env_flag() {
        let Ok(Command::Run(opts)) = parse_from(&[], env_of(&[("BBUI_DEMO_JSON", "true")])) else {
            panic!("expected run");
        };
        assert!(opts.json);
    }

    #[test]
    fn help_and_version() {
        assert_eq!(parse_from(&args(&["-h"]), env_of(&[])), Ok(Command::Help));
        assert_eq!(
            parse_from(&args(&["--version"]), env_of(&[])),
            Ok(Command::Version)
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_from(&args(&["--renders=lots"]), env_of(&[])).is_err());
        assert!(parse_from(&args(&["--log-format=xml"]), env_of(&[])).is_err());
        assert!(parse_from(&args(&["--page-size=0"]), env_of(&[])).is_err());
        assert!(parse_from(&args(&["--bogus"]), env_of(&[])).is_err());
    }

    #[test]
    fn help_text_contains_env_vars() {
        for var in [
            "BBUI_DEMO_RENDERS",
            "BBUI_DEMO_BUILDERS",
            "BBUI_DEMO_PAGE_SIZE",
            "BBUI_DEMO_LOG_FORMAT",
            "BBUI_DEMO_JSON",
            "BBUI_LOG",
        ] {
            assert!(HELP_TEXT.contains(var), "{var} missing from help");
        }
    }
}
