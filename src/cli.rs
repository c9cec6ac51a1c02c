//! Command-line interface for renbuild.
//!
//! Defines CLI arguments using clap builder API

use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

/// CLI arguments parsed from command line
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Master script to build
    pub input: PathBuf,

    /// Output directory (overrides `output_path`)
    pub output: Option<PathBuf>,

    /// Config file path
    pub config: Option<PathBuf>,

    /// Log at debug level
    pub debug: bool,

    /// Log every processed line
    pub verbose: bool,

    /// Do not write control.rpy
    pub no_flow_control: bool,

    /// Route top-level labels to per-root files
    pub parent_files: bool,

    /// Log errors and continue instead of stopping
    pub keep_going: bool,
}

/// Build the clap Command for parsing CLI arguments
#[must_use]
pub fn build_cli() -> Command {
    Command::new("renbuild")
        .version(env!("CARGO_PKG_VERSION"))
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version")
                .action(ArgAction::Version),
        )
        .about("Builds Ren'Py scripts from compact indentation-based story scripts")
        .arg(
            Arg::new("input")
                .help("Master script to build")
                .value_name("INPUT")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Directory receiving generated files [default: input directory]")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("Config file path (overrides auto-discovery of renbuild.toml)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("debug")
                .short('D')
                .long("debug")
                .help("Enable debug output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('V')
                .long("verbose")
                .help("Trace every processed line (implies debug)")
                .conflicts_with("debug")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-flow-control")
                .long("no-flow-control")
                .help("Do not write the control.rpy flow-control file")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("parent-files")
                .long("parent-files")
                .help("Write each top-level label root to its own <root>.rpy")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("keep-going")
                .short('k')
                .long("keep-going")
                .help("Log errors and keep building instead of stopping at the first one")
                .action(ArgAction::SetTrue),
        )
}

/// Parse CLI arguments from command line
#[must_use]
pub fn parse_args() -> CliArgs {
    args_from_matches(&build_cli().get_matches())
}

/// Parse CLI arguments from an iterator (for testing)
#[must_use]
pub fn parse_args_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    args_from_matches(&build_cli().get_matches_from(args))
}

/// Convert clap `ArgMatches` to `CliArgs`
fn args_from_matches(matches: &clap::ArgMatches) -> CliArgs {
    CliArgs {
        input: matches
            .get_one::<PathBuf>("input")
            .cloned()
            .unwrap_or_default(),
        output: matches.get_one::<PathBuf>("output").cloned(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        debug: matches.get_flag("debug"),
        verbose: matches.get_flag("verbose"),
        no_flow_control: matches.get_flag("no-flow-control"),
        parent_files: matches.get_flag("parent-files"),
        keep_going: matches.get_flag("keep-going"),
    }
}
