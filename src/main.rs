//! renbuild - Ren'Py script builder

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::process::ExitCode;

use anyhow::Context;
use log::{debug, error, LevelFilter};
use renbuild::{parse_args, CliArgs, Config, Engine};

fn main() -> ExitCode {
    let args = parse_args();
    init_logging(&args);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr at info, or lower with `--debug` / `--verbose`.
/// `RUST_LOG` sets the default.
fn init_logging(args: &CliArgs) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Trace);
    } else if args.debug {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let mut engine = Engine::new(config)?;
    engine.run(&args.input)?;
    Ok(())
}

/// Build configuration from CLI args and config files
///
/// An explicit `--config` file replaces auto-discovery of `renbuild.toml`
/// in the input's ancestors and the home directory.
fn build_config(args: &CliArgs) -> anyhow::Result<Config> {
    let mut config = if let Some(config_path) = &args.config {
        debug!("Using explicit config file: {}", config_path.display());
        Config::from_toml_file(config_path)
            .with_context(|| format!("Unable to load config file {}", config_path.display()))?
    } else {
        let discovered = Config::discover_config_files(&args.input);
        if discovered.is_empty() {
            debug!("No config files discovered for {}", args.input.display());
        }
        for path in &discovered {
            debug!("Discovered config file {}", path.display());
        }
        Config::from_discovered_files(&args.input)
    };

    // Override with CLI arguments
    if let Some(output) = &args.output {
        config.output_path = std::path::absolute(output)
            .with_context(|| format!("Invalid output directory {}", output.display()))?;
    }
    if args.no_flow_control {
        config.create_flow_control_file = false;
    }
    if args.parent_files {
        config.create_parent_files = true;
    }
    if args.keep_going {
        config.abort_on_error = false;
    }

    debug!("Configuration: {config:?}");

    if let Some(error) = config.validate() {
        anyhow::bail!("Invalid configuration: {error}");
    }

    Ok(config)
}
