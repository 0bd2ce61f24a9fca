use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

use geofix::config::{Config, Overrides};
use geofix::location::{Coordinate, LocationError, LocationResolver};

/// geofix — place name to coordinates and elevation
///
/// Uses the Google Geocoding and Elevation APIs (2500 free requests/day).
///
/// Examples:
///   geofix locate "Trondheim"
///   geofix coordinate "1600 Amphitheatre Parkway, Mountain View, CA"
///   geofix elevation --lat 39.7391536 --lng -104.9847034
///   geofix --key YOUR_KEY serve --port 8080
#[derive(Parser)]
#[command(name = "geofix", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Google Maps API key. Also read from GEOFIX_API_KEY or the config file.
    #[arg(long, global = true)]
    key: Option<String>,

    /// Request timeout in seconds (0 = none).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Config file path. Defaults to ~/.geofix/config.json.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log requests to stderr (-vv for debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Coordinates and elevation of a place.
    Locate {
        /// Free-text place description.
        place: String,
    },
    /// Coordinates of a place.
    Coordinate {
        place: String,
    },
    /// Elevation at a coordinate.
    Elevation {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
    },
    /// Serve the JSON API over HTTP.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

/// Exit code for "the provider had nothing for this input".
const EXIT_NOT_FOUND: u8 = 2;

/// Failures of the binary itself, kept apart from lookup errors.
#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Lookup(#[from] LocationError),
    #[error("cannot start runtime: {0}")]
    Runtime(io::Error),
    #[error("cannot serve on {addr}: {source}")]
    Serve { addr: String, source: io::Error },
    #[error("cannot write output: {0}")]
    Output(#[from] serde_json::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (host, port) = match &cli.command {
        Command::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    let overrides = Overrides {
        api_key: cli.key.clone(),
        timeout_secs: cli.timeout,
        host,
        port,
    };

    match run(&cli, overrides) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_NOT_FOUND),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("geofix")
        .build();
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("Unable to initiate logger: {}", e);
    }
}

/// `Ok(false)` means the lookup ran but found nothing.
fn run(cli: &Cli, overrides: Overrides) -> Result<bool, CliError> {
    let config = Config::resolve(cli.config.as_deref(), overrides)?;
    let resolver =
        LocationResolver::new(config.api_key()?)?.with_default_timeout(config.timeout());

    match &cli.command {
        Command::Locate { place } => {
            let fix = resolver.resolve_full(place)?;
            if let Some(f) = &fix {
                eprintln!("  {}", f.display_line());
            }
            report(fix, || format!("Location not found: '{}'", place))
        }
        Command::Coordinate { place } => {
            let coord = resolver.resolve_coordinate(place)?;
            report(coord, || format!("Location not found: '{}'", place))
        }
        Command::Elevation { lat, lng } => {
            let coord = Coordinate::new(*lat, *lng);
            let elevation = resolver.resolve_elevation(coord)?;
            report(elevation, || format!("No elevation available for {}", coord))
        }
        Command::Serve { .. } => {
            let runtime = tokio::runtime::Runtime::new().map_err(CliError::Runtime)?;
            runtime
                .block_on(geofix::server::start(resolver, &config.host, config.port))
                .map_err(|source| CliError::Serve {
                    addr: format!("{}:{}", config.host, config.port),
                    source,
                })?;
            Ok(true)
        }
    }
}

/// JSON to stdout when found, message to stderr otherwise.
fn report<T: Serialize>(value: Option<T>, missing: impl FnOnce() -> String) -> Result<bool, CliError> {
    match value {
        Some(v) => {
            println!("{}", serde_json::to_string_pretty(&v)?);
            Ok(true)
        }
        None => {
            eprintln!("{}", missing());
            Ok(false)
        }
    }
}
