//! GeoQuery CLI - Command-line interface
//!
//! Inspect geohash coverings and replay live query scenarios against the
//! in-memory store.

mod commands;
mod error;
mod fixture;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use geoquery::config::ConfigFile;
use geoquery::logging::init_logging;

use commands::ranges::RangesArgs;
use commands::watch::WatchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "geoquery")]
#[command(version = geoquery::VERSION)]
#[command(about = "Live circular geo queries over geohash key ranges", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.geoquery/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the geohash ranges covering a circle
    Ranges(RangesArgs),
    /// Replay a fixture scenario and print every query event
    Watch(WatchArgs),
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ConfigFile::load_from(path),
        None => ConfigFile::load(),
    }
    .map_err(|e| CliError::Config(e.to_string()))?;

    let _logging_guard =
        init_logging(&config.logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

    match cli.command {
        Commands::Ranges(args) => commands::ranges::run(args, &config),
        Commands::Watch(args) => commands::watch::run(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ranges() {
        let cli = Cli::try_parse_from([
            "geoquery", "ranges", "--lat", "-33.86", "--lon", "151.2", "--radius", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Ranges(args) => {
                assert_eq!(args.circle.lat, -33.86);
                assert_eq!(args.circle.radius, 3.0);
                assert!(!args.json);
            }
            Commands::Watch(_) => panic!("expected ranges"),
        }
    }

    #[test]
    fn test_parse_watch_with_global_config() {
        let cli = Cli::try_parse_from([
            "geoquery", "watch", "--fixture", "scenario.json", "--lat", "0", "--lon", "0",
            "--radius", "1", "--config", "/tmp/geoquery.ini",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/geoquery.ini")));
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.fixture, PathBuf::from("scenario.json"));
                assert_eq!(args.quiet_ms, 100);
            }
            Commands::Ranges(_) => panic!("expected watch"),
        }
    }
}
