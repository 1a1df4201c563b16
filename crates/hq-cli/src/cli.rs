use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use hq_algo::{DispatchMethod, PowerFlowMode};

#[derive(Parser, Debug)]
#[command(name = "hq-cli", author, version, about = "Hydro-Québec transmission grid studies", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// TOML configuration file
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the network (and optionally its time series) comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    /// Data directory with regions/, topology/ and timeseries/
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Read the static network from a JSON document instead
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "data_dir")]
    pub json: Option<PathBuf>,

    /// Time-series year; without it the static network is studied
    #[arg(long)]
    pub year: Option<String>,

    /// First day kept (YYYY-MM-DD)
    #[arg(long, requires = "year")]
    pub start: Option<String>,

    /// Last day kept (YYYY-MM-DD)
    #[arg(long, requires = "year")]
    pub end: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise the network and its time horizon
    Inspect {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Check the network before a study; fails when errors are found
    Validate {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Power flow with line loading, losses and voltage reports
    Pf {
        #[command(flatten)]
        data: DataArgs,
        /// `dc` (linear) or `ac` (Newton-Raphson)
        #[arg(long, default_value = "dc")]
        mode: PowerFlowMode,
        /// Solve a single snapshot (YYYY-MM-DD HH:MM:SS)
        #[arg(long, requires = "year")]
        snapshot: Option<String>,
        /// Critical loading threshold in percent
        #[arg(long)]
        threshold: Option<f64>,
        /// Switch PV buses to PQ at their reactive limits
        #[arg(long)]
        enforce_q_limits: bool,
        /// Write the line loading table to a CSV file
        #[arg(long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Economic dispatch of every snapshot
    Dispatch {
        #[command(flatten)]
        data: DataArgs,
        /// `merit` or `lopf`
        #[arg(long, default_value = "merit")]
        method: DispatchMethod,
        /// Only check that capacity covers the load
        #[arg(long)]
        check: bool,
    },
    /// Hand the slack generator's output back to the other units
    Redistribute {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, default_value = "ac")]
        mode: PowerFlowMode,
        /// Snapshot whose loads and costs are used (YYYY-MM-DD HH:MM:SS)
        #[arg(long, requires = "year")]
        snapshot: Option<String>,
        /// Start from a merit-order dispatch instead of the stored set-points
        #[arg(long)]
        from_dispatch: bool,
        #[arg(long)]
        max_iterations: Option<usize>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Raw transmission-line table preparation
    Lines {
        #[command(subcommand)]
        command: LinesCommands,
    },
    /// Distances, line lengths and region joins
    Geo {
        #[command(subcommand)]
        command: GeoCommands,
    },
    /// Time-series analysis
    Ts {
        #[command(subcommand)]
        command: TsCommands,
    },
    /// Yearly CO₂ attributed to transport and distribution
    Emissions {
        /// Energy types (default: all known types)
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,
        #[arg(long, default_value_t = hq_algo::emissions::DEFAULT_TRANSPORT_SHARE)]
        transport_share: f64,
        #[arg(long, default_value_t = hq_algo::emissions::DEFAULT_TRANSPORT_LENGTH_KM)]
        length_km: f64,
        #[arg(long, default_value_t = hq_algo::emissions::DEFAULT_DISTRIBUTION_SHARE)]
        distribution_share: f64,
        #[arg(long, default_value_t = hq_algo::emissions::DEFAULT_DISTRIBUTED_KWH)]
        kwh: f64,
    },
}

#[derive(Subcommand, Debug)]
pub enum LinesCommands {
    /// Keep the Québec rows of the raw table
    Filter {
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// List the substations used as line ends
    Nodes {
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Geolocate a node table with Nominatim
    Geocode {
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// Interpolate missing node coordinates from their neighbours
    Fill {
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Add node coordinates to the line rows
    Attach {
        #[arg(long)]
        lines: PathBuf,
        #[arg(long)]
        nodes: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Derive a `lines.csv` table
    Extract {
        input: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum GeoCommands {
    /// Great-circle distance between two points (decimal degrees)
    #[command(allow_negative_numbers = true)]
    Distance {
        lat1: f64,
        lon1: f64,
        lat2: f64,
        lon2: f64,
    },
    /// Length of every geolocated line row, in whole kilometres
    Lengths {
        input: PathBuf,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Assign geolocated nodes to MRC regions
    Regions {
        #[arg(long)]
        nodes: PathBuf,
        /// Region polygons (GeoJSON)
        #[arg(long)]
        regions: PathBuf,
        /// Region names (CSV `ID,CDNAME`)
        #[arg(long)]
        names: Option<PathBuf>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TsCommands {
    /// Highest total load snapshots
    Peaks {
        #[command(flatten)]
        data: DataArgs,
        /// Restrict to a year (YYYY) or month (YYYY-MM)
        #[arg(long)]
        period: Option<String>,
    },
    /// Quarterly load, availability and cost
    Seasonal {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Hour / month / weekday profile of a carrier
    Patterns {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long)]
        carrier: Option<String>,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Check that every table covers the same snapshots
    Check {
        #[command(flatten)]
        data: DataArgs,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn parses_modes_and_negative_coordinates() {
        let cli = Cli::try_parse_from(["hq-cli", "pf", "--mode", "ac", "--data-dir", "data"]).unwrap();
        match cli.command {
            Commands::Pf { mode, data, .. } => {
                assert_eq!(mode, PowerFlowMode::Ac);
                assert_eq!(data.data_dir, Some(PathBuf::from("data")));
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "hq-cli", "geo", "distance", "45.5017", "-73.5673", "46.8139", "-71.2080",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Geo {
                command: GeoCommands::Distance { lon1, .. }
            } if lon1 == -73.5673
        ));
    }

    #[test]
    fn snapshot_requires_year() {
        assert!(Cli::try_parse_from(["hq-cli", "pf", "--snapshot", "2024-01-01 00:00:00"]).is_err());
    }
}
