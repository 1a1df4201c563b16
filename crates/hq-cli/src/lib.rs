pub mod cli;
pub mod config;

pub use cli::{
    build_cli_command, Cli, Commands, DataArgs, GeoCommands, LinesCommands, OutputFormat,
    TsCommands,
};
pub use config::{load_config, HqConfig};
