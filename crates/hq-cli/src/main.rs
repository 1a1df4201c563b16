use std::process;

use anyhow::Result;
use clap::Parser;
use hq_cli::{load_config, Cli, Commands};
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

use crate::commands::emissions::EmissionsOptions;
use crate::commands::pf::PfOptions;
use crate::commands::redistribute::RedistributeOptions;
use crate::commands::{dispatch, emissions, geo, inspect, lines, pf, redistribute, ts};

mod commands;

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    debug!(?config, "configuration");

    match &cli.command {
        Commands::Inspect { data, format } => inspect::handle_inspect(data, *format, &config),
        Commands::Validate { data } => inspect::handle_validate(data, &config),
        Commands::Pf {
            data,
            mode,
            snapshot,
            threshold,
            enforce_q_limits,
            out,
        } => pf::handle(
            data,
            PfOptions {
                mode: *mode,
                snapshot: snapshot.as_deref(),
                threshold: *threshold,
                enforce_q_limits: *enforce_q_limits,
                out: out.as_deref(),
            },
            &config,
        ),
        Commands::Dispatch {
            data,
            method,
            check,
        } => dispatch::handle(data, *method, *check, &config),
        Commands::Redistribute {
            data,
            mode,
            snapshot,
            from_dispatch,
            max_iterations,
            format,
        } => redistribute::handle(
            data,
            RedistributeOptions {
                mode: *mode,
                snapshot: snapshot.as_deref(),
                from_dispatch: *from_dispatch,
                max_iterations: *max_iterations,
                format: *format,
            },
            &config,
        ),
        Commands::Lines { command } => lines::handle(command, &config),
        Commands::Geo { command } => geo::handle(command),
        Commands::Ts { command } => ts::handle(command, &config),
        Commands::Emissions {
            types,
            transport_share,
            length_km,
            distribution_share,
            kwh,
        } => emissions::handle(EmissionsOptions {
            types,
            transport_share: *transport_share,
            length_km: *length_km,
            distribution_share: *distribution_share,
            kwh: *kwh,
        }),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging disabled: {err}");
    }

    if let Err(err) = run(&cli) {
        error!("{err:#}");
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
