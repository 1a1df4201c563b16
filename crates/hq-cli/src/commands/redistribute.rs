use std::io::{self, Write};

use anyhow::{Context, Result};
use hq_algo::{dispatch, redistribute, DispatchMethod, Dispatcher, PowerFlowMode};
use hq_cli::{DataArgs, HqConfig, OutputFormat};
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::util::{load_study, print_json, snapshot_row};

pub struct RedistributeOptions<'a> {
    pub mode: PowerFlowMode,
    pub snapshot: Option<&'a str>,
    pub from_dispatch: bool,
    pub max_iterations: Option<usize>,
    pub format: OutputFormat,
}

pub fn handle(data: &DataArgs, options: RedistributeOptions<'_>, config: &HqConfig) -> Result<()> {
    let mut study = load_study(data, config)?;

    let row = match (&study.series, options.snapshot) {
        (Some(series), Some(snapshot)) => Some(snapshot_row(series, snapshot)?),
        (Some(_), None) => Some(0),
        (None, _) => None,
    };
    if let (Some(series), Some(row)) = (&study.series, row) {
        series.apply_snapshot(&mut study.network, row)?;
        info!(snapshot = %series.snapshots()[row], "set-points taken from snapshot");
    }

    if options.from_dispatch {
        let result = Dispatcher::new(DispatchMethod::MeritOrder)
            .run(&study.network, None)
            .context("merit-order dispatch before redistribution")?;
        dispatch::apply_snapshot(&mut study.network, &result, 0)?;
    }

    let mut settings = config
        .redistribution
        .settings(options.mode, config.power_flow.settings());
    if let Some(max) = options.max_iterations {
        settings.max_iterations = max;
    }
    let report = redistribute(&mut study.network, &settings).context("slack redistribution")?;

    if options.format == OutputFormat::Json {
        return print_json(&report);
    }

    println!(
        "Number of iterations: {} ({})",
        report.iterations,
        if report.converged { "converged" } else { "NOT converged" }
    );
    println!("Final slack output:   {:.2} MW", report.final_slack_mw);

    println!();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "GENERATOR\tP (MW)")?;
    for (name, p) in &report.generator_p {
        writeln!(writer, "{name}\t{p:.2}")?;
    }
    writer.flush()?;

    println!();
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "LINE\tP0 (MW)\tLOSSES (MW)")?;
    for (name, losses) in &report.line_losses {
        let p0 = report.line_flows.get(name).copied().unwrap_or(0.0);
        writeln!(writer, "{name}\t{p0:.2}\t{losses:.3}")?;
    }
    writer.flush()?;

    println!();
    println!("Total generation: {:.0} MW", report.total_generation);
    println!("Total load:       {:.0} MW", report.total_load);
    println!("Total losses:     {:.0} MW", report.total_losses);
    Ok(())
}
